mod common;

use common::{folder, track, FakeMusicAssistant, Harness};
use music_assistant_mcp::{ErrorKind, MaError};
use serde_json::json;
use std::time::Duration;

fn living_room() -> Harness {
    let api = FakeMusicAssistant::new();
    api.add_player("kitchen", "Kitchen");
    api.add_player("den", "Den");
    api.add_player("bath", "Bathroom");
    Harness::new(api)
}

fn kind_of<T: std::fmt::Debug>(result: Result<T, MaError>) -> ErrorKind {
    result.expect_err("expected the tool to fail").kind()
}

// ========== Players ==========

#[tokio::test]
async fn test_list_players_with_no_players_is_success() {
    let h = Harness::new(FakeMusicAssistant::new());

    let output = h.dispatcher.call("ma_list_players", json!({})).await.unwrap();
    assert_eq!(output.data["players"], json!([]));
    assert!(output.summary.contains("No players found"));
}

#[tokio::test]
async fn test_list_players_rejects_arguments() {
    let h = living_room();
    let result = h.dispatcher.call("ma_list_players", json!({ "verbose": true })).await;
    assert_eq!(kind_of(result), ErrorKind::ValidationError);
}

#[tokio::test]
async fn test_volume_on_missing_player_is_not_found() {
    let h = living_room();

    let result = h
        .dispatcher
        .call("ma_volume", json!({ "player_id": "garage", "level": 10 }))
        .await;
    assert_eq!(kind_of(result), ErrorKind::NotFound);
    assert!(h.api.log().is_empty());
}

#[tokio::test]
async fn test_conflicting_volume_modes_never_reach_the_server() {
    let h = living_room();

    let result = h
        .dispatcher
        .call("ma_volume", json!({ "player_id": "kitchen", "level": 10, "adjust": "up" }))
        .await;
    assert_eq!(kind_of(result), ErrorKind::ValidationError);
    assert_eq!(h.connects(), 0);
    assert!(h.api.log().is_empty());
}

#[tokio::test]
async fn test_volume_by_name_and_relative_step() {
    let h = living_room();

    h.dispatcher
        .call("ma_volume", json!({ "player_id": "den", "level": 55 }))
        .await
        .unwrap();
    let output = h
        .dispatcher
        .call("ma_volume", json!({ "player_id": "KITCHEN", "adjust": -40 }))
        .await
        .unwrap();

    assert_eq!(output.data["volume_level"], 0);
    assert_eq!(output.data["previous_level"], 30);
    assert_eq!(h.api.log(), vec!["volume_set den 55", "volume_set kitchen 0"]);
}

#[tokio::test]
async fn test_ambiguous_name_lists_candidates() {
    let api = FakeMusicAssistant::new();
    api.add_player("sp1", "Speaker");
    api.add_player("sp2", "speaker");
    let h = Harness::new(api);

    let err = h
        .dispatcher
        .call("ma_volume", json!({ "player_id": "Speaker", "mute": true }))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    match err {
        MaError::Ambiguous { candidates, .. } => assert_eq!(candidates, vec!["sp1", "sp2"]),
        other => panic!("expected ambiguity, got {:?}", other),
    }
}

// ========== Grouping ==========

#[tokio::test]
async fn test_textual_self_join_is_rejected() {
    let h = living_room();

    let result = h
        .dispatcher
        .call(
            "ma_group",
            json!({ "action": "join", "player_ids": ["kitchen"], "target_player_id": "kitchen" }),
        )
        .await;
    assert_eq!(kind_of(result), ErrorKind::ValidationError);
    assert_eq!(h.connects(), 0);
}

#[tokio::test]
async fn test_self_join_through_name_is_rejected() {
    let h = living_room();

    let result = h
        .dispatcher
        .call(
            "ma_group",
            json!({ "action": "join", "player_ids": ["Kitchen"], "target_player_id": "kitchen" }),
        )
        .await;
    assert_eq!(kind_of(result), ErrorKind::ValidationError);
    assert!(h.api.log().is_empty());
}

#[tokio::test]
async fn test_join_is_visible_in_player_list() {
    let h = living_room();

    h.dispatcher
        .call(
            "ma_group",
            json!({ "action": "join", "player_ids": ["den", "Bathroom"], "target_player_id": "Kitchen" }),
        )
        .await
        .unwrap();

    let output = h.dispatcher.call("ma_list_players", json!({})).await.unwrap();
    let players = output.data["players"].as_array().unwrap();
    let find = |id: &str| players.iter().find(|p| p["player_id"] == id).unwrap().clone();

    assert_eq!(find("den")["group_leader"], "kitchen");
    assert_eq!(find("bath")["group_leader"], "kitchen");
    assert_eq!(find("kitchen")["group_members"], json!(["den", "bath"]));
}

#[tokio::test]
async fn test_join_with_membership_reported_on_leader_only() {
    let h = living_room();
    h.api.state.lock().unwrap().leader_only_groups = true;

    let joined = h
        .dispatcher
        .call("ma_group", json!({ "action": "join", "player_ids": ["den"], "target_player_id": "kitchen" }))
        .await
        .unwrap();
    assert_eq!(joined.data["joined"], json!(["den"]));
    assert_eq!(joined.data["already_joined"], json!([]));
    assert!(h.api.player("den").synced_to.is_none());

    let output = h.dispatcher.call("ma_list_players", json!({})).await.unwrap();
    let players = output.data["players"].as_array().unwrap();
    let find = |id: &str| players.iter().find(|p| p["player_id"] == id).unwrap().clone();
    assert_eq!(find("den")["group_leader"], "kitchen");
    assert_eq!(find("kitchen")["group_members"], json!(["den"]));

    let again = h
        .dispatcher
        .call("ma_group", json!({ "action": "join", "player_ids": ["den"], "target_player_id": "kitchen" }))
        .await
        .unwrap();
    assert_eq!(again.data["joined"], json!([]));
    assert_eq!(again.data["already_joined"], json!(["den"]));
}

#[tokio::test]
async fn test_join_moves_player_out_of_its_old_group() {
    let h = living_room();
    h.dispatcher
        .call("ma_group", json!({ "action": "join", "player_ids": "den", "target_player_id": "bath" }))
        .await
        .unwrap();

    h.dispatcher
        .call("ma_group", json!({ "action": "join", "player_ids": "den", "target_player_id": "kitchen" }))
        .await
        .unwrap();

    assert_eq!(h.api.player("den").synced_to.as_deref(), Some("kitchen"));
    assert!(h.api.player("bath").group_childs.is_empty());
    let log = h.api.log();
    assert_eq!(log[1], r#"ungroup_many ["den"]"#);
    assert_eq!(log[2], r#"group_many kitchen ["den"]"#);
}

#[tokio::test(start_paused = true)]
async fn test_join_reports_members_that_never_follow() {
    let h = living_room();
    h.api.state.lock().unwrap().stubborn.insert("den".to_string());

    let err = h
        .dispatcher
        .call(
            "ma_group",
            json!({ "action": "join", "player_ids": ["den", "bath"], "target_player_id": "kitchen" }),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::PartialFailure);
    let MaError::PartialFailure { succeeded, failed, .. } = err else {
        panic!("expected a partial failure");
    };
    assert_eq!(succeeded, vec!["bath"]);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].target, "den");
}

#[tokio::test]
async fn test_leave_is_idempotent() {
    let h = living_room();
    h.dispatcher
        .call("ma_group", json!({ "action": "join", "player_ids": ["den"], "target_player_id": "kitchen" }))
        .await
        .unwrap();

    h.dispatcher
        .call("ma_group", json!({ "action": "leave", "player_ids": ["den"] }))
        .await
        .unwrap();
    let before = h.api.log().len();
    let output = h
        .dispatcher
        .call("ma_group", json!({ "action": "leave", "player_ids": ["den"] }))
        .await
        .unwrap();

    assert_eq!(h.api.log().len(), before);
    assert_eq!(output.data["ungrouped"], json!([]));
    assert!(h.api.player("den").synced_to.is_none());
}

// ========== Playback ==========

#[tokio::test]
async fn test_negative_seek_is_rejected_before_any_call() {
    let h = living_room();

    let result = h
        .dispatcher
        .call("ma_playback", json!({ "queue_id": "kitchen", "command": "seek", "position": -1 }))
        .await;
    assert_eq!(kind_of(result), ErrorKind::ValidationError);
    assert_eq!(h.connects(), 0);
}

#[tokio::test]
async fn test_playback_commands_reach_the_queue() {
    let h = living_room();

    h.dispatcher
        .call("ma_playback", json!({ "queue_id": "Den", "command": "seek", "position": 42.7 }))
        .await
        .unwrap();
    h.dispatcher
        .call("ma_playback", json!({ "player_id": "den", "command": "toggle" }))
        .await
        .unwrap();

    assert_eq!(h.api.log(), vec!["seek den 42", "queue_command den PlayPause"]);
}

#[tokio::test]
async fn test_search_result_plays_unchanged() {
    let h = living_room();
    h.api.state.lock().unwrap().search.tracks = vec![
        track("Song One", "spotify://track/abc123"),
        track("Song Two", "library://track/7"),
    ];

    let found = h
        .dispatcher
        .call("ma_search", json!({ "query": "song", "media_types": ["track"], "limit": 1 }))
        .await
        .unwrap();
    let results = found.data["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["artist"], "The Band");
    let uri = results[0]["uri"].as_str().unwrap().to_string();

    h.dispatcher
        .call("ma_play_media", json!({ "queue_id": "kitchen", "media": [uri.clone()] }))
        .await
        .unwrap();

    assert_eq!(
        h.api.log(),
        vec![r#"play_media kitchen ["spotify://track/abc123"] play false"#]
    );
    assert_eq!(h.api.item_names("kitchen"), vec![uri]);
}

#[tokio::test]
async fn test_search_without_results_is_success() {
    let h = living_room();
    let output = h.dispatcher.call("ma_search", json!({ "query": "nothing" })).await.unwrap();
    assert_eq!(output.data["results"], json!([]));
}

#[tokio::test]
async fn test_media_that_is_not_a_uri_is_invalid() {
    let h = living_room();

    let local = h
        .dispatcher
        .call("ma_play_media", json!({ "queue_id": "kitchen", "media": "just a name" }))
        .await;
    assert_eq!(kind_of(local), ErrorKind::InvalidMedia);
    assert_eq!(h.connects(), 0);

    let remote = h
        .dispatcher
        .call("ma_play_media", json!({ "queue_id": "kitchen", "media": "bogus://track/1" }))
        .await;
    assert_eq!(kind_of(remote), ErrorKind::InvalidMedia);
}

// ========== Queue ==========

#[tokio::test]
async fn test_clearing_twice_succeeds() {
    let h = living_room();
    h.api.add_items("kitchen", &["a", "b"]);

    for _ in 0..2 {
        let output = h
            .dispatcher
            .call("ma_queue", json!({ "queue_id": "kitchen", "action": "clear" }))
            .await
            .unwrap();
        assert_eq!(output.data["total_items"], 0);
    }

    let shown = h.dispatcher.call("ma_queue", json!({ "queue_id": "kitchen" })).await.unwrap();
    assert_eq!(shown.data["items"], json!([]));
}

#[tokio::test]
async fn test_queue_settings_report_fresh_state() {
    let h = living_room();

    let shuffled = h
        .dispatcher
        .call("ma_queue", json!({ "queue_id": "den", "action": "shuffle", "shuffle": true }))
        .await
        .unwrap();
    let repeated = h
        .dispatcher
        .call("ma_queue", json!({ "queue_id": "den", "action": "repeat", "repeat": "ALL" }))
        .await
        .unwrap();

    assert_eq!(shuffled.data["shuffle_enabled"], true);
    assert_eq!(repeated.data["repeat_mode"], "all");
}

#[tokio::test]
async fn test_queue_listing_pages() {
    let h = living_room();
    h.api.add_items("kitchen", &["a", "b", "c", "d", "e"]);

    let output = h
        .dispatcher
        .call("ma_queue", json!({ "queue_id": "kitchen", "limit": 2, "offset": 3 }))
        .await
        .unwrap();

    let items = output.data["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["name"], "d");
    assert_eq!(items[0]["index"], 3);
    assert_eq!(output.data["total_items"], 5);
}

#[tokio::test]
async fn test_queue_item_moves() {
    let h = living_room();
    h.api.add_items("kitchen", &["a", "b", "c", "d"]);
    let d = h.api.item_id("kitchen", 3);
    let a = h.api.item_id("kitchen", 0);

    h.dispatcher
        .call("ma_queue_item", json!({ "queue_id": "kitchen", "item_id": d, "action": "move", "position": 0 }))
        .await
        .unwrap();
    assert_eq!(h.api.item_names("kitchen"), vec!["d", "a", "b", "c"]);

    // Past the end clamps to the last slot
    h.dispatcher
        .call("ma_queue_item", json!({ "queue_id": "kitchen", "item_id": a, "action": "move", "position": 99 }))
        .await
        .unwrap();
    assert_eq!(h.api.item_names("kitchen"), vec!["d", "b", "c", "a"]);

    let log_len = h.api.log().len();
    let output = h
        .dispatcher
        .call("ma_queue_item", json!({ "queue_id": "kitchen", "item_id": d, "action": "move_up" }))
        .await
        .unwrap();
    assert_eq!(output.data["moved"], false);
    assert_eq!(h.api.log().len(), log_len);
}

#[tokio::test]
async fn test_queue_item_remove_and_unknown_item() {
    let h = living_room();
    h.api.add_items("den", &["a", "b"]);
    let b = h.api.item_id("den", 1);

    h.dispatcher
        .call("ma_queue_item", json!({ "queue_id": "den", "item_id": b, "action": "remove" }))
        .await
        .unwrap();
    assert_eq!(h.api.item_names("den"), vec!["a"]);

    let result = h
        .dispatcher
        .call("ma_queue_item", json!({ "queue_id": "den", "item_id": b, "action": "remove" }))
        .await;
    assert_eq!(kind_of(result), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_item_lookup_ends_when_server_ignores_offset() {
    let h = living_room();
    let names: Vec<String> = (0..600).map(|i| format!("t{}", i)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    h.api.add_items("kitchen", &names);
    h.api.state.lock().unwrap().ignore_offset = true;

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        h.dispatcher
            .call("ma_queue_item", json!({ "queue_id": "kitchen", "item_id": "missing", "action": "remove" })),
    )
    .await
    .expect("lookup kept paging");
    assert_eq!(kind_of(result), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_transfer_queue() {
    let h = living_room();
    h.api.add_items("kitchen", &["a"]);

    let same = h
        .dispatcher
        .call("ma_transfer_queue", json!({ "source_queue_id": "Kitchen", "target_queue_id": "kitchen" }))
        .await;
    assert_eq!(kind_of(same), ErrorKind::ValidationError);

    h.dispatcher
        .call("ma_transfer_queue", json!({ "source_queue_id": "kitchen", "target_queue_id": "Den" }))
        .await
        .unwrap();
    assert_eq!(h.api.item_names("den"), vec!["a"]);
    assert!(h.api.item_names("kitchen").is_empty());
}

// ========== Browse ==========

#[tokio::test]
async fn test_browse_splits_folders_and_pages() {
    let h = living_room();
    h.api.state.lock().unwrap().browse.insert(
        "spotify://library".to_string(),
        vec![
            folder("Playlists", "spotify://folder/playlists"),
            track("One", "spotify://track/1"),
            track("Two", "spotify://track/2"),
        ],
    );

    let output = h
        .dispatcher
        .call("ma_browse", json!({ "path": "spotify://library", "limit": 2 }))
        .await
        .unwrap();

    assert_eq!(output.data["folders"][0]["path"], "spotify://playlists");
    assert_eq!(output.data["items"][0]["uri"], "spotify://track/1");
    assert_eq!(output.data["total"], 3);
    assert_eq!(output.data["has_more"], true);

    let rest = h
        .dispatcher
        .call("ma_browse", json!({ "path": "spotify://library", "offset": 2 }))
        .await
        .unwrap();
    assert_eq!(rest.data["items"][0]["uri"], "spotify://track/2");
    assert_eq!(rest.data["has_more"], false);
}

// ========== Sessions ==========

#[tokio::test]
async fn test_mutating_calls_run_one_at_a_time() {
    let h = living_room();
    let gate = h.api.gate_volume();

    let first = h.dispatcher.call("ma_volume", json!({ "player_id": "den", "level": 10 }));
    let second = h.dispatcher.call("ma_volume", json!({ "player_id": "bath", "level": 20 }));
    let release = async {
        while h.api.log().is_empty() {
            tokio::task::yield_now().await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        let while_held = h.api.log();
        gate.add_permits(2);
        while_held
    };
    let (first, second, while_held) = tokio::join!(first, second, release);
    first.unwrap();
    second.unwrap();

    assert_eq!(while_held.len(), 1, "second call reached the server early: {:?}", while_held);
    let log = h.api.log();
    assert_eq!(log.len(), 4);
    let waiting: Vec<bool> = log.iter().map(|entry| entry.contains("waiting")).collect();
    assert_eq!(waiting, vec![true, false, true, false]);
}

#[tokio::test]
async fn test_transport_failure_recovers_on_next_call() {
    let h = living_room();

    h.dispatcher.call("ma_list_players", json!({})).await.unwrap();
    h.api.drop_connection_on_next_read();

    let failed = h.dispatcher.call("ma_list_players", json!({})).await;
    assert_eq!(kind_of(failed), ErrorKind::ConnectionError);

    let healed = h.dispatcher.call("ma_list_players", json!({})).await.unwrap();
    assert_eq!(healed.data["players"].as_array().unwrap().len(), 3);
    assert_eq!(h.connects(), 2);
}

#[tokio::test]
async fn test_unknown_tool_is_a_validation_error() {
    let h = living_room();
    let err = h.dispatcher.call("ma_dance", json!({})).await.unwrap_err();
    assert!(matches!(err, MaError::Validation { ref field, .. } if field == "name"));
}
