use super::args::{
    BROWSE_DEFAULT_LIMIT, BROWSE_MAX_LIMIT, QUEUE_DEFAULT_LIMIT, QUEUE_MAX_LIMIT, SEARCH_DEFAULT_LIMIT,
    SEARCH_MAX_LIMIT,
};
use serde_json::{json, Value};

/// Every tool the dispatcher routes, in listing order
pub const TOOL_NAMES: [&str; 10] = [
    "ma_list_players",
    "ma_volume",
    "ma_group",
    "ma_playback",
    "ma_play_media",
    "ma_queue",
    "ma_queue_item",
    "ma_transfer_queue",
    "ma_search",
    "ma_browse",
];

/// Get the list of available tools (for MCP discovery)
pub fn tool_definitions() -> Value {
    json!({
        "tools": [
            {
                "name": "ma_list_players",
                "description": "List all Music Assistant players with their state, volume and grouping. Use the returned player_id values with the other tools.",
                "inputSchema": {
                    "type": "object",
                    "properties": {}
                }
            },
            {
                "name": "ma_volume",
                "description": "Change a player's volume. Give exactly one of level (absolute 0-100), adjust (\"up\", \"down\" or a signed step such as -10) or mute (true/false).",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "player_id": {
                            "type": "string",
                            "description": "Player id or exact display name"
                        },
                        "level": {
                            "type": "integer",
                            "minimum": 0,
                            "maximum": 100,
                            "description": "Absolute volume level (0-100)"
                        },
                        "adjust": {
                            "oneOf": [
                                { "type": "string", "enum": ["up", "down"] },
                                { "type": "integer", "minimum": -100, "maximum": 100 }
                            ],
                            "description": "\"up\"/\"down\" for one step, or a signed change in percent"
                        },
                        "mute": {
                            "type": "boolean",
                            "description": "Mute (true) or unmute (false)"
                        }
                    },
                    "required": ["player_id"]
                }
            },
            {
                "name": "ma_group",
                "description": "Group players for synchronised playback. 'join' makes player_ids follow target_player_id; 'leave' removes player_ids from their groups.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "action": {
                            "type": "string",
                            "enum": ["join", "leave"]
                        },
                        "player_ids": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Players to join or remove"
                        },
                        "target_player_id": {
                            "type": "string",
                            "description": "Group leader; required for 'join'"
                        }
                    },
                    "required": ["action", "player_ids"]
                }
            },
            {
                "name": "ma_playback",
                "description": "Control playback on a queue: play, pause, stop, toggle (play/pause), next, previous or seek.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "queue_id": {
                            "type": "string",
                            "description": "Queue id, player id or player name"
                        },
                        "command": {
                            "type": "string",
                            "enum": ["play", "pause", "stop", "toggle", "next", "previous", "seek"]
                        },
                        "position": {
                            "type": "number",
                            "minimum": 0,
                            "description": "Seek position in seconds; only for 'seek'"
                        }
                    },
                    "required": ["queue_id", "command"]
                }
            },
            {
                "name": "ma_play_media",
                "description": "Play one or more media URIs (from ma_search or ma_browse) on a queue.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "queue_id": {
                            "type": "string",
                            "description": "Queue id, player id or player name"
                        },
                        "media": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Media URIs such as library://track/12 or spotify://album/abc"
                        },
                        "option": {
                            "type": "string",
                            "enum": ["play", "replace", "next", "add"],
                            "description": "How to treat the existing queue (default play)"
                        },
                        "radio_mode": {
                            "type": "boolean",
                            "description": "Keep playing similar tracks after the given media"
                        }
                    },
                    "required": ["queue_id", "media"]
                }
            },
            {
                "name": "ma_queue",
                "description": "Show a queue or change its settings: get (default), shuffle, repeat or clear.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "queue_id": {
                            "type": "string",
                            "description": "Queue id, player id or player name"
                        },
                        "action": {
                            "type": "string",
                            "enum": ["get", "shuffle", "repeat", "clear"]
                        },
                        "shuffle": {
                            "type": "boolean",
                            "description": "Required for 'shuffle'"
                        },
                        "repeat": {
                            "type": "string",
                            "enum": ["off", "one", "all"],
                            "description": "Required for 'repeat'"
                        },
                        "limit": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": QUEUE_MAX_LIMIT,
                            "default": QUEUE_DEFAULT_LIMIT
                        },
                        "offset": {
                            "type": "integer",
                            "minimum": 0,
                            "default": 0
                        }
                    },
                    "required": ["queue_id"]
                }
            },
            {
                "name": "ma_queue_item",
                "description": "Reorder or remove one queue item, identified by the queue_item_id shown by ma_queue.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "queue_id": {
                            "type": "string",
                            "description": "Queue id, player id or player name"
                        },
                        "item_id": {
                            "type": "string",
                            "description": "queue_item_id of the item"
                        },
                        "action": {
                            "type": "string",
                            "enum": ["move", "move_up", "move_down", "move_next", "remove"]
                        },
                        "position": {
                            "type": "integer",
                            "minimum": 0,
                            "description": "Destination index; only for 'move'"
                        }
                    },
                    "required": ["queue_id", "item_id", "action"]
                }
            },
            {
                "name": "ma_transfer_queue",
                "description": "Move the queue and playback from one player to another.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "source_queue_id": { "type": "string" },
                        "target_queue_id": { "type": "string" }
                    },
                    "required": ["source_queue_id", "target_queue_id"]
                }
            },
            {
                "name": "ma_search",
                "description": "Search all configured providers for artists, albums, tracks, playlists and radio stations. Results carry URIs for ma_play_media.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "query": { "type": "string" },
                        "media_types": {
                            "type": "array",
                            "items": {
                                "type": "string",
                                "enum": ["artist", "album", "track", "playlist", "radio"]
                            },
                            "description": "Restrict the search; all types when omitted"
                        },
                        "limit": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": SEARCH_MAX_LIMIT,
                            "default": SEARCH_DEFAULT_LIMIT,
                            "description": "Maximum results per media type"
                        }
                    },
                    "required": ["query"]
                }
            },
            {
                "name": "ma_browse",
                "description": "Browse provider content. Omit path to list providers, then pass folder paths from earlier results to go deeper.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "path": { "type": "string" },
                        "limit": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": BROWSE_MAX_LIMIT,
                            "default": BROWSE_DEFAULT_LIMIT
                        },
                        "offset": {
                            "type": "integer",
                            "minimum": 0,
                            "default": 0
                        }
                    }
                }
            }
        ]
    })
}
