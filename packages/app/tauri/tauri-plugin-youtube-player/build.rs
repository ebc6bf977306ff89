const COMMANDS: &[&str] = &[
    "initialize",
    "destroy",
    "call",
    "add_event_listener",
    "remove_event_listener",
    "get_all_players_events_state",
    "get_plugin_version",
    "bridge_message",
];

fn main() {
    tauri_plugin::Builder::new(COMMANDS).build();
}
