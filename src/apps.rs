//! Static AppID → title lookup.
//!
//! Steam's local artifacts mostly carry numeric AppIDs. This table covers
//! the common titles without any network lookup; everything else renders
//! as `App <id>`.

const KNOWN_APPS: &[(&str, &str)] = &[
    ("730", "Counter-Strike 2"),
    ("570", "Dota 2"),
    ("578080", "PUBG: BATTLEGROUNDS"),
    ("1091500", "Cyberpunk 2077"),
    ("1172470", "Apex Legends"),
    ("271590", "Grand Theft Auto V"),
    ("1245620", "ELDEN RING"),
    ("292030", "The Witcher 3: Wild Hunt"),
    ("1085660", "Destiny 2"),
    ("381210", "Dead by Daylight"),
];

pub fn display_name(app_id: &str) -> String {
    KNOWN_APPS
        .iter()
        .find(|(id, _)| *id == app_id)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| format!("App {}", app_id))
}
