//! Normalizing artifact text into a download status.
//!
//! Three heuristics run against the same content, in confidence order:
//! an embedded JSON fragment, the free-text `Downloading app <id> <name>`
//! template, and bare marker substrings inside key-value blocks. The first
//! label-yielding heuristic wins the label; marker scanning refines the
//! state afterwards. Malformed input degrades to "no match" — none of
//! these paths may panic on garbage.

use serde_json::Value;

use crate::model::{DownloadState, RawStatus};

/// Extract {state, item label, raw byte count} from artifact text.
pub fn extract(text: &str) -> RawStatus {
    let mut status = json_fragment(text)
        .or_else(|| template_line(text))
        .unwrap_or_default();

    // Marker scan supplies the state when nothing stronger matched, and
    // pause markers override everything: a paused queue still carries
    // "downloading" lines elsewhere in the same artifact.
    match marker_state(text) {
        Some(DownloadState::Paused) => status.state = DownloadState::Paused,
        Some(state) if status.state == DownloadState::Unknown => status.state = state,
        _ => {}
    }

    if status.byte_count == 0 {
        status.byte_count = kv_byte_count(text).unwrap_or(0);
    }
    status
}

/// Highest confidence: a JSON object embedded on a single line carrying an
/// app name or identifier, e.g. progress lines some client builds emit.
fn json_fragment(text: &str) -> Option<RawStatus> {
    for line in text.lines() {
        let Some(start) = line.find('{') else { continue };
        let Some(end) = line.rfind('}') else { continue };
        if end <= start {
            continue;
        }
        let Ok(value) = serde_json::from_str::<Value>(&line[start..=end]) else {
            continue;
        };

        let label = value
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| id_label(&value, "appid"))
            .or_else(|| id_label(&value, "app_id"));
        // Without an identifying field this is some other JSON; keep looking.
        let Some(label) = label else { continue };

        let byte_count = ["bytespersecond", "bytes_per_second", "bytes", "total_bytes"]
            .iter()
            .find_map(|key| value.get(*key).and_then(as_u64))
            .unwrap_or(0);

        let state = if value.get("paused").and_then(Value::as_bool).unwrap_or(false) {
            DownloadState::Paused
        } else {
            DownloadState::Active
        };

        return Some(RawStatus { state, item_label: Some(label), byte_count });
    }
    None
}

/// Medium confidence: Steam's free-text log template
/// `Downloading app <id> <name>`, with or without quotes around the name.
fn template_line(text: &str) -> Option<RawStatus> {
    for line in text.lines() {
        let Some(pos) = line.find("Downloading app ") else { continue };
        let rest = &line[pos + "Downloading app ".len()..];
        let mut parts = rest.trim().splitn(2, char::is_whitespace);

        let Some(id) = parts.next() else { continue };
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }

        let name = parts
            .next()
            .map(|n| n.trim().trim_matches('"').to_string())
            .filter(|n| !n.is_empty());

        return Some(RawStatus {
            state: DownloadState::Active,
            // A bare numeric label is prettified by the engine later.
            item_label: Some(name.unwrap_or_else(|| id.to_string())),
            byte_count: 0,
        });
    }
    None
}

/// Lowest confidence: case-insensitive marker substrings. Only ever yields
/// a state, never a label. Paused outranks active outranks completed — in
/// a log tail the completion markers of *previous* items are routine.
fn marker_state(text: &str) -> Option<DownloadState> {
    let lower = text.to_ascii_lowercase();
    if lower.contains("paused") || lower.contains("suspend") {
        return Some(DownloadState::Paused);
    }
    if lower.contains("downloading") || lower.contains("update running") {
        return Some(DownloadState::Active);
    }
    if lower.contains("fully installed") || lower.contains("completed") {
        return Some(DownloadState::Completed);
    }
    None
}

/// Numeric value of a quoted key-value line such as
/// `\t"BytesPerSecond"\t\t"524288"`. Quoted tokens sit at the odd indices
/// of a `split('"')`.
fn kv_byte_count(text: &str) -> Option<u64> {
    for line in text.lines() {
        let lower = line.to_ascii_lowercase();
        if !lower.contains("bytespersecond") && !lower.contains("bytesdownloaded") {
            continue;
        }
        let quoted: Vec<&str> = line.split('"').skip(1).step_by(2).collect();
        if quoted.len() >= 2 {
            if let Ok(value) = quoted[1].trim().parse::<u64>() {
                return Some(value);
            }
        }
    }
    None
}

fn id_label(value: &Value, key: &str) -> Option<String> {
    let field = value.get(key)?;
    field
        .as_u64()
        .map(|n| n.to_string())
        .or_else(|| field.as_str().map(str::to_string))
}

fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_line_yields_active_and_label() {
        let status = extract("[2024-01-02 10:11:12] Downloading app 730 Counter-Strike 2\n");
        assert_eq!(status.state, DownloadState::Active);
        assert_eq!(status.item_label.as_deref(), Some("Counter-Strike 2"));
    }

    #[test]
    fn template_line_strips_quotes() {
        let status = extract("Downloading app 570 \"Dota 2\"");
        assert_eq!(status.item_label.as_deref(), Some("Dota 2"));
    }

    #[test]
    fn template_without_name_keeps_numeric_id() {
        let status = extract("Downloading app 1245620");
        assert_eq!(status.state, DownloadState::Active);
        assert_eq!(status.item_label.as_deref(), Some("1245620"));
    }

    #[test]
    fn json_fragment_outranks_template() {
        let text = "Downloading app 570 Dota 2\n\
                    progress {\"name\":\"ELDEN RING\",\"bytespersecond\":1048576}\n";
        let status = extract(text);
        assert_eq!(status.item_label.as_deref(), Some("ELDEN RING"));
        assert_eq!(status.byte_count, 1_048_576);
        assert_eq!(status.state, DownloadState::Active);
    }

    #[test]
    fn json_fragment_with_appid_only() {
        let status = extract("{\"appid\":730,\"bytes\":\"4096\"}");
        assert_eq!(status.item_label.as_deref(), Some("730"));
        assert_eq!(status.byte_count, 4096);
    }

    #[test]
    fn paused_marker_overrides_downloading() {
        let text = "\"scheduler\"\n{\n\t\"downloading\"\t\"1\"\n\t\"paused\"\t\"1\"\n}\n";
        assert_eq!(extract(text).state, DownloadState::Paused);
    }

    #[test]
    fn paused_marker_overrides_template_match() {
        let text = "Downloading app 730 Counter-Strike 2\nupdate state: suspended\n";
        let status = extract(text);
        assert_eq!(status.state, DownloadState::Paused);
        assert_eq!(status.item_label.as_deref(), Some("Counter-Strike 2"));
    }

    #[test]
    fn marker_only_content_yields_state_without_label() {
        let status = extract("\"apps\"\n{\n\t\"state\"\t\"downloading\"\n}\n");
        assert_eq!(status.state, DownloadState::Active);
        assert!(status.item_label.is_none());
    }

    #[test]
    fn completion_marker_detected() {
        assert_eq!(
            extract("AppID 730 update canceled : Fully Installed\n").state,
            DownloadState::Completed
        );
    }

    #[test]
    fn kv_byte_count_parsed_from_quoted_pair() {
        let text = "\"downloads\"\n{\n\t\"BytesPerSecond\"\t\t\"524288\"\n\t\"downloading\"\t\"1\"\n}\n";
        let status = extract(text);
        assert_eq!(status.byte_count, 524_288);
        assert_eq!(status.state, DownloadState::Active);
    }

    #[test]
    fn no_match_degrades_to_unknown() {
        let status = extract("totally unrelated text\n");
        assert_eq!(status.state, DownloadState::Unknown);
        assert!(status.item_label.is_none());
        assert_eq!(status.byte_count, 0);
    }

    #[test]
    fn malformed_json_is_not_fatal() {
        let status = extract("progress {\"name\":\"broken\n{]}\nDownloading app 730 CS2\n");
        // The broken fragment is skipped; the template still matches.
        assert_eq!(status.state, DownloadState::Active);
        assert_eq!(status.item_label.as_deref(), Some("CS2"));
    }
}
