//! Table formatting helpers for CLI output.

use comfy_table::{ContentArrangement, Table};
use dockerless_runtime::provider::{Action, Plan};

/// Create a styled table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// Table of planned changes, one row per resource.
pub fn plan_table(plan: &Plan) -> Table {
    let mut table = new_table(&["ACTION", "RESOURCE", "SOURCE", "TARGET"]);
    for change in &plan.changes {
        let model = change.after.as_ref().or(change.before.as_ref());
        let source = model.and_then(|m| m.source.as_deref()).unwrap_or("-");
        let mut target = model
            .and_then(|m| m.target.as_deref())
            .unwrap_or("-")
            .to_string();
        if change.action == Action::Update {
            if let Some(previous) = change.before.as_ref().and_then(|m| m.target.as_deref()) {
                if Some(previous) != change.after.as_ref().and_then(|m| m.target.as_deref()) {
                    target = format!("{} -> {}", previous, target);
                }
            }
        }
        table.add_row(vec![
            change.action.to_string(),
            change.name.clone(),
            source.to_string(),
            target,
        ]);
    }
    table
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Shorten a `sha256:` digest for display.
pub fn short_digest(digest: &str) -> &str {
    let hex_start = digest.find(':').map(|i| i + 1).unwrap_or(0);
    let end = (hex_start + 12).min(digest.len());
    digest.get(..end).unwrap_or(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockerless_runtime::provider::PlannedChange;
    use dockerless_runtime::RemoteImageModel;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_short_digest() {
        assert_eq!(
            short_digest("sha256:0123456789abcdef0123"),
            "sha256:0123456789ab"
        );
        assert_eq!(short_digest("sha256:abc"), "sha256:abc");
    }

    #[test]
    fn test_plan_table_shows_moved_target() {
        let model = |target: &str| RemoteImageModel {
            source: Some("app:v1".to_string()),
            target: Some(target.to_string()),
            digest: None,
        };
        let plan = Plan {
            changes: vec![PlannedChange {
                name: "app".to_string(),
                action: Action::Update,
                before: Some(model("ghcr.io/o/app:v1")),
                after: Some(model("ghcr.io/o/app:v2")),
            }],
        };
        let rendered = plan_table(&plan).to_string();
        assert!(rendered.contains("update"));
        assert!(rendered.contains("ghcr.io/o/app:v1 -> ghcr.io/o/app:v2"));
    }
}
