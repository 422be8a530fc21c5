//! Output formatting: human-readable, JSON, plain.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde::Serialize;

use spc_core::{PanelInfo, PanelSnapshot, PanelState};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Render a serializable value in the chosen format.
///
/// `human` renders the table (default) view; `plain` the scripting view.
pub fn render<T: Serialize>(
    format: OutputFormat,
    data: &T,
    human: impl Fn(&T) -> String,
    plain: impl Fn(&T) -> String,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table => human(data),
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::JsonCompact => serde_json::to_string(data)?,
        OutputFormat::Plain => plain(data),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Panel views ──────────────────────────────────────────────────────

/// Colored label for a panel state.
pub fn state_label(state: PanelState, color: bool) -> String {
    let label = match state {
        PanelState::Unset => "UNSET (disarmed)",
        PanelState::Fullset => "FULLSET (armed)",
        PanelState::Unknown => "UNKNOWN",
    };
    if !color {
        return label.to_owned();
    }
    match state {
        PanelState::Unset => label.green().to_string(),
        PanelState::Fullset => label.red().bold().to_string(),
        PanelState::Unknown => label.yellow().to_string(),
    }
}

/// Multi-line status view of a snapshot.
pub fn snapshot_detail(info: &PanelInfo, snapshot: &PanelSnapshot, color: bool) -> String {
    let mut lines = vec![format!(
        "{:<12} {}",
        "Panel:",
        info.display_name()
    )];
    lines.push(format!(
        "{:<12} {}",
        "All Areas:",
        state_label(snapshot.effective_state(), color)
    ));
    if let Some(at) = snapshot.updated_at {
        lines.push(format!(
            "{:<12} {}",
            "Confirmed:",
            at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
        ));
    }
    if !snapshot.available {
        lines.push(format!("{:<12} unavailable", "Status:"));
    }
    if let Some(ref err) = snapshot.last_error {
        lines.push(format!("{:<12} {err}", "Last error:"));
    }
    lines.join("\n")
}

/// Multi-line view of panel identification.
pub fn info_detail(info: &PanelInfo) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".into());
    [
        format!("{:<14} {}", "Name:", info.display_name()),
        format!("{:<14} {}", "Model:", field(&info.model)),
        format!("{:<14} {}", "Serial number:", field(&info.serial_number)),
        format!("{:<14} {}", "Site:", field(&info.site)),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_state_labels_have_no_escape_codes() {
        assert_eq!(state_label(PanelState::Fullset, false), "FULLSET (armed)");
        assert!(state_label(PanelState::Unset, true).contains('\u{1b}'));
    }

    #[test]
    fn unavailable_snapshot_is_flagged() {
        let snapshot = PanelSnapshot {
            state: PanelState::Unset,
            available: false,
            consecutive_failures: 3,
            updated_at: None,
            last_error: Some("Request timed out after 10s".into()),
        };
        let text = snapshot_detail(&PanelInfo::default(), &snapshot, false);
        assert!(text.contains("UNKNOWN"));
        assert!(text.contains("unavailable"));
        assert!(text.contains("timed out"));
        assert!(text.starts_with("Panel:       SPC Panel"));
    }
}
