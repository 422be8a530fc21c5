// Web UI markup recognition.
//
// Every assumption about the panel's HTML lives here. When firmware changes
// its pages, this is the only module that should need revision.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseError;
use crate::model::{PanelInfo, PanelState};

static SESSION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"session=(0x[0-9A-Fa-f]+)").expect("valid session regex"));

static PASSWORD_INPUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<input[^>]*type\s*=\s*["']?password"#).expect("valid password regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

static ROW_END: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)</tr\s*>").expect("valid row regex"));

static STATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(fullset|unset|partset(?:\s+[ab])?)\b").expect("valid state regex")
});

static CELL_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<t[dh][^>]*>\s*([^<]+?)\s*:?\s*</t[dh]>\s*<t[dh][^>]*>\s*([^<]*?)\s*</t[dh]>",
    )
    .expect("valid cell regex")
});

const PREVIEW_LEN: usize = 120;

/// Pull the session id out of a redirect target or page body.
pub fn extract_session_id(text: &str) -> Option<String> {
    SESSION_ID
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_owned())
}

/// Whether `body` is the login form (i.e. the session is not valid).
pub fn is_login_page(body: &str) -> bool {
    PASSWORD_INPUT.is_match(body)
}

/// Read the arming state of the `area_label` row.
///
/// Only tokens in visible text count; button labels inside tags are ignored.
/// `Unset` and `Fullset` are the only states returned. Any other outcome is
/// a [`ParseError`], never a guess.
pub fn parse_area_state(body: &str, area_label: &str) -> Result<PanelState, ParseError> {
    let html = body.replace("&nbsp;", " ");
    let haystack = html.to_ascii_lowercase();
    let needle = area_label.to_ascii_lowercase();

    if !needle.is_empty() {
        for (start, _) in haystack.match_indices(&needle) {
            let row = row_after(&html, start + needle.len());
            let text = TAG.replace_all(row, " ");
            let Some(token) = STATE_TOKEN.captures(&text).and_then(|c| c.get(1)) else {
                continue;
            };

            let found = collapse_whitespace(token.as_str());
            return match found.to_ascii_lowercase().as_str() {
                "unset" => Ok(PanelState::Unset),
                "fullset" => Ok(PanelState::Fullset),
                _ => Err(ParseError::UnsupportedState { found }),
            };
        }
    }

    Err(ParseError::MarkerNotFound {
        marker: area_label.to_owned(),
        preview: preview(body),
    })
}

/// Best-effort panel identification from label/value table cells.
pub fn parse_panel_info(body: &str) -> PanelInfo {
    let mut info = PanelInfo::default();

    for caps in CELL_PAIR.captures_iter(body) {
        let (Some(label), Some(value)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let value = collapse_whitespace(&value.as_str().replace("&nbsp;", " "));
        if value.is_empty() {
            continue;
        }

        let slot = match collapse_whitespace(label.as_str()).to_ascii_lowercase().as_str() {
            "panel type" | "model" | "type" => &mut info.model,
            "serial number" | "serial no" | "serial" => &mut info.serial_number,
            "installation" | "installation name" | "site" | "system name" => &mut info.site,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    info
}

/// The rest of the table row beginning at `from`, or the rest of the page.
fn row_after(html: &str, from: usize) -> &str {
    let rest = html.get(from..).unwrap_or_default();
    match ROW_END.find(rest) {
        Some(end) => rest.get(..end.start()).unwrap_or(rest),
        None => rest,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn preview(body: &str) -> String {
    let text = collapse_whitespace(&TAG.replace_all(body, " "));
    text.chars().take(PREVIEW_LEN).collect()
}
