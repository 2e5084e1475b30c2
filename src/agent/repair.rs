//! Clean-up of agent-written text before it is parsed as JSON.
//!
//! Agent harnesses on other platforms write files as UTF-16 or with a UTF-8
//! byte-order mark, and their output sometimes carries mojibake for dashes
//! and ellipses. Both are repaired here.

use std::sync::LazyLock;

use regex::Regex;

static DASH_MOJIBAKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("ÔÇô|ÔÇö|â€“|â€”").expect("valid regex"));

static ELLIPSIS_MOJIBAKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("ÔÇª|â€¦").expect("valid regex"));

// Leaked en-dash with an embedded quote; longest variant first.
static LEAKED_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("ا\"اخaُ|ا\"اخa|ا\"اخ").expect("valid regex"));

/// Decode raw file bytes, honouring UTF-16 and UTF-8 byte-order marks.
/// Invalid sequences become U+FFFD.
pub fn decode_text(raw: &[u8]) -> String {
    match raw {
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => String::from_utf8_lossy(raw).into_owned(),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Replace known dash/ellipsis mojibake with ASCII.
pub fn repair_mojibake(text: &str) -> String {
    let text = DASH_MOJIBAKE.replace_all(text, "-");
    let text = ELLIPSIS_MOJIBAKE.replace_all(&text, "...");
    LEAKED_DASH.replace_all(&text, "-").into_owned()
}

/// Decode and repair in one step.
pub fn repair_json_text(raw: &[u8]) -> String {
    repair_mojibake(&decode_text(raw))
}
