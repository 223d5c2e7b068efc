//! Email body normalization
//!
//! Bank alert mail arrives in every state of disrepair: quoted-printable
//! encoded, HTML-entity escaped, soft-wrapped mid-digit-run, or as an HTML
//! table pretending to be text. Everything here decodes to one canonical
//! plain-text substrate before any extraction pattern runs, and none of it
//! ever fails: unresolvable byte sequences are stripped, not raised.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{Html, Selector};

/// Tags whose content is never user-visible text
const SKIP_TAGS: [&str; 3] = ["script", "style", "head"];

/// Tags that end a logical line when flattening HTML
const LINE_BREAK_TAGS: [&str; 6] = ["br", "tr", "p", "div", "li", "table"];

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&(#x?[0-9a-fA-F]+|[a-zA-Z]+);").expect("invalid entity regex"))
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("invalid tag regex"))
}

fn space_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\r]+").expect("invalid space regex"))
}

fn ws_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("invalid ws regex"))
}

/// Decode transport encodings on a body: quoted-printable (soft line breaks
/// and =XX octets) followed by HTML entities.
///
/// Soft wraps matter most here: transports routinely split the long
/// narration digit run mid-sequence, and no downstream pattern survives
/// that. Robust-mode decoding leaves malformed escapes alone; bytes that do
/// not form valid UTF-8 are dropped.
pub fn decode_transport(body: &str) -> String {
    let decoded = match quoted_printable::decode(body.as_bytes(), quoted_printable::ParseMode::Robust)
    {
        Ok(bytes) => String::from_utf8_lossy(&bytes).replace('\u{FFFD}', ""),
        Err(_) => body.to_string(),
    };
    decode_entities(&decoded)
}

/// Decode the HTML entities banks actually emit into plain-text bodies
/// (&nbsp;, &amp;, numeric escapes). Unknown entities pass through verbatim.
pub fn decode_entities(text: &str) -> String {
    entity_re()
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match body.to_ascii_lowercase().as_str() {
                    "nbsp" => Some('\u{00A0}'),
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "naira" => Some('₦'),
                    _ => None,
                }
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .replace('\u{00A0}', " ")
}

/// Convert an HTML body to canonical plain text: scripts and styles dropped,
/// entities decoded by the parser, table rows and block elements becoming
/// line breaks, runs of spaces collapsed. Logical lines are preserved so
/// "same line as the label" patterns keep working.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    flatten_element(document.root_element(), &mut out);
    clean_text(&out)
}

fn flatten_element(element: scraper::ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_element) = scraper::ElementRef::wrap(child) {
            let name = child_element.value().name();
            if SKIP_TAGS.contains(&name) {
                continue;
            }
            if LINE_BREAK_TAGS.contains(&name) {
                out.push('\n');
            }
            flatten_element(child_element, out);
            if LINE_BREAK_TAGS.contains(&name) {
                out.push('\n');
            }
        }
    }
}

/// Extract label/value pairs from the `<td>` rows bank notifications are
/// built from.
///
/// Handles the three layouts seen in the wild: label and value in adjacent
/// cells, a separator cell holding only ":" between them, and label plus
/// value combined in one cell. Labels come back lower-cased with trailing
/// colons stripped.
pub fn table_fields(html: &str) -> Vec<(String, String)> {
    let document = Html::parse_document(html);
    let row_sel = Selector::parse("tr").expect("invalid tr selector");
    let cell_sel = Selector::parse("td, th").expect("invalid cell selector");

    let mut fields = Vec::new();
    for row in document.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|cell| collapse_ws(&cell.text().collect::<String>()))
            .collect();

        match cells.len() {
            0 => {}
            1 => {
                // Same-cell layout: "Amount : NGN 1,000.00"
                if let Some((label, value)) = cells[0].split_once(':') {
                    let label = normalize_label(label);
                    let value = value.trim().to_string();
                    if !label.is_empty() && !value.is_empty() {
                        fields.push((label, value));
                    }
                }
            }
            _ => {
                let label = normalize_label(&cells[0]);
                if label.is_empty() {
                    continue;
                }
                // Skip separator-only cells between label and value
                let value = cells[1..]
                    .iter()
                    .map(|c| c.trim_matches(|ch: char| ch == ':' || ch.is_whitespace()))
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if !value.is_empty() {
                    fields.push((label, value));
                }
            }
        }
    }
    fields
}

fn normalize_label(raw: &str) -> String {
    collapse_ws(raw)
        .trim_matches(|ch: char| ch == ':' || ch.is_whitespace())
        .to_lowercase()
}

/// Strip stray markup and control characters, collapse space runs, keep
/// logical lines intact.
pub fn clean_text(text: &str) -> String {
    let stripped = tag_re().replace_all(text, " ");
    let no_ctl: String = stripped
        .chars()
        .filter(|c| *c == '\n' || *c == '\t' || !c.is_control())
        .collect();
    let collapsed = space_run_re().replace_all(&no_ctl, " ");
    // Trim each line and drop empty ones
    collapsed
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse all whitespace (including newlines) to single spaces
pub fn collapse_ws(text: &str) -> String {
    ws_run_re().replace_all(text.trim(), " ").to_string()
}

/// Truncate to at most `limit` characters on a UTF-8 boundary, with control
/// characters removed. Used for the audit snippets.
pub fn truncate_snippet(text: &str, limit: usize) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }
    let sanitized: String = text
        .chars()
        .filter(|c| *c == '\n' || !c.is_control())
        .take(limit)
        .collect();
    Some(sanitized)
}
