//! Markup rendering of past visits.

use crate::models::Visit;

/// Clinical and health-parameter fields included in the narrative, in
/// display order.
pub const HISTORY_FIELDS: [&str; 16] = [
    "chief_complaint",
    "associated_complaint",
    "past_history",
    "family_history",
    "present_history",
    "diagnosis",
    "investigations",
    "others",
    "panchakarma_advice",
    "artava",
    "nadi",
    "agni",
    "mala",
    "mutra",
    "nidra",
    "manas",
];

/// `chief_complaint` -> `Chief Complaint`.
pub fn humanize_field(field: &str) -> String {
    field
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Render visits (already ordered newest first) as one markup string.
///
/// Each visit becomes a block opening with its date followed by one line
/// per non-empty field. Blocks are separated by a blank line.
pub fn render_narrative(visits: &[Visit]) -> String {
    let mut out = String::new();

    for visit in visits {
        out.push_str(&format!("<b>Date:</b> {}<br/>", visit.appointment_date));
        for field in HISTORY_FIELDS {
            if let Some(value) = visit.history_field(field) {
                out.push_str(&format!(
                    "<b>{}:</b> {}<br/>",
                    humanize_field(field),
                    escape_markup(value)
                ));
            }
        }
        out.push_str("<br/>");
    }

    out.trim().to_string()
}

fn escape_markup(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
