// src/core/parse.rs
// Number parsing for scraped text: "1,204" → 1204, "" → None.

use crate::errors::TaskError;

/// Parse a count as printed by a source. Thousands separators, surrounding
/// whitespace and a trailing `*` footnote mark are ignored.
pub fn number(raw: &str) -> Result<f64, TaskError> {
    let cleaned: String = raw
        .trim()
        .trim_end_matches('*')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned
        .parse::<f64>()
        .map_err(|_| TaskError::exec(format!("not a number: {raw:?}")))
}

/// Like [`number`], but blank cells are `None` rather than an error.
pub fn optional_number(raw: &str) -> Result<Option<f64>, TaskError> {
    if raw.trim().is_empty() { Ok(None) } else { number(raw).map(Some) }
}

/// Leading digit groups of a row split across cells: `["1", "204", "x"]` → `"1204"`.
pub fn joined_digits(parts: &[String]) -> String {
    let mut out = s!();
    for part in parts {
        let p = part.trim().replace(',', "");
        if p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()) {
            break;
        }
        out.push_str(&p);
    }
    out
}
