// src/core/html.rs
// Tolerant, case-insensitive scanning of HTML tables. No DOM; local scanning
// within known blocks only.

use super::sanitize::{normalize_entities, normalize_ws};

pub fn to_lower(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

/// Byte range `(start, end)` of the next `<o …>…c` block at or after `from`.
pub fn next_tag_block_ci(s: &str, o: &str, c: &str, from: usize) -> Option<(usize, usize)> {
    let lc = to_lower(s);
    let ol = to_lower(o);
    let cl = to_lower(c);
    let start = lc.get(from..)?.find(&ol)? + from;
    let open_end = s[start..].find('>')? + start + 1;
    let end_rel = lc[open_end..].find(&cl)?;
    let end = open_end + end_rel + c.len();
    Some((start, end))
}

pub fn inner_after_open_tag(block: &str) -> String {
    if let Some(oe) = block.find('>') {
        if let Some(cs) = block.rfind('<') {
            if cs > oe {
                return block[oe + 1..cs].to_string();
            }
        }
    }
    s!()
}

pub fn strip_tags<S: AsRef<str>>(s: S) -> String {
    let s = s.as_ref();

    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;

    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&out)
}

/// Visible text of every `<tag>…</tag>` cell inside `block`, in order.
pub fn cell_texts(block: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut cells = Vec::new();
    let mut pos = 0usize;
    while let Some((s, e)) = next_tag_block_ci(block, &open, &close, pos) {
        let inner = inner_after_open_tag(&block[s..e]);
        cells.push(strip_tags(normalize_entities(&inner)));
        pos = e;
    }
    cells
}

/// Inner HTML of the first `<table>` whose header cells mention `header`.
pub fn table_with_header<'a>(doc: &'a str, header: &str) -> Option<&'a str> {
    let needle = to_lower(header);
    let mut pos = 0usize;
    while let Some((s, e)) = next_tag_block_ci(doc, "<table", "</table>", pos) {
        let table = &doc[s..e];
        if cell_texts(table, "th").iter().any(|h| to_lower(h).contains(&needle)) {
            let open_end = table.find('>')? + 1;
            let close = table.len().saturating_sub("</table>".len());
            return table.get(open_end..close);
        }
        pos = e;
    }
    None
}

/// Body rows of a table as cell text, skipping rows with no `<td>` cells.
pub fn body_rows(table: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut pos = 0usize;
    while let Some((s, e)) = next_tag_block_ci(table, "<tr", "</tr>", pos) {
        pos = e;
        let cells = cell_texts(&table[s..e], "td");
        if !cells.is_empty() {
            rows.push(cells);
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        <table class="other"><tr><th>Age</th></tr><tr><td>1</td></tr></table>
        <TABLE class="counties">
          <thead><tr><th>County</th><th>Cases</th></tr></thead>
          <tbody>
            <tr><td>Anoka</td><td>1,204</td></tr>
            <tr><td>St.&nbsp;Louis</td><td> 87 </td></tr>
          </tbody>
        </TABLE>"#;

    #[test]
    fn finds_table_by_header_and_reads_rows() {
        let table = table_with_header(DOC, "county").unwrap();
        let rows = body_rows(table);
        assert_eq!(rows, vec![
            vec![s!("Anoka"), s!("1,204")],
            vec![s!("St. Louis"), s!("87")],
        ]);
    }

    #[test]
    fn missing_header_yields_none() {
        assert!(table_with_header(DOC, "deaths").is_none());
    }
}
