// src/geography/mod.rs
//! Region names: turning a source's free text into canonical county names and
//! filling in counties a source left out.
//!
//! Canonical county names follow the `"<Name> County"` form (`"St. Louis County"`).
//! A source row that covers two counties at once (`"Dukes and Nantucket"`)
//! stays a single combined entity; it is never pinned to one of the two.

pub mod names;

use std::collections::{HashMap, HashSet};

use crate::config::consts::UNASSIGNED;
use crate::core::sanitize::normalize_ws;
use crate::record::{CountyRef, Record};

pub use names::{to_iso3166_alpha3, to_us_state_abbreviation};

/// Result of canonicalizing one free-text region name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Canonical {
    One(String),
    Combined(Vec<String>),
    /// Cases the source could not place in any region.
    Unassigned,
}

impl Canonical {
    pub fn into_county(self) -> CountyRef {
        match self {
            Canonical::One(n) => CountyRef::One(n),
            Canonical::Combined(v) => CountyRef::Combined(v),
            Canonical::Unassigned => CountyRef::One(s!(UNASSIGNED)),
        }
    }
}

const UNASSIGNED_KEYS: [&str; 5] = ["unknown", "unassigned", "(unassigned)", "pending", "other"];

/// Known county names of one task, indexed by a loose matching key.
#[derive(Clone, Debug, Default)]
pub struct Gazetteer {
    index: HashMap<String, String>,
}

impl Gazetteer {
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let index = known
            .into_iter()
            .map(|n| (match_key(n.as_ref()), n.as_ref().to_string()))
            .collect();
        Self { index }
    }

    /// Map a source's spelling onto canonical county name(s).
    pub fn canonicalize(&self, raw: &str) -> Canonical {
        let cleaned = normalize_ws(raw);
        let key = match_key(&cleaned);
        if key.is_empty() || UNASSIGNED_KEYS.contains(&key.as_str()) {
            return Canonical::Unassigned;
        }
        if let Some(known) = self.index.get(&key) {
            return Canonical::One(known.clone());
        }

        let parts = split_combined(&cleaned);
        if parts.len() > 1 {
            return Canonical::Combined(parts.iter().map(|p| self.resolve_one(p)).collect());
        }
        Canonical::One(self.resolve_one(&cleaned))
    }

    /// Canonicalize an existing county field in place.
    pub fn canonicalize_county(&self, county: &CountyRef) -> CountyRef {
        match county {
            CountyRef::One(raw) => self.canonicalize(raw).into_county(),
            CountyRef::Combined(members) => {
                let mut out: Vec<String> = Vec::with_capacity(members.len());
                for m in members {
                    match self.canonicalize(m) {
                        Canonical::One(n) => out.push(n),
                        Canonical::Combined(v) => out.extend(v),
                        Canonical::Unassigned => {}
                    }
                }
                out.dedup();
                match out.len() {
                    0 => CountyRef::One(s!(UNASSIGNED)),
                    1 => CountyRef::One(out.remove(0)),
                    _ => CountyRef::Combined(out),
                }
            }
        }
    }

    fn resolve_one(&self, part: &str) -> String {
        self.index
            .get(&match_key(part))
            .cloned()
            .unwrap_or_else(|| add_county(part))
    }
}

/// `"essex"` → `"Essex County"`, `"BARNSTABLE COUNTY"` → `"Barnstable County"`.
/// Mixed-case names keep their casing (`"Lac qui Parle"`).
pub fn add_county(name: &str) -> String {
    let name = normalize_ws(name);
    let base = strip_county_suffix(&name);
    let base = if is_single_case(base) { title_case(base) } else { base.to_string() };
    if base.is_empty() {
        return base;
    }
    join!(&base, " County")
}

/// For every known region no record covers, append a zero-valued placeholder.
/// Combined rows cover each of their members. Idempotent.
pub fn backfill(mut records: Vec<Record>, known: &[String]) -> Vec<Record> {
    let covered: HashSet<String> = records
        .iter()
        .filter_map(|r| r.county.as_ref())
        .flat_map(|c| c.members().into_iter().map(str::to_string))
        .collect();

    let mut added = 0usize;
    for name in known {
        if !covered.contains(name) {
            records.push(Record::placeholder(name));
            added += 1;
        }
    }
    if added > 0 {
        logd!("Backfilled {added} of {} known regions", known.len());
    }
    records
}

/// Project a record onto each region it covers. A combined row yields one
/// copy per member, all carrying the same shared values; anything else is
/// returned as-is. Only for per-region views (map features), never for sums.
pub fn expand_combined(record: &Record) -> Vec<Record> {
    match &record.county {
        Some(CountyRef::Combined(members)) => members
            .iter()
            .map(|m| {
                let mut r = record.clone();
                r.county = Some(CountyRef::One(m.clone()));
                r
            })
            .collect(),
        _ => vec![record.clone()],
    }
}

fn match_key(name: &str) -> String {
    let lc = normalize_ws(name).to_lowercase().replace('.', "");
    let lc = strip_county_suffix(&lc).to_string();
    match lc.strip_prefix("saint ") {
        Some(rest) => join!("st ", rest),
        None => lc,
    }
}

fn strip_county_suffix(name: &str) -> &str {
    let trimmed = name.trim();
    let n = trimmed.len();
    if n > 7 && trimmed.is_char_boundary(n - 7) && trimmed[n - 7..].eq_ignore_ascii_case(" county") {
        trimmed[..n - 7].trim_end()
    } else {
        trimmed
    }
}

fn split_combined(name: &str) -> Vec<String> {
    let lc = name.to_ascii_lowercase();
    let mut parts = Vec::new();
    let mut start = 0usize;
    let seps = [" and ", " & ", "/", ","];
    let mut i = 0usize;
    while i < lc.len() {
        if let Some(sep) = seps.iter().find(|s| lc[i..].starts_with(**s)) {
            parts.push(name[start..i].trim().to_string());
            i += sep.len();
            start = i;
        } else {
            i += lc[i..].chars().next().map_or(1, char::len_utf8);
        }
    }
    parts.push(name[start..].trim().to_string());
    if parts.iter().any(String::is_empty) {
        return vec![name.to_string()];
    }
    parts
}

fn is_single_case(s: &str) -> bool {
    let letters = s.chars().filter(|c| c.is_alphabetic());
    let (mut up, mut low) = (false, false);
    for c in letters {
        up |= c.is_uppercase();
        low |= c.is_lowercase();
    }
    !(up && low)
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|w| {
            let mut cs = w.chars();
            match cs.next() {
                Some(f) => f.to_uppercase().chain(cs.flat_map(char::to_lowercase)).collect(),
                None => s!(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn recognizes_free_text_variants() {
        let g = Gazetteer::new(["St. Louis County", "Essex County", "Lac qui Parle County"]);
        assert_eq!(g.canonicalize("Saint Louis"), Canonical::One(s!("St. Louis County")));
        assert_eq!(g.canonicalize("ESSEX"), Canonical::One(s!("Essex County")));
        assert_eq!(g.canonicalize("  essex   county "), Canonical::One(s!("Essex County")));
        assert_eq!(g.canonicalize("Lac Qui Parle"), Canonical::One(s!("Lac qui Parle County")));
    }

    #[test]
    fn unknown_names_get_county_suffix() {
        let g = Gazetteer::default();
        assert_eq!(g.canonicalize("BARNSTABLE"), Canonical::One(s!("Barnstable County")));
        assert_eq!(g.canonicalize("Hampden County"), Canonical::One(s!("Hampden County")));
    }

    #[test]
    fn combined_row_keeps_both_regions() {
        let g = Gazetteer::new(["Essex County"]);
        assert_eq!(
            g.canonicalize("Dukes and Nantucket"),
            Canonical::Combined(vec![s!("Dukes County"), s!("Nantucket County")])
        );
        assert_eq!(
            g.canonicalize("DUKES & NANTUCKET"),
            Canonical::Combined(vec![s!("Dukes County"), s!("Nantucket County")])
        );
    }

    #[test]
    fn unknown_rows_are_unassigned() {
        let g = Gazetteer::default();
        assert_eq!(g.canonicalize("Unknown"), Canonical::Unassigned);
        assert_eq!(g.canonicalize(""), Canonical::Unassigned);
        assert_eq!(Canonical::Unassigned.into_county(), CountyRef::One(s!(UNASSIGNED)));
    }

    #[test]
    fn canonicalizing_twice_is_stable() {
        let g = Gazetteer::default();
        let once = g.canonicalize_county(&CountyRef::One(s!("Dukes and Nantucket")));
        let twice = g.canonicalize_county(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn backfill_adds_only_missing_regions() {
        let all: Vec<String> = (1..=14).map(|i| format!("County {i:02}")).collect();
        let reported: Vec<Record> = all[..12]
            .iter()
            .map(|n| record! { county: n.as_str(), cases: 3 })
            .collect();

        let out = backfill(reported, &all);
        assert_eq!(out.len(), 14);
        for name in &all {
            let hits: Vec<&Record> = out
                .iter()
                .filter(|r| r.county.as_ref().is_some_and(|c| c.covers(name)))
                .collect();
            assert_eq!(hits.len(), 1, "{name} should appear exactly once");
        }
        assert_eq!(out[12].cases, Some(0.0));
        assert_eq!(out[13].cases, Some(0.0));
        assert_eq!(out[13].deaths, None);
    }

    #[test]
    fn backfill_is_idempotent() {
        let k = known(&["A County", "B County", "C County"]);
        let r = vec![record! { county: "B County", cases: 2 }];
        let once = backfill(r, &k);
        let twice = backfill(once.clone(), &k);
        assert_eq!(once, twice);
    }

    #[test]
    fn combined_rows_cover_their_members() {
        let k = known(&["Dukes County", "Nantucket County", "Essex County"]);
        let mut combined = record! { cases: 10 };
        combined.county = Some(CountyRef::Combined(known(&["Dukes County", "Nantucket County"])));
        let out = backfill(vec![combined], &k);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].county, Some(CountyRef::One(s!("Essex County"))));
    }

    #[test]
    fn expanding_combined_row_shares_values() {
        let g = Gazetteer::default();
        let mut r = record! { cases: 10 };
        r.county = Some(g.canonicalize("Dukes and Nantucket").into_county());
        let parts = expand_combined(&r);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].county, Some(CountyRef::One(s!("Dukes County"))));
        assert_eq!(parts[1].county, Some(CountyRef::One(s!("Nantucket County"))));
        assert!(parts.iter().all(|p| p.cases == Some(10.0)));
    }
}
