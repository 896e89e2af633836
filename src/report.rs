// src/report.rs
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::{ErrorKind, TaskError};
use crate::record::{Level, Record};

/// One failed task in one run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ErrorRecord {
    pub name: String,
    pub url: Option<String>,
    pub err: String,
    #[serde(skip)]
    pub kind: ErrorKind,
}

impl ErrorRecord {
    pub fn new(name: String, url: Option<String>, err: &TaskError) -> Self {
        Self { name, url, err: err.to_string(), kind: err.kind() }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCounts {
    pub num_countries: usize,
    pub num_states: usize,
    pub num_counties: usize,
}

impl LevelCounts {
    pub fn total(&self) -> usize {
        self.num_countries + self.num_states + self.num_counties
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Report {
    pub counts: LevelCounts,
    pub errors: Vec<ErrorRecord>,
}

impl Report {
    pub fn build(records: &[Record], errors: Vec<ErrorRecord>) -> Self {
        let mut counts = LevelCounts::default();
        for r in records {
            match r.level() {
                Level::Country => counts.num_countries += 1,
                Level::State => counts.num_states += 1,
                Level::County => counts.num_counties += 1,
            }
        }
        Self { counts, errors }
    }

    /// `{ date, scrape: { numCountries, numStates, numCounties, numErrors, errors } }`
    pub fn summary(&self, date: NaiveDate) -> Value {
        json!({
            "date": date.format("%Y-%m-%d").to_string(),
            "scrape": {
                "numCountries": self.counts.num_countries,
                "numStates": self.counts.num_states,
                "numCounties": self.counts.num_counties,
                "numErrors": self.errors.len(),
                "errors": self.errors,
            }
        })
    }

    pub fn log(&self) {
        logf!("Data scraped");
        logf!("   - {} countries", self.counts.num_countries);
        logf!("   - {} states", self.counts.num_states);
        logf!("   - {} counties", self.counts.num_counties);
        if self.errors.is_empty() {
            logf!("No errors");
        } else {
            logw!("{} errors", self.errors.len());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_cover_every_record() {
        let rows = vec![
            record! { country: "USA", cases: 9 },
            record! { country: "USA", state: "MA", cases: 5 },
            record! { country: "USA", state: "MA", county: "Essex County", cases: 2 },
            record! { country: "USA", state: "MA", county: "Suffolk County", cases: 3 },
        ];
        let r = Report::build(&rows, vec![]);
        assert_eq!(r.counts, LevelCounts { num_countries: 1, num_states: 1, num_counties: 2 });
        assert_eq!(r.counts.total(), rows.len());
    }

    #[test]
    fn summary_shape() {
        let err = TaskError::exec("boom");
        let r = Report::build(&[], vec![ErrorRecord::new(s!("MN, USA"), Some(s!("https://x")), &err)]);
        let d = NaiveDate::from_ymd_opt(2020, 3, 30).unwrap();
        let v = r.summary(d);
        assert_eq!(v["date"], "2020-03-30");
        assert_eq!(v["scrape"]["numErrors"], 1);
        assert_eq!(v["scrape"]["errors"][0], json!({ "name": "MN, USA", "url": "https://x", "err": "boom" }));
    }
}
