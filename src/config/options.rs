// src/config/options.rs
use std::path::PathBuf;
use std::time::Duration;

use chrono::{Local, NaiveDate};

use super::consts::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunOptions {
    /// Explicitly requested snapshot date; `None` means today.
    pub date: Option<NaiveDate>,
    pub out_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Task filter by display name (case-insensitive).
    pub only: Option<Vec<String>>,
    pub list_tasks: bool,
    pub verbose: bool,
    pub scrape: ScrapeOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            date: None,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            only: None,
            list_tasks: false,
            verbose: false,
            scrape: ScrapeOptions::default(),
        }
    }
}

impl RunOptions {
    /// The date this run produces data for.
    pub fn snapshot_date(&self) -> NaiveDate {
        self.date.unwrap_or_else(today)
    }

    /// Does `name` pass the `--only` filter? A filter entry matches the full
    /// display name or its leading part (`"ma"` matches `"MA, USA"`).
    pub fn wants(&self, name: &str) -> bool {
        let head = name.split(',').next().unwrap_or(name).trim();
        match &self.only {
            None => true,
            Some(list) => list
                .iter()
                .any(|n| n.eq_ignore_ascii_case(name) || n.eq_ignore_ascii_case(head)),
        }
    }
}

/// Worker pool knobs for the runner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrapeOptions {
    pub workers: usize,
    pub task_timeout: Duration,
    pub request_pause: Duration,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            workers: WORKERS,
            task_timeout: Duration::from_secs(TASK_TIMEOUT_SECS),
            request_pause: Duration::from_millis(REQUEST_PAUSE_MS),
        }
    }
}

/// Artifact file names for one run. Dated only when a date was asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputNames {
    pub data_json: String,
    pub data_csv: String,
    pub features: String,
    pub summary: String,
}

impl OutputNames {
    pub fn for_date(date: Option<NaiveDate>) -> Self {
        let suffix = date
            .map(|d| format!("-{}", d.format("%Y-%m-%d")))
            .unwrap_or_default();
        Self {
            data_json: format!("{DATA_STEM}{suffix}.json"),
            data_csv: format!("{DATA_STEM}{suffix}.csv"),
            features: format!("{FEATURES_STEM}{suffix}.json"),
            summary: s!(SUMMARY_FILE),
        }
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unsuffixed_for_today() {
        let n = OutputNames::for_date(None);
        assert_eq!(n.data_json, "data.json");
        assert_eq!(n.data_csv, "data.csv");
        assert_eq!(n.features, "features.json");
        assert_eq!(n.summary, "summary.json");
    }

    #[test]
    fn names_carry_requested_date() {
        let d = NaiveDate::from_ymd_opt(2020, 3, 30).unwrap();
        let n = OutputNames::for_date(Some(d));
        assert_eq!(n.data_json, "data-2020-03-30.json");
        assert_eq!(n.features, "features-2020-03-30.json");
        assert_eq!(n.summary, "summary.json");
    }

    #[test]
    fn only_filter_is_case_insensitive() {
        let mut o = RunOptions::default();
        assert!(o.wants("MA, USA"));
        o.only = Some(vec![s!("ma, usa")]);
        assert!(o.wants("MA, USA"));
        assert!(!o.wants("MN, USA"));
        o.only = Some(vec![s!("mn")]);
        assert!(o.wants("MN, USA"));
    }
}
