// tests/version_dispatch.rs
use std::sync::Arc;

use chrono::NaiveDate;

use case_atlas::config::options::ScrapeOptions;
use case_atlas::errors::TaskError;
use case_atlas::fetch::StaticFetcher;
use case_atlas::record;
use case_atlas::runner::run;
use case_atlas::task::{select_implementation, Effective, RawResult, Task, TaskContext, TaskIdentity};

fn versioned() -> Task {
    fn baseline(_: &TaskContext) -> Result<RawResult, TaskError> {
        Ok(record! { cases: 1, version: "baseline" }.into())
    }
    fn redesign(ctx: &TaskContext) -> Result<RawResult, TaskError> {
        Ok(record! { cases: 2, version: "2020-03-30", seen: ctx.snapshot_date.to_string() }.into())
    }
    Task::new(TaskIdentity::state("iso1:US", "iso2:US-MA"), baseline)
        .since("2020-03-30", redesign)
        .unwrap()
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn earlier_dates_use_baseline() {
    let (key, _) = select_implementation(&versioned(), day(2020, 3, 15));
    assert_eq!(key, Effective::Baseline);
    // long before any dated key
    let (key, _) = select_implementation(&versioned(), day(2019, 1, 1));
    assert_eq!(key, Effective::Baseline);
}

#[test]
fn later_dates_use_latest_applicable_key() {
    let (key, _) = select_implementation(&versioned(), day(2020, 4, 1));
    assert_eq!(key, Effective::Since(day(2020, 3, 30)));
}

#[test]
fn snapshot_date_reaches_the_implementation() {
    let opts = ScrapeOptions::default();
    let fetch = Arc::new(StaticFetcher::new());

    let early = run(vec![versioned()], day(2020, 3, 15), fetch.clone(), &opts, None);
    assert_eq!(early.records[0].extra["version"], "baseline");
    assert_eq!(early.date, day(2020, 3, 15));

    let late = run(vec![versioned()], day(2020, 4, 1), fetch, &opts, None);
    assert_eq!(late.records[0].extra["version"], "2020-03-30");
    assert_eq!(late.records[0].extra["seen"], "2020-04-01");
}
