// src/sources/us_ma.rs
//! Massachusetts, by county.
//!
//! Until 2020-03-30 the state published a daily PDF; its county table is read
//! from row-structured text. From then on an ArcGIS layer has the same data.
//! Both report Dukes and Nantucket as one combined row, and both have an
//! "Unknown" row for cases not yet placed in a county.

use chrono::Datelike;

use crate::aggregate::sum;
use crate::config::consts::UNASSIGNED;
use crate::core::parse::{joined_digits, number};
use crate::errors::{RegistryError, TaskError};
use crate::record::{CountyRef, Level, Record};
use crate::sources::arcgis;
use crate::task::{RawResult, Task, TaskContext, TaskIdentity};

const ARCGIS_LAYER: &str =
    "https://services1.arcgis.com/TXaY625xGc0yvAuQ/arcgis/rest/services/COVID_CASES_MA/FeatureServer/0/query";

// Dukes and Nantucket are never reported on their own
pub const COUNTIES: [&str; 12] = [
    "Barnstable County",
    "Berkshire County",
    "Bristol County",
    "Essex County",
    "Franklin County",
    "Hampden County",
    "Hampshire County",
    "Middlesex County",
    "Norfolk County",
    "Plymouth County",
    "Suffolk County",
    "Worcester County",
];

pub fn task() -> Result<Task, RegistryError> {
    Task::new(TaskIdentity::state("iso1:US", "iso2:US-MA"), daily_pdf)
        .source("https://www.mass.gov/orgs/department-of-public-health", "Massachusetts DPH")
        .source(
            "http://memamaps.maps.arcgis.com/apps/MapSeries/index.html?appid=9ef7ef55e4644af29e9ca07bfe6a509f",
            "Massachusetts Emergency Management Agency",
        )
        .known_regions(COUNTIES)
        .aggregate(Level::County)
        .since("2020-03-30", arcgis_layer)
}

fn combined() -> CountyRef {
    CountyRef::Combined(vec![s!("Dukes County"), s!("Nantucket County")])
}

fn is_dukes_and_nantucket(name: &str) -> bool {
    let lc = name.to_lowercase();
    lc.contains("dukes") && lc.contains("nantucket")
}

/* ---------------- baseline: daily PDF ---------------- */

fn daily_pdf(ctx: &TaskContext) -> Result<RawResult, TaskError> {
    let url = format!(
        "https://www.mass.gov/doc/covid-19-cases-in-massachusetts-as-of-march-{}-2020/download",
        ctx.snapshot_date.day()
    );
    let rows = ctx.rows(&url, "default")?;
    Ok(RawResult::Many(parse_pdf_rows(&rows)?))
}

fn first_cell_contains(row: &[String], needle: &str) -> bool {
    row.first().is_some_and(|c| c.contains(needle))
}

/// County rows plus the state total. The county table runs from the row after
/// the "County" header to the "Sex" section; state deaths are the last cell of
/// the row after the "Death" header.
pub fn parse_pdf_rows(rows: &[Vec<String>]) -> Result<Vec<Record>, TaskError> {
    let start = rows
        .iter()
        .position(|r| first_cell_contains(r, "County"))
        .ok_or_else(|| TaskError::exec("county table not found"))?
        + 1;

    let mut counties = Vec::new();
    for row in &rows[start.min(rows.len())..] {
        if first_cell_contains(row, "Sex") {
            break;
        }
        let Some(name) = row.first() else { continue };
        let mut county = CountyRef::One(name.clone());
        let mut values = &row[1..];

        if name == "Dukes and" {
            // second half of the name spilled into the next cell
            values = row.get(2..).unwrap_or_default();
            county = combined();
        } else if is_dukes_and_nantucket(name) {
            county = combined();
        } else if name == "Unknown" {
            county = CountyRef::One(s!(UNASSIGNED));
        }

        let cases = match values {
            [] => return Err(TaskError::exec(format!("no case count for {name}"))),
            [one] => number(one)?,
            // numbers sometimes end up split across cells
            many => number(&joined_digits(many))?,
        };
        let mut r = record! { cases: cases };
        r.county = Some(county);
        counties.push(r);
    }
    if !rows[start.min(rows.len())..].iter().any(|r| first_cell_contains(r, "Sex")) {
        return Err(TaskError::exec("county table has no end marker"));
    }

    let mut state = sum(&counties);
    if let Some(i) = rows.iter().position(|r| first_cell_contains(r, "Death")) {
        if let Some(last) = rows.get(i + 1).and_then(|r| r.last()) {
            state.deaths = Some(number(last)?);
        }
    }
    counties.push(state);
    Ok(counties)
}

/* ---------------- 2020-03-30: ArcGIS layer ---------------- */

fn arcgis_layer(ctx: &TaskContext) -> Result<RawResult, TaskError> {
    let data = arcgis::query_layer(ctx, ARCGIS_LAYER, "default")?;
    Ok(RawResult::Many(parse_layer(&data)?))
}

/// The layer carries a "Total" row whose deaths/tested are used for the state
/// when no county reports them. Blank county metrics read as zero, as the
/// layer itself treats them.
pub fn parse_layer(data: &serde_json::Value) -> Result<Vec<Record>, TaskError> {
    let mut counties = Vec::new();
    let (mut total_deaths, mut total_tested) = (0.0, 0.0);
    let (mut only_total_deaths, mut only_total_tested) = (true, true);

    for item in arcgis::attributes(data)? {
        let name = arcgis::text(item, "County")?;
        let lc = name.to_lowercase();
        if lc.contains("total") {
            total_deaths = arcgis::count(item, "DEATHS");
            total_tested = arcgis::count(item, "TESTED");
            continue;
        }

        let county = if is_dukes_and_nantucket(name) {
            combined()
        } else if lc.contains("unknown") {
            CountyRef::One(s!(UNASSIGNED))
        } else {
            CountyRef::One(s!(name))
        };
        only_total_deaths &= !arcgis::reported(item, "DEATHS");
        only_total_tested &= !arcgis::reported(item, "TESTED");

        let mut r = record! {
            cases: arcgis::count(item, "CASES"),
            deaths: arcgis::count(item, "DEATHS"),
            tested: arcgis::count(item, "TESTED"),
        };
        r.county = Some(county);
        counties.push(r);
    }

    let mut state = sum(&counties);
    if only_total_deaths {
        state.deaths = Some(total_deaths);
    }
    if only_total_tested {
        state.tested = Some(total_tested);
    }
    counties.push(state);
    Ok(counties)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::fetch::{Content, StaticFetcher};
    use crate::runner::process;
    use crate::task::select_implementation;

    fn cells(row: &[&str]) -> Vec<String> {
        row.iter().map(|c| c.to_string()).collect()
    }

    fn pdf_fixture() -> Vec<Vec<String>> {
        vec![
            cells(&["COVID-19 Cases in Massachusetts"]),
            cells(&["County", "Cases"]),
            cells(&["Barnstable", "12"]),
            cells(&["Middlesex", "1", "045"]),
            cells(&["Dukes and", "Nantucket", "3"]),
            cells(&["Suffolk", "300"]),
            cells(&["Unknown", "5"]),
            cells(&["Sex"]),
            cells(&["Female", "700"]),
            cells(&["Deaths"]),
            cells(&["Attributed to COVID-19", "15"]),
        ]
    }

    #[test]
    fn pdf_rows_parse_into_counties_and_state() {
        let rows = parse_pdf_rows(&pdf_fixture()).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[1].cases, Some(1045.0));
        assert_eq!(rows[2].county, Some(combined()));
        assert_eq!(rows[2].cases, Some(3.0));
        assert_eq!(rows[4].county, Some(CountyRef::One(s!(UNASSIGNED))));

        let state = &rows[5];
        assert!(state.county.is_none());
        assert_eq!(state.cases, Some(12.0 + 1045.0 + 3.0 + 300.0 + 5.0));
        assert_eq!(state.deaths, Some(15.0));
    }

    #[test]
    fn pdf_without_county_table_fails() {
        assert!(parse_pdf_rows(&[cells(&["Nothing here"])]).is_err());
    }

    #[test]
    fn baseline_runs_end_to_end_on_a_historical_date() {
        let task = task().unwrap();
        let date = NaiveDate::from_ymd_opt(2020, 3, 20).unwrap();
        let url = "https://www.mass.gov/doc/covid-19-cases-in-massachusetts-as-of-march-20-2020/download";
        let fetch = Arc::new(StaticFetcher::new().with(url, Content::Rows(pdf_fixture())));
        let ctx = TaskContext::new(task.name(), date, date, fetch);

        let (_, imp) = select_implementation(&task, date);
        let raw = imp.produce(&ctx).unwrap();
        let rows = process(&task, raw, ctx.used_url()).unwrap();

        // 5 source rows (incl. combined + unassigned) + state + 9 backfilled
        assert_eq!(rows.len(), 6 + 9);
        for name in COUNTIES {
            let n = rows
                .iter()
                .filter(|r| r.county.as_ref().is_some_and(|c| c.covers(name)))
                .count();
            assert_eq!(n, 1, "{name}");
        }
        assert!(rows.iter().all(|r| r.state.as_deref() == Some("MA") && r.country.as_deref() == Some("USA")));
        assert_eq!(rows[0].county, Some(CountyRef::One(s!("Barnstable County"))));
        assert_eq!(rows[0].url.as_deref(), Some(url));
    }

    #[test]
    fn arcgis_layer_uses_total_row_when_counties_lack_deaths() {
        let data = json!({ "features": [
            { "attributes": { "County": "BARNSTABLE", "CASES": 20, "DEATHS": null, "TESTED": null } },
            { "attributes": { "County": "DUKES AND NANTUCKET", "CASES": 4 } },
            { "attributes": { "County": "Unknown", "CASES": 2 } },
            { "attributes": { "County": "Total", "CASES": 26, "DEATHS": 3, "TESTED": 900 } }
        ]});
        let rows = parse_layer(&data).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].county, Some(combined()));
        assert_eq!(rows[0].deaths, Some(0.0));
        let state = &rows[3];
        assert_eq!(state.cases, Some(26.0));
        assert_eq!(state.deaths, Some(3.0));
        assert_eq!(state.tested, Some(900.0));
    }

    #[test]
    fn arcgis_layer_prefers_county_sums_when_reported() {
        let data = json!({ "features": [
            { "attributes": { "County": "Essex", "CASES": 5, "DEATHS": 1, "TESTED": 40 } },
            { "attributes": { "County": "Total", "CASES": 5, "DEATHS": 9, "TESTED": 99 } }
        ]});
        let rows = parse_layer(&data).unwrap();
        assert_eq!(rows[1].deaths, Some(1.0));
        assert_eq!(rows[1].tested, Some(40.0));
    }

    #[test]
    fn version_switches_on_march_30() {
        let task = task().unwrap();
        let (early, _) = select_implementation(&task, NaiveDate::from_ymd_opt(2020, 3, 29).unwrap());
        let (late, _) = select_implementation(&task, NaiveDate::from_ymd_opt(2020, 4, 2).unwrap());
        assert_eq!(early.to_string(), "baseline");
        assert_eq!(late.to_string(), "2020-03-30");
    }
}
