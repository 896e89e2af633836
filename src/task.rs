// src/task.rs
//! Task registry entries and version dispatch.
//!
//! A [`Task`] covers one monitored region. Its extraction logic can change
//! over time (site redesigns), so a task holds a mandatory baseline
//! implementation plus any number of implementations valid *from* a date on.
//! [`Versions::select`] picks the one that was in force on the snapshot date,
//! which keeps historical snapshots reproducible.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use chrono::NaiveDate;
use serde_json::Value;

use crate::errors::{FetchError, RegistryError, TaskError};
use crate::fetch::{host_of, Content, ContentKind, DomainGate, Fetch, FetchRequest};
use crate::geography::{to_iso3166_alpha3, to_us_state_abbreviation};
use crate::record::{Level, Record};

/* ---------------- Identity & sources ---------------- */

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskIdentity {
    pub country: String,
    pub state: Option<String>,
    pub county: Option<String>,
}

impl TaskIdentity {
    pub fn country(country: &str) -> Self {
        Self { country: s!(country), state: None, county: None }
    }

    pub fn state(country: &str, state: &str) -> Self {
        Self { country: s!(country), state: Some(s!(state)), county: None }
    }

    pub fn county(country: &str, state: &str, county: &str) -> Self {
        Self { country: s!(country), state: Some(s!(state)), county: Some(s!(county)) }
    }

    pub fn level(&self) -> Level {
        if self.county.is_some() {
            Level::County
        } else if self.state.is_some() {
            Level::State
        } else {
            Level::Country
        }
    }

    /// `"Essex County, MA, USA"`: standardized codes, most specific first.
    pub fn display_name(&self) -> String {
        let country = to_iso3166_alpha3(&self.country);
        let state = self.state.as_deref().map(|s| {
            if country == crate::config::consts::HOME_COUNTRY {
                to_us_state_abbreviation(s)
            } else {
                s.to_string()
            }
        });
        [self.county.clone(), state, Some(country)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Source {
    pub url: String,
    pub name: String,
}

/* ---------------- Raw results ---------------- */

/// What an implementation hands back: one record or an ordered list.
#[derive(Clone, Debug, PartialEq)]
pub enum RawResult {
    One(Record),
    Many(Vec<Record>),
}

impl RawResult {
    /// Flatten to rows. An empty list is a structural failure.
    pub fn into_rows(self, task: &str) -> Result<Vec<Record>, TaskError> {
        match self {
            RawResult::One(r) => Ok(vec![r]),
            RawResult::Many(v) if v.is_empty() => {
                Err(TaskError::Structural(format!("scraper for {task} returned 0 rows")))
            }
            RawResult::Many(v) => Ok(v),
        }
    }
}

impl From<Record> for RawResult {
    fn from(r: Record) -> Self { RawResult::One(r) }
}

impl From<Vec<Record>> for RawResult {
    fn from(v: Vec<Record>) -> Self { RawResult::Many(v) }
}

/* ---------------- Execution context ---------------- */

/// Everything an implementation may use. The snapshot date is passed in
/// explicitly; there is no ambient "current date".
///
/// Every fetch holds the run's per-host permit while it is in flight, so two
/// tasks never hit the same host at once, whatever their primary source.
pub struct TaskContext {
    pub name: String,
    pub snapshot_date: NaiveDate,
    pub today: NaiveDate,
    fetch: Arc<dyn Fetch>,
    gate: Arc<DomainGate>,
    cancelled: Arc<AtomicBool>,
    used_url: Mutex<Option<String>>,
}

impl TaskContext {
    pub fn new(name: String, snapshot_date: NaiveDate, today: NaiveDate, fetch: Arc<dyn Fetch>) -> Self {
        Self {
            name,
            snapshot_date,
            today,
            fetch,
            gate: Arc::new(DomainGate::default()),
            cancelled: Arc::new(AtomicBool::new(false)),
            used_url: Mutex::new(None),
        }
    }

    /// Share `gate` with the other tasks of the run.
    pub fn with_gate(mut self, gate: Arc<DomainGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Flag that, once set, makes every later fetch of this task fail.
    /// Set by the runner when the task misses its deadline.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    fn check_cancelled(&self, url: &str) -> Result<(), TaskError> {
        if self.cancelled.load(Ordering::Acquire) {
            return Err(TaskError::exec(format!("{}: abandoned before fetching {url}", self.name)));
        }
        Ok(())
    }

    pub fn is_today(&self) -> bool {
        self.snapshot_date == self.today
    }

    /// The last URL this task fetched, if any.
    pub fn used_url(&self) -> Option<String> {
        self.used_url.lock().ok().and_then(|g| g.clone())
    }

    fn get(&self, url: &str, kind: ContentKind, cache_key: &str) -> Result<Content, TaskError> {
        self.check_cancelled(url)?;
        let _permit = host_of(url).map(|h| self.gate.acquire(h));
        // the wait for the permit may outlast the deadline
        self.check_cancelled(url)?;

        if let Ok(mut g) = self.used_url.lock() {
            *g = Some(url.to_string());
        }
        let req = FetchRequest {
            task: &self.name,
            url,
            kind,
            cache_key,
            date: self.snapshot_date,
            live: self.is_today(),
        };
        Ok(self.fetch.fetch(&req)?)
    }

    pub fn page(&self, url: &str, cache_key: &str) -> Result<String, TaskError> {
        match self.get(url, ContentKind::Page, cache_key)? {
            Content::Page(p) => Ok(p),
            _ => Err(wrong_kind(url, "page")),
        }
    }

    pub fn json(&self, url: &str, cache_key: &str) -> Result<Value, TaskError> {
        match self.get(url, ContentKind::Json, cache_key)? {
            Content::Json(v) => Ok(v),
            _ => Err(wrong_kind(url, "JSON")),
        }
    }

    pub fn rows(&self, url: &str, cache_key: &str) -> Result<Vec<Vec<String>>, TaskError> {
        match self.get(url, ContentKind::Rows, cache_key)? {
            Content::Rows(r) => Ok(r),
            _ => Err(wrong_kind(url, "row")),
        }
    }
}

fn wrong_kind(url: &str, want: &str) -> TaskError {
    TaskError::Fetch(FetchError::Parse { url: url.to_string(), msg: format!("expected {want} content") })
}

/* ---------------- Versioned implementations ---------------- */

/// The capability every implementation provides.
pub trait Produce: Send + Sync {
    fn produce(&self, ctx: &TaskContext) -> Result<RawResult, TaskError>;
}

impl<F> Produce for F
where
    F: Fn(&TaskContext) -> Result<RawResult, TaskError> + Send + Sync,
{
    fn produce(&self, ctx: &TaskContext) -> Result<RawResult, TaskError> {
        self(ctx)
    }
}

/// Key an implementation is registered under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Effective {
    Baseline,
    Since(NaiveDate),
}

impl std::fmt::Display for Effective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effective::Baseline => f.write_str("baseline"),
            Effective::Since(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

#[derive(Clone)]
pub struct Versions {
    baseline: Arc<dyn Produce>,
    /// Ascending by date, one entry per date.
    dated: Vec<(NaiveDate, Arc<dyn Produce>)>,
}

impl Versions {
    pub fn new(baseline: impl Produce + 'static) -> Self {
        Self { baseline: Arc::new(baseline), dated: Vec::new() }
    }

    /// Register an implementation valid from `date` onward. Re-registering a
    /// date replaces the earlier entry.
    pub fn since(mut self, date: NaiveDate, imp: impl Produce + 'static) -> Self {
        let imp: Arc<dyn Produce> = Arc::new(imp);
        match self.dated.binary_search_by_key(&date, |(d, _)| *d) {
            Ok(i) => self.dated[i].1 = imp,
            Err(i) => self.dated.insert(i, (date, imp)),
        }
        self
    }

    /// Latest dated implementation not after `snapshot`, else baseline.
    pub fn select(&self, snapshot: NaiveDate) -> (Effective, Arc<dyn Produce>) {
        match self.dated.iter().rev().find(|(d, _)| *d <= snapshot) {
            Some((d, imp)) => (Effective::Since(*d), Arc::clone(imp)),
            None => (Effective::Baseline, Arc::clone(&self.baseline)),
        }
    }

    pub fn keys(&self) -> Vec<Effective> {
        std::iter::once(Effective::Baseline)
            .chain(self.dated.iter().map(|(d, _)| Effective::Since(*d)))
            .collect()
    }
}

/* ---------------- Task ---------------- */

#[derive(Clone)]
pub struct Task {
    pub identity: TaskIdentity,
    pub sources: Vec<Source>,
    /// Sub-regions that must appear in every snapshot (backfill list).
    pub known_regions: Vec<String>,
    /// Level of the child rows this task reports, when the core should add
    /// the parent rollup for them.
    pub aggregate: Option<Level>,
    pub versions: Versions,
}

impl Task {
    pub fn new(identity: TaskIdentity, baseline: impl Produce + 'static) -> Self {
        Self {
            identity,
            sources: Vec::new(),
            known_regions: Vec::new(),
            aggregate: None,
            versions: Versions::new(baseline),
        }
    }

    pub fn source(mut self, url: &str, name: &str) -> Self {
        self.sources.push(Source { url: s!(url), name: s!(name) });
        self
    }

    pub fn known_regions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_regions = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn aggregate(mut self, level: Level) -> Self {
        self.aggregate = Some(level);
        self
    }

    /// Register a dated implementation by its ISO key (`"2020-03-30"`).
    pub fn since(mut self, key: &str, imp: impl Produce + 'static) -> Result<Self, RegistryError> {
        let date = NaiveDate::parse_from_str(key, "%Y-%m-%d").map_err(|_| RegistryError::BadVersionKey {
            task: self.name(),
            key: key.to_string(),
        })?;
        self.versions = self.versions.since(date, imp);
        Ok(self)
    }

    pub fn name(&self) -> String {
        self.identity.display_name()
    }

    pub fn primary_url(&self) -> Option<&str> {
        self.sources.first().map(|s| s.url.as_str())
    }
}

/// Pick the implementation in force for `task` on `snapshot`.
pub fn select_implementation(task: &Task, snapshot: NaiveDate) -> (Effective, Arc<dyn Produce>) {
    task.versions.select(snapshot)
}
