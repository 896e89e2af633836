// src/fetch.rs
//! Boundary to the fetch/cache collaborator.
//!
//! Sources never talk to the network directly; they ask a [`Fetch`] for a URL
//! on behalf of a snapshot date. For any date other than today the answer must
//! be reproducible, so [`CacheFetcher`] serves historical dates from its cache
//! only and never goes live for them.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::consts::{HTTP_TIMEOUT_SECS, USER_AGENT};
use crate::errors::FetchError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    /// HTML page text
    Page,
    Json,
    /// Row-structured text extracted from a PDF
    Rows,
}

impl ContentKind {
    fn ext(self) -> &'static str {
        match self {
            ContentKind::Page => "html",
            ContentKind::Json => "json",
            ContentKind::Rows => "rows.json",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Page(String),
    Json(Value),
    Rows(Vec<Vec<String>>),
}

#[derive(Clone, Debug)]
pub struct FetchRequest<'a> {
    /// Display name of the requesting task (for logs).
    pub task: &'a str,
    pub url: &'a str,
    pub kind: ContentKind,
    pub cache_key: &'a str,
    pub date: NaiveDate,
    /// True when `date` is today and a live fetch is allowed.
    pub live: bool,
}

pub trait Fetch: Send + Sync {
    fn fetch(&self, req: &FetchRequest<'_>) -> Result<Content, FetchError>;
}

/* ---------------- Disk cache with live fallback for today ---------------- */

pub struct CacheFetcher {
    dir: PathBuf,
    http: reqwest::blocking::Client,
}

impl CacheFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, FetchError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetchError::Network { url: s!(), msg: e.to_string() })?;
        Ok(Self { dir: dir.into(), http })
    }

    /// `<dir>/<YYYY-MM-DD>/<sha256(url|key)>.<ext>`
    pub fn cache_path(&self, req: &FetchRequest<'_>) -> PathBuf {
        cache_path(&self.dir, req)
    }

    fn read_cached(&self, path: &Path, req: &FetchRequest<'_>) -> Result<Content, FetchError> {
        let text = fs::read_to_string(path).map_err(|e| FetchError::Io(e.to_string()))?;
        decode(req, text)
    }

    fn fetch_live(&self, req: &FetchRequest<'_>) -> Result<String, FetchError> {
        if req.kind == ContentKind::Rows {
            return Err(FetchError::Parse {
                url: req.url.to_string(),
                msg: s!("row-structured PDF text is only available from cache"),
            });
        }
        logd!("{}: GET {}", req.task, req.url);
        let resp = self
            .http
            .get(req.url)
            .send()
            .map_err(|e| FetchError::Network { url: req.url.to_string(), msg: e.to_string() })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http { url: req.url.to_string(), status: status.as_u16() });
        }
        resp.text()
            .map_err(|e| FetchError::Network { url: req.url.to_string(), msg: e.to_string() })
    }
}

impl Fetch for CacheFetcher {
    fn fetch(&self, req: &FetchRequest<'_>) -> Result<Content, FetchError> {
        let path = self.cache_path(req);
        if path.exists() {
            logd!("{}: cache hit {}", req.task, path.display());
            return self.read_cached(&path, req);
        }
        if !req.live {
            return Err(FetchError::CacheMiss(req.url.to_string()));
        }

        let text = self.fetch_live(req)?;
        let content = decode(req, text.clone())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| FetchError::Io(e.to_string()))?;
        }
        fs::write(&path, text).map_err(|e| FetchError::Io(e.to_string()))?;
        Ok(content)
    }
}

pub fn cache_path(dir: &Path, req: &FetchRequest<'_>) -> PathBuf {
    let mut h = Sha256::new();
    h.update(req.url.as_bytes());
    h.update(b"|");
    h.update(req.cache_key.as_bytes());
    let name = format!("{}.{}", hex::encode(h.finalize()), req.kind.ext());
    dir.join(req.date.format("%Y-%m-%d").to_string()).join(name)
}

fn decode(req: &FetchRequest<'_>, text: String) -> Result<Content, FetchError> {
    let parse_err = |e: serde_json::Error| FetchError::Parse {
        url: req.url.to_string(),
        msg: e.to_string(),
    };
    match req.kind {
        ContentKind::Page => Ok(Content::Page(text)),
        ContentKind::Json => serde_json::from_str(&text).map(Content::Json).map_err(parse_err),
        ContentKind::Rows => serde_json::from_str(&text).map(Content::Rows).map_err(parse_err),
    }
}

/* ---------------- Per-host politeness ---------------- */

/// Host part of `url`, the key requests are serialized on.
pub fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url).ok()?.host_str().map(str::to_string)
}

/// At most one in-flight request per host, across every task of a run.
#[derive(Default)]
pub struct DomainGate {
    busy: Mutex<HashSet<String>>,
    freed: Condvar,
}

pub struct Permit<'a> {
    gate: &'a DomainGate,
    host: String,
}

impl DomainGate {
    /// Blocks until no other request holds `host`.
    pub fn acquire(&self, host: String) -> Permit<'_> {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        while busy.contains(&host) {
            busy = self.freed.wait(busy).unwrap_or_else(PoisonError::into_inner);
        }
        busy.insert(host.clone());
        Permit { gate: self, host }
    }

    pub fn is_busy(&self, host: &str) -> bool {
        self.busy.lock().unwrap_or_else(PoisonError::into_inner).contains(host)
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        let mut busy = self.gate.busy.lock().unwrap_or_else(PoisonError::into_inner);
        busy.remove(&self.host);
        self.gate.freed.notify_all();
    }
}

/* ---------------- In-memory fixtures ---------------- */

/// Serves fixed content by URL, regardless of date. For tests and demos.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, Content>,
}

impl StaticFetcher {
    pub fn new() -> Self { Self::default() }

    pub fn with(mut self, url: &str, content: Content) -> Self {
        self.pages.insert(url.to_string(), content);
        self
    }
}

impl Fetch for StaticFetcher {
    fn fetch(&self, req: &FetchRequest<'_>) -> Result<Content, FetchError> {
        self.pages
            .get(req.url)
            .cloned()
            .ok_or_else(|| FetchError::CacheMiss(req.url.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(date: NaiveDate, live: bool) -> FetchRequest<'static> {
        FetchRequest {
            task: "MA, USA",
            url: "https://example.org/data.json",
            kind: ContentKind::Json,
            cache_key: "default",
            date,
            live,
        }
    }

    #[test]
    fn historical_miss_never_goes_live() {
        let tmp = tempfile::tempdir().unwrap();
        let f = CacheFetcher::new(tmp.path()).unwrap();
        let d = NaiveDate::from_ymd_opt(2020, 3, 15).unwrap();
        match f.fetch(&req(d, false)) {
            Err(FetchError::CacheMiss(url)) => assert_eq!(url, "https://example.org/data.json"),
            other => panic!("expected cache miss, got {other:?}"),
        }
    }

    #[test]
    fn historical_hit_is_read_back() {
        let tmp = tempfile::tempdir().unwrap();
        let f = CacheFetcher::new(tmp.path()).unwrap();
        let d = NaiveDate::from_ymd_opt(2020, 3, 15).unwrap();
        let r = req(d, false);
        let path = f.cache_path(&r);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"features":[]}"#).unwrap();

        let got = f.fetch(&r).unwrap();
        assert_eq!(got, Content::Json(serde_json::json!({"features": []})));
        assert!(path.to_string_lossy().contains("2020-03-15"));
    }

    #[test]
    fn cache_key_separates_entries() {
        let d = NaiveDate::from_ymd_opt(2020, 3, 15).unwrap();
        let a = req(d, false);
        let mut b = req(d, false);
        b.cache_key = "tested";
        assert_ne!(cache_path(Path::new("c"), &a), cache_path(Path::new("c"), &b));
    }

    #[test]
    fn host_ignores_path_and_scheme() {
        assert_eq!(host_of("https://www.health.state.mn.us/x").as_deref(), Some("www.health.state.mn.us"));
        assert_eq!(host_of("http://services1.arcgis.com/a/b?q=1").as_deref(), Some("services1.arcgis.com"));
        assert_eq!(host_of("not a url"), None);
    }

    #[test]
    fn gate_releases_on_drop() {
        let gate = DomainGate::default();
        {
            let _a = gate.acquire(s!("a.gov"));
            assert!(gate.is_busy("a.gov"));
            assert!(!gate.is_busy("b.gov"));
        }
        assert!(!gate.is_busy("a.gov"));
        let _b = gate.acquire(s!("a.gov"));
    }
}
