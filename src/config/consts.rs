// src/config/consts.rs

// Output
pub const DEFAULT_OUT_DIR: &str = "dist";
pub const DATA_STEM: &str = "data";
pub const FEATURES_STEM: &str = "features";
pub const SUMMARY_FILE: &str = "summary.json";

// Fetch cache
pub const DEFAULT_CACHE_DIR: &str = "cache";
pub const USER_AGENT: &str = concat!("case_atlas/", env!("CARGO_PKG_VERSION"));
pub const HTTP_TIMEOUT_SECS: u64 = 30;

// Records
pub const PRIVATE_PREFIX: char = '_';
pub const IMPLEMENTATION_FIELDS: [&str; 2] = ["scraper", "implementation"];
pub const UNASSIGNED: &str = "(unassigned)";
pub const HOME_COUNTRY: &str = "USA";

// Concurrency
pub const WORKERS: usize = 1; // sequential unless asked otherwise
pub const REQUEST_PAUSE_MS: u64 = 75; // be polite
pub const TASK_TIMEOUT_SECS: u64 = 120;
