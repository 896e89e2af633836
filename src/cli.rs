// src/cli.rs
use std::{env, path::PathBuf, sync::Arc, time::Duration};

use chrono::NaiveDate;
use color_eyre::eyre::{bail, eyre, Result};

use crate::config::options::RunOptions;
use crate::fetch::{CacheFetcher, Fetch};
use crate::progress::LogProgress;
use crate::{file, runner, sources};

const HELP: &str = include_str!("cli_help.txt");

/// Entry point of the binary. Task failures are reported in the summary and
/// never make this fail; only argument, registry and output errors do.
pub fn run() -> Result<()> {
    let Some(opts) = parse_args(env::args().skip(1))? else {
        print!("{HELP}");
        return Ok(());
    };
    crate::log::init(opts.verbose);

    let registry = sources::all()?;
    if opts.list_tasks {
        for t in &registry {
            println!("{}", t.name());
        }
        return Ok(());
    }

    let tasks: Vec<_> = registry.into_iter().filter(|t| opts.wants(&t.name())).collect();
    if tasks.is_empty() {
        bail!("No task matches --only (see --list)");
    }

    let fetch: Arc<dyn Fetch> = Arc::new(CacheFetcher::new(&opts.cache_dir)?);
    let mut progress = LogProgress::default();
    let run = runner::run(tasks, opts.snapshot_date(), fetch, &opts.scrape, Some(&mut progress));
    file::write_outputs(&opts.out_dir, opts.date, &run)?;
    Ok(())
}

/// `None` when help was asked for.
pub fn parse_args<I>(args: I) -> Result<Option<RunOptions>>
where
    I: IntoIterator<Item = String>,
{
    let mut opts = RunOptions::default();
    let mut args = args.into_iter();
    while let Some(a) = args.next() {
        let mut value = |flag: &str| args.next().ok_or_else(|| eyre!("Missing value for {flag}"));
        match a.as_str() {
            "-d" | "--date" => opts.date = Some(parse_date(&value("--date")?)?),
            "-o" | "--out" => opts.out_dir = PathBuf::from(value("--out")?),
            "--cache" => opts.cache_dir = PathBuf::from(value("--cache")?),
            "--workers" => {
                let n: usize = value("--workers")?.parse()?;
                if n == 0 { bail!("--workers must be at least 1"); }
                opts.scrape.workers = n;
            }
            "--timeout" => {
                let secs: u64 = value("--timeout")?.parse()?;
                if secs == 0 { bail!("--timeout must be at least 1 second"); }
                opts.scrape.task_timeout = Duration::from_secs(secs);
            }
            "--only" => {
                let names: Vec<String> = value("--only")?
                    .split(',')
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty())
                    .collect();
                opts.only = Some(names);
            }
            "--list" => opts.list_tasks = true,
            "-v" | "--verbose" => opts.verbose = true,
            "-h" | "--help" => return Ok(None),
            _ => bail!("Unknown arg: {a}"),
        }
    }
    Ok(Some(opts))
}

/// `YYYY-M-D`, zero padding optional.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let parts: Vec<&str> = s.trim().split('-').collect();
    let [y, m, d] = parts.as_slice() else {
        bail!("Invalid date {s:?}: expected YYYY-M-D");
    };
    let (y, m, d): (i32, u32, u32) = (y.parse()?, m.parse()?, d.parse()?);
    NaiveDate::from_ymd_opt(y, m, d).ok_or_else(|| eyre!("No such date: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn date_accepts_unpadded_parts() {
        assert_eq!(parse_date("2020-3-5").unwrap(), NaiveDate::from_ymd_opt(2020, 3, 5).unwrap());
        assert_eq!(parse_date("2020-03-30").unwrap(), NaiveDate::from_ymd_opt(2020, 3, 30).unwrap());
        assert!(parse_date("2020-02-30").is_err());
        assert!(parse_date("March 3").is_err());
    }

    #[test]
    fn flags_fill_options() {
        let o = parse_args(args(&["-d", "2020-3-30", "-o", "out", "--workers", "4", "--only", "ma, MN"]))
            .unwrap()
            .unwrap();
        assert_eq!(o.date, NaiveDate::from_ymd_opt(2020, 3, 30));
        assert_eq!(o.out_dir, PathBuf::from("out"));
        assert_eq!(o.scrape.workers, 4);
        assert_eq!(o.only.as_deref(), Some(&[s!("ma"), s!("MN")][..]));
        assert!(o.wants("MA, USA") && o.wants("MN, USA"));
    }

    #[test]
    fn unpadded_date_gives_padded_output_names() {
        use crate::config::options::OutputNames;

        let o = parse_args(args(&["--date", "2020-3-5"])).unwrap().unwrap();
        let names = OutputNames::for_date(o.date);
        assert_eq!(names.data_json, "data-2020-03-05.json");
        assert_eq!(names.data_csv, "data-2020-03-05.csv");
    }

    #[test]
    fn no_flags_means_today_and_defaults() {
        let o = parse_args(args(&[])).unwrap().unwrap();
        assert_eq!(o, RunOptions::default());
    }

    #[test]
    fn bad_input_is_an_error() {
        assert!(parse_args(args(&["--bogus"])).is_err());
        assert!(parse_args(args(&["--date"])).is_err());
        assert!(parse_args(args(&["--workers", "0"])).is_err());
        assert!(parse_args(args(&["-h"])).unwrap().is_none());
    }
}
