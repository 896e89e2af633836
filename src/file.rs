// src/file.rs

use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::options::OutputNames;
use crate::errors::RunError;
use crate::runner::Run;

/// Write every artifact of `run` into `dir`.
/// `explicit_date` decides naming: dated when a date was asked for, plain otherwise.
pub fn write_outputs(dir: &Path, explicit_date: Option<NaiveDate>, run: &Run) -> Result<Vec<PathBuf>, RunError> {
    ensure_directory(dir)?;
    let names = OutputNames::for_date(explicit_date);
    let mut written = Vec::with_capacity(4);

    let path = dir.join(&names.data_json);
    write_json(&path, &run.records, true)?;
    written.push(path);

    let path = dir.join(&names.data_csv);
    let file = File::create(&path).map_err(|e| RunError::io(&path, e))?;
    crate::csv::write_records(BufWriter::new(file), &run.records)?;
    written.push(path);

    let path = dir.join(&names.features);
    write_json(&path, &crate::features::feature_collection(&run.records)?, false)?;
    written.push(path);

    let path = dir.join(&names.summary);
    write_json(&path, &run.report.summary(run.date), false)?;
    written.push(path);

    for p in &written {
        logf!("Wrote {}", p.display());
    }
    Ok(written)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<(), RunError> {
    let file = File::create(path).map_err(|e| RunError::io(path, e))?;
    let mut out = BufWriter::new(file);
    if pretty {
        serde_json::to_writer_pretty(&mut out, value)?;
    } else {
        serde_json::to_writer(&mut out, value)?;
    }
    out.flush().map_err(|e| RunError::io(path, e))
}

pub fn ensure_directory(dir: &Path) -> Result<(), RunError> {
    if dir.exists() && !dir.is_dir() {
        return Err(RunError::Output(format!("Path exists but is not a directory: {}", dir.display())));
    }
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| RunError::io(dir, e))?;
    }
    Ok(())
}
