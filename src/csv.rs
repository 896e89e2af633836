// src/csv.rs
use std::io::Write;

use serde_json::{Map, Value};

use crate::errors::RunError;
use crate::record::{format_number, Record};

/// Columns every export starts with, in this order.
pub const FIXED_COLUMNS: [&str; 11] = [
    "city", "county", "state", "country", "cases", "deaths", "recovered", "tested", "lat", "long", "url",
];

/// Never a column of its own; split into `lat`/`long`.
const COORDINATES: &str = "coordinates";

/* ---------------- Header ---------------- */

/// Fixed prefix, then every other field in first-seen order across `rows`.
fn header_of(rows: &[Map<String, Value>]) -> Vec<String> {
    let mut header: Vec<String> = FIXED_COLUMNS.iter().map(|c| s!(*c)).collect();
    for row in rows {
        for key in row.keys() {
            if key != COORDINATES && !header.contains(key) {
                header.push(key.clone());
            }
        }
    }
    header
}

pub fn header(records: &[Record]) -> Result<Vec<String>, RunError> {
    Ok(header_of(&as_maps(records)?))
}

fn as_maps(records: &[Record]) -> Result<Vec<Map<String, Value>>, RunError> {
    records
        .iter()
        .map(|r| match serde_json::to_value(r)? {
            Value::Object(m) => Ok(m),
            other => Err(RunError::Output(format!("record serialized as {other}"))),
        })
        .collect()
}

/* ---------------- Cells ---------------- */

/// Text for one cell. Lists (combined counties) are joined with ", ".
pub fn cell(v: &Value) -> String {
    match v {
        Value::Null => s!(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format_number(f),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        Value::Object(_) => v.to_string(),
    }
}

fn row_of(map: &Map<String, Value>, header: &[String]) -> Vec<String> {
    let coords = map.get(COORDINATES).and_then(Value::as_array);
    header
        .iter()
        .map(|col| match col.as_str() {
            "long" => coords.and_then(|c| c.first()).map(cell).unwrap_or_default(),
            "lat" => coords.and_then(|c| c.get(1)).map(cell).unwrap_or_default(),
            key => map.get(key).map(cell).unwrap_or_default(),
        })
        .collect()
}

/* ---------------- Writing ---------------- */

pub fn write_records<W: Write>(w: W, records: &[Record]) -> Result<(), RunError> {
    let maps = as_maps(records)?;
    let header = header_of(&maps);

    let mut out = csv::WriterBuilder::new().from_writer(w);
    out.write_record(&header)?;
    for m in &maps {
        out.write_record(row_of(m, &header))?;
    }
    out.flush().map_err(|e| RunError::io("<csv>", e))?;
    Ok(())
}

pub fn to_csv_string(records: &[Record]) -> Result<String, RunError> {
    let mut buf: Vec<u8> = Vec::new();
    write_records(&mut buf, records)?;
    match String::from_utf8(buf) {
        Ok(s) => Ok(s),
        Err(e) => Ok(String::from_utf8_lossy(&e.into_bytes()).into_owned()),
    }
}
