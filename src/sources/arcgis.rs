// src/sources/arcgis.rs
// ArcGIS FeatureServer query results: `{ "features": [ { "attributes": {..} } ] }`.

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

use crate::errors::TaskError;
use crate::task::TaskContext;

/// Query string asking a FeatureServer layer for every row, no geometry.
pub const QUERY_ALL: &str = "?f=json&where=1%3D1&returnGeometry=false&outFields=*";

/// Rows per page once layers are read in pages.
pub const PAGE_SIZE: usize = 1000;
const MAX_PAGES: usize = 100;

/// First snapshot date whose layers are read in pages. Earlier snapshots
/// were cached as one unpaged query and are read back that way.
pub fn paged_since() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(2020, 5, 1)
}

fn page_url(layer: &str, offset: usize) -> String {
    format!("{layer}{QUERY_ALL}&resultOffset={offset}&resultRecordCount={PAGE_SIZE}")
}

/// Every feature of `layer` as one `{ "features": [..] }` value, paged or
/// not depending on the snapshot date.
pub fn query_layer(ctx: &TaskContext, layer: &str, cache_key: &str) -> Result<Value, TaskError> {
    let paged = paged_since().is_some_and(|d| ctx.snapshot_date >= d);
    if !paged {
        return ctx.json(&join!(layer, QUERY_ALL), cache_key);
    }

    let mut features: Vec<Value> = Vec::new();
    for _ in 0..MAX_PAGES {
        let page = ctx.json(&page_url(layer, features.len()), cache_key)?;
        let batch = page
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| TaskError::exec("ArcGIS response has no features"))?;
        let more = page.get("exceededTransferLimit").and_then(Value::as_bool).unwrap_or(false);
        if batch.is_empty() {
            return Ok(json!({ "features": features }));
        }
        features.extend(batch.iter().cloned());
        if !more {
            return Ok(json!({ "features": features }));
        }
    }
    Err(TaskError::exec(format!("ArcGIS layer {layer} has more than {MAX_PAGES} pages")))
}

pub fn attributes(data: &Value) -> Result<Vec<&Map<String, Value>>, TaskError> {
    let features = data
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| TaskError::exec("ArcGIS response has no features"))?;
    features
        .iter()
        .map(|f| {
            f.get("attributes")
                .and_then(Value::as_object)
                .ok_or_else(|| TaskError::exec("ArcGIS feature has no attributes"))
        })
        .collect()
}

pub fn text<'a>(attrs: &'a Map<String, Value>, key: &str) -> Result<&'a str, TaskError> {
    attrs
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| TaskError::exec(format!("ArcGIS attribute {key} missing")))
}

/// Numeric attribute; absent or null reads as zero.
pub fn count(attrs: &Map<String, Value>, key: &str) -> f64 {
    attrs.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Was the attribute reported with a nonzero value?
pub fn reported(attrs: &Map<String, Value>, key: &str) -> bool {
    count(attrs, key) != 0.0
}
