// src/features.rs
//! GeoJSON view of a run: one feature per region, record fields as properties.
//! Geometry is a point at the record's coordinates, or `null` when a source
//! gave none. Combined rows become one feature per member region.

use serde_json::{json, Map, Value};

use crate::errors::RunError;
use crate::geography::expand_combined;
use crate::record::Record;

pub fn feature(record: &Record) -> Result<Value, RunError> {
    let mut props: Map<String, Value> = match serde_json::to_value(record)? {
        Value::Object(m) => m,
        other => return Err(RunError::Output(format!("record serialized as {other}"))),
    };
    props.remove("coordinates");

    let geometry = match record.coordinates {
        Some([long, lat]) => json!({ "type": "Point", "coordinates": [long, lat] }),
        None => Value::Null,
    };
    Ok(json!({ "type": "Feature", "properties": props, "geometry": geometry }))
}

pub fn feature_collection(records: &[Record]) -> Result<Value, RunError> {
    let mut features = Vec::with_capacity(records.len());
    for r in records {
        for part in expand_combined(r) {
            let mut f = feature(&part)?;
            f["id"] = Value::from(features.len());
            features.push(f);
        }
    }
    Ok(json!({ "type": "FeatureCollection", "features": features }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CountyRef;

    #[test]
    fn point_geometry_from_coordinates() {
        let f = feature(&record! { state: "MN", cases: 3, coordinates: [-94.6, 46.3] }).unwrap();
        assert_eq!(f["geometry"]["type"], "Point");
        assert_eq!(f["geometry"]["coordinates"], json!([-94.6, 46.3]));
        assert_eq!(f["properties"]["cases"], 3);
        assert!(f["properties"].get("coordinates").is_none());
    }

    #[test]
    fn combined_rows_expand_per_region() {
        let mut r = record! { cases: 10 };
        r.county = Some(CountyRef::Combined(vec![s!("Dukes County"), s!("Nantucket County")]));
        let fc = feature_collection(&[r, record! { state: "MA", cases: 10 }]).unwrap();
        let features = fc["features"].as_array().unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(features[0]["properties"]["county"], "Dukes County");
        assert_eq!(features[1]["properties"]["county"], "Nantucket County");
        assert_eq!(features[1]["properties"]["cases"], 10);
        assert!(features[2]["geometry"].is_null());
        assert_eq!(features[2]["id"], 2);
    }
}
