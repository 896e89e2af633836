// src/record.rs
//! The per-region record shape every source is reduced to.
//!
//! A record carries a handful of known fields (identity, metrics, coordinates)
//! plus an `extra` map for whatever else a source reports. Extra fields keep
//! their insertion order so exports list them in first-seen order.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Metric names the pipeline knows about, in export order.
pub const METRICS: [&str; 5] = ["cases", "deaths", "recovered", "tested", "active"];

/// Administrative level a finished record sits at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Country,
    State,
    County,
}

/// County field: one region, or one row covering several regions at once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountyRef {
    One(String),
    Combined(Vec<String>),
}

impl CountyRef {
    pub fn members(&self) -> Vec<&str> {
        match self {
            CountyRef::One(n) => vec![n.as_str()],
            CountyRef::Combined(v) => v.iter().map(String::as_str).collect(),
        }
    }

    pub fn covers(&self, name: &str) -> bool {
        self.members().iter().any(|m| *m == name)
    }

    pub fn is_combined(&self) -> bool {
        matches!(self, CountyRef::Combined(_))
    }

    fn is_blank(&self) -> bool {
        match self {
            CountyRef::One(n) => n.is_empty(),
            CountyRef::Combined(v) => v.is_empty(),
        }
    }
}

impl std::fmt::Display for CountyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountyRef::One(n) => f.write_str(n),
            CountyRef::Combined(v) => f.write_str(&v.join(", ")),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub county: Option<CountyRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_number")]
    pub cases: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_number")]
    pub deaths: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_number")]
    pub recovered: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_number")]
    pub tested: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "ser_opt_number")]
    pub active: Option<f64>,
    /// `[longitude, latitude]`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Source-specific fields passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    /// Extension fields that were set to NaN or an infinity. JSON has no
    /// such numbers, so `extra` holds null for them.
    #[serde(skip)]
    pub non_finite: Vec<String>,
}

/// Loose value accepted by [`Record::set_field`] (and the `record!` macro).
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Num(f64),
    Text(String),
    Coords([f64; 2]),
    County(CountyRef),
    Json(Value),
}

impl From<f64> for FieldValue { fn from(v: f64) -> Self { FieldValue::Num(v) } }
impl From<i32> for FieldValue { fn from(v: i32) -> Self { FieldValue::Num(v as f64) } }
impl From<u32> for FieldValue { fn from(v: u32) -> Self { FieldValue::Num(v as f64) } }
impl From<i64> for FieldValue { fn from(v: i64) -> Self { FieldValue::Num(v as f64) } }
impl From<u64> for FieldValue { fn from(v: u64) -> Self { FieldValue::Num(v as f64) } }
impl From<&str> for FieldValue { fn from(v: &str) -> Self { FieldValue::Text(v.to_string()) } }
impl From<String> for FieldValue { fn from(v: String) -> Self { FieldValue::Text(v) } }
impl From<[f64; 2]> for FieldValue { fn from(v: [f64; 2]) -> Self { FieldValue::Coords(v) } }
impl From<CountyRef> for FieldValue { fn from(v: CountyRef) -> Self { FieldValue::County(v) } }
impl From<Value> for FieldValue { fn from(v: Value) -> Self { FieldValue::Json(v) } }

impl Record {
    /// Set a field by name. Known names go to their typed slot when the value
    /// fits; everything else is stored in `extra`.
    pub fn set_field(&mut self, name: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        match (name, value) {
            ("city", FieldValue::Text(t)) => self.city = Some(t),
            ("state", FieldValue::Text(t)) => self.state = Some(t),
            ("country", FieldValue::Text(t)) => self.country = Some(t),
            ("url", FieldValue::Text(t)) => self.url = Some(t),
            ("county", FieldValue::Text(t)) => self.county = Some(CountyRef::One(t)),
            ("county", FieldValue::County(c)) => self.county = Some(c),
            ("coordinates", FieldValue::Coords(c)) => self.coordinates = Some(c),
            (m, FieldValue::Num(n)) if METRICS.contains(&m) => self.set_metric(m, Some(n)),
            (other, v) => {
                let finite = match &v {
                    FieldValue::Num(n) => n.is_finite(),
                    FieldValue::Coords(c) => c.iter().all(|n| n.is_finite()),
                    _ => true,
                };
                self.non_finite.retain(|n| n != other);
                if !finite {
                    self.non_finite.push(other.to_string());
                }
                self.extra.insert(other.to_string(), field_to_json(v));
            }
        }
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        match name {
            "cases" => self.cases,
            "deaths" => self.deaths,
            "recovered" => self.recovered,
            "tested" => self.tested,
            "active" => self.active,
            _ => None,
        }
    }

    pub fn set_metric(&mut self, name: &str, value: Option<f64>) {
        match name {
            "cases" => self.cases = value,
            "deaths" => self.deaths = value,
            "recovered" => self.recovered = value,
            "tested" => self.tested = value,
            "active" => self.active = value,
            _ => {}
        }
    }

    /// Every numeric field present on this record: known metrics first, then
    /// numeric extension fields in their stored order.
    pub fn numeric_fields(&self) -> Vec<(&str, f64)> {
        let mut out: Vec<(&str, f64)> = METRICS
            .iter()
            .filter_map(|m| self.metric(m).map(|v| (*m, v)))
            .collect();
        for (k, v) in &self.extra {
            if let Some(n) = v.as_f64() {
                out.push((k.as_str(), n));
            }
        }
        out
    }

    /// Classification: county field ⇒ county, else state field ⇒ state, else country.
    pub fn level(&self) -> Level {
        if self.county.as_ref().is_some_and(|c| !c.is_blank()) {
            Level::County
        } else if self.state.as_deref().is_some_and(|s| !s.is_empty()) {
            Level::State
        } else {
            Level::Country
        }
    }

    /// Zero-valued stand-in for a region the source did not report.
    pub fn placeholder(county: &str) -> Self {
        Record {
            county: Some(CountyRef::One(county.to_string())),
            cases: Some(0.0),
            ..Record::default()
        }
    }
}

fn field_to_json(v: FieldValue) -> Value {
    match v {
        FieldValue::Num(n) => number_value(n),
        FieldValue::Text(t) => Value::String(t),
        FieldValue::Coords([a, b]) => Value::Array(vec![number_value(a), number_value(b)]),
        FieldValue::County(c) => serde_json::to_value(c).unwrap_or(Value::Null),
        FieldValue::Json(j) => j,
    }
}

/// JSON number for `n`, integral when `n` is whole. Non-finite values have no
/// JSON form and become `null` (which validation then rejects).
pub fn number_value(n: f64) -> Value {
    if is_integral(n) {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15
}

/// Render a number the way the exports show it: `8` rather than `8.0`.
pub fn format_number(n: f64) -> String {
    if is_integral(n) { format!("{}", n as i64) } else { format!("{n}") }
}

fn ser_opt_number<S: Serializer>(v: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    match v {
        Some(n) if is_integral(*n) => s.serialize_i64(*n as i64),
        Some(n) => s.serialize_f64(*n),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_macro_routes_known_and_extra_fields() {
        let r = record! { county: "Essex County", cases: 12, hospitalized: 3, _raw: "x" };
        assert_eq!(r.county, Some(CountyRef::One(s!("Essex County"))));
        assert_eq!(r.cases, Some(12.0));
        assert_eq!(r.extra.get("hospitalized"), Some(&Value::from(3)));
        assert!(r.extra.contains_key("_raw"));
    }

    #[test]
    fn level_classification() {
        assert_eq!(record! { county: "A", state: "MA", cases: 1 }.level(), Level::County);
        assert_eq!(record! { state: "MA", cases: 1 }.level(), Level::State);
        assert_eq!(record! { country: "USA", cases: 1 }.level(), Level::Country);
    }

    #[test]
    fn whole_numbers_serialize_as_integers() {
        let r = record! { state: "MA", cases: 8.0, tested: 2.5 };
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"state":"MA","cases":8,"tested":2.5}"#);
    }

    #[test]
    fn non_finite_extension_is_remembered() {
        let mut r = record! { cases: 1, hospitalized: f64::NAN, icu: 2 };
        assert_eq!(r.non_finite, [s!("hospitalized")]);
        assert_eq!(r.extra["hospitalized"], Value::Null);
        r.set_field("hospitalized", 4);
        assert!(r.non_finite.is_empty());
    }

    #[test]
    fn combined_county_serializes_as_list() {
        let mut r = Record::placeholder("x");
        r.county = Some(CountyRef::Combined(vec![s!("Dukes County"), s!("Nantucket County")]));
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["county"], serde_json::json!(["Dukes County", "Nantucket County"]));
    }
}
