// src/normalize.rs
//! Turn a validated source row into a clean record: task identity merged in,
//! private and implementation fields gone, empty strings dropped, country and
//! state codes standardized.

use serde_json::Value;

use crate::config::consts::{HOME_COUNTRY, IMPLEMENTATION_FIELDS, PRIVATE_PREFIX};
use crate::geography::{to_iso3166_alpha3, to_us_state_abbreviation};
use crate::record::{CountyRef, Record};
use crate::task::TaskIdentity;

pub fn normalize(mut record: Record, identity: &TaskIdentity, url: Option<&str>) -> Record {
    // identity wins over whatever the source put there
    record.country = Some(identity.country.clone());
    if let Some(state) = &identity.state {
        record.state = Some(state.clone());
    }
    if let Some(county) = &identity.county {
        record.county = Some(CountyRef::One(county.clone()));
    }
    if record.url.is_none() {
        record.url = url.map(str::to_string);
    }

    record
        .extra
        .retain(|k, v| !is_private(k) && !matches!(v, Value::String(s) if s.is_empty()));

    for field in [&mut record.city, &mut record.state, &mut record.country, &mut record.url] {
        if field.as_deref() == Some("") {
            *field = None;
        }
    }
    if matches!(&record.county, Some(CountyRef::One(c)) if c.is_empty()) {
        record.county = None;
    }

    record.country = record.country.as_deref().map(to_iso3166_alpha3);
    if record.country.as_deref() == Some(HOME_COUNTRY) {
        record.state = record.state.as_deref().map(to_us_state_abbreviation);
    }
    record
}

fn is_private(name: &str) -> bool {
    name.starts_with(PRIVATE_PREFIX) || IMPLEMENTATION_FIELDS.contains(&name)
}

/// Fill `active = cases - deaths - recovered` wherever a record lacks it.
/// Absent components count as zero. Runs once, after aggregation.
pub fn derive_active(records: &mut [Record]) {
    for r in records.iter_mut().filter(|r| r.active.is_none()) {
        if let Some(cases) = r.cases {
            r.active = Some(cases - r.deaths.unwrap_or(0.0) - r.recovered.unwrap_or(0.0));
        }
    }
}
