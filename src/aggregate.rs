// src/aggregate.rs
use crate::record::{number_value, Level, Record, METRICS};

/// Sum every numeric field over `records`. A field absent on some inputs
/// counts as zero there; a field absent on all inputs stays absent.
pub fn sum(records: &[Record]) -> Record {
    // first-seen order, known metrics ahead of extension fields per record
    let mut totals: Vec<(&str, f64)> = Vec::new();
    for r in records {
        for (name, n) in r.numeric_fields() {
            match totals.iter_mut().find(|(seen, _)| *seen == name) {
                Some((_, total)) => *total += n,
                None => totals.push((name, n)),
            }
        }
    }

    let mut out = Record::default();
    for (name, total) in totals {
        if METRICS.contains(&name) {
            out.set_metric(name, Some(total));
        } else {
            out.extra.insert(name.to_string(), number_value(total));
        }
    }
    out
}

/// Parent total for a task that reported only `child`-level rows.
/// `None` when a `parent`-level row is already there or no child exists.
pub fn rollup(records: &[Record], parent: Level, child: Level) -> Option<Record> {
    if records.iter().any(|r| r.level() == parent) {
        return None;
    }
    let children: Vec<Record> = records.iter().filter(|r| r.level() == child).cloned().collect();
    if children.is_empty() {
        return None;
    }
    Some(sum(&children))
}
