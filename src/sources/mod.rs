// src/sources/mod.rs
//! Registered tasks, one module per monitored region.

pub mod arcgis;
pub mod us_ma;
pub mod us_mn;

use crate::errors::RegistryError;
use crate::task::Task;

/// Every task, in the order they run and appear in the output.
pub fn all() -> Result<Vec<Task>, RegistryError> {
    Ok(vec![us_ma::task()?, us_mn::task()?])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_builds_and_names_are_unique() {
        let tasks = all().unwrap();
        let mut names: Vec<String> = tasks.iter().map(Task::name).collect();
        assert_eq!(names, ["MA, USA", "MN, USA"]);
        names.dedup();
        assert_eq!(names.len(), tasks.len());
    }
}
