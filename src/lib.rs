// src/lib.rs
// #![allow(dead_code)]
// #![allow(unused)]

#[macro_use]
pub mod macros;
#[macro_use]
pub mod log;

pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod fetch;
pub mod geography;
pub mod record;
pub mod sources;
pub mod task;

pub mod aggregate;
pub mod normalize;
pub mod validate;

pub mod csv;
pub mod features;
pub mod file;
pub mod progress;
pub mod report;
pub mod runner;
