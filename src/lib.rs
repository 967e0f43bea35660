//! Web front-end for the comparison report generator.
//!
//! Collects a competitor URL, an optional baseline and source file from a
//! browser form, runs the external generator, and links the reports it writes.

pub mod cli;
pub mod error;
pub mod model;
pub mod normalize;
pub mod orchestrator;
pub mod presets;
pub mod runs;
pub mod settings;
pub mod web;
