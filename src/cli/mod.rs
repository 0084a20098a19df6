//! Terminal presentation and first-run setup

pub mod setup;
pub mod stocks;
pub mod ui;
