pub mod audit;
pub mod catch_up;
pub mod cohort;
pub mod config;
pub mod content;
pub mod error;
pub mod evaluator;
pub mod io;
pub mod paths;
pub mod plan;
pub mod progress;
pub mod schedule;
pub mod store;
pub mod types;
pub mod view;

pub use error::{DaybookError, Result};
