//! Scanned-product wellness scoring for food pantry intake.

pub mod config;
pub mod error;
pub mod scan;
pub mod telemetry;
