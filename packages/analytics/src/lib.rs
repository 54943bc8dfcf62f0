#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dashboard computations over an aggregated school safety dataset.
//!
//! Everything here is a pure function of the records, apart from
//! [`export::write_export`], which writes a JSON file.

pub mod distribution;
pub mod export;
pub mod summary;

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during analytics operations.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Writing an export file failed.
    #[error("I/O error writing {}: {source}", .path.display())]
    Io {
        /// Target file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Records could not be serialized or parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
