#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the firstrun provisioning tool
//!
//! This crate provides the fundamental types shared by the index reader,
//! the selection model, the installer and the provisioning orchestrator.

pub mod app;
pub mod category;
pub mod readiness;
pub mod reports;
pub mod request;

// Re-export commonly used types
pub use app::AppDescriptor;
pub use category::{CategoryFilter, CategoryNames};
pub use readiness::ReadinessState;
pub use reports::{ArchiveFailure, ProvisionOutcome, ProvisionReport};
pub use request::{ArchiveRefs, BatchRequest};
pub use uuid::Uuid;

use serde::{Deserialize, Serialize};

/// How command results are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// No colors or table decoration
    Plain,
    #[default]
    Tty,
    Json,
}

impl OutputFormat {
    #[must_use]
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    #[default]
    Auto,
    Never,
}
