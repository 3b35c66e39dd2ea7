//! Batch install request types

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Archive locations in either of the two supported encodings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArchiveRefs {
    /// Absolute file paths (flat repository layout)
    Absolute { paths: Vec<PathBuf> },
    /// A base directory plus file names (manifest repository layout)
    Relative { base: PathBuf, names: Vec<String> },
}

impl ArchiveRefs {
    /// Resolve to concrete paths, preserving order
    #[must_use]
    pub fn resolve(&self) -> Vec<PathBuf> {
        match self {
            Self::Absolute { paths } => paths.clone(),
            Self::Relative { base, names } => names.iter().map(|name| base.join(name)).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Absolute { paths } => paths.len(),
            Self::Relative { names, .. } => names.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ArchiveRefs {
    fn default() -> Self {
        Self::Absolute { paths: Vec::new() }
    }
}

/// One provisioning batch: what to install and which packages to wait for
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub archives: ArchiveRefs,
    pub expected: BTreeSet<String>,
}

impl BatchRequest {
    /// Create a request
    pub fn new<I, S>(archives: ArchiveRefs, expected: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            archives,
            expected: expected.into_iter().map(Into::into).collect(),
        }
    }
}
