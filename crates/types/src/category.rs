//! Category-based filtering of repository entries

use serde::{Deserialize, Serialize};

/// Names of the two categories that drive default selection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNames {
    /// Apps in this category are installed unless the user unchecks them
    pub default: String,
    /// Location backend providers, only offered when asked for explicitly
    pub backend: String,
}

impl Default for CategoryNames {
    fn default() -> Self {
        Self {
            default: "Default".to_string(),
            backend: "DefaultBackend".to_string(),
        }
    }
}

/// How a repository load decides which apps to surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Everything except backend providers; default-category apps pre-checked
    Default(CategoryNames),
    /// Only apps carrying this category, all pre-checked
    Only(String),
}

impl CategoryFilter {
    /// Build the filter for a requested category name
    #[must_use]
    pub fn for_category(requested: &str, names: &CategoryNames) -> Self {
        if requested == names.default {
            Self::Default(names.clone())
        } else {
            Self::Only(requested.to_string())
        }
    }

    /// Decide whether an app with these categories is included.
    ///
    /// Returns `None` when the app is skipped, otherwise its initial
    /// `checked` state.
    #[must_use]
    pub fn admit(&self, categories: &[String]) -> Option<bool> {
        let has = |name: &str| categories.iter().any(|c| c == name);
        match self {
            Self::Default(names) => {
                if has(&names.default) {
                    Some(true)
                } else if has(&names.backend) {
                    None
                } else {
                    Some(false)
                }
            }
            Self::Only(category) => has(category).then_some(true),
        }
    }

    /// Category name this filter was built for
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::Default(names) => &names.default,
            Self::Only(category) => category,
        }
    }
}

impl Default for CategoryFilter {
    fn default() -> Self {
        Self::Default(CategoryNames::default())
    }
}
