//! Locale candidate resolution for localized manifest text

use serde_json::{Map, Value};

/// Fallback tag tried after the user's own preferences
pub const FALLBACK_TAG: &str = "en-US";

/// Language prefix of the last-resort fallback
const FALLBACK_LANGUAGE: &str = "en";

/// Bare language part of a tag (`de-AT` -> `de`)
#[must_use]
pub fn bare_language(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or(tag)
}

/// Priority-ordered locale tags to try, most preferred first.
///
/// Insertion order is preserved and each tag appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleCandidates(Vec<String>);

impl LocaleCandidates {
    /// Compute candidates from the tags a localized block offers and the
    /// user's ordered preferences.
    #[must_use]
    pub fn resolve<'a, I>(available: I, preferences: &[String]) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let available: Vec<&str> = available.into_iter().collect();
        let has = |tag: &str| available.contains(&tag);
        let mut out = Self::default();

        if let Some(primary) = preferences.first() {
            if has(primary) {
                out.push(primary);
            }
            let language = bare_language(primary);
            if has(language) {
                out.push(language);
            }
        }

        for preference in preferences {
            out.push(preference);
            let language = bare_language(preference);
            // The bare language tag itself wins over regional siblings
            let sibling = if has(language) {
                Some(language)
            } else {
                available
                    .iter()
                    .copied()
                    .find(|tag| bare_language(tag) == language)
            };
            if let Some(tag) = sibling {
                out.push(tag);
            }
        }

        if has(FALLBACK_TAG) {
            out.push(FALLBACK_TAG);
        }
        if let Some(tag) = available
            .iter()
            .find(|tag| tag.starts_with(FALLBACK_LANGUAGE))
        {
            out.push(tag);
        }

        out
    }

    fn push(&mut self, tag: &str) {
        if !tag.is_empty() && !self.0.iter().any(|t| t == tag) {
            self.0.push(tag.to_string());
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First non-empty string value of `field`, scanning candidates in order.
    ///
    /// Blocks that are missing, not objects, or hold a non-string value are
    /// skipped.
    #[must_use]
    pub fn pick_field(&self, localized: &Map<String, Value>, field: &str) -> Option<String> {
        self.iter().find_map(|tag| {
            localized
                .get(tag)
                .and_then(Value::as_object)
                .and_then(|block| block.get(field))
                .and_then(Value::as_str)
                .filter(|value| !value.is_empty())
                .map(ToString::to_string)
        })
    }
}

/// The device's ordered locale preferences
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemLocales(Vec<String>);

impl SystemLocales {
    #[must_use]
    pub fn new(preferences: Vec<String>) -> Self {
        let mut locales = Self::default();
        for tag in preferences {
            locales.push(normalize_posix(&tag));
        }
        locales
    }

    /// Read preferences from the POSIX locale environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as [`SystemLocales::from_env`] with an injectable lookup.
    ///
    /// `LANGUAGE` is a colon separated list and comes first, then the
    /// first set of `LC_ALL`, `LC_MESSAGES` and `LANG`.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut locales = Self::default();
        if let Some(language) = lookup("LANGUAGE") {
            for part in language.split(':') {
                locales.push(normalize_posix(part));
            }
        }
        if let Some(value) = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.is_empty()))
        {
            locales.push(normalize_posix(&value));
        }
        locales
    }

    fn push(&mut self, tag: Option<String>) {
        if let Some(tag) = tag {
            if !self.0.contains(&tag) {
                self.0.push(tag);
            }
        }
    }

    #[must_use]
    pub fn preferences(&self) -> &[String] {
        &self.0
    }

    #[must_use]
    pub fn into_preferences(self) -> Vec<String> {
        self.0
    }
}

/// `de_AT.UTF-8@euro` -> `de-AT`; `C` and `POSIX` carry no language
fn normalize_posix(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let base = raw.split(['.', '@']).next().unwrap_or(raw);
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}
