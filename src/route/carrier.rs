//! Carrier classification of AS names.

use ahash::AHashMap;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use super::AsNames;
use crate::error::{Error, Result};

/// Carrier labels and their AS-name patterns, in priority order.
///
/// When several patterns match one name, the one listed last wins.
pub const DEFAULT_CARRIERS: &[(&str, &str)] = &[
    ("联通", "(unicom|cnc)"),
    ("铁通", "tietong"),
    ("电信", "(china ?telecom|chinanet)"),
    ("移动", "mobile"),
    ("教育网", "cernet"),
    ("科技网", "cstnet"),
    ("鹏博士", "(dxtnet|dr.?peng)"),
];

static DEFAULT_CLASSIFIER: Lazy<CarrierClassifier> = Lazy::new(|| {
    CarrierClassifier::from_patterns(DEFAULT_CARRIERS.iter().copied()).unwrap()
});

/// A carrier label and the case-insensitive pattern identifying it.
#[derive(Debug, Clone)]
pub struct Carrier {
    label: String,
    pattern: Regex,
}

impl Carrier {
    /// Compile a carrier pattern. Matching ignores case.
    pub fn new(label: impl Into<String>, pattern: &str) -> Result<Self> {
        let label = label.into();
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::InvalidPattern {
                label: label.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self { label, pattern })
    }

    /// Get the carrier label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Check if an AS name belongs to this carrier.
    pub fn is_match(&self, as_name: &str) -> bool {
        self.pattern.is_match(as_name)
    }
}

/// Ordered list of carriers.
#[derive(Debug, Clone)]
pub struct CarrierClassifier {
    carriers: Vec<Carrier>,
}

impl CarrierClassifier {
    /// Create a classifier from carriers in priority order.
    pub fn new(carriers: Vec<Carrier>) -> Self {
        Self { carriers }
    }

    /// Compile `(label, pattern)` pairs in priority order.
    pub fn from_patterns<I, L, P>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (L, P)>,
        L: Into<String>,
        P: AsRef<str>,
    {
        let carriers = patterns
            .into_iter()
            .map(|(label, pattern)| Carrier::new(label, pattern.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(carriers))
    }

    /// Label of the last carrier whose pattern matches `as_name`.
    pub fn classify(&self, as_name: &str) -> Option<&str> {
        self.carriers
            .iter()
            .rev()
            .find(|carrier| carrier.is_match(as_name))
            .map(Carrier::label)
    }

    /// Classify every registered AS; unmatched ASNs are left out.
    pub fn classify_all(&self, names: &AsNames) -> AHashMap<u32, String> {
        names
            .iter()
            .filter_map(|(&asn, name)| self.classify(name).map(|label| (asn, label.to_string())))
            .collect()
    }

    /// Get the carriers in priority order.
    pub fn carriers(&self) -> &[Carrier] {
        &self.carriers
    }
}

impl Default for CarrierClassifier {
    fn default() -> Self {
        DEFAULT_CLASSIFIER.clone()
    }
}
