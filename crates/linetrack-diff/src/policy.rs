use serde::{Deserialize, Serialize};

/// Line diff algorithm used by the exact comparator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffAlgorithm {
    #[default]
    Myers,
    Patience,
    Lcs,
}

impl From<DiffAlgorithm> for similar::Algorithm {
    fn from(algorithm: DiffAlgorithm) -> Self {
        match algorithm {
            DiffAlgorithm::Myers => similar::Algorithm::Myers,
            DiffAlgorithm::Patience => similar::Algorithm::Patience,
            DiffAlgorithm::Lcs => similar::Algorithm::Lcs,
        }
    }
}

/// Cost policy for line comparison.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonPolicy {
    /// Algorithm used for exact comparison.
    pub algorithm: DiffAlgorithm,
    /// The exact comparator declines when the lines left after trimming the
    /// common prefix and suffix exceed this count (both sides summed).
    pub exact_line_limit: usize,
}

impl Default for ComparisonPolicy {
    fn default() -> Self {
        Self {
            algorithm: DiffAlgorithm::Myers,
            exact_line_limit: 100_000,
        }
    }
}

impl ComparisonPolicy {
    /// A policy under which every non-trivial comparison is approximate.
    pub fn approximate_only() -> Self {
        Self {
            exact_line_limit: 0,
            ..Default::default()
        }
    }
}
