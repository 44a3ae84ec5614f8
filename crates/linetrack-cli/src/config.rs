use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use linetrack_diff::ComparisonPolicy;

/// Settings read from the `--config` TOML file. Missing keys keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub comparison: ComparisonPolicy,
}

impl CliConfig {
    /// Load from `path`, or the defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("serializing config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use linetrack_diff::DiffAlgorithm;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        assert_eq!(CliConfig::load(None).unwrap(), CliConfig::default());
    }

    #[test]
    fn loads_comparison_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[comparison]\nalgorithm = \"lcs\"\nexact_line_limit = 64").unwrap();

        let config = CliConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.comparison.algorithm, DiffAlgorithm::Lcs);
        assert_eq!(config.comparison.exact_line_limit, 64);
    }

    #[test]
    fn empty_file_is_default() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert_eq!(CliConfig::load(Some(file.path())).unwrap(), CliConfig::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[comparison]\nexact_line_limit = \"many\"").unwrap();

        let err = CliConfig::load(Some(file.path())).unwrap_err();
        assert!(err.to_string().contains("parsing config"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CliConfig::load(Some(&dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn toml_round_trip() {
        let config = CliConfig::default();
        let parsed: CliConfig = toml::from_str(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
