use std::path::Path;

use serde::{Deserialize, Serialize};
use tablegraph_core::{ColumnOverride, InferenceOptions, InferenceOverrides};

use crate::{CliError, CliResult};

/// Contents of a `tablegraph.toml` file.
///
/// ```toml
/// [inference]
/// rails = true
/// ignored_columns = ["LanguageId"]
///
/// [[overrides]]
/// table = "Album"
/// column = "ArtistId"
/// implied_parents = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TablegraphConfig {
    pub inference: InferenceOptions,
    pub overrides: Vec<ColumnOverride>,
}

impl TablegraphConfig {
    pub fn overrides(&self) -> InferenceOverrides {
        InferenceOverrides::new(self.overrides.iter().cloned())
    }

    fn validate(&self) -> CliResult<()> {
        for entry in &self.overrides {
            if entry.table.trim().is_empty() || entry.column.trim().is_empty() {
                return Err(CliError::InvalidConfig(
                    "overrides need both table and column".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Load the config file, or defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> CliResult<TablegraphConfig> {
    let Some(path) = path else {
        return Ok(TablegraphConfig::default());
    };

    let content = std::fs::read_to_string(path)?;
    let config: TablegraphConfig = toml::from_str(&content)?;
    config.validate()?;
    tracing::info!(
        event = "config_loaded",
        path = %path.display(),
        overrides = config.overrides.len()
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_inference_and_overrides() {
        let config: TablegraphConfig = toml::from_str(
            r#"
            [inference]
            rails = true
            require_type_match = false
            ignored_columns = ["LanguageId"]

            [[overrides]]
            table = "Album"
            column = "ArtistId"
            implied_parents = false
            "#,
        )
        .unwrap();

        assert!(config.inference.implied);
        assert!(config.inference.rails);
        assert!(!config.inference.require_type_match);
        assert_eq!(config.inference.ignored_columns, vec!["LanguageId"]);
        assert_eq!(config.overrides.len(), 1);
        assert!(!config.overrides[0].implied_parents);
        assert!(config.overrides[0].implied_children);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: TablegraphConfig = toml::from_str("").unwrap();
        assert_eq!(config, TablegraphConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_sections_are_rejected() {
        assert!(toml::from_str::<TablegraphConfig>("[orderer]\nfast = true\n").is_err());
    }

    #[test]
    fn blank_override_targets_are_invalid() {
        let config: TablegraphConfig =
            toml::from_str("[[overrides]]\ntable = \"\"\ncolumn = \"id\"\n").unwrap();
        assert!(matches!(config.validate(), Err(CliError::InvalidConfig(_))));
    }
}
