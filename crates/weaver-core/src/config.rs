//! Generator configuration.
//!
//! Load order: `weaver.toml` → build properties of the model → defaults.

use crate::error::CoreError;
use crate::model::{ProgramModel, ROOT_NAMESPACE_PROPERTY};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name looked up next to the model.
pub const CONFIG_FILE_NAME: &str = "weaver.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Namespace used for generated code whose declaration has none.
    /// Falls back to the `RootNamespace` build property, then the assembly name.
    pub root_namespace: Option<String>,
    pub markers: MarkerConfig,
    pub output: OutputConfig,
}

/// Names of the marker attributes the extraction pass looks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerConfig {
    pub register_service: String,
    pub inject: String,
    pub inject_initializer: String,
    pub value_comparer: String,
    pub ignore_in_comparison: String,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            register_service: "RegisterService".to_string(),
            inject: "Inject".to_string(),
            inject_initializer: "InjectInitializer".to_string(),
            value_comparer: "ValueComparer".to_string(),
            ignore_in_comparison: "IgnoreInComparison".to_string(),
        }
    }
}

/// Output naming and formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub registration_file: String,
    pub constructor_file: String,
    pub comparer_file: String,
    /// Static class receiving the registration extension methods.
    pub registration_class: String,
    /// Method name used for registrations without a grouping hint.
    pub default_group_method: String,
    pub indent_size: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            registration_file: "ServiceRegistrationMethods.g.cs".to_string(),
            constructor_file: "InjectConstructors.g.cs".to_string(),
            comparer_file: "ValueComparers.g.cs".to_string(),
            registration_class: "ServiceCollectionExtensions".to_string(),
            default_group_method: "AddServices".to_string(),
            indent_size: 4,
        }
    }
}

impl GeneratorConfig {
    pub fn from_toml(text: &str) -> Result<Self, CoreError> {
        let config: GeneratorConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if self.output.indent_size == 0 {
            return Err(CoreError::Config("output.indent_size must be positive".to_string()));
        }
        for (key, file) in [
            ("output.registration_file", &self.output.registration_file),
            ("output.constructor_file", &self.output.constructor_file),
            ("output.comparer_file", &self.output.comparer_file),
        ] {
            if file.is_empty() || file.contains('/') || file.contains('\\') {
                return Err(CoreError::Config(format!(
                    "{} must be a plain file name, got '{}'",
                    key, file
                )));
            }
        }
        Ok(())
    }

    /// Root namespace for a model: explicit config, then build property, then assembly name.
    pub fn root_namespace(&self, model: &ProgramModel) -> String {
        self.root_namespace
            .clone()
            .filter(|ns| !ns.is_empty())
            .or_else(|| {
                model
                    .build_property(ROOT_NAMESPACE_PROPERTY)
                    .filter(|ns| !ns.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| model.assembly_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = GeneratorConfig::from_toml(
            r#"
            root_namespace = "Contoso"

            [markers]
            inject = "Dependency"
            "#,
        )
        .unwrap();

        assert_eq!(config.root_namespace.as_deref(), Some("Contoso"));
        assert_eq!(config.markers.inject, "Dependency");
        assert_eq!(config.markers.register_service, "RegisterService");
        assert_eq!(config.output.indent_size, 4);
    }

    #[test]
    fn test_rejects_nested_output_paths() {
        let err = GeneratorConfig::from_toml(
            r#"
            [output]
            comparer_file = "gen/Comparers.g.cs"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("output.comparer_file"));
    }

    #[test]
    fn test_root_namespace_resolution_order() {
        let mut model = ProgramModel::new("My.Assembly");
        let config = GeneratorConfig::default();
        assert_eq!(config.root_namespace(&model), "My.Assembly");

        model
            .build_properties
            .insert(ROOT_NAMESPACE_PROPERTY.to_string(), "My.Root".to_string());
        assert_eq!(config.root_namespace(&model), "My.Root");

        let config = GeneratorConfig {
            root_namespace: Some("Override".to_string()),
            ..Default::default()
        };
        assert_eq!(config.root_namespace(&model), "Override");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, GeneratorConfig::default());
    }
}
