use crate::{error::ConfigError, executor::Dialect, row::Column};
use serde::Deserialize;
use tether_core::relation::MissingParentPolicy;

///
/// LoaderConfig
///
/// Loader settings, typically read from a `[loader]`-style TOML table.
/// Every field has a default, so an empty document is a valid config.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Parent identifier column used by belongs-to fetches.
    pub primary_key_column: Column,

    /// Placeholder style forced on every generated statement. When unset the
    /// executor renders its own placeholders.
    pub dialect: Option<Dialect>,

    pub missing_parent: MissingParentPolicy,
}

impl LoaderConfig {
    pub const DEFAULT_PRIMARY_KEY: &'static str = "id";

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Re-check settings assembled in code; parsed columns are already
    /// checked on deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.primary_key_column.validate()?;

        Ok(())
    }

    #[must_use]
    pub fn with_primary_key_column(mut self, column: Column) -> Self {
        self.primary_key_column = column;
        self
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    #[must_use]
    pub fn with_missing_parent(mut self, policy: MissingParentPolicy) -> Self {
        self.missing_parent = policy;
        self
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            primary_key_column: Column::new(Self::DEFAULT_PRIMARY_KEY),
            dialect: None,
            missing_parent: MissingParentPolicy::Ignore,
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use tether_core::error::ErrorClass;

    #[test]
    fn empty_document_yields_defaults() {
        let config = LoaderConfig::from_toml_str("").expect("empty config should parse");

        assert_eq!(config, LoaderConfig::default());
        assert_eq!(config.primary_key_column.name(), "id");
    }

    #[test]
    fn parses_every_field() {
        let config = LoaderConfig::from_toml_str(
            r#"
                primary_key_column = "author_uuid"
                dialect = "dollar"
                missing_parent = "reject"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.primary_key_column, Column::new("author_uuid"));
        assert_eq!(config.dialect, Some(Dialect::Dollar));
        assert_eq!(config.missing_parent, MissingParentPolicy::Reject);
    }

    #[test]
    fn rejects_unknown_fields_and_bad_columns() {
        let err = LoaderConfig::from_toml_str("batch_size = 10").expect_err("unknown field");
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = LoaderConfig::from_toml_str(r#"primary_key_column = "id; --""#)
            .expect_err("invalid column");
        assert!(matches!(err, ConfigError::Parse(_)));
        assert_eq!(err.class(), ErrorClass::Config);

        let err = LoaderConfig::default()
            .with_primary_key_column(Column::new("1x"))
            .validate()
            .expect_err("invalid column");
        assert!(matches!(err, ConfigError::Column(_)));
        assert_eq!(err.class(), ErrorClass::Config);
    }
}
