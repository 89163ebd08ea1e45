#[cfg(feature = "cli")]
pub mod cli;
pub mod credentials;
pub mod env;
pub mod toml_config;

use crate::adapters::checkpoint::DEFAULT_CHECKPOINT_KEY;
use crate::core::clean::{CleanOptions, DEFAULT_NULL_FILL};
use crate::core::ingest::IngestOptions;
use crate::core::load::LoadOptions;
use crate::core::query::DEFAULT_CURSOR_COLUMN;
use crate::domain::model::FileStructures;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::*;
use chrono::NaiveDateTime;
use credentials::DbCredentials;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub storage: StorageSettings,
    #[serde(default)]
    pub source: SourceSettings,
    pub warehouse: Option<WarehouseSettings>,
    #[serde(default)]
    pub extract: ExtractSettings,
    #[serde(default)]
    pub load: LoadSettings,
    #[serde(default)]
    pub file_structures: FileStructures,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    pub bucket: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    pub error_bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_checkpoint_key")]
    pub checkpoint_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceSettings {
    pub url: Option<String>,
    /// JSON credentials document, used when `url` is not set.
    pub credentials: Option<String>,
    /// Environment variable holding the JSON credentials document. JSON cannot
    /// be substituted into a TOML string, so the file names the variable instead.
    pub credentials_env: Option<String>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseSettings {
    pub endpoint: String,
    pub database: String,
    pub workgroup: Option<String>,
    pub role_arn: String,
    pub token: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractSettings {
    #[serde(default = "default_cursor_column")]
    pub cursor_column: String,
    #[serde(default = "default_null_fill")]
    pub null_fill: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadSettings {
    #[serde(default)]
    pub validate_before_load: bool,
}

pub(crate) fn default_prefix() -> String {
    "raw".to_string()
}

pub(crate) fn default_region() -> String {
    "us-east-2".to_string()
}

pub(crate) fn default_checkpoint_key() -> String {
    DEFAULT_CHECKPOINT_KEY.to_string()
}

fn default_cursor_column() -> String {
    DEFAULT_CURSOR_COLUMN.to_string()
}

fn default_null_fill() -> String {
    DEFAULT_NULL_FILL.to_string()
}

impl Default for ExtractSettings {
    fn default() -> Self {
        Self {
            cursor_column: default_cursor_column(),
            null_fill: default_null_fill(),
        }
    }
}

impl SourceSettings {
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        if let Some(credentials) = &self.credentials {
            return DbCredentials::from_json(credentials)?.connection_url();
        }

        let var = validate_required_field("source.credentials", &self.credentials_env)?;
        let credentials = std::env::var(var).map_err(|_| EtlError::MissingConfigError {
            field: var.clone(),
        })?;
        DbCredentials::from_json(&credentials)?.connection_url()
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(2)
    }
}

impl Settings {
    pub fn clean_options(&self) -> CleanOptions {
        CleanOptions {
            cursor_column: self.extract.cursor_column.clone(),
            null_fill: self.extract.null_fill.clone(),
        }
    }

    pub fn ingest_options(&self, run_timestamp: NaiveDateTime) -> IngestOptions {
        IngestOptions {
            structures: self.file_structures.clone(),
            prefix: self.storage.prefix.clone(),
            clean: self.clean_options(),
            run_timestamp,
        }
    }

    pub fn warehouse(&self) -> Result<&WarehouseSettings> {
        validate_required_field("warehouse", &self.warehouse)
    }

    pub fn load_options(&self) -> Result<LoadOptions> {
        Ok(LoadOptions {
            structures: self.file_structures.clone(),
            staging_bucket: self.storage.bucket.clone(),
            role_arn: self.warehouse()?.role_arn.clone(),
            validate_before_load: self.load.validate_before_load,
        })
    }

    /// Extra checks for the load run: a warehouse and a copy query per structure.
    pub fn validate_for_load(&self) -> Result<()> {
        let warehouse = self.warehouse()?;
        validate_url("warehouse.endpoint", &warehouse.endpoint)?;
        validate_non_empty_string("warehouse.database", &warehouse.database)?;
        validate_non_empty_string("warehouse.role_arn", &warehouse.role_arn)?;

        for (prefix, structure) in &self.file_structures.0 {
            validate_non_empty_string(
                &format!("file_structures.{}.copy_query", prefix),
                &structure.copy_query,
            )?;
        }
        Ok(())
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_s3_bucket_name("storage.bucket", &self.storage.bucket)?;
        validate_s3_bucket_name("storage.error_bucket", &self.storage.error_bucket)?;
        validate_aws_region("storage.region", &self.storage.region)?;
        validate_path("storage.checkpoint_key", &self.storage.checkpoint_key)?;
        validate_identifier("extract.cursor_column", &self.extract.cursor_column)?;

        if self.file_structures.is_empty() {
            return Err(EtlError::ConfigError {
                message: "at least one file structure must be configured".to_string(),
            });
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_settings() -> Settings {
        Settings {
            storage: StorageSettings {
                bucket: "raw-data".to_string(),
                prefix: default_prefix(),
                error_bucket: "raw-data-errors".to_string(),
                region: default_region(),
                checkpoint_key: default_checkpoint_key(),
            },
            source: SourceSettings::default(),
            warehouse: None,
            extract: ExtractSettings::default(),
            load: LoadSettings::default(),
            file_structures: FileStructures::from_json(
                r#"{"orders": {"required_columns": ["id"], "copy_query": ""}}"#,
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_validate_settings() {
        let settings = sample_settings();
        assert!(settings.validate().is_ok());

        let mut bad = settings.clone();
        bad.storage.bucket = "Raw_Data".to_string();
        assert!(bad.validate().is_err());

        let mut bad = settings;
        bad.file_structures = FileStructures::default();
        assert!(matches!(bad.validate(), Err(EtlError::ConfigError { .. })));
    }

    #[test]
    fn test_load_requires_warehouse_and_copy_query() {
        let mut settings = sample_settings();
        assert!(matches!(
            settings.validate_for_load(),
            Err(EtlError::MissingConfigError { .. })
        ));

        settings.warehouse = Some(WarehouseSettings {
            endpoint: "https://warehouse.internal/statements".to_string(),
            database: "analytics".to_string(),
            workgroup: None,
            role_arn: "arn:aws:iam::123:role/load".to_string(),
            token: None,
            timeout_seconds: None,
        });
        assert!(settings.validate_for_load().is_err());

        settings.file_structures.0.get_mut("orders").unwrap().copy_query =
            "COPY orders FROM s3uri IAM_ROLE iamrole".to_string();
        assert!(settings.validate_for_load().is_ok());
    }

    #[test]
    fn test_connection_url_prefers_explicit_url() {
        let source = SourceSettings {
            url: Some("postgres://localhost/app".to_string()),
            credentials: Some("not json".to_string()),
            credentials_env: None,
            max_connections: None,
        };
        assert_eq!(source.connection_url().unwrap(), "postgres://localhost/app");
        assert!(SourceSettings::default().connection_url().is_err());
    }
}
