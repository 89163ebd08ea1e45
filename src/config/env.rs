use crate::config::{
    default_checkpoint_key, default_prefix, default_region, ExtractSettings, LoadSettings,
    Settings, SourceSettings, StorageSettings, WarehouseSettings,
};
use crate::domain::model::FileStructures;
use crate::utils::error::{EtlError, Result};

impl Settings {
    /// Builds settings from the process environment (Lambda configuration).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| EtlError::MissingConfigError {
                    field: name.to_string(),
                })
        };

        let file_structures = match (lookup("FILE_STRUCTURES"), lookup("FILE_STRUCTURES_PATH")) {
            (Some(json), _) => FileStructures::from_json(&json)?,
            (None, Some(path)) => FileStructures::from_json(&std::fs::read_to_string(path)?)?,
            (None, None) => {
                return Err(EtlError::MissingConfigError {
                    field: "FILE_STRUCTURES".to_string(),
                })
            }
        };

        // 沒有設定 endpoint 就只能跑 ingest
        let warehouse = match lookup("WAREHOUSE_ENDPOINT") {
            Some(endpoint) => Some(WarehouseSettings {
                endpoint,
                database: required("WAREHOUSE_DATABASE")?,
                workgroup: lookup("WAREHOUSE_WORKGROUP"),
                role_arn: required("WAREHOUSE_ROLE_ARN")?,
                token: lookup("WAREHOUSE_TOKEN"),
                timeout_seconds: parse_opt("WAREHOUSE_TIMEOUT_SECONDS", lookup("WAREHOUSE_TIMEOUT_SECONDS"))?,
            }),
            None => None,
        };

        let mut extract = ExtractSettings::default();
        if let Some(cursor_column) = lookup("CURSOR_COLUMN") {
            extract.cursor_column = cursor_column;
        }
        if let Some(null_fill) = lookup("NULL_FILL") {
            extract.null_fill = null_fill;
        }

        Ok(Self {
            storage: StorageSettings {
                bucket: required("S3_BUCKET")?,
                prefix: lookup("S3_PREFIX").unwrap_or_else(default_prefix),
                error_bucket: required("S3_ERROR_BUCKET")?,
                region: lookup("S3_REGION").unwrap_or_else(default_region),
                checkpoint_key: lookup("CHECKPOINT_KEY").unwrap_or_else(default_checkpoint_key),
            },
            source: SourceSettings {
                url: lookup("DATABASE_URL"),
                credentials: lookup("DB_CREDENTIALS"),
                credentials_env: None,
                max_connections: parse_opt("DB_MAX_CONNECTIONS", lookup("DB_MAX_CONNECTIONS"))?,
            },
            warehouse,
            extract,
            load: LoadSettings {
                validate_before_load: parse_opt("VALIDATE_BEFORE_LOAD", lookup("VALIDATE_BEFORE_LOAD"))?
                    .unwrap_or(false),
            },
            file_structures,
        })
    }
}

fn parse_opt<T: std::str::FromStr>(field: &str, value: Option<String>) -> Result<Option<T>> {
    value
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| EtlError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: raw.clone(),
                    reason: "cannot be parsed".to_string(),
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const STRUCTURES: &str =
        r#"{"orders": {"required_columns": ["id"], "copy_query": "COPY orders FROM s3uri IAM_ROLE iamrole"}}"#;

    #[test]
    fn test_from_lookup_minimal() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("S3_BUCKET", "raw-data"),
            ("S3_ERROR_BUCKET", "raw-data-errors"),
            ("FILE_STRUCTURES", STRUCTURES),
        ]))
        .unwrap();

        assert_eq!(settings.storage.prefix, "raw");
        assert_eq!(settings.storage.region, "us-east-2");
        assert!(settings.warehouse.is_none());
        assert!(!settings.load.validate_before_load);
        assert!(settings.file_structures.lookup("orders_1.csv").is_some());
    }

    #[test]
    fn test_from_lookup_full() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("S3_BUCKET", "raw-data"),
            ("S3_PREFIX", "landing"),
            ("S3_ERROR_BUCKET", "raw-data-errors"),
            ("FILE_STRUCTURES", STRUCTURES),
            ("WAREHOUSE_ENDPOINT", "https://warehouse.internal/statements"),
            ("WAREHOUSE_DATABASE", "analytics"),
            ("WAREHOUSE_ROLE_ARN", "arn:aws:iam::123:role/load"),
            ("VALIDATE_BEFORE_LOAD", "true"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("CURSOR_COLUMN", "updated_at"),
        ]))
        .unwrap();

        assert_eq!(settings.storage.prefix, "landing");
        assert_eq!(settings.warehouse.unwrap().database, "analytics");
        assert!(settings.load.validate_before_load);
        assert_eq!(settings.source.max_connections(), 4);
        assert_eq!(settings.extract.cursor_column, "updated_at");
    }

    #[test]
    fn test_missing_required_values() {
        let err = Settings::from_lookup(lookup_from(&[
            ("S3_ERROR_BUCKET", "raw-data-errors"),
            ("FILE_STRUCTURES", STRUCTURES),
        ]))
        .unwrap_err();
        assert!(matches!(err, EtlError::MissingConfigError { field } if field == "S3_BUCKET"));

        let err = Settings::from_lookup(lookup_from(&[
            ("S3_BUCKET", "raw-data"),
            ("S3_ERROR_BUCKET", "raw-data-errors"),
        ]))
        .unwrap_err();
        assert!(matches!(err, EtlError::MissingConfigError { field } if field == "FILE_STRUCTURES"));
    }

    #[test]
    fn test_bad_boolean_is_rejected() {
        let err = Settings::from_lookup(lookup_from(&[
            ("S3_BUCKET", "raw-data"),
            ("S3_ERROR_BUCKET", "raw-data-errors"),
            ("FILE_STRUCTURES", STRUCTURES),
            ("VALIDATE_BEFORE_LOAD", "yes please"),
        ]))
        .unwrap_err();
        assert!(matches!(err, EtlError::InvalidConfigValueError { .. }));
    }
}
