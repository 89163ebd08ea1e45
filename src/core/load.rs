use crate::core::clean::check_structure;
use crate::core::csv_output::from_csv;
use crate::core::{Storage, Warehouse};
use crate::domain::model::{FileStructures, HandlerResponse, S3Event, S3EventRecord};
use crate::utils::error::{EtlError, Result};
use regex::{NoExpand, Regex};
use std::sync::OnceLock;

pub const LOAD_SUCCEEDED: &str = "Lambda execution completed successfully";
pub const LOAD_SKIPPED: &str = "No data to process or invalid structure";

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub structures: FileStructures,
    /// Bucket the staged files live in; notifications from other buckets are refused.
    pub staging_bucket: String,
    /// Role the warehouse assumes to read the bucket.
    pub role_arn: String,
    pub validate_before_load: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadDecision {
    Submitted { file_name: String, statement_id: String },
    Skipped { file_name: String, reason: String },
}

/// Event keys arrive form-encoded (`+` for space, `%XX` escapes). The whole key
/// is one component, so literal `&` and `=` are escaped before decoding.
pub fn decode_object_key(raw: &str) -> String {
    let escaped = raw.replace('&', "%26").replace('=', "%3D");
    url::form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

pub fn file_name_from_key(key: &str) -> Result<&str> {
    key.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| EtlError::EventError {
            message: format!("object key '{}' has no file name", key),
        })
}

fn placeholder(token: &str) -> &'static Regex {
    static S3URI: OnceLock<Regex> = OnceLock::new();
    static IAMROLE: OnceLock<Regex> = OnceLock::new();
    let cell = if token == "s3uri" { &S3URI } else { &IAMROLE };
    cell.get_or_init(|| Regex::new(&format!(r"\b{}\b", token)).expect("placeholder pattern is valid"))
}

/// Fills the `s3uri` and `iamrole` placeholders of the copy statement
/// configured for the longest prefix of the file name.
pub fn render_copy_query(
    structures: &FileStructures,
    bucket: &str,
    key: &str,
    role_arn: &str,
) -> Result<String> {
    let file_name = file_name_from_key(key)?;
    let (prefix, structure) =
        structures
            .lookup(file_name)
            .ok_or_else(|| EtlError::ValidationError {
                message: format!("no file structure configured for '{}'", file_name),
            })?;

    if structure.copy_query.trim().is_empty() {
        return Err(EtlError::ValidationError {
            message: format!("file structure '{}' has no copy query", prefix),
        });
    }

    let uri = format!("'s3://{}/{}'", bucket, key);
    let role = format!("'{}'", role_arn);

    let query = placeholder("s3uri").replace_all(&structure.copy_query, NoExpand(&uri));
    let query = placeholder("iamrole").replace_all(&query, NoExpand(&role));

    Ok(query.into_owned())
}

/// Answers object-created notifications by submitting the matching copy
/// statement to the warehouse.
pub struct LoadHandler<S: Storage, W: Warehouse> {
    staging: S,
    warehouse: W,
    options: LoadOptions,
}

impl<S: Storage, W: Warehouse> LoadHandler<S, W> {
    pub fn new(staging: S, warehouse: W, options: LoadOptions) -> Self {
        Self {
            staging,
            warehouse,
            options,
        }
    }

    pub async fn handle(&self, event: &S3Event) -> HandlerResponse {
        match self.process(event).await {
            Ok(decisions) => {
                let submitted = decisions
                    .iter()
                    .filter(|d| matches!(d, LoadDecision::Submitted { .. }))
                    .count();
                if submitted > 0 {
                    HandlerResponse::ok(LOAD_SUCCEEDED)
                } else {
                    HandlerResponse::ok(LOAD_SKIPPED)
                }
            }
            Err(e) => {
                tracing::error!("Error during load: {}", e);
                HandlerResponse::failed_with(&e)
            }
        }
    }

    pub async fn process(&self, event: &S3Event) -> Result<Vec<LoadDecision>> {
        if event.records.is_empty() {
            return Err(EtlError::EventError {
                message: "event contains no records".to_string(),
            });
        }

        let mut decisions = Vec::with_capacity(event.records.len());
        let mut first_error = None;
        // 單筆失敗不影響其他檔案，第一個錯誤決定回應
        for record in &event.records {
            match self.load_record(record).await {
                Ok(decision) => decisions.push(decision),
                Err(e) => {
                    tracing::error!("❌ Failed to load {}: {}", record.s3.object.key, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(decisions),
        }
    }

    async fn load_record(&self, record: &S3EventRecord) -> Result<LoadDecision> {
        if record.s3.bucket.name != self.options.staging_bucket {
            return Err(EtlError::EventError {
                message: format!(
                    "notification from bucket '{}', expected '{}'",
                    record.s3.bucket.name, self.options.staging_bucket
                ),
            });
        }

        let key = decode_object_key(&record.s3.object.key);
        let file_name = file_name_from_key(&key)?.to_string();

        // checkpoint 文件等非 CSV 物件也會觸發通知
        if !file_name.to_ascii_lowercase().ends_with(".csv") {
            tracing::debug!("Ignoring non-CSV object {}", key);
            return Ok(LoadDecision::Skipped {
                file_name,
                reason: "not a CSV file".to_string(),
            });
        }

        if self.options.validate_before_load {
            let data = self.staging.read_file(&key).await?;
            let table = from_csv(&file_name, &data)?;
            if let Some(reason) = check_structure(&table, &self.options.structures) {
                tracing::warn!("⚠️ Skipping {}: {}", file_name, reason);
                return Ok(LoadDecision::Skipped {
                    file_name,
                    reason: reason.to_string(),
                });
            }
        }

        let sql = render_copy_query(
            &self.options.structures,
            &record.s3.bucket.name,
            &key,
            &self.options.role_arn,
        )?;
        tracing::info!("Executing warehouse copy command for file {}: {}", file_name, sql);

        let statement_id = self.warehouse.execute(&sql).await?;
        tracing::info!(
            "Loading data from {} submitted as statement {}",
            self.staging.location(&key),
            statement_id
        );

        Ok(LoadDecision::Submitted {
            file_name,
            statement_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structures() -> FileStructures {
        FileStructures::from_json(
            r#"{"orders": {"required_columns": ["id"],
                "copy_query": "COPY raw.orders FROM s3uri IAM_ROLE iamrole FORMAT AS CSV IGNOREHEADER 1;"}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_decode_object_key() {
        assert_eq!(decode_object_key("raw/orders+2024%3A01.csv"), "raw/orders 2024:01.csv");
        assert_eq!(decode_object_key("raw/orders.csv"), "raw/orders.csv");
        assert_eq!(decode_object_key("raw/a&b.csv"), "raw/a&b.csv");
        assert_eq!(decode_object_key("raw/k=v.csv"), "raw/k=v.csv");
        assert_eq!(decode_object_key("raw/a%26b.csv"), "raw/a&b.csv");
    }

    #[test]
    fn test_file_name_from_key() {
        assert_eq!(file_name_from_key("raw/2024/orders_1.csv").unwrap(), "orders_1.csv");
        assert_eq!(file_name_from_key("orders_1.csv").unwrap(), "orders_1.csv");
        assert!(file_name_from_key("raw/").is_err());
    }

    #[test]
    fn test_render_copy_query() {
        let sql = render_copy_query(
            &structures(),
            "raw-data",
            "raw/orders_2024-01-01_00-00-00.csv",
            "arn:aws:iam::123:role/load",
        )
        .unwrap();
        assert_eq!(
            sql,
            "COPY raw.orders FROM 's3://raw-data/raw/orders_2024-01-01_00-00-00.csv' IAM_ROLE 'arn:aws:iam::123:role/load' FORMAT AS CSV IGNOREHEADER 1;"
        );
    }

    #[test]
    fn test_render_copy_query_unknown_prefix() {
        let err = render_copy_query(&structures(), "raw-data", "raw/customers.csv", "arn").unwrap_err();
        assert!(matches!(err, EtlError::ValidationError { .. }));
    }
}
