use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Rows pulled from the source, one `Option<String>` per column (`None` is NULL).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStructure {
    #[serde(default)]
    pub required_columns: Vec<String>,
    #[serde(default)]
    pub copy_query: String,
}

/// Table name / file prefix → expected structure and warehouse copy statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileStructures(pub BTreeMap<String, FileStructure>);

impl FileStructures {
    pub fn from_json(json: &str) -> crate::utils::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Longest configured prefix of `name`.
    pub fn lookup(&self, name: &str) -> Option<(&str, &FileStructure)> {
        self.0
            .iter()
            .filter(|(prefix, _)| name.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, structure)| (prefix.as_str(), structure))
    }

    pub fn table_names(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    MissingColumns(Vec<String>),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Empty => write!(f, "no rows"),
            RejectReason::MissingColumns(cols) => {
                write!(f, "missing required columns: {}", cols.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum TransformResult {
    Accepted {
        table: Table,
        checkpoint: Option<NaiveDateTime>,
    },
    Rejected {
        table: Table,
        reason: RejectReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Uploaded,
    Rejected(RejectReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOutcome {
    pub table: String,
    pub status: TableStatus,
    pub object_key: String,
    pub rows_written: usize,
    pub checkpoint: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<TableOutcome>,
}

impl RunSummary {
    pub fn uploaded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == TableStatus::Uploaded)
            .count()
    }

    pub fn rejected(&self) -> usize {
        self.outcomes.len() - self.uploaded()
    }

    /// Rows uploaded to staging; rows sent to the error bucket are not counted.
    pub fn rows_staged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == TableStatus::Uploaded)
            .map(|o| o.rows_written)
            .sum()
    }
}

// Object-created notification, only the fields we read.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Event {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3EventRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3EventRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Object {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    pub fn new(status_code: u16, message: &str) -> Self {
        // body 與 API Gateway 慣例一致：JSON 編碼過的字串
        let body = serde_json::to_string(message).unwrap_or_else(|_| format!("\"{}\"", message));
        Self { status_code, body }
    }

    pub fn ok(message: &str) -> Self {
        Self::new(200, message)
    }

    pub fn failed(message: &str) -> Self {
        Self::new(500, message)
    }

    /// 500 response for an error that ended the invocation.
    pub fn failed_with(error: &crate::utils::error::EtlError) -> Self {
        Self::failed(&format!("Lambda execution failed: {}", error))
    }

    /// Turns any error from handling an invocation into a 500 response.
    pub fn from_result(result: crate::utils::error::Result<Self>) -> Self {
        result.unwrap_or_else(|e| {
            tracing::error!("Error in handler: {}", e);
            Self::failed_with(&e)
        })
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}
