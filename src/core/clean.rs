use crate::core::query::DEFAULT_CURSOR_COLUMN;
use crate::domain::model::{FileStructures, RejectReason, Table};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::collections::HashSet;

pub const DEFAULT_NULL_FILL: &str = "-1";

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d_%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub cursor_column: String,
    pub null_fill: String,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            cursor_column: DEFAULT_CURSOR_COLUMN.to_string(),
            null_fill: DEFAULT_NULL_FILL.to_string(),
        }
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

/// `None` when the table can be staged, otherwise why it goes to the error bucket.
pub fn check_structure(table: &Table, structures: &FileStructures) -> Option<RejectReason> {
    if table.is_empty() {
        return Some(RejectReason::Empty);
    }

    let required = structures
        .lookup(&table.name)
        .map(|(_, structure)| structure.required_columns.as_slice())
        .unwrap_or_default();

    let missing: Vec<String> = required
        .iter()
        .filter(|col| table.column_index(col).is_none())
        .cloned()
        .collect();

    if missing.is_empty() {
        None
    } else {
        Some(RejectReason::MissingColumns(missing))
    }
}

/// ASCII 控制字元 (0x00-0x1F, 0x7F) 一律換成空白
pub fn replace_non_printable(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii_control() { ' ' } else { c })
        .collect()
}

/// Cleans rows in place and returns the table with the newest cursor value
/// seen, which becomes the next checkpoint.
pub fn clean_table(mut table: Table, options: &CleanOptions) -> (Table, Option<NaiveDateTime>) {
    let cursor_idx = table.column_index(&options.cursor_column);
    let mut newest: Option<NaiveDateTime> = None;

    for row in table.rows.iter_mut() {
        for (idx, cell) in row.iter_mut().enumerate() {
            let cleaned = cell
                .as_deref()
                .map(replace_non_printable)
                .filter(|text| !text.trim().is_empty())
                .unwrap_or_else(|| options.null_fill.clone());

            *cell = if Some(idx) == cursor_idx {
                // 無法解析的時間欄位視為空值
                parse_timestamp(&cleaned).map(|ts| {
                    newest = newest.max(Some(ts));
                    format_timestamp(ts)
                })
            } else {
                Some(cleaned)
            };
        }
    }

    let before = table.rows.len();
    let mut seen = HashSet::with_capacity(before);
    table.rows.retain(|row| seen.insert(row.clone()));

    if before != table.rows.len() {
        tracing::debug!(
            "Dropped {} duplicate rows from {}",
            before - table.rows.len(),
            table.name
        );
    }

    (table, newest)
}
