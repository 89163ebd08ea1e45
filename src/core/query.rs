use crate::core::clean::format_timestamp;
use crate::utils::error::Result;
use crate::utils::validation::validate_identifier;
use chrono::NaiveDateTime;

pub const DEFAULT_CURSOR_COLUMN: &str = "created_at";

/// Builds the extraction query for `table`, bounded by `since` when a
/// checkpoint exists. Newest rows first.
pub fn incremental_query(
    table: &str,
    cursor_column: &str,
    since: Option<NaiveDateTime>,
) -> Result<String> {
    validate_identifier("table", table)?;
    validate_identifier("cursor_column", cursor_column)?;

    let query = match since {
        Some(ts) => format!(
            "SELECT * FROM {table} WHERE {cursor_column} > '{}'::timestamp ORDER BY {cursor_column} DESC;",
            format_timestamp(ts)
        ),
        None => format!("SELECT * FROM {table} ORDER BY {cursor_column} DESC;"),
    };

    Ok(query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_query_without_checkpoint_is_unbounded() {
        let query = incremental_query("orders", DEFAULT_CURSOR_COLUMN, None).unwrap();
        assert_eq!(query, "SELECT * FROM orders ORDER BY created_at DESC;");
    }

    #[test]
    fn test_query_with_checkpoint_is_bounded() {
        let since = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        let query = incremental_query("sales.orders", "updated_at", Some(since)).unwrap();
        assert_eq!(
            query,
            "SELECT * FROM sales.orders WHERE updated_at > '2024-03-01 12:30:00'::timestamp ORDER BY updated_at DESC;"
        );
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        assert!(incremental_query("orders; DELETE FROM orders", "created_at", None).is_err());
        assert!(incremental_query("orders", "created_at DESC --", None).is_err());
    }
}
