use crate::core::SourceDatabase;
use crate::domain::model::Table;
use crate::utils::error::{EtlError, Result};
use serde_json::{Map, Value};
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Postgres source. Rows come back as `row_to_json` text so any table can be
/// read without knowing its column types, with column order preserved.
#[derive(Clone)]
pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }
}

fn cell_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

pub(crate) fn table_from_json_rows(name: &str, rows: Vec<Map<String, Value>>) -> Table {
    let columns: Vec<String> = rows
        .first()
        .map(|row| row.keys().cloned().collect())
        .unwrap_or_default();

    let mut table = Table::new(name, columns);
    for mut row in rows {
        let cells = table
            .columns
            .iter()
            .map(|col| row.remove(col).and_then(cell_text))
            .collect();
        table.rows.push(cells);
    }
    table
}

impl SourceDatabase for PgSource {
    async fn fetch(&self, table: &str, query: &str) -> Result<Table> {
        let wrapped = format!(
            "SELECT row_to_json(src)::text FROM ({}) AS src",
            query.trim().trim_end_matches(';')
        );

        let raw_rows: Vec<String> = sqlx::query_scalar(&wrapped).fetch_all(&self.pool).await?;

        let rows = raw_rows
            .iter()
            .map(|raw| -> Result<Map<String, Value>> {
                match serde_json::from_str::<Value>(raw)? {
                    Value::Object(map) => Ok(map),
                    other => Err(EtlError::SourceError {
                        message: format!("expected a JSON object per row, got {}", other),
                    }),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!("Fetched {} rows from {}", rows.len(), table);
        Ok(table_from_json_rows(table, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_table_from_json_rows_keeps_column_order() {
        let rows = vec![
            object(json!({"id": 1, "name": "Latte", "price": 4.5, "created_at": "2024-01-01T10:00:00"})),
            object(json!({"id": 2, "name": null, "price": 3, "created_at": "2024-01-02T10:00:00"})),
        ];

        let table = table_from_json_rows("menu_items", rows);

        assert_eq!(table.columns, vec!["id", "name", "price", "created_at"]);
        assert_eq!(
            table.rows[0],
            vec![
                Some("1".to_string()),
                Some("Latte".to_string()),
                Some("4.5".to_string()),
                Some("2024-01-01T10:00:00".to_string())
            ]
        );
        assert_eq!(table.rows[1][1], None);
    }

    #[test]
    fn test_table_from_no_rows_is_empty() {
        let table = table_from_json_rows("menu_items", vec![]);
        assert!(table.columns.is_empty());
        assert!(table.is_empty());
    }
}
