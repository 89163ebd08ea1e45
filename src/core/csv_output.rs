use crate::domain::model::Table;
use crate::utils::error::Result;

pub fn to_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.columns)?;

    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }

    writer.into_inner().map_err(|e| e.into_error().into())
}

/// Reads a staged CSV back; empty fields come back as `None`.
pub fn from_csv(name: &str, data: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(data);

    let columns = reader.headers()?.iter().map(str::to_string).collect();
    let mut table = Table::new(name, columns);

    for record in reader.records() {
        let record = record?;
        table.rows.push(
            record
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_string()))
                .collect(),
        );
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_csv_writes_header_and_quotes() {
        let mut table = Table::new("orders", vec!["id".to_string(), "note".to_string()]);
        table.rows.push(vec![Some("1".to_string()), Some("a, b".to_string())]);
        table.rows.push(vec![Some("2".to_string()), None]);

        let csv = String::from_utf8(to_csv(&table).unwrap()).unwrap();
        assert_eq!(csv, "id,note\n1,\"a, b\"\n2,\n");
    }

    #[test]
    fn test_from_csv_reads_header_only_file_as_empty() {
        let table = from_csv("orders.csv", b"id,note\n").unwrap();
        assert_eq!(table.columns, vec!["id", "note"]);
        assert!(table.is_empty());
    }
}
