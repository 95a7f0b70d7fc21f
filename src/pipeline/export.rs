use csv::WriterBuilder;

use super::record::Record;
use crate::error::{InventoryError, Result};

/// Serialize `records` as CSV with a header row of `columns`, in that order.
/// Columns a record lacks are written as empty fields.
pub fn export_csv(records: &[Record], columns: &[String]) -> Result<String> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());

    writer.write_record(columns)?;
    for record in records {
        writer.write_record(columns.iter().map(|column| record.value(column)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| InventoryError::Storage(format!("Failed to flush CSV writer: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| InventoryError::Storage(format!("CSV output is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::import::import_catalog;
    use crate::pipeline::settings::Settings;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_export_uses_column_order() {
        let records = vec![[("sku", "A1"), ("name", "Widget")].into_iter().collect::<Record>()];

        let text = export_csv(&records, &cols(&["sku", "name"])).unwrap();
        assert_eq!(text, "sku,name\nA1,Widget\n");

        let text = export_csv(&records, &cols(&["name", "sku", "bin"])).unwrap();
        assert_eq!(text, "name,sku,bin\nWidget,A1,\n");
    }

    #[test]
    fn test_export_then_import_round_trips() {
        let columns = cols(&["sku", "Name", "Note"]);
        let staged: Vec<Record> = vec![
            [("sku", "A1"), ("Name", "Widget, large"), ("Note", "say \"hi\"")]
                .into_iter()
                .collect(),
            [("sku", "B2"), ("Name", ""), ("Note", "line one\nline two")]
                .into_iter()
                .collect(),
        ];

        let text = export_csv(&staged, &columns).unwrap();
        let preserved = Settings {
            sku_column: "sku".to_string(),
            save_columns: columns.clone(),
            lists: Vec::new(),
        };
        let outcome = import_catalog(&text, Some(&preserved)).unwrap();

        let restored: Vec<Record> = outcome
            .catalog
            .iter()
            .map(|record| record.project(&outcome.settings.save_columns))
            .collect();
        assert_eq!(restored, staged);
    }
}
