use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A single inventory row: column name to string value.
///
/// Columns keep the order they were first inserted in, which is the header
/// order of the CSV the record came from. That order survives a JSON round
/// trip so headers restored from storage match the uploaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Exact match first, then the first column equal ignoring ASCII case.
    pub fn get_ignore_case(&self, column: &str) -> Option<&str> {
        self.get(column).or_else(|| {
            self.fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(column))
                .map(|(_, value)| value.as_str())
        })
    }

    /// Value of `column`, or the empty string when the record lacks it.
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// Set a column, keeping its position if it already exists.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy of this record carrying exactly `columns`, in that order.
    /// Columns the record does not have come out as empty strings.
    pub fn project(&self, columns: &[String]) -> Record {
        columns
            .iter()
            .map(|column| (column.clone(), self.value(column).to_string()))
            .collect()
    }

    /// Overwrite fields with those in `patch`; fields not in the patch are kept.
    pub fn apply_patch(&mut self, patch: &Record) {
        for (column, value) in patch.iter() {
            self.set(column, value);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Record {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RecordVisitor)
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = Record;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an object of column names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Record, A::Error> {
        let mut record = Record::new();
        while let Some((column, value)) = access.next_entry::<String, serde_json::Value>()? {
            record.set(column, normalize_value(value));
        }
        Ok(record)
    }
}

/// Stored values are expected to be strings, but older data may hold
/// numbers, booleans or nulls.
fn normalize_value(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_keeps_column_order() {
        let record: Record = [("sku", "A1"), ("Name", "Widget"), ("Cost", "4.00")]
            .into_iter()
            .collect();

        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"sku":"A1","Name":"Widget","Cost":"4.00"}"#);

        let restored: Record = serde_json::from_str(&json).unwrap();
        let columns: Vec<&str> = restored.columns().collect();
        assert_eq!(columns, vec!["sku", "Name", "Cost"]);
    }

    #[test]
    fn test_non_string_values_are_normalized() {
        let restored: Record =
            serde_json::from_value(json!({"sku": 42, "active": true, "note": null})).unwrap();

        assert_eq!(restored.value("sku"), "42");
        assert_eq!(restored.value("active"), "true");
        assert_eq!(restored.value("note"), "");
    }

    #[test]
    fn test_project_fills_missing_columns() {
        let record: Record = [("sku", "A1"), ("Name", "Widget"), ("Bin", "7")]
            .into_iter()
            .collect();
        let columns = vec!["Name".to_string(), "sku".to_string(), "Price".to_string()];

        let projected = record.project(&columns);
        let pairs: Vec<(&str, &str)> = projected.iter().collect();
        assert_eq!(pairs, vec![("Name", "Widget"), ("sku", "A1"), ("Price", "")]);
    }

    #[test]
    fn test_apply_patch_overwrites_and_preserves() {
        let mut record: Record = [("sku", "A1"), ("Name", "Widget")].into_iter().collect();
        let patch: Record = [("Name", "Gadget"), ("Price", "9.99")].into_iter().collect();

        record.apply_patch(&patch);

        assert_eq!(record.value("sku"), "A1");
        assert_eq!(record.value("Name"), "Gadget");
        assert_eq!(record.value("Price"), "9.99");
    }
}
