use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Session configuration persisted under the `settings` key.
///
/// Field names on the wire are `skuColumn`, `saveColumns` and `lists` so
/// settings written by earlier sessions keep loading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Column that uniquely identifies a staged record
    #[serde(default)]
    pub sku_column: String,
    /// Columns copied into the staged set, in export order
    #[serde(default)]
    pub save_columns: Vec<String>,
    /// Auxiliary list names
    #[serde(default)]
    pub lists: Vec<String>,
}

impl Settings {
    /// Defaults for a freshly discovered column set: first column is the key,
    /// every column is saved.
    pub fn for_columns(columns: &[String]) -> Self {
        Self {
            sku_column: columns.first().cloned().unwrap_or_default(),
            save_columns: columns.to_vec(),
            lists: Vec::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.sku_column.is_empty() && !self.save_columns.is_empty()
    }

    /// Settings to use after importing a catalog with `columns`, keeping as
    /// much of `self` as still applies.
    ///
    /// The key column survives only if the new catalog has it. Save columns
    /// are narrowed to the ones the catalog has; if none remain, all
    /// discovered columns are saved. Lists are always kept.
    pub fn reconciled_with(&self, columns: &[String]) -> Self {
        let defaults = Self::for_columns(columns);

        if self.sku_column.is_empty() || !columns.contains(&self.sku_column) {
            return Self {
                lists: self.lists.clone(),
                ..defaults
            };
        }

        let save_columns: Vec<String> = self
            .save_columns
            .iter()
            .filter(|column| columns.contains(column))
            .cloned()
            .collect();

        let mut next = Self {
            sku_column: self.sku_column.clone(),
            save_columns: if save_columns.is_empty() {
                defaults.save_columns
            } else {
                save_columns
            },
            lists: self.lists.clone(),
        };
        next.ensure_key_saved();
        next
    }

    /// Staged records are deduplicated on the key column, so it is always
    /// one of the saved columns.
    fn ensure_key_saved(&mut self) {
        if !self.sku_column.is_empty() && !self.save_columns.contains(&self.sku_column) {
            self.save_columns.insert(0, self.sku_column.clone());
        }
    }

    pub fn set_key_column(&mut self, column: &str, headers: &[String]) -> Result<(), ValidationError> {
        if !headers.iter().any(|h| h == column) {
            return Err(ValidationError::UnknownColumn(column.to_string()));
        }
        self.sku_column = column.to_string();
        self.ensure_key_saved();
        Ok(())
    }

    /// Add `column` to the save set if absent, remove it if present.
    /// Returns true when the column is saved afterwards. The key column
    /// cannot be removed.
    pub fn toggle_save_column(&mut self, column: &str, headers: &[String]) -> Result<bool, ValidationError> {
        if !headers.iter().any(|h| h == column) {
            return Err(ValidationError::UnknownColumn(column.to_string()));
        }
        if column == self.sku_column {
            return Err(ValidationError::KeyColumnRequired(column.to_string()));
        }
        if let Some(pos) = self.save_columns.iter().position(|c| c == column) {
            self.save_columns.remove(pos);
            Ok(false)
        } else {
            self.save_columns.push(column.to_string());
            Ok(true)
        }
    }

    /// Returns false if the list already existed.
    pub fn add_list(&mut self, name: &str) -> Result<bool, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyListName);
        }
        if self.lists.iter().any(|l| l == name) {
            return Ok(false);
        }
        self.lists.push(name.to_string());
        Ok(true)
    }

    pub fn remove_list(&mut self, name: &str) -> bool {
        let before = self.lists.len();
        self.lists.retain(|l| l != name.trim());
        self.lists.len() != before
    }
}
