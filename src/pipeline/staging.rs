use serde::{Deserialize, Serialize};

use super::record::Record;
use crate::error::ValidationError;

/// Result of looking a query up against the staged set and the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The staged set already holds this key; the catalog was not consulted
    AlreadyStaged,
    /// First catalog record whose key contains the query
    Found(Record),
    /// Nothing matched; the caller may offer to create `{key: query}`
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Added(Record),
    /// A record with the same key is already staged; nothing changed
    Duplicate,
}

/// What a merge-import appended and what it passed over.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub added: Vec<Record>,
    pub duplicates: usize,
    pub blank_keys: usize,
}

/// Look `query` up: staged set first (exact, case-insensitive), then the
/// catalog in order (substring, case-insensitive). The first catalog match
/// wins, so when several rows share a key the earliest one is returned.
pub fn search(
    catalog: &[Record],
    staged: &StagedSet,
    key_column: &str,
    query: &str,
) -> Result<SearchOutcome, ValidationError> {
    if key_column.is_empty() {
        return Err(ValidationError::NotConfigured);
    }
    if query.trim().is_empty() {
        return Err(ValidationError::EmptyQuery);
    }

    let needle = query.to_lowercase();
    if staged
        .iter()
        .any(|record| record.value(key_column).to_lowercase() == needle)
    {
        return Ok(SearchOutcome::AlreadyStaged);
    }

    Ok(catalog
        .iter()
        .find(|record| record.value(key_column).to_lowercase().contains(&needle))
        .cloned()
        .map(SearchOutcome::Found)
        .unwrap_or(SearchOutcome::NotFound))
}

/// The curated working set. Keys are unique: every insert scans for an
/// existing record with the same key value first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagedSet {
    records: Vec<Record>,
}

impl StagedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_key(&self, key_column: &str, key: &str) -> bool {
        self.records.iter().any(|r| r.value(key_column) == key)
    }

    pub fn find(&self, key_column: &str, key: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.value(key_column) == key)
    }

    /// Copy `record` in, keeping only `save_columns`. Ignored when its key
    /// is already staged.
    pub fn stage(&mut self, record: &Record, save_columns: &[String], key_column: &str) -> StageOutcome {
        if self.contains_key(key_column, record.value(key_column)) {
            return StageOutcome::Duplicate;
        }
        let projected = record.project(save_columns);
        self.records.push(projected.clone());
        StageOutcome::Added(projected)
    }

    /// Build a new record from user-entered `fields`. Only `save_columns`
    /// are kept; unspecified ones are empty. The key must be non-blank.
    pub fn create(
        &mut self,
        fields: &Record,
        save_columns: &[String],
        key_column: &str,
    ) -> Result<StageOutcome, ValidationError> {
        if fields.value(key_column).trim().is_empty() {
            return Err(ValidationError::MissingKey(key_column.to_string()));
        }
        Ok(self.stage(fields, save_columns, key_column))
    }

    /// Overwrite fields of the record keyed `target` with `patch`.
    ///
    /// The result is the union of the record's fields and the patch, so a
    /// column saved after the record was staged can still be filled in.
    /// Renaming the key is allowed as long as the new key is non-blank and
    /// unused.
    pub fn edit(&mut self, key_column: &str, target: &str, patch: &Record) -> Result<(), ValidationError> {
        let idx = self
            .records
            .iter()
            .position(|r| r.value(key_column) == target)
            .ok_or_else(|| ValidationError::KeyNotFound(target.to_string()))?;

        if let Some(new_key) = patch.get(key_column) {
            if new_key.trim().is_empty() {
                return Err(ValidationError::MissingKey(key_column.to_string()));
            }
            let taken = self
                .records
                .iter()
                .enumerate()
                .any(|(i, r)| i != idx && r.value(key_column) == new_key);
            if taken {
                return Err(ValidationError::DuplicateKey(new_key.to_string()));
            }
        }

        self.records[idx].apply_patch(patch);
        Ok(())
    }

    /// Remove every record keyed `target`. Returns how many went.
    pub fn delete(&mut self, key_column: &str, target: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.value(key_column) != target);
        before - self.records.len()
    }

    /// Append rows from a previously exported staged set.
    ///
    /// The import must carry every saved column or nothing is merged. Rows
    /// with a blank key or a key already staged (including one added earlier
    /// in the same import) are skipped. Input order is preserved.
    pub fn merge_import(
        &mut self,
        rows: &[Record],
        columns: &[String],
        save_columns: &[String],
        key_column: &str,
    ) -> Result<MergeSummary, ValidationError> {
        let missing: Vec<String> = save_columns
            .iter()
            .filter(|c| !columns.contains(c))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ValidationError::MissingColumns(missing));
        }

        let mut summary = MergeSummary::default();
        for row in rows {
            if row.value(key_column).trim().is_empty() {
                summary.blank_keys += 1;
                continue;
            }
            match self.stage(row, save_columns, key_column) {
                StageOutcome::Added(record) => summary.added.push(record),
                StageOutcome::Duplicate => summary.duplicates += 1,
            }
        }
        Ok(summary)
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl From<Vec<Record>> for StagedSet {
    fn from(records: Vec<Record>) -> Self {
        Self { records }
    }
}
