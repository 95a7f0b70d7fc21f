//! Inventory staging pipeline: catalog import, lookup, staging, merge and export.
//!
//! `InventoryStagingPipeline` owns the in-memory catalog, staged set and
//! settings for one session. Every mutation is computed on a copy, persisted,
//! and only then committed, so a failed write leaves the session as it was.

pub mod export;
pub mod import;
pub mod margin;
pub mod record;
pub mod settings;
pub mod staging;

use chrono::Utc;
use metrics::counter;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::app::ports::{PrintQueuePort, PrintRequest};
use crate::constants::{MISSING_VALUE_PLACEHOLDER, UNKNOWN_SHELF_ID};
use crate::error::{Result, ValidationError};
use crate::storage::InventoryRepository;

pub use margin::MarginView;
pub use record::Record;
pub use settings::Settings;
pub use staging::{MergeSummary, SearchOutcome, StageOutcome, StagedSet};

/// Catalog import result reported back to the caller
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub rows: usize,
    pub columns: Vec<String>,
    pub settings: Settings,
}

/// Result of a search-and-stage lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResult {
    pub outcome: SearchOutcome,
    /// False when the found record was already staged under its full key
    pub newly_staged: bool,
}

/// A record laid out for display: saved columns with values, plus margins.
#[derive(Debug, Clone)]
pub struct RecordDetail {
    pub fields: Vec<(String, String)>,
    pub margin: Option<MarginView>,
}

pub struct InventoryStagingPipeline {
    repository: InventoryRepository,
    print_queue: Arc<dyn PrintQueuePort>,
    catalog: Vec<Record>,
    headers: Vec<String>,
    staged: StagedSet,
    settings: Settings,
}

impl InventoryStagingPipeline {
    /// Restore a session from storage.
    ///
    /// Each key loads independently: a corrupt value is logged and treated
    /// as absent without affecting the others.
    pub fn open(repository: InventoryRepository, print_queue: Arc<dyn PrintQueuePort>) -> Self {
        let catalog = repository.load_catalog().unwrap_or_else(|e| {
            warn!("Failed to load inventory from storage: {}", e);
            None
        });
        let staged = repository.load_staged().unwrap_or_else(|e| {
            warn!("Failed to load new inventory from storage: {}", e);
            None
        });
        let stored_settings = repository.load_settings().unwrap_or_else(|e| {
            warn!("Failed to load settings from storage: {}", e);
            None
        });

        let catalog = catalog.unwrap_or_default();
        let headers: Vec<String> = catalog
            .first()
            .map(|record| record.columns().map(str::to_string).collect())
            .unwrap_or_default();
        let settings = match stored_settings {
            Some(settings) => settings,
            None => Settings::for_columns(&headers),
        };
        let staged = staged.unwrap_or_default();

        info!(
            "Session restored: {} catalog rows, {} staged items",
            catalog.len(),
            staged.len()
        );

        Self {
            repository,
            print_queue,
            catalog,
            headers,
            staged,
            settings,
        }
    }

    pub fn catalog(&self) -> &[Record] {
        &self.catalog
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn staged(&self) -> &StagedSet {
        &self.staged
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the catalog with the contents of `text`.
    ///
    /// With `preserve_settings` the current key and saved columns are kept
    /// where the new columns allow; otherwise they reset to the defaults.
    /// Lists always survive.
    #[instrument(skip(self, text))]
    pub fn import_catalog(&mut self, text: &str, preserve_settings: bool) -> Result<ImportSummary> {
        let baseline = if preserve_settings {
            self.settings.clone()
        } else {
            Settings {
                lists: self.settings.lists.clone(),
                ..Settings::default()
            }
        };
        let outcome = import::import_catalog(text, Some(&baseline))?;

        // Settings first; put back if the catalog write fails
        self.repository.save_settings(&outcome.settings)?;
        if let Err(e) = self.repository.save_catalog(&outcome.catalog) {
            if let Err(restore) = self.repository.save_settings(&self.settings) {
                warn!("Failed to restore settings after catalog write failure: {}", restore);
            }
            return Err(e);
        }

        counter!("inventory_imports_total").increment(1);
        info!(
            "Main inventory loaded: {} rows, {} columns",
            outcome.catalog.len(),
            outcome.columns.len()
        );

        let summary = ImportSummary {
            rows: outcome.catalog.len(),
            columns: outcome.columns.clone(),
            settings: outcome.settings.clone(),
        };
        self.catalog = outcome.catalog;
        self.headers = outcome.columns;
        self.settings = outcome.settings;
        Ok(summary)
    }

    pub fn search(&self, query: &str) -> Result<SearchOutcome> {
        Ok(staging::search(
            &self.catalog,
            &self.staged,
            &self.settings.sku_column,
            query,
        )?)
    }

    /// Search, and stage the record when the catalog has a match.
    #[instrument(skip(self))]
    pub fn lookup(&mut self, query: &str) -> Result<LookupResult> {
        let outcome = self.search(query)?;
        let newly_staged = match &outcome {
            SearchOutcome::Found(record) => {
                matches!(self.stage(record)?, StageOutcome::Added(_))
            }
            SearchOutcome::AlreadyStaged => {
                warn!("Item with key '{}' already exists in new inventory", query);
                false
            }
            SearchOutcome::NotFound => {
                info!("No product found for '{}'", query);
                false
            }
        };
        Ok(LookupResult {
            outcome,
            newly_staged,
        })
    }

    /// Copy a record into the staged set using the saved columns.
    pub fn stage(&mut self, record: &Record) -> Result<StageOutcome> {
        self.require_configured()?;
        let mut next = self.staged.clone();
        let outcome = next.stage(record, &self.settings.save_columns, &self.settings.sku_column);
        self.commit_staged_outcome(next, &outcome, "lookup")?;
        Ok(outcome)
    }

    #[instrument(skip(self, fields))]
    pub fn create_record(&mut self, fields: &Record) -> Result<StageOutcome> {
        self.require_configured()?;
        let mut next = self.staged.clone();
        let outcome = next.create(fields, &self.settings.save_columns, &self.settings.sku_column)?;
        self.commit_staged_outcome(next, &outcome, "create")?;
        Ok(outcome)
    }

    #[instrument(skip(self, patch))]
    pub fn edit(&mut self, target: &str, patch: &Record) -> Result<()> {
        self.require_key_column()?;
        let mut next = self.staged.clone();
        next.edit(&self.settings.sku_column, target, patch)?;
        self.repository.save_staged(&next)?;
        self.staged = next;
        info!("Item '{}' updated", target);
        Ok(())
    }

    /// Delete every staged record keyed `target`. Deleting an absent key
    /// changes nothing and returns 0.
    #[instrument(skip(self))]
    pub fn delete(&mut self, target: &str) -> Result<usize> {
        self.require_key_column()?;
        let mut next = self.staged.clone();
        let removed = next.delete(&self.settings.sku_column, target);
        self.repository.save_staged(&next)?;
        self.staged = next;
        info!("Deleted {} item(s) with key '{}'", removed, target);
        Ok(removed)
    }

    /// Merge a previously exported staged-set CSV into the session.
    #[instrument(skip(self, text))]
    pub fn merge_import(&mut self, text: &str) -> Result<MergeSummary> {
        self.require_configured()?;
        let parsed = import::parse_csv(text)?;

        let mut next = self.staged.clone();
        let summary = next.merge_import(
            &parsed.rows,
            &parsed.columns,
            &self.settings.save_columns,
            &self.settings.sku_column,
        )?;
        self.repository.save_staged(&next)?;
        self.staged = next;

        counter!("inventory_merge_rows_total", "result" => "added").increment(summary.added.len() as u64);
        counter!("inventory_merge_rows_total", "result" => "duplicate").increment(summary.duplicates as u64);
        counter!("inventory_merge_rows_total", "result" => "blank_key").increment(summary.blank_keys as u64);
        if summary.duplicates > 0 {
            warn!("Skipped {} rows already in new inventory", summary.duplicates);
        }
        info!(
            "Merged {} rows into new inventory ({} staged)",
            summary.added.len(),
            self.staged.len()
        );

        for record in &summary.added {
            self.notify(record);
        }
        Ok(summary)
    }

    /// Staged set as CSV text, columns in saved order.
    pub fn export(&self) -> Result<String> {
        export::export_csv(self.staged.records(), &self.settings.save_columns)
    }

    /// Write the export to `path`. An empty staged set is refused.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn download(&self, path: &Path) -> Result<()> {
        if self.staged.is_empty() {
            return Err(ValidationError::NothingToExport.into());
        }
        let text = self.export()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        info!("New inventory downloaded as CSV ({} items)", self.staged.len());
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.repository.clear_staged()?;
        self.staged = StagedSet::new();
        info!("New inventory cleared");
        Ok(())
    }

    pub fn set_key_column(&mut self, column: &str) -> Result<()> {
        let mut next = self.settings.clone();
        next.set_key_column(column, &self.headers)?;
        self.commit_settings(next)
    }

    /// Returns true when the column is saved afterwards.
    pub fn toggle_save_column(&mut self, column: &str) -> Result<bool> {
        let mut next = self.settings.clone();
        let saved = next.toggle_save_column(column, &self.headers)?;
        self.commit_settings(next)?;
        Ok(saved)
    }

    pub fn add_list(&mut self, name: &str) -> Result<bool> {
        let mut next = self.settings.clone();
        let added = next.add_list(name)?;
        self.commit_settings(next)?;
        Ok(added)
    }

    pub fn remove_list(&mut self, name: &str) -> Result<bool> {
        let mut next = self.settings.clone();
        let removed = next.remove_list(name);
        self.commit_settings(next)?;
        Ok(removed)
    }

    /// Saved columns of `record` for display, with the margin view if the
    /// record carries a usable cost.
    pub fn detail(&self, record: &Record) -> RecordDetail {
        let fields = self
            .settings
            .save_columns
            .iter()
            .map(|column| {
                let value = match record.get(column) {
                    Some(v) if !v.is_empty() => v.to_string(),
                    _ => MISSING_VALUE_PLACEHOLDER.to_string(),
                };
                (column.clone(), value)
            })
            .collect();
        RecordDetail {
            fields,
            margin: MarginView::for_record(record),
        }
    }

    fn require_key_column(&self) -> Result<()> {
        if self.settings.sku_column.is_empty() {
            return Err(ValidationError::NotConfigured.into());
        }
        Ok(())
    }

    fn require_configured(&self) -> Result<()> {
        if !self.settings.is_configured() {
            return Err(ValidationError::NotConfigured.into());
        }
        Ok(())
    }

    fn commit_staged_outcome(&mut self, next: StagedSet, outcome: &StageOutcome, source: &'static str) -> Result<()> {
        match outcome {
            StageOutcome::Added(record) => {
                self.repository.save_staged(&next)?;
                self.staged = next;
                counter!("inventory_records_staged_total", "source" => source).increment(1);
                info!(
                    "Added '{}' to new inventory",
                    record.value(&self.settings.sku_column)
                );
                self.notify(record);
            }
            StageOutcome::Duplicate => {
                counter!("inventory_duplicates_skipped_total", "source" => source).increment(1);
                warn!("Item already exists in new inventory");
            }
        }
        Ok(())
    }

    fn commit_settings(&mut self, next: Settings) -> Result<()> {
        self.repository.save_settings(&next)?;
        self.settings = next;
        info!("Settings saved");
        Ok(())
    }

    /// Fire-and-forget label request for a newly staged record
    fn notify(&self, record: &Record) {
        let request = PrintRequest {
            sku: record.value(&self.settings.sku_column).to_string(),
            shelf_id: UNKNOWN_SHELF_ID.to_string(),
            queued_at: Utc::now(),
        };
        if let Err(e) = self.print_queue.enqueue(&request) {
            warn!("Failed to queue print request for '{}': {}", request.sku, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::KeyValueStore;
    use crate::constants::{CATALOG_KEY, STAGED_KEY};
    use crate::error::{ImportError, InventoryError};
    use crate::infra::{InMemoryKeyValueStore, InMemoryPrintQueue};

    const CATALOG_CSV: &str = "sku,Name,Price,Cost\nA1,Widget,$10.00,$4.00\nA10,Big Widget,$20.00,$9.00\nB2,Gadget,$3.00,$1.00\n";

    struct Harness {
        store: Arc<InMemoryKeyValueStore>,
        queue: Arc<InMemoryPrintQueue>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: Arc::new(InMemoryKeyValueStore::new()),
                queue: Arc::new(InMemoryPrintQueue::new()),
            }
        }

        fn open(&self) -> InventoryStagingPipeline {
            InventoryStagingPipeline::open(
                InventoryRepository::new(self.store.clone()),
                self.queue.clone(),
            )
        }
    }

    /// Store whose writes to one key always fail
    struct FailingKeyStore {
        inner: InMemoryKeyValueStore,
        failing_key: &'static str,
    }

    impl KeyValueStore for FailingKeyStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == self.failing_key {
                return Err(InventoryError::Storage(format!("write to '{}' refused", key)));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    fn fields(pairs: &[(&str, &str)]) -> Record {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_lookup_stages_and_notifies() {
        let harness = Harness::new();
        let mut pipeline = harness.open();
        pipeline.import_catalog(CATALOG_CSV, false).unwrap();

        let result = pipeline.lookup("a1").unwrap();
        assert!(result.newly_staged);
        assert!(matches!(result.outcome, SearchOutcome::Found(ref r) if r.value("sku") == "A1"));

        let again = pipeline.lookup("A1").unwrap();
        assert_eq!(again.outcome, SearchOutcome::AlreadyStaged);
        assert!(!again.newly_staged);

        let requests = harness.queue.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].sku, "A1");
        assert_eq!(requests[0].shelf_id, "unknown");
    }

    #[test]
    fn test_substring_match_of_staged_key_is_duplicate() {
        let harness = Harness::new();
        let mut pipeline = harness.open();
        pipeline.import_catalog(CATALOG_CSV, false).unwrap();
        pipeline.lookup("A1").unwrap();

        // "a" is not an exact staged key, finds A1 in the catalog, which is staged
        let result = pipeline.lookup("a").unwrap();
        assert!(matches!(result.outcome, SearchOutcome::Found(_)));
        assert!(!result.newly_staged);
        assert_eq!(pipeline.staged().len(), 1);
    }

    #[test]
    fn test_session_restores_from_storage() {
        let harness = Harness::new();
        {
            let mut pipeline = harness.open();
            pipeline.import_catalog(CATALOG_CSV, false).unwrap();
            pipeline.toggle_save_column("Cost").unwrap();
            pipeline.add_list("front").unwrap();
            pipeline.lookup("B2").unwrap();
        }

        let pipeline = harness.open();
        assert_eq!(pipeline.catalog().len(), 3);
        assert_eq!(pipeline.headers(), ["sku", "Name", "Price", "Cost"]);
        assert_eq!(pipeline.settings().save_columns, ["sku", "Name", "Price"]);
        assert_eq!(pipeline.settings().lists, ["front"]);
        assert_eq!(pipeline.staged().records()[0], fields(&[("sku", "B2"), ("Name", "Gadget"), ("Price", "$3.00")]));
    }

    #[test]
    fn test_corrupt_staged_value_does_not_block_catalog() {
        let harness = Harness::new();
        harness.open().import_catalog(CATALOG_CSV, false).unwrap();
        harness.store.set(STAGED_KEY, "{broken").unwrap();

        let pipeline = harness.open();
        assert_eq!(pipeline.catalog().len(), 3);
        assert!(pipeline.staged().is_empty());
    }

    #[test]
    fn test_create_without_key_leaves_set_empty() {
        let harness = Harness::new();
        let mut pipeline = harness.open();
        pipeline.import_catalog(CATALOG_CSV, false).unwrap();

        let err = pipeline.create_record(&fields(&[("Name", "Nameless")])).unwrap_err();
        assert!(matches!(
            err,
            InventoryError::Validation(ValidationError::MissingKey(ref col)) if col == "sku"
        ));
        assert!(pipeline.staged().is_empty());
        assert_eq!(harness.store.get(STAGED_KEY).unwrap(), None);
        assert!(harness.queue.requests().is_empty());
    }

    #[test]
    fn test_staging_requires_configuration() {
        let harness = Harness::new();
        let mut pipeline = harness.open();

        let err = pipeline.merge_import("sku\nA1\n").unwrap_err();
        assert!(matches!(err, InventoryError::Validation(ValidationError::NotConfigured)));
        let err = pipeline.create_record(&fields(&[("sku", "A1")])).unwrap_err();
        assert!(matches!(err, InventoryError::Validation(ValidationError::NotConfigured)));
    }

    #[test]
    fn test_merge_rejection_keeps_staged_set() {
        let harness = Harness::new();
        let mut pipeline = harness.open();
        pipeline.import_catalog(CATALOG_CSV, false).unwrap();
        pipeline.lookup("A1").unwrap();
        let before = pipeline.staged().clone();

        let err = pipeline.merge_import("sku,Name\nZ9,Zed\n").unwrap_err();
        match err {
            InventoryError::Validation(ValidationError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["Price".to_string(), "Cost".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(pipeline.staged(), &before);

        let err = pipeline.merge_import("").unwrap_err();
        assert!(matches!(err, InventoryError::Import(ImportError::NoHeaders)));
    }

    #[test]
    fn test_edit_fills_column_saved_after_staging() {
        let harness = Harness::new();
        let mut pipeline = harness.open();
        pipeline.import_catalog("sku,Name,Bin\nA1,Widget,4\n", false).unwrap();
        pipeline.toggle_save_column("Bin").unwrap();
        pipeline.lookup("A1").unwrap();
        pipeline.toggle_save_column("Bin").unwrap();

        pipeline.edit("A1", &fields(&[("Bin", "9")])).unwrap();
        assert_eq!(pipeline.export().unwrap(), "sku,Name,Bin\nA1,Widget,9\n");
    }

    #[test]
    fn test_failed_catalog_write_keeps_stored_settings() {
        let store = Arc::new(FailingKeyStore {
            inner: InMemoryKeyValueStore::new(),
            failing_key: CATALOG_KEY,
        });
        let previous = Settings {
            sku_column: "code".to_string(),
            save_columns: vec!["code".to_string()],
            lists: Vec::new(),
        };
        let repository = InventoryRepository::new(store.clone());
        repository.save_settings(&previous).unwrap();
        let mut pipeline = InventoryStagingPipeline::open(repository.clone(), Arc::new(InMemoryPrintQueue::new()));

        let err = pipeline.import_catalog(CATALOG_CSV, false).unwrap_err();
        assert!(matches!(err, InventoryError::Storage(_)));
        assert_eq!(repository.load_settings().unwrap(), Some(previous.clone()));
        assert_eq!(pipeline.settings(), &previous);
        assert!(pipeline.catalog().is_empty());
    }

    #[test]
    fn test_import_resets_or_preserves_settings() {
        let harness = Harness::new();
        let mut pipeline = harness.open();
        pipeline.import_catalog(CATALOG_CSV, false).unwrap();
        pipeline.set_key_column("Name").unwrap();
        pipeline.toggle_save_column("Cost").unwrap();

        let kept = pipeline.import_catalog(CATALOG_CSV, true).unwrap();
        assert_eq!(kept.settings.sku_column, "Name");
        assert_eq!(kept.settings.save_columns, ["sku", "Name", "Price"]);

        let reset = pipeline.import_catalog(CATALOG_CSV, false).unwrap();
        assert_eq!(reset.settings.sku_column, "sku");
        assert_eq!(reset.settings.save_columns, ["sku", "Name", "Price", "Cost"]);
    }

    #[test]
    fn test_detail_shows_placeholder_and_margin() {
        let harness = Harness::new();
        let mut pipeline = harness.open();
        pipeline.import_catalog("sku,Name,Price,Cost\nA1,,$10.00,$4.00\n", false).unwrap();

        let record = pipeline.catalog()[0].clone();
        let detail = pipeline.detail(&record);
        assert_eq!(detail.fields[1], ("Name".to_string(), "N/A".to_string()));
        let margin = detail.margin.unwrap();
        assert_eq!(format!("{:.2}", margin.margin), "6.00");
    }

    #[test]
    fn test_download_refuses_empty_set() {
        let harness = Harness::new();
        let mut pipeline = harness.open();
        pipeline.import_catalog(CATALOG_CSV, false).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new_inventory.csv");
        let err = pipeline.download(&path).unwrap_err();
        assert!(matches!(err, InventoryError::Validation(ValidationError::NothingToExport)));
        assert!(!path.exists());

        pipeline.lookup("B2").unwrap();
        pipeline.download(&path).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "sku,Name,Price,Cost\nB2,Gadget,$3.00,$1.00\n"
        );
    }
}
