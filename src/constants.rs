/// Storage keys shared with earlier sessions of the tool.
/// Changing these orphans data written by previous runs.
pub const CATALOG_KEY: &str = "inventoryData";
pub const STAGED_KEY: &str = "newInventory";
pub const SETTINGS_KEY: &str = "settings";

pub const DEFAULT_EXPORT_FILE_NAME: &str = "new_inventory.csv";
pub const DEFAULT_PRINT_QUEUE_FILE: &str = "print_queue.ndjson";
pub const DEFAULT_CONFIG_FILE: &str = "inventory_stager.toml";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Shelf assigned to every print request; shelving happens downstream.
pub const UNKNOWN_SHELF_ID: &str = "unknown";

// Column names the margin view and detail view look for
pub const COST_COLUMN: &str = "Cost";
pub const PRICE_COLUMN: &str = "Price";
pub const NAME_COLUMN: &str = "Name";

/// Markup percentages offered as suggested prices
pub const SUGGESTED_MARKUP_PERCENTS: [u32; 9] = [25, 30, 35, 40, 45, 50, 60, 70, 80];

/// Shown in the detail view for columns a record does not carry
pub const MISSING_VALUE_PLACEHOLDER: &str = "N/A";
