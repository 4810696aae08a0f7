/// Column names recognised in the source header
pub const QUANTITY_COLUMN: &str = "Quantity";
pub const UNIT_PRICE_COLUMN: &str = "UnitPrice";
pub const CUSTOMER_ID_COLUMN: &str = "CustomerID";

/// Derived column appended by the revenue stage
pub const REVENUE_COLUMN: &str = "Revenue";

// Defaults used when neither the config file nor the CLI supplies a value
pub const DEFAULT_INPUT_FILE: &str = "Online_Retail_Data_Set.xlsx";
pub const DEFAULT_OUTPUT_FILE: &str = "Online_Retail_Data_Set_Cleaned.csv";
pub const DEFAULT_BACKUP_DIR: &str = "backups";
pub const DEFAULT_LOG_DIR: &str = ".";
pub const LOG_FILE_NAME: &str = "data_cleanup.log";

pub const DEFAULT_OUTLIER_CAP: f64 = 0.99;

/// Revenue is always capped at this quantile; it is not configurable
pub const REVENUE_CAP_QUANTILE: f64 = 0.99;

/// Below this much available memory the resource check warns
pub const LOW_MEMORY_THRESHOLD_GB: f64 = 0.5;

pub const BACKUP_PREFIX: &str = "backup_";
pub const BACKUP_EXTENSION: &str = "csv.gz";
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Extensions read through calamine
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];
pub const CSV_EXTENSION: &str = "csv";
