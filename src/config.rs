//! Configuration for opsledger
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

/// Main configuration for an opsledger instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the CLI snapshot and import spool files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── ledger.json      (collection snapshot)
    ///     └── spool/           (uploaded files awaiting import)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Allocation Configuration
    // -------------------------------------------------------------------------
    /// Attempts per allocate-and-insert cycle before a conflict is surfaced
    pub alloc_max_retries: usize,

    /// Minimum digit width of the sequence part ("001"; width grows past it)
    pub sequence_width: usize,

    // -------------------------------------------------------------------------
    // Import Configuration
    // -------------------------------------------------------------------------
    /// Max rows accepted in one bulk import
    pub import_max_rows: usize,

    // -------------------------------------------------------------------------
    // Registration Configuration
    // -------------------------------------------------------------------------
    /// Hard cap on non-super users
    pub employee_limit: usize,

    /// Trial subscription window in days
    pub trial_days: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./opsledger_data"),
            alloc_max_retries: 5,
            sequence_width: 3,
            import_max_rows: 10_000,
            employee_limit: 100,
            trial_days: 7,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (snapshot + import spool)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the number of allocate-and-insert attempts before giving up
    pub fn alloc_max_retries(mut self, attempts: usize) -> Self {
        self.config.alloc_max_retries = attempts;
        self
    }

    /// Set the minimum sequence digit width
    pub fn sequence_width(mut self, width: usize) -> Self {
        self.config.sequence_width = width;
        self
    }

    /// Set the max row count per bulk import
    pub fn import_max_rows(mut self, rows: usize) -> Self {
        self.config.import_max_rows = rows;
        self
    }

    /// Set the non-super user cap
    pub fn employee_limit(mut self, limit: usize) -> Self {
        self.config.employee_limit = limit;
        self
    }

    /// Set the trial subscription window (days)
    pub fn trial_days(mut self, days: u64) -> Self {
        self.config.trial_days = days;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
