//! Constants used throughout the idoc workspace

// Download tracker grace periods
pub const DEFAULT_SUCCESS_GRACE_MS: u64 = 3_000;
pub const DEFAULT_ERROR_GRACE_MS: u64 = 5_000;

// Idle scheduling
pub const DEFAULT_IDLE_FALLBACK_MS: u64 = 1_000;

// Preloader
pub const DEFAULT_RECENT_DOCUMENTS_LIMIT: usize = 10;
pub const TEMPLATES_CACHE_KEY: &str = "templates";
pub const PROFILE_CACHE_KEY_PREFIX: &str = "profile_";
pub const RECENT_DOCUMENTS_CACHE_KEY_PREFIX: &str = "recent_documents_";

// Environment variable names
pub const IDOC_LOG_VAR: &str = "IDOC_LOG";
pub const IDOC_CONFIG_VAR: &str = "IDOC_CONFIG";
pub const IDOC_SUCCESS_GRACE_MS_VAR: &str = "IDOC_SUCCESS_GRACE_MS";
pub const IDOC_ERROR_GRACE_MS_VAR: &str = "IDOC_ERROR_GRACE_MS";
pub const IDOC_IDLE_FALLBACK_MS_VAR: &str = "IDOC_IDLE_FALLBACK_MS";
pub const IDOC_RECENT_DOCUMENTS_LIMIT_VAR: &str = "IDOC_RECENT_DOCUMENTS_LIMIT";

// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "info";

// Config file name under the XDG config directory
pub const CONFIG_FILENAME: &str = "config.json";
