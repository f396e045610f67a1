//! Configuration constants for the ingester
//!
//! This module centralizes the tunable parameters used throughout the
//! application. Everything else arrives through CLI arguments.

// ============================================================================
// Ingestion Configuration
// ============================================================================

/// Number of rows read, normalized and appended per batch
///
/// Set to 100,000 rows so a batch of a typical trip-record file stays within a
/// few hundred MB in memory while keeping the number of round trips low.
pub const CHUNK_SIZE: usize = 100_000;

/// Columns parsed into timestamps before every append
pub const TIMESTAMP_COLUMNS: [&str; 2] = ["lpep_pickup_datetime", "lpep_dropoff_datetime"];

// ============================================================================
// Database Configuration
// ============================================================================

/// Maximum bind parameters in a single Postgres statement (u16 wire limit)
pub const POSTGRES_MAX_BIND_PARAMS: usize = 65_535;

/// Maximum bind parameters in a single SQLite statement (SQLITE_MAX_VARIABLE_NUMBER)
pub const SQLITE_MAX_BIND_PARAMS: usize = 32_766;

// ============================================================================
// Download Configuration
// ============================================================================

pub const DOWNLOAD_PROGRESS_TEMPLATE: &str =
    "[{elapsed_precise}] Download: [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec})";

pub const DOWNLOAD_SPINNER_TEMPLATE: &str =
    "[{elapsed_precise}] Download: {spinner} {bytes} ({bytes_per_sec})";
