// Public API - the runner is the entry point used by the CLI
pub mod runner;

// Library modules - organized by subsystem
pub mod config;
pub mod db;
pub mod error;
pub mod formats;
pub mod ingest;
pub mod io;
pub mod telemetry;
