//! Database export and restore through external dump tools.
//!
//! Each engine implements [`database::Database`]: `export` runs the engine's
//! dump tool and compresses the result with gzip, `import` pipes a decompressed
//! archive into the engine's restore tool.

pub mod cli;
pub mod compression;
pub mod config;
pub mod database;
pub mod error;
pub mod process;
pub mod storage;
pub mod utils;

pub use database::{Backend, Database, ExportResult};
pub use error::{BackupError, ProcessError};
