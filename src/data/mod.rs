//! Data ingestion and storage
//!
//! Raw export normalization, SQLite table storage, and unification of per-team
//! tables into the master dataset.

pub mod database;
pub mod manifest;
pub mod normalize;
pub mod table;
pub mod unify;

pub use database::{Database, DatabaseStats, TableStore};
pub use manifest::{ingest_all, read_manifest, IngestReport, ManifestEntry};
pub use normalize::{store_export, ExportNormalizer};
pub use table::{Table, Value};
pub use unify::{Unifier, UnifySummary};
