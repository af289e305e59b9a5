//! Batch ingestion driven by a `team,path` manifest

use crate::data::normalize::{store_export, ExportNormalizer};
use crate::data::TableStore;
use crate::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ManifestEntry {
    pub team: String,
    /// Export file; relative paths resolve against the manifest's directory
    pub path: PathBuf,
}

/// Per-entry results of a batch
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// (table name, rows)
    pub stored: Vec<(String, usize)>,
    /// (team, error message)
    pub failed: Vec<(String, String)>,
}

impl IngestReport {
    pub fn total_rows(&self) -> usize {
        self.stored.iter().map(|(_, rows)| rows).sum()
    }
}

pub fn read_manifest<P: AsRef<Path>>(path: P) -> Result<Vec<ManifestEntry>> {
    let path = path.as_ref();
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;

    let mut entries = Vec::new();
    for record in reader.deserialize() {
        let mut entry: ManifestEntry = record?;
        if entry.path.is_relative() {
            entry.path = base.join(&entry.path);
        }
        entries.push(entry);
    }
    Ok(entries)
}

/// Ingest every entry; a failing export is logged and skipped
pub fn ingest_all<S: TableStore + ?Sized>(
    store: &mut S,
    normalizer: &ExportNormalizer,
    entries: &[ManifestEntry],
) -> IngestReport {
    let mut report = IngestReport::default();

    for entry in entries {
        let result = std::fs::read_to_string(&entry.path)
            .map_err(Into::into)
            .and_then(|raw| store_export(store, normalizer, &entry.team, &raw));

        match result {
            Ok(stored) => report.stored.push(stored),
            Err(e) => {
                log::warn!("Failed to ingest {} ({}): {}", entry.team, entry.path.display(), e);
                report.failed.push((entry.team.clone(), e.to_string()));
            }
        }
    }

    log::info!(
        "Ingested {} of {} exports ({} rows)",
        report.stored.len(),
        entries.len(),
        report.total_rows()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Database;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_manifest_batch_continues_past_failures() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        fs::write(
            dir.join("celtics.csv"),
            "Rk,Gtm,Date,Tm,Opp\n1,1,2024-10-22,132,109\n2,2,2024-10-24,122,102\n",
        )
        .unwrap();
        fs::write(dir.join("broken.csv"), "no header here\n1,2,3\n").unwrap();
        fs::write(
            dir.join("manifest.csv"),
            "team,path\nBoston Celtics,celtics.csv\nBroken,broken.csv\nGhost,missing.csv\n",
        )
        .unwrap();

        let entries = read_manifest(dir.join("manifest.csv")).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, dir.join("celtics.csv"));

        let mut db = Database::in_memory().unwrap();
        let report = ingest_all(&mut db, &ExportNormalizer::default(), &entries);

        assert_eq!(report.stored, vec![("Boston_Celtics".to_string(), 2)]);
        assert_eq!(report.failed.len(), 2);
        assert_eq!(report.failed[0].0, "Broken");
        assert_eq!(db.list_tables().unwrap(), vec!["Boston_Celtics".to_string()]);
    }
}
