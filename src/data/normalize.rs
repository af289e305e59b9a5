//! Raw game log export cleaning
//!
//! Exports arrive with inconsistent header shapes: a grouped two-row header,
//! a single header row, or noise lines before the real header. The header is
//! found by scanning for a known leading token sequence instead of trusting a
//! fixed line offset.

use crate::data::table::{Table, Value};
use crate::data::TableStore;
use crate::{HoopsError, IngestConfig, Result};
use csv::ReaderBuilder;
use std::collections::{HashMap, HashSet};

/// Leading tokens of the real header row in a team game log export
pub const DEFAULT_HEADER_MARKER: &str = "Rk,Gtm,Date";

/// Turns one team's raw export text into a clean [`Table`]
#[derive(Debug, Clone)]
pub struct ExportNormalizer {
    marker: Vec<String>,
    delimiter: u8,
}

impl Default for ExportNormalizer {
    fn default() -> Self {
        ExportNormalizer::new(DEFAULT_HEADER_MARKER, b',')
    }
}

impl ExportNormalizer {
    /// `marker` is written with the same delimiter as the export
    pub fn new(marker: &str, delimiter: u8) -> Self {
        let marker = split_tokens(marker, delimiter);
        ExportNormalizer { marker, delimiter }
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Ok(ExportNormalizer::new(
            &config.header_marker,
            config.delimiter_byte()?,
        ))
    }

    /// Index of the first line whose leading tokens equal the marker
    pub fn locate_header(&self, lines: &[&str]) -> Option<usize> {
        lines.iter().position(|line| self.is_header_line(line))
    }

    fn is_header_line(&self, line: &str) -> bool {
        if self.marker.is_empty() {
            return false;
        }
        let tokens = split_tokens(line, self.delimiter);
        tokens.len() >= self.marker.len() && tokens[..self.marker.len()] == self.marker[..]
    }

    fn is_header_record(&self, record: &csv::StringRecord) -> bool {
        !self.marker.is_empty()
            && record.len() >= self.marker.len()
            && record
                .iter()
                .zip(&self.marker)
                .all(|(field, marker)| field.trim() == marker.as_str())
    }

    fn header_not_found(&self) -> HoopsError {
        HoopsError::HeaderNotFound {
            marker: self.marker.join(&(self.delimiter as char).to_string()),
        }
    }

    /// Normalize one raw export.
    ///
    /// Fails with [`HoopsError::HeaderNotFound`] when no line carries the marker.
    pub fn normalize(&self, raw: &str) -> Result<Table> {
        let lines: Vec<&str> = raw.lines().collect();
        let header_idx = self
            .locate_header(&lines)
            .ok_or_else(|| self.header_not_found())?;
        if header_idx > 0 {
            log::debug!("Discarding {} lines before header", header_idx);
        }

        let body = lines[header_idx..].join("\n");
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(body.as_bytes());

        let mut records = reader.records();
        let header = match records.next() {
            Some(record) => record?,
            None => return Err(self.header_not_found()),
        };

        // Positions of real columns in the raw record, placeholders dropped
        let kept: Vec<usize> = header
            .iter()
            .enumerate()
            .filter(|(_, name)| !is_placeholder(name))
            .map(|(idx, _)| idx)
            .collect();
        let names: Vec<String> = kept.iter().map(|&idx| header[idx].trim().to_string()).collect();
        let dropped = header.len() - kept.len();
        if dropped > 0 {
            log::debug!("Dropped {} placeholder columns", dropped);
        }

        let mut table = Table::new(make_unique(&names))?;
        let mut repeated_headers = 0usize;
        for record in records {
            let record = record?;
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            if self.is_header_record(&record) {
                repeated_headers += 1;
                continue;
            }
            let row = kept
                .iter()
                .map(|&idx| record.get(idx).map(Value::parse).unwrap_or(Value::Missing))
                .collect();
            table.push_row(row);
        }
        if repeated_headers > 0 {
            log::debug!("Skipped {} repeated header rows", repeated_headers);
        }

        Ok(table)
    }
}

/// Empty header cells and spreadsheet-style `Unnamed` columns carry no data name
fn is_placeholder(name: &str) -> bool {
    let name = name.trim();
    name.is_empty() || name.starts_with("Unnamed")
}

fn split_tokens(line: &str, delimiter: u8) -> Vec<String> {
    line.split(delimiter as char)
        .map(|token| token.trim().trim_matches('"').trim().to_string())
        .collect()
}

/// Make column names unique: the first occurrence keeps its name, each repeat
/// gets `_<k>` with k counting earlier occurrences.
pub fn make_unique(names: &[String]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut unique = Vec::with_capacity(names.len());

    for name in names {
        let count = counts.entry(name.as_str()).or_insert(0);
        *count += 1;

        let mut candidate = name.clone();
        if *count > 1 || taken.contains(&candidate) {
            let mut suffix = (*count - 1).max(1);
            loop {
                candidate = format!("{}_{}", name, suffix);
                if !taken.contains(&candidate) {
                    break;
                }
                suffix += 1;
            }
        }
        taken.insert(candidate.clone());
        unique.push(candidate);
    }

    unique
}

/// Storage table name for a team: spaces and dashes become underscores
pub fn table_name_for(team: &str) -> String {
    team.trim().replace([' ', '-'], "_")
}

/// Normalize a raw export and store it as the team's table (full replace).
///
/// Normalization finishes before storage is touched, so a bad export leaves
/// every persisted table as it was. Returns the table name and row count.
pub fn store_export<S: TableStore + ?Sized>(
    store: &mut S,
    normalizer: &ExportNormalizer,
    team: &str,
    raw: &str,
) -> Result<(String, usize)> {
    let table = normalizer.normalize(raw)?;
    let name = table_name_for(team);
    store.write_table(&name, &table)?;
    log::info!("Stored {} rows for {} in table '{}'", table.len(), team, name);
    Ok((name, table.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Database;

    const GROUPED_EXPORT: &str = "\
Share & Export
,,,,,,Score,Score,,Team,Team,Team
Rk,Gtm,Date,,Opp,Rslt,Tm,Opp,OT,FG,FGA,FG%
1,1,2024-10-22,@,BOS,L,110,132,,41,88,.466
2,2,2024-10-24,,DAL,W,115,99,,43,92,.467
Rk,Gtm,Date,,Opp,Rslt,Tm,Opp,OT,FG,FGA,FG%
3,3,2024-10-26,@,MIL,W,120,118,OT,45,90,.500
";

    fn names(table: &Table) -> Vec<&str> {
        table.columns().iter().map(String::as_str).collect()
    }

    #[test]
    fn test_grouped_header_duplicate_opp() {
        let table = ExportNormalizer::default().normalize(GROUPED_EXPORT).unwrap();
        assert_eq!(
            names(&table),
            vec!["Rk", "Gtm", "Date", "Opp", "Rslt", "Tm", "Opp_1", "OT", "FG", "FGA", "FG%"]
        );
        // Repeated header row is skipped
        assert_eq!(table.len(), 3);
        let row = &table.rows()[0];
        assert_eq!(row[3], Value::Text("BOS".into()));
        assert_eq!(row[5], Value::Number(110.0));
        assert_eq!(row[6], Value::Number(132.0));
        assert_eq!(row[7], Value::Missing);
    }

    #[test]
    fn test_single_header_row() {
        let raw = "Rk,Gtm,Date,Tm,Opp\n1,1,2024-10-22,101,99\n";
        let table = ExportNormalizer::default().normalize(raw).unwrap();
        assert_eq!(names(&table), vec!["Rk", "Gtm", "Date", "Tm", "Opp"]);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_unnamed_columns_dropped() {
        let raw = "Rk,Gtm,Date,Unnamed: 3,Tm\n1,1,2024-10-22,@,101\n";
        let table = ExportNormalizer::default().normalize(raw).unwrap();
        assert_eq!(names(&table), vec!["Rk", "Gtm", "Date", "Tm"]);
        assert_eq!(table.rows()[0][3], Value::Number(101.0));
    }

    #[test]
    fn test_header_not_found() {
        let raw = "Team,Score\nBOS,110\n";
        let err = ExportNormalizer::default().normalize(raw).unwrap_err();
        assert!(matches!(err, HoopsError::HeaderNotFound { .. }));
    }

    #[test]
    fn test_locate_header_skips_noise() {
        let normalizer = ExportNormalizer::default();
        let lines = vec!["noise", ",,Score,Score", "Rk,Gtm,Date,Opp", "1,1,x,BOS"];
        assert_eq!(normalizer.locate_header(&lines), Some(2));
        assert_eq!(normalizer.locate_header(&lines[3..]), None);
    }

    #[test]
    fn test_make_unique() {
        let input: Vec<String> = ["Opp", "Tm", "Opp", "Opp"].iter().map(|s| s.to_string()).collect();
        assert_eq!(make_unique(&input), vec!["Opp", "Tm", "Opp_1", "Opp_2"]);

        let clash: Vec<String> = ["A", "A_1", "A"].iter().map(|s| s.to_string()).collect();
        let unique = make_unique(&clash);
        assert_eq!(unique, vec!["A", "A_1", "A_2"]);
        let set: HashSet<_> = unique.iter().collect();
        assert_eq!(set.len(), unique.len());
    }

    #[test]
    fn test_custom_delimiter() {
        let raw = "junk\nRk;Gtm;Date;Tm\n1;1;d;100\n";
        let table = ExportNormalizer::new("Rk;Gtm;Date", b';').normalize(raw).unwrap();
        assert_eq!(names(&table), vec!["Rk", "Gtm", "Date", "Tm"]);
    }

    #[test]
    fn test_table_name_for() {
        assert_eq!(table_name_for("Los Angeles Lakers"), "Los_Angeles_Lakers");
        assert_eq!(table_name_for("Trail-Blazers"), "Trail_Blazers");
    }

    #[test]
    fn test_failed_export_leaves_store_untouched() {
        let mut db = Database::in_memory().unwrap();
        let normalizer = ExportNormalizer::default();
        store_export(&mut db, &normalizer, "Boston Celtics", GROUPED_EXPORT).unwrap();

        let err = store_export(&mut db, &normalizer, "Boston Celtics", "no header here").unwrap_err();
        assert!(matches!(err, HoopsError::HeaderNotFound { .. }));

        let table = db.read_table("Boston_Celtics").unwrap();
        assert_eq!(table.len(), 3);
    }
}
