//! Combine every team table into the master dataset

use crate::data::table::{Table, Value};
use crate::data::TableStore;
use crate::{DataConfig, HoopsError, Result};

/// What a unification pass did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnifySummary {
    /// Tables that contributed rows, in order
    pub combined: Vec<String>,
    pub skipped_empty: Vec<String>,
    pub skipped_unreadable: Vec<String>,
    pub total_rows: usize,
}

/// Builds the master dataset from all per-team tables in a store
#[derive(Debug, Clone)]
pub struct Unifier {
    master_table: String,
    entity_column: String,
}

impl Unifier {
    pub fn new(master_table: impl Into<String>, entity_column: impl Into<String>) -> Self {
        Unifier {
            master_table: master_table.into(),
            entity_column: entity_column.into(),
        }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Unifier::new(&config.master_table, &config.entity_column)
    }

    pub fn master_table(&self) -> &str {
        &self.master_table
    }

    pub fn entity_column(&self) -> &str {
        &self.entity_column
    }

    /// Read and tag every source table and concatenate them in memory.
    ///
    /// The master table itself is never treated as a source. Empty tables are
    /// skipped with a notice, unreadable ones with a warning. Fails with
    /// [`HoopsError::NoData`] when nothing is left to combine.
    pub fn combine<S: TableStore + ?Sized>(&self, store: &S) -> Result<(Table, UnifySummary)> {
        let sources: Vec<String> = store
            .list_tables()?
            .into_iter()
            .filter(|name| name != &self.master_table)
            .collect();

        if sources.is_empty() {
            return Err(HoopsError::NoData(
                "no user-defined tables found in storage".to_string(),
            ));
        }

        let mut summary = UnifySummary::default();
        let mut frames = Vec::with_capacity(sources.len());
        for name in sources {
            let mut table = match store.read_table(&name) {
                Ok(table) => table,
                Err(e) => {
                    log::warn!("Could not read table '{}': {}; skipping", name, e);
                    summary.skipped_unreadable.push(name);
                    continue;
                }
            };
            if table.is_empty() {
                log::info!("Table '{}' is empty; skipping", name);
                summary.skipped_empty.push(name);
                continue;
            }

            table.set_constant_column(&self.entity_column, Value::Text(name.clone()));
            summary.total_rows += table.len();
            summary.combined.push(name);
            frames.push(table);
        }

        if frames.is_empty() {
            return Err(HoopsError::NoData(
                "no tables contained any data to concatenate".to_string(),
            ));
        }

        Ok((Table::concat(&frames), summary))
    }

    /// Combine all source tables and replace the master table with the result.
    ///
    /// On failure nothing is written and the previous master table survives.
    pub fn unify<S: TableStore + ?Sized>(&self, store: &mut S) -> Result<(Table, UnifySummary)> {
        let (master, summary) = self.combine(&*store)?;
        store.write_table(&self.master_table, &master)?;
        log::info!(
            "Combined {} tables into '{}'. Total rows: {}",
            summary.combined.len(),
            self.master_table,
            summary.total_rows
        );
        Ok((master, summary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Database;
    use std::collections::{BTreeSet, HashSet};

    fn game_table(rows: &[(f64, f64)]) -> Table {
        Table::from_rows(
            vec!["TeamScore".into(), "OpponentScore".into()],
            rows.iter()
                .map(|&(t, o)| vec![Value::Number(t), Value::Number(o)])
                .collect(),
        )
        .unwrap()
    }

    fn seeded_db() -> Database {
        let mut db = Database::in_memory().unwrap();
        db.write_table("TeamA", &game_table(&[(100.0, 90.0), (95.0, 99.0), (110.0, 104.0)]))
            .unwrap();
        db.write_table("TeamB", &game_table(&[(88.0, 92.0), (101.0, 97.0)]))
            .unwrap();
        db
    }

    fn unifier() -> Unifier {
        Unifier::new("TeamStats_AllTeams", "EntityId")
    }

    #[test]
    fn test_unify_two_teams() {
        let mut db = seeded_db();
        let (master, summary) = unifier().unify(&mut db).unwrap();

        assert_eq!(master.len(), 5);
        assert_eq!(summary.total_rows, 5);
        let entities: BTreeSet<&str> = master
            .column_values("EntityId")
            .unwrap()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(entities, BTreeSet::from(["TeamA", "TeamB"]));

        let stored = db.read_table("TeamStats_AllTeams").unwrap();
        assert_eq!(stored.len(), 5);
    }

    #[test]
    fn test_unify_is_idempotent() {
        let mut db = seeded_db();
        let (first, _) = unifier().unify(&mut db).unwrap();
        let (second, summary) = unifier().unify(&mut db).unwrap();

        assert_eq!(first.len(), second.len());
        let a: HashSet<_> = first.columns().iter().collect();
        let b: HashSet<_> = second.columns().iter().collect();
        assert_eq!(a, b);
        assert!(!summary.combined.contains(&"TeamStats_AllTeams".to_string()));
    }

    #[test]
    fn test_combine_does_not_write_master() {
        let db = seeded_db();
        let (master, summary) = unifier().combine(&db).unwrap();

        assert_eq!(master.len(), 5);
        assert_eq!(summary.total_rows, 5);
        assert_eq!(
            db.list_tables().unwrap(),
            vec!["TeamA".to_string(), "TeamB".to_string()]
        );
    }

    #[test]
    fn test_column_union_fills_missing() {
        let mut db = seeded_db();
        let extra = Table::from_rows(
            vec!["TeamScore".into(), "Pace".into()],
            vec![vec![Value::Number(99.0), Value::Number(101.5)]],
        )
        .unwrap();
        db.write_table("TeamC", &extra).unwrap();

        let (master, _) = unifier().unify(&mut db).unwrap();
        assert_eq!(master.len(), 6);
        let pace: Vec<&Value> = master.column_values("Pace").unwrap().collect();
        assert_eq!(pace.iter().filter(|v| v.is_missing()).count(), 5);
        let opp: Vec<&Value> = master.column_values("OpponentScore").unwrap().collect();
        assert!(opp[5].is_missing());
    }

    #[test]
    fn test_empty_table_skipped() {
        let mut db = seeded_db();
        db.write_table("TeamEmpty", &Table::new(vec!["TeamScore".into()]).unwrap())
            .unwrap();

        let (master, summary) = unifier().unify(&mut db).unwrap();
        assert_eq!(master.len(), 5);
        assert_eq!(summary.skipped_empty, vec!["TeamEmpty".to_string()]);
    }

    #[test]
    fn test_no_tables_is_no_data() {
        let mut db = Database::in_memory().unwrap();
        let err = unifier().unify(&mut db).unwrap_err();
        assert!(matches!(err, HoopsError::NoData(_)));
    }

    #[test]
    fn test_all_empty_leaves_master_untouched() {
        let mut db = seeded_db();
        unifier().unify(&mut db).unwrap();

        // Replace every source with an empty table; the old master must survive
        let empty = Table::new(vec!["TeamScore".into()]).unwrap();
        db.write_table("TeamA", &empty).unwrap();
        db.write_table("TeamB", &empty).unwrap();

        let err = unifier().unify(&mut db).unwrap_err();
        assert!(matches!(err, HoopsError::NoData(_)));
        assert_eq!(db.row_count("TeamStats_AllTeams").unwrap(), 5);
    }

    /// Store whose reads fail for selected tables
    struct FlakyStore {
        inner: Database,
        broken: Vec<String>,
    }

    impl TableStore for FlakyStore {
        fn list_tables(&self) -> Result<Vec<String>> {
            self.inner.list_tables()
        }

        fn read_table(&self, name: &str) -> Result<Table> {
            if self.broken.iter().any(|b| b == name) {
                return Err(HoopsError::Parse(format!("corrupt table {}", name)));
            }
            self.inner.read_table(name)
        }

        fn write_table(&mut self, name: &str, table: &Table) -> Result<()> {
            self.inner.write_table(name, table)
        }
    }

    #[test]
    fn test_unreadable_table_skipped() {
        let mut store = FlakyStore {
            inner: seeded_db(),
            broken: vec!["TeamB".to_string()],
        };
        let (master, summary) = unifier().unify(&mut store).unwrap();
        assert_eq!(master.len(), 3);
        assert_eq!(summary.skipped_unreadable, vec!["TeamB".to_string()]);
    }

    #[test]
    fn test_all_unreadable_is_no_data() {
        let mut store = FlakyStore {
            inner: seeded_db(),
            broken: vec!["TeamA".to_string(), "TeamB".to_string()],
        };
        let err = unifier().unify(&mut store).unwrap_err();
        assert!(matches!(err, HoopsError::NoData(_)));
        assert!(!store.inner.list_tables().unwrap().contains(&"TeamStats_AllTeams".to_string()));
    }
}
