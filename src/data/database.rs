//! SQLite storage for team tables and the master dataset

use crate::data::table::{Table, Value};
use crate::{HoopsError, Result};
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

/// Named-table storage: the only persistence the pipeline relies on
pub trait TableStore {
    /// All user tables, excluding engine-internal ones, sorted by name
    fn list_tables(&self) -> Result<Vec<String>>;

    /// Read a table in full
    fn read_table(&self, name: &str) -> Result<Table>;

    /// Replace a table with `table`; readers see the old or the new contents, never a mix
    fn write_table(&mut self, name: &str, table: &Table) -> Result<()>;
}

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Database { conn })
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Database { conn })
    }

    /// Number of rows in a table
    pub fn row_count(&self, name: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", quote_ident(name)),
            [],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DatabaseStats> {
        let mut tables = Vec::new();
        for name in self.list_tables()? {
            let rows = self.row_count(&name)?;
            tables.push((name, rows));
        }
        Ok(DatabaseStats { tables })
    }
}

impl TableStore for Database {
    fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    fn read_table(&self, name: &str) -> Result<Table> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", quote_ident(name)))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|idx| row.get_ref(idx).map(value_from_sql))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Table::from_rows(columns, rows)
    }

    fn write_table(&mut self, name: &str, table: &Table) -> Result<()> {
        if table.width() == 0 {
            return Err(HoopsError::NoData(format!(
                "refusing to write table '{}' with no columns",
                name
            )));
        }

        let ident = quote_ident(name);
        let column_list = table
            .columns()
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = vec!["?"; table.width()].join(", ");

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", ident), [])?;
        tx.execute(&format!("CREATE TABLE {} ({})", ident, column_list), [])?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                ident, placeholders
            ))?;
            for row in table.rows() {
                insert.execute(params_from_iter(row.iter()))?;
            }
        }
        tx.commit()?;

        log::debug!("Wrote {} rows to table '{}'", table.len(), name);
        Ok(())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Number(n) => ToSqlOutput::from(*n),
            Value::Text(s) => ToSqlOutput::from(s.as_str()),
            Value::Missing => ToSqlOutput::from(rusqlite::types::Null),
        })
    }
}

fn value_from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Missing,
        ValueRef::Integer(i) => Value::Number(i as f64),
        ValueRef::Real(f) => Value::Number(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Quote an identifier for SQLite; stat names like `3P%` need it
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    /// Table name and row count
    pub tables: Vec<(String, usize)>,
}

impl DatabaseStats {
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, rows)| rows).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        Table::from_rows(
            vec!["Opp".into(), "3P%".into(), "Tm".into()],
            vec![
                vec![Value::Text("BOS".into()), Value::Number(0.375), Value::Number(110.0)],
                vec![Value::Text("NYK".into()), Value::Missing, Value::Number(98.0)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.stats().unwrap();
        assert_eq!(stats.table_count(), 0);
        assert_eq!(stats.total_rows(), 0);
    }

    #[test]
    fn test_write_and_read_table() {
        let mut db = Database::in_memory().unwrap();
        db.write_table("Boston_Celtics", &sample_table()).unwrap();

        let table = db.read_table("Boston_Celtics").unwrap();
        assert_eq!(table, sample_table());
        assert_eq!(db.list_tables().unwrap(), vec!["Boston_Celtics".to_string()]);
    }

    #[test]
    fn test_write_replaces_table() {
        let mut db = Database::in_memory().unwrap();
        db.write_table("t", &sample_table()).unwrap();

        let replacement = Table::from_rows(vec!["x".into()], vec![vec![Value::Number(1.0)]]).unwrap();
        db.write_table("t", &replacement).unwrap();

        let table = db.read_table("t").unwrap();
        assert_eq!(table.columns(), &["x".to_string()]);
        assert_eq!(db.row_count("t").unwrap(), 1);
    }

    #[test]
    fn test_empty_table_persists_columns() {
        let mut db = Database::in_memory().unwrap();
        let empty = Table::new(vec!["Tm".into()]).unwrap();
        db.write_table("Empty", &empty).unwrap();
        let table = db.read_table("Empty").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.width(), 1);
    }

    #[test]
    fn test_write_rejects_zero_columns() {
        let mut db = Database::in_memory().unwrap();
        let err = db.write_table("t", &Table::default()).unwrap_err();
        assert!(matches!(err, HoopsError::NoData(_)));
    }

    #[test]
    fn test_read_missing_table_fails() {
        let db = Database::in_memory().unwrap();
        assert!(db.read_table("nope").is_err());
    }
}
