//! Table and column name map
//!
//! The map is loaded from the tab-delimited file produced by the schema
//! conversion step (sqlserver2pgsql.pl), with five columns per row:
//!
//! ```text
//! SourceTable    SourceName    Schema    NewTable    NewName
//! ```
//!
//! Each row describes one column rename; the table rename is carried on every
//! row. The map is built once, before the conversion pass begins, and is
//! read-only afterwards.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ConvertError;
use crate::events::EventSink;
use crate::util::read_text_file;

/// Replacement target for a source table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    /// Target schema; empty when the map row does not assign one
    pub schema: String,
    /// New table name
    pub name: String,
}

impl TableTarget {
    /// Schema-qualified replacement text
    pub fn qualified_name(&self) -> String {
        if self.schema.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.schema, self.name)
        }
    }
}

/// Read-only table-name and column-name substitution tables.
///
/// BTreeMap keys (stored lowercase) keep rewrite iteration deterministic,
/// which the order-sensitive text rewrites require.
#[derive(Debug, Default, Clone)]
pub struct NameMap {
    /// lowercase source table name -> replacement
    tables: BTreeMap<String, TableTarget>,
    /// lowercase NEW table name -> (lowercase old column -> new column)
    columns: BTreeMap<String, BTreeMap<String, String>>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn add_table(&mut self, source_table: &str, schema: &str, new_table: &str) {
        self.tables
            .entry(source_table.to_lowercase())
            .or_insert_with(|| TableTarget {
                schema: schema.trim().to_string(),
                name: new_table.trim().to_string(),
            });
    }

    pub fn add_column(&mut self, new_table: &str, source_column: &str, new_column: &str) {
        self.columns
            .entry(new_table.to_lowercase())
            .or_default()
            .insert(source_column.to_lowercase(), new_column.trim().to_string());
    }

    /// Source tables and their replacements, in deterministic order.
    pub fn tables(&self) -> impl Iterator<Item = (&String, &TableTarget)> {
        self.tables.iter()
    }

    /// Column renames for a table, keyed by the NEW table name.
    pub fn columns_for(&self, new_table: &str) -> Option<&BTreeMap<String, String>> {
        self.columns.get(&new_table.to_lowercase())
    }

    /// Load a map from a tab-delimited file.
    ///
    /// A header row is tolerated; rows with fewer than five columns are
    /// reported as warnings and skipped.
    pub fn load(path: &Path, sink: &dyn EventSink) -> Result<Self, ConvertError> {
        if !path.is_file() {
            return Err(ConvertError::NameMapReadError {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }

        let text = read_text_file(path).map_err(|source| ConvertError::NameMapReadError {
            path: path.to_path_buf(),
            source,
        })?;

        let mut map = NameMap::new();

        for (index, line) in text.lines().enumerate() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split('\t').collect();

            if index == 0 && fields[0].trim().eq_ignore_ascii_case("SourceTable") {
                continue;
            }

            if fields.len() < 5 {
                sink.warning(&format!(
                    "Skipping row {} of {}: expected 5 tab-delimited columns, found {}",
                    index + 1,
                    path.display(),
                    fields.len()
                ));
                continue;
            }

            let source_table = fields[0].trim();
            let source_name = fields[1].trim();
            let schema = fields[2].trim();
            let new_table = fields[3].trim();
            let new_name = fields[4].trim();

            if source_table.is_empty() || new_table.is_empty() {
                continue;
            }

            map.add_table(source_table, schema, new_table);

            // Rows where SourceName repeats the table name carry the table
            // rename only
            if !source_name.is_empty() && !source_name.eq_ignore_ascii_case(source_table) {
                map.add_column(new_table, source_name, new_name);
            }
        }

        Ok(map)
    }
}
