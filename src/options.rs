//! Conversion options
//!
//! Options are parsed by the CLI (or constructed directly by library callers)
//! and consumed by the converter as plain values.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::events::EventSink;

/// Suffix appended to the input file stem when no output path is given
const DEFAULT_OUTPUT_SUFFIX: &str = "_postgres.sql";

/// Options controlling a single conversion pass
#[derive(Debug, Clone)]
pub struct ConverterOptions {
    /// File with SQL Server stored procedures to convert
    pub input_file: PathBuf,
    /// Output file path; defaults to the input stem plus `_postgres.sql`
    pub output_file: Option<PathBuf>,
    /// Schema prefixed to every converted procedure name
    pub schema_name: String,
    /// Tab-delimited table/column name map file (five columns:
    /// SourceTable, SourceName, Schema, NewTable, NewName)
    pub column_map_file: Option<PathBuf>,
    /// Convert procedure names to snake_case in the emitted DDL
    pub snake_case_names: bool,
    /// Procedure names to skip while converting (stored lowercase)
    pub skip_list: BTreeSet<String>,
    /// Report rewritten name-map blocks through the event sink
    pub verbose: bool,
}

impl ConverterOptions {
    pub fn new(input_file: PathBuf) -> Self {
        Self {
            input_file,
            output_file: None,
            schema_name: "public".to_string(),
            column_map_file: None,
            snake_case_names: false,
            skip_list: BTreeSet::new(),
            verbose: false,
        }
    }

    /// Parse a comma-separated skip list, replacing any existing entries.
    pub fn parse_skip_list(&mut self, list: &str) {
        self.skip_list.clear();
        for item in list.split(',') {
            let name = item.trim();
            if !name.is_empty() {
                self.skip_list.insert(name.to_lowercase());
            }
        }
    }

    /// True when the given (unqualified) procedure name is in the skip list.
    pub fn should_skip(&self, procedure_name: &str) -> bool {
        self.skip_list.contains(&procedure_name.to_lowercase())
    }

    /// Output path: the explicit option, or the input stem plus `_postgres.sql`
    /// in the input file's directory.
    pub fn resolved_output_path(&self) -> PathBuf {
        if let Some(path) = &self.output_file {
            return path.clone();
        }

        let stem = self
            .input_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("converted");
        let file_name = format!("{stem}{DEFAULT_OUTPUT_SUFFIX}");

        match self.input_file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.join(file_name),
            _ => PathBuf::from(file_name),
        }
    }

    /// Report the effective options through the event sink.
    pub fn log_summary(&self, sink: &dyn EventSink) {
        sink.status("Options:");
        sink.status(&format!(
            " {:<35} {}",
            "Input file with stored procedures:",
            self.input_file.display()
        ));
        sink.status(&format!(
            " {:<35} {}",
            "Output file path:",
            self.resolved_output_path().display()
        ));
        sink.status(&format!(" {:<35} {}", "Schema name:", self.schema_name));
        if let Some(map_file) = &self.column_map_file {
            sink.status(&format!(
                " {:<35} {}",
                "Column name map file:",
                map_file.display()
            ));
        }
        if self.snake_case_names {
            sink.status(&format!(" {:<35} {}", "Snake case names:", "enabled"));
        }
        if !self.skip_list.is_empty() {
            sink.status(&format!(
                " {:<35} {}",
                "Procedures to skip:",
                self.skip_list.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        sink.status("");
    }
}
