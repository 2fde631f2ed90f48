//! sqlproc2pg: SQL Server stored procedure converter
//!
//! Translates files of SQL Server (T-SQL) stored procedure and function
//! definitions into PostgreSQL PL/pgSQL. The translation is line-based and
//! best-effort: the common patterns (control flow, assignments, declarations,
//! known function renames, table/column renames) convert automatically, and
//! anything unrecognized passes through for manual review.

pub mod convert;
pub mod error;
pub mod events;
pub mod namemap;
pub mod options;
pub mod util;

pub use convert::Converter;
pub use error::ConvertError;
pub use events::{ConsoleSink, EventSink};
pub use namemap::NameMap;
pub use options::ConverterOptions;

/// Convert a stored procedure file, reporting progress to the console.
///
/// Returns the overall success flag; failures have already been reported
/// through the sink.
pub fn convert_file(options: &ConverterOptions) -> bool {
    let sink = ConsoleSink::new(options.verbose);
    convert_file_with_sink(options, &sink)
}

/// Convert a stored procedure file, reporting progress to the given sink.
pub fn convert_file_with_sink(options: &ConverterOptions, sink: &dyn EventSink) -> bool {
    let name_map = match &options.column_map_file {
        Some(path) => match NameMap::load(path, sink) {
            Ok(map) => {
                sink.status(&format!(
                    "Loaded name mappings for {} tables from {}",
                    map.table_count(),
                    path.display()
                ));
                map
            }
            Err(error) => {
                sink.error("Unable to load the column name map file", Some(&error));
                return false;
            }
        },
        None => NameMap::new(),
    };

    options.log_summary(sink);

    Converter::new(options, &name_map, sink).process_file()
}
