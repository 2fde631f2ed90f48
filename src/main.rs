use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use sqlproc2pg::{convert_file, ConverterOptions};

#[derive(Parser)]
#[command(name = "sqlproc2pg")]
#[command(author, version, about = "Converts SQL Server stored procedures to PostgreSQL PL/pgSQL")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a file of stored procedure definitions
    Convert {
        /// File with SQL Server stored procedures to convert
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (defaults to the input name plus _postgres.sql)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Schema to use for the converted procedures
        #[arg(long, default_value = "public")]
        schema: String,

        /// Tab-delimited table/column name map file
        /// (SourceTable, SourceName, Schema, NewTable, NewName)
        #[arg(short, long)]
        map: Option<PathBuf>,

        /// Convert procedure names to snake_case
        #[arg(long)]
        snake_case: bool,

        /// Comma-separated list of procedure names to skip
        #[arg(long)]
        skip_list: Option<String>,

        /// Show rewritten name-map blocks while converting
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            schema,
            map,
            snake_case,
            skip_list,
            verbose,
        } => {
            let mut options = ConverterOptions::new(input);
            options.output_file = output;
            options.schema_name = schema;
            options.column_map_file = map;
            options.snake_case_names = snake_case;
            options.verbose = verbose;
            if let Some(list) = skip_list {
                options.parse_skip_list(&list);
            }

            if convert_file(&options) {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
