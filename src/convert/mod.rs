//! Conversion engine
//!
//! The engine consumes the input line by line. Definition boundaries
//! (`CREATE PROCEDURE` / `CREATE FUNCTION`) flush the previous accumulated
//! definition and reset all per-definition state; between boundaries the
//! header parser phases (comment block, argument list, return type) run
//! first, and everything after them is translated by the body pipeline.
//!
//! The pass is strictly single-threaded and sequential: every rewrite step
//! depends on state built by prior lines (open control blocks, the most
//! recent UPDATE/DELETE target, comment-block phase) and on bounded lookahead
//! of not-yet-processed lines.

pub mod create_line;
pub mod ddl;
pub mod line_source;
pub mod name_rewriter;
pub mod rewrite;

use std::fs::File;
use std::io::{BufRead, BufWriter, Cursor, Write};
use std::path::Path;

use anyhow::Result;
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ConvertError;
use crate::events::EventSink;
use crate::namemap::NameMap;
use crate::options::ConverterOptions;
use crate::util::{
    contains_ci, ends_with_ci, find_ci, leading_whitespace, replace_tabs, starts_with_ci,
};

use ddl::ProcedureDdl;
use line_source::LineSource;
use rewrite::BodyLine;

/// Header comment block delimiters
const COMMENT_BLOCK_OPEN: &str = "/*****************";
const COMMENT_BLOCK_CLOSE: &str = "*****************/";

/// Boilerplate sentences dropped from header comment blocks
const RETURN_VALUE_BOILERPLATE: [&str; 2] = [
    "Return values: 0: success, otherwise, error code",
    "Return values: 0 if no error; otherwise error code",
];

static COMMENT_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\*\*\s+(?P<label>Desc|Auth|Date):\s*(?P<value>.*)").unwrap());

static PARAMETERS_HEADER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\*\*\s+Parameters:\s*$").unwrap());

static ARGUMENT_NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@[^\s,)]+").unwrap());

static NARROW_INT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:tinyint|smallint)\b").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlBlock {
    If,
    While,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DmlKind {
    Update,
    Delete,
}

/// Converts one file of SQL Server stored procedure definitions.
pub struct Converter<'a> {
    options: &'a ConverterOptions,
    name_map: &'a NameMap,
    sink: &'a dyn EventSink,
}

impl<'a> Converter<'a> {
    pub fn new(
        options: &'a ConverterOptions,
        name_map: &'a NameMap,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            options,
            name_map,
            sink,
        }
    }

    /// Convert the input file to the resolved output path.
    ///
    /// All failures are reported through the event sink; the return value is
    /// the overall success flag.
    pub fn process_file(&self) -> bool {
        let input = &self.options.input_file;
        if !input.is_file() {
            self.sink
                .warning(&format!("File not found: {}", input.display()));
            return false;
        }

        let output_path = self.options.resolved_output_path();
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                if let Err(source) = std::fs::create_dir_all(parent) {
                    let error = ConvertError::OutputDirectoryError {
                        path: parent.to_path_buf(),
                        source,
                    };
                    self.sink
                        .error("Unable to create the output directory", Some(&error));
                    return false;
                }
            }
        }

        match self.run_pass(&output_path) {
            Ok(()) => {
                self.sink
                    .status(&format!("Results written to {}", output_path.display()));
                true
            }
            Err(error) => {
                let cause: &(dyn std::error::Error + 'static) = error.as_ref();
                self.sink
                    .error("Error converting the stored procedure file", Some(cause));
                false
            }
        }
    }

    /// Convert already-loaded text, returning the converted output.
    pub fn convert_text(&self, text: &str) -> Result<String> {
        let mut output = Vec::new();
        {
            let source = LineSource::new(Cursor::new(text.as_bytes().to_vec()));
            let mut pass = Pass::new(source, &mut output, self.options, self.name_map, self.sink);
            pass.run()?;
        }
        Ok(String::from_utf8_lossy(&output).into_owned())
    }

    fn run_pass(&self, output_path: &Path) -> Result<()> {
        let input = &self.options.input_file;
        let content =
            crate::util::read_text_file(input).map_err(|source| ConvertError::InputReadError {
                path: input.clone(),
                source,
            })?;

        let output_file =
            File::create(output_path).map_err(|source| ConvertError::OutputWriteError {
                path: output_path.to_path_buf(),
                source,
            })?;

        let source = LineSource::new(Cursor::new(content.into_bytes()));
        let mut pass = Pass::new(
            source,
            BufWriter::new(output_file),
            self.options,
            self.name_map,
            self.sink,
        );
        pass.run()
    }
}

/// State for one sequential conversion pass over one input.
struct Pass<'a, R: BufRead, W: Write> {
    source: LineSource<R>,
    writer: W,
    options: &'a ConverterOptions,
    map: &'a NameMap,
    sink: &'a dyn EventSink,

    ddl: ProcedureDdl,
    control_blocks: Vec<ControlBlock>,

    found_comment_block_start: bool,
    found_comment_block_end: bool,
    found_argument_list_start: bool,
    found_argument_list_end: bool,
    date_block_open: bool,
    skip_next_go: bool,
    recent_dml: Option<(DmlKind, String)>,
}

impl<'a, R: BufRead, W: Write> Pass<'a, R, W> {
    fn new(
        source: LineSource<R>,
        writer: W,
        options: &'a ConverterOptions,
        map: &'a NameMap,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            source,
            writer,
            options,
            map,
            sink,
            ddl: ProcedureDdl::new(),
            control_blocks: Vec::new(),
            found_comment_block_start: false,
            found_comment_block_end: false,
            found_argument_list_start: false,
            found_argument_list_end: false,
            date_block_open: false,
            skip_next_go: false,
            recent_dml: None,
        }
    }

    fn run(&mut self) -> Result<()> {
        while let Some(line) = self.source.next_line()? {
            self.process_line(line)?;
        }
        self.flush_definition()?;
        self.writer.flush()?;
        Ok(())
    }

    fn process_line(&mut self, line: String) -> Result<()> {
        let trimmed = line.trim().to_string();

        // A batch separator following a dropped directive is swallowed, along
        // with one following blank line
        if self.skip_next_go && starts_with_ci(&trimmed, "GO") {
            self.skip_next_go = false;
            self.source.fill(1)?;
            if matches!(self.source.peek(0), Some(next) if next.trim().is_empty()) {
                self.source.take_cached();
            }
            return Ok(());
        }
        self.skip_next_go = false;

        if rewrite::is_dropped_directive(&line, &trimmed) {
            return Ok(());
        }
        if rewrite::arms_batch_separator_skip(&trimmed) {
            self.skip_next_go = true;
            return Ok(());
        }

        if starts_with_ci(&trimmed, "CREATE PROC") || starts_with_ci(&trimmed, "CREATE FUNCTION") {
            return self.start_definition(&trimmed);
        }

        // Header comment block
        if !self.found_comment_block_start && trimmed.starts_with(COMMENT_BLOCK_OPEN) {
            self.found_comment_block_start = true;
            self.ddl.comment_block.push(replace_tabs(&line));
            return Ok(());
        }
        if self.found_comment_block_start
            && !self.found_comment_block_end
            && trimmed.ends_with(COMMENT_BLOCK_CLOSE)
        {
            if self.date_block_open {
                self.insert_ported_date_line();
            }
            self.found_comment_block_end = true;
            self.ddl.comment_block.push(replace_tabs(&line));
            return Ok(());
        }
        if self.found_comment_block_start && !self.found_comment_block_end {
            return self.store_comment_line(&line);
        }

        // Argument list
        if !self.found_argument_list_start && trimmed.starts_with('(') {
            self.found_argument_list_start = true;
            if trimmed.starts_with("()") {
                self.found_argument_list_end = true;
            }
            return Ok(());
        }
        if self.found_argument_list_start
            && !self.found_argument_list_end
            && trimmed.starts_with(')')
        {
            self.found_argument_list_end = true;
            return Ok(());
        }
        if self.found_argument_list_start && !self.found_argument_list_end {
            self.store_argument(&line);
            return Ok(());
        }

        // Function return type, possibly on the following physical line
        if self.ddl.is_function
            && self.ddl.return_type.is_empty()
            && starts_with_ci(&trimmed, "RETURNS")
        {
            let rest = trimmed["RETURNS".len()..].trim().to_string();
            let type_text = if rest.is_empty() {
                self.source.fill(1)?;
                self.source
                    .take_cached()
                    .map(|next| next.trim().to_string())
                    .unwrap_or_default()
            } else {
                rest
            };
            self.ddl.return_type =
                rewrite::varchar_to_text(&rewrite::apply_fixed_rewrites(&type_text));
            return Ok(());
        }

        self.process_body_line(&line)
    }

    // ------------------------------------------------------------------
    // Segmenter
    // ------------------------------------------------------------------

    fn start_definition(&mut self, trimmed: &str) -> Result<()> {
        self.flush_definition()?;

        self.found_comment_block_start = false;
        self.found_comment_block_end = false;
        self.found_argument_list_start = false;
        self.found_argument_list_end = false;
        self.date_block_open = false;
        self.skip_next_go = false;
        self.recent_dml = None;
        self.control_blocks.clear();

        let (object_name, is_function) = match create_line::parse_create_line(trimmed) {
            Some(parsed) => (parsed.object_name, parsed.is_function),
            None => {
                // Unrecognized shape: take the remainder of the line
                let is_function = starts_with_ci(trimmed, "CREATE FUNCTION");
                let keywords = if is_function {
                    "CREATE FUNCTION"
                } else if starts_with_ci(trimmed, "CREATE PROCEDURE") {
                    "CREATE PROCEDURE"
                } else {
                    "CREATE PROC"
                };
                (trimmed[keywords.len()..].trim().to_string(), is_function)
            }
        };

        let qualified = format!("{}.{}", self.options.schema_name, object_name);
        self.ddl.reset(&qualified, &object_name, is_function);
        Ok(())
    }

    fn flush_definition(&mut self) -> Result<()> {
        while self.ddl.body.last().map_or(false, |line| line.is_empty()) {
            self.ddl.body.pop();
        }

        if self.ddl.name.is_empty() || self.ddl.body.is_empty() {
            return Ok(());
        }

        if self.options.should_skip(&self.ddl.source_name) {
            self.sink
                .status(&format!("Skipping {}", self.ddl.source_name));
            return Ok(());
        }

        if !self.map.is_empty() {
            self.ddl.body =
                name_rewriter::update_names(&self.ddl.body, self.map, self.sink, self.options.verbose);
        }

        let kind = if self.ddl.is_function {
            "function"
        } else {
            "stored procedure"
        };
        self.sink.status(&format!("Writing {kind} {}", self.ddl.name));

        self.ddl
            .to_postgres(&mut self.writer, self.options.snake_case_names)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Header parser
    // ------------------------------------------------------------------

    fn store_comment_line(&mut self, line: &str) -> Result<()> {
        // Boilerplate return-value sentences are dropped, along with a
        // following bare continuation line
        if RETURN_VALUE_BOILERPLATE
            .iter()
            .any(|text| matches!(find_ci(line, text), Some(index) if index > 0))
        {
            self.source.fill(1)?;
            if matches!(self.source.peek(0), Some(next) if next.trim() == "**") {
                self.source.take_cached();
            }
            return Ok(());
        }

        // An empty Parameters: header (immediately followed by a bare
        // continuation line) is dropped; the continuation itself is kept
        if PARAMETERS_HEADER_RE.is_match(line.trim_end()) {
            self.source.fill(1)?;
            if matches!(self.source.peek(0), Some(next) if next.trim() == "**") {
                return Ok(());
            }
        }

        if line.trim() == "**" && self.date_block_open {
            self.insert_ported_date_line();
        }

        if let Some(caps) = COMMENT_LABEL_RE.captures(line) {
            if caps["label"].eq_ignore_ascii_case("Date") {
                self.date_block_open = true;
            }
            let value = caps["value"].trim_end();
            let updated = if value.is_empty() {
                format!("**  {}:", &caps["label"])
            } else {
                format!("**  {}:   {}", &caps["label"], value)
            };
            self.ddl.comment_block.push(replace_tabs(&updated));
            return Ok(());
        }

        if let Some(rest) = line.strip_prefix("**\t") {
            self.ddl.comment_block.push(format!("**  {}", replace_tabs(rest)));
            return Ok(());
        }

        self.ddl.comment_block.push(replace_tabs(line));
        Ok(())
    }

    fn insert_ported_date_line(&mut self) {
        let date_text = Local::now().format("%m/%d/%Y");
        self.ddl
            .comment_block
            .push(format!("**          {date_text} - Ported to PostgreSQL"));
        self.date_block_open = false;
    }

    fn store_argument(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }

        // This shouldn't normally fail; keep the whole line as the key if it does
        let argument_name = ARGUMENT_NAME_RE
            .find(line)
            .map(|name| rewrite::update_variable_prefix(name.as_str()))
            .unwrap_or_else(|| line.trim().to_string());

        let mut updated = rewrite::update_variable_prefix(line).trim().to_string();

        if contains_ci(&updated, "varchar") {
            updated = rewrite::varchar_to_text(&updated);
        }
        updated = NARROW_INT_RE.replace_all(&updated, "int").to_string();

        // Output-only parameters are not supported by CALL conventions;
        // both output forms map to INOUT
        if let Some(index) = find_ci(&updated, " output,") {
            let remainder = format!("{},{}", &updated[..index], &updated[index + " output,".len()..]);
            updated = format!("INOUT {}", remainder.trim());
        } else if ends_with_ci(updated.trim_end(), "output") {
            let trimmed_end = updated.trim_end();
            updated = format!(
                "INOUT {}",
                trimmed_end[..trimmed_end.len() - "output".len()].trim()
            );
        }

        if let Some(index) = updated.find("--") {
            if index > 0 && index + 2 < updated.len() {
                let comment = updated[index + 2..].trim().to_string();
                self.ddl
                    .argument_comments
                    .push((argument_name.clone(), comment));
                updated = updated[..index].trim_end().to_string();
            }
        }

        self.ddl.arguments.push(replace_tabs(&updated));
    }

    // ------------------------------------------------------------------
    // Body transpiler
    // ------------------------------------------------------------------

    fn process_body_line(&mut self, raw_line: &str) -> Result<()> {
        if raw_line.trim().is_empty() {
            self.recent_dml = None;
            self.append_body_line("");
            return Ok(());
        }

        let line = rewrite::apply_fixed_rewrites(raw_line);

        match rewrite::classify(&line) {
            BodyLine::DeclareAssign {
                leading,
                name,
                data_type,
                value,
            } => {
                if rewrite::is_error_tracking_variable(&name) {
                    return Ok(());
                }
                self.store_local_variable(&name, &data_type);
                self.append_body_line(&rewrite::reformat_set_statement(&leading, &name, &value));
            }
            BodyLine::Declare {
                name, data_type, ..
            } => {
                if rewrite::is_error_tracking_variable(&name) {
                    return Ok(());
                }
                self.store_local_variable(&name, &data_type);
            }
            BodyLine::SetAssign {
                leading,
                name,
                value,
            } => {
                self.append_body_line(&rewrite::reformat_set_statement(&leading, &name, &value));
            }
            BodyLine::PrintVariable { leading, name } => {
                self.append_body_line(&format!("{leading}RAISE INFO '%', _{name};"));
            }
            BodyLine::Print { leading, expr } => {
                self.append_body_line(&rewrite::reformat_print(&leading, &expr));
            }
            BodyLine::SelectRowCount { leading, name } => {
                self.append_body_line(&rewrite::reformat_select_rowcount(&leading, &name));
            }
            BodyLine::SelectAssign {
                leading,
                name,
                rest,
            } => {
                self.append_body_line(&rewrite::reformat_select_assign(&leading, &name, &rest));
            }
            BodyLine::EndBlock { leading, extra } => match self.control_blocks.pop() {
                Some(ControlBlock::If) => self.close_if_block(&leading, &extra)?,
                Some(ControlBlock::While) => {
                    self.append_body_line(&format!("{leading}End Loop;{extra}"));
                }
                // An End with no open control block passes through unchanged
                None => self.emit_default(&line),
            },
            BodyLine::IfHeader => self.translate_if(&line)?,
            BodyLine::WhileHeader => self.translate_while(&line)?,
            BodyLine::GotoDone { leading } => {
                self.append_body_line(&format!("{leading}Return;"));
            }
            BodyLine::Break { leading } => {
                self.append_body_line(&format!("{leading}EXIT;"));
            }
            BodyLine::Continue => {
                let text = line.trim_end();
                if text.ends_with(';') {
                    self.append_body_line(text);
                } else {
                    self.append_body_line(&format!("{text};"));
                }
            }
            BodyLine::ExecCall { leading, rest } => {
                self.append_body_line(&rewrite::reformat_exec(
                    &leading,
                    &rest,
                    self.options.snake_case_names,
                ));
            }
            BodyLine::Other => self.emit_default(&line),
        }

        Ok(())
    }

    fn store_local_variable(&mut self, name: &str, data_type: &str) {
        let declaration = format!("_{name}{}", rewrite::varchar_to_text(data_type));
        self.ddl.local_variables.push(replace_tabs(&declaration));
    }

    /// `If <condition>` becomes `<condition> Then`; up to three lines of
    /// lookahead decide between a block body, a guarded single statement, and
    /// an `Else` branch. "Else If" chains are not supported and need manual
    /// review of the output.
    fn translate_if(&mut self, line: &str) -> Result<()> {
        let condition = rewrite::update_function_names(&rewrite::update_variable_prefix(line));
        self.append_body_line(&format!("{condition} Then"));

        self.source.fill(3)?;
        if self.source.cached_len() == 0 {
            return Ok(());
        }

        if self.consume_begin_if_next()? {
            return Ok(());
        }

        let leading = leading_whitespace(line).to_string();

        if let Some(statement) = self.source.take_cached() {
            self.append_guarded_statement(&statement);
        }

        if matches!(self.source.peek(0), Some(next) if starts_with_ci(next.trim_start(), "Else")) {
            let else_line = self.source.take_cached().unwrap_or_default();
            self.append_else_line(&else_line);

            if self.consume_begin_if_next()? {
                return Ok(());
            }

            if let Some(statement) = self.source.take_cached() {
                self.append_guarded_statement(&statement);
            }
        }

        self.append_body_line(&format!("{leading}End If;"));
        Ok(())
    }

    /// `While <condition>` becomes `<condition> Loop`; the loop syntax has no
    /// separate block-open keyword, so an immediately following `Begin` line
    /// is discarded.
    fn translate_while(&mut self, line: &str) -> Result<()> {
        let condition = rewrite::update_function_names(&rewrite::update_variable_prefix(line));
        self.append_body_line(&format!("{condition} Loop"));
        self.control_blocks.push(ControlBlock::While);

        self.source.fill(1)?;
        if matches!(self.source.peek(0), Some(next) if starts_with_ci(next.trim_start(), "Begin")) {
            self.source.take_cached();
        }
        Ok(())
    }

    /// An `End` that popped an If marker: when the next line is `Else`, the
    /// close is suppressed and the Else branch handled; otherwise `End If;`
    /// is emitted with any trailing tokens preserved.
    fn close_if_block(&mut self, leading: &str, extra: &str) -> Result<()> {
        self.source.fill(1)?;

        if matches!(self.source.peek(0), Some(next) if starts_with_ci(next.trim_start(), "Else")) {
            let else_line = self.source.take_cached().unwrap_or_default();
            self.append_else_line(&else_line);

            if self.consume_begin_if_next()? {
                return Ok(());
            }

            self.source.fill(1)?;
            if let Some(statement) = self.source.take_cached() {
                self.append_guarded_statement(&statement);
                self.append_body_line(&format!("{leading}End If;"));
            }
            return Ok(());
        }

        self.append_body_line(&format!("{leading}End If;{extra}"));
        Ok(())
    }

    /// When the next line starts a block, push an If marker and keep only its
    /// trailing inline comment.
    fn consume_begin_if_next(&mut self) -> Result<bool> {
        self.source.fill(1)?;
        let is_begin = matches!(
            self.source.peek(0),
            Some(next) if starts_with_ci(next.trim_start(), "Begin")
        );
        if !is_begin {
            return Ok(false);
        }

        self.control_blocks.push(ControlBlock::If);
        let begin_line = self.source.take_cached().unwrap_or_default();
        self.append_trailing_comment(&begin_line);
        Ok(true)
    }

    fn append_trailing_comment(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        if let Some(index) = line.find("--") {
            let leading = leading_whitespace(line);
            self.append_body_line(&format!("{leading}{}", &line[index..]));
        }
    }

    fn append_else_line(&mut self, line: &str) {
        let updated = rewrite::normalize_else_keyword(line);
        let updated = self.rewrite_consumed_statement(&updated);
        self.append_body_line(&updated);
    }

    /// A line consumed via lookahead, emitted with a statement terminator.
    fn append_guarded_statement(&mut self, line: &str) {
        let updated = self.rewrite_consumed_statement(line);
        let text = updated.trim_end();
        if text.is_empty() || text.ends_with(';') {
            self.append_body_line(text);
        } else {
            self.append_body_line(&format!("{text};"));
        }
    }

    /// Lines consumed via lookahead bypass the main classifier; apply the
    /// same assignment/print reformatting before the expression chain.
    fn rewrite_consumed_statement(&self, line: &str) -> String {
        let updated = rewrite::apply_fixed_rewrites(line);
        match rewrite::classify(&updated) {
            BodyLine::SetAssign {
                leading,
                name,
                value,
            } => rewrite::reformat_set_statement(&leading, &name, &value),
            BodyLine::PrintVariable { leading, name } => {
                format!("{leading}RAISE INFO '%', _{name};")
            }
            BodyLine::Print { leading, expr } => rewrite::reformat_print(&leading, &expr),
            BodyLine::GotoDone { leading } => format!("{leading}Return;"),
            BodyLine::Break { leading } => format!("{leading}EXIT;"),
            _ => rewrite::rewrite_expression(&updated),
        }
    }

    fn emit_default(&mut self, line: &str) {
        let updated = rewrite::rewrite_expression(line);
        self.append_body_line(&updated);
        self.track_dml(&updated);
    }

    /// Remember the most recent UPDATE/DELETE target; when a later FROM
    /// clause re-mentions it, warn that a self-join condition is required.
    fn track_dml(&mut self, line: &str) {
        let trimmed = line.trim_start();

        if starts_with_ci(trimmed, "UPDATE ") {
            if let Some(table) = dml_target_table(trimmed, "UPDATE ") {
                self.recent_dml = Some((DmlKind::Update, table));
            }
            return;
        }

        if starts_with_ci(trimmed, "DELETE FROM ") {
            if let Some(table) = dml_target_table(trimmed, "DELETE FROM ") {
                self.recent_dml = Some((DmlKind::Delete, table));
            }
            return;
        }

        let Some((kind, table)) = self.recent_dml.clone() else {
            return;
        };
        if starts_with_ci(trimmed, "FROM") && contains_ci(trimmed, &table) {
            let leading = leading_whitespace(line).to_string();
            self.append_self_join_warning(&leading, kind);
            self.recent_dml = None;
        }
    }

    fn append_self_join_warning(&mut self, leading: &str, kind: DmlKind) {
        let verb = match kind {
            DmlKind::Update => "UPDATE",
            DmlKind::Delete => "DELETE",
        };
        let stars = "*".repeat(76);

        self.append_body_line(&format!("{leading}/{stars}"));
        self.append_body_line(&format!(
            "{leading}** This {verb} query includes the target table name in the FROM clause"
        ));
        self.append_body_line(&format!(
            "{leading}** A self-join condition must be added to the WHERE clause manually"
        ));
        if kind == DmlKind::Delete {
            self.append_body_line(&format!(
                "{leading}** In addition, rewrite the DELETE to use a USING clause"
            ));
        }
        self.append_body_line(&format!("{leading}{stars}/"));
        self.append_body_line(&format!("{leading}ToDo: Fix this query"));
    }

    /// Append a body line, expanding tabs, collapsing runs of trailing
    /// statement terminators, and suppressing consecutive blank lines.
    fn append_body_line(&mut self, line: &str) {
        let mut text = replace_tabs(line);
        while text.ends_with(";;") {
            text.pop();
        }
        if text.is_empty() && self.ddl.body.last().map_or(true, |previous| previous.is_empty()) {
            return;
        }
        self.ddl.body.push(text);
    }
}

fn dml_target_table(trimmed: &str, prefix: &str) -> Option<String> {
    let token = trimmed[prefix.len()..].split_whitespace().next()?;
    let unqualified = token.rsplit('.').next().unwrap_or(token);
    let name = unqualified.trim_matches(|c| c == '[' || c == ']');
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}
