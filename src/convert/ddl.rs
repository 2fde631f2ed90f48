//! Accumulated procedure definition and PL/pgSQL rendering
//!
//! One instance is live at a time: the segmenter and header parser fill it,
//! the body transpiler appends to it, and `to_postgres` renders it once the
//! next definition boundary (or end of input) is reached.

use std::io::Write;

use crate::convert::rewrite::fold_procedure_name;
use crate::util::contains_ci;

/// Local variable that tracks affected-row counts; always declared with an
/// explicit zero initializer regardless of how the source declared it
const ROW_COUNT_VARIABLE: &str = "_myRowCount";

/// Conventional scalar-function name prefix, stripped when folding names
const UDF_NAME_PREFIX: &str = "udf";

/// One in-flight or completed procedure/function definition
#[derive(Debug, Default)]
pub struct ProcedureDdl {
    /// Schema-qualified converted name
    pub name: String,
    /// Original unqualified object name (skip list, metadata annotation)
    pub source_name: String,
    pub is_function: bool,
    /// Return type clause; functions only
    pub return_type: String,
    /// Normalized argument declarations, in source order
    pub arguments: Vec<String>,
    /// (argument name, comment text) pairs extracted from the argument list
    pub argument_comments: Vec<(String, String)>,
    /// Local variable declarations to render in the DECLARE block
    pub local_variables: Vec<String>,
    /// Reconstituted header comment block
    pub comment_block: Vec<String>,
    /// Translated statement body
    pub body: Vec<String>,
}

impl ProcedureDdl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all accumulated data and start a new definition.
    pub fn reset(&mut self, name: &str, source_name: &str, is_function: bool) {
        self.name = name.to_string();
        self.source_name = source_name.to_string();
        self.is_function = is_function;
        self.return_type.clear();
        self.arguments.clear();
        self.argument_comments.clear();
        self.local_variables.clear();
        self.comment_block.clear();
        self.body.clear();
    }

    /// Render the definition as PostgreSQL DDL.
    ///
    /// Emits nothing for an empty accumulator: an empty name means no
    /// definition has been seen yet, and an empty body means there is nothing
    /// worth writing.
    pub fn to_postgres<W: Write>(
        &self,
        writer: &mut W,
        snake_case_names: bool,
    ) -> std::io::Result<()> {
        if self.name.is_empty() || self.body.is_empty() {
            return Ok(());
        }

        let object_type = if self.is_function {
            "FUNCTION"
        } else {
            "PROCEDURE"
        };
        let name = self.converted_name(snake_case_names);

        writeln!(writer)?;

        let create_statement = format!("CREATE OR REPLACE {object_type} {name}");
        if self.arguments.is_empty() {
            writeln!(writer, "{create_statement}()")?;
        } else {
            writeln!(writer, "{create_statement}")?;
            writeln!(writer, "(")?;
            for argument in &self.arguments {
                writeln!(writer, "    {argument}")?;
            }
            writeln!(writer, ")")?;
        }

        if self.is_function && !self.return_type.is_empty() {
            writeln!(writer, "RETURNS {}", self.return_type)?;
        }

        writeln!(writer, "LANGUAGE plpgsql")?;
        writeln!(writer, "AS $$")?;

        for line in self.comment_block_with_argument_comments() {
            writeln!(writer, "{line}")?;
        }

        if !self.local_variables.is_empty() {
            writeln!(writer, "DECLARE")?;
            for declaration in &self.local_variables {
                writeln!(writer, "    {};", render_local_variable(declaration))?;
            }
        }

        writeln!(writer, "BEGIN")?;
        for line in &self.body {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer, "END")?;
        writeln!(writer, "$$;")?;

        writeln!(writer)?;
        writeln!(
            writer,
            "COMMENT ON {object_type} {name} IS '{}';",
            self.source_name.replace('\'', "''")
        )?;

        Ok(())
    }

    fn converted_name(&self, snake_case_names: bool) -> String {
        if !snake_case_names {
            return self.name.clone();
        }

        match self.name.split_once('.') {
            Some((schema, object)) => {
                format!("{schema}.{}", fold_object_name(object))
            }
            None => fold_object_name(&self.name),
        }
    }

    /// The comment block with argument comments spliced in.
    ///
    /// Anchor precedence: immediately after the `Auth:` label, else
    /// immediately before the block's closing delimiter, else a synthesized
    /// standalone comment block.
    fn comment_block_with_argument_comments(&self) -> Vec<String> {
        if self.argument_comments.is_empty() {
            return self.comment_block.clone();
        }

        let insert = self.argument_comment_lines();

        if let Some(anchor) = self
            .comment_block
            .iter()
            .position(|line| line.starts_with("**") && contains_ci(line, "Auth:"))
        {
            let mut block = self.comment_block.clone();
            block.splice(anchor + 1..anchor + 1, insert);
            return block;
        }

        if !self.comment_block.is_empty() {
            let mut block = self.comment_block.clone();
            let anchor = if block.len() >= 2 {
                block.len() - 1
            } else {
                block.len()
            };
            block.splice(anchor..anchor, insert);
            return block;
        }

        let mut block = vec![format!("/{}", "*".repeat(70))];
        block.extend(insert);
        block.push(format!("{}/", "*".repeat(70)));
        block
    }

    fn argument_comment_lines(&self) -> Vec<String> {
        let width = self
            .argument_comments
            .iter()
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0);

        let mut lines = vec!["**  Arguments:".to_string()];
        for (name, comment) in &self.argument_comments {
            lines.push(format!("**    {name:<width$}  {comment}"));
        }
        lines
    }
}

/// Fold an object name to snake_case, stripping the conventional scalar
/// function prefix first (`udfCombinePaths` folds to `combine_paths`).
fn fold_object_name(object: &str) -> String {
    let object = if object.len() > UDF_NAME_PREFIX.len()
        && object[..UDF_NAME_PREFIX.len()].eq_ignore_ascii_case(UDF_NAME_PREFIX)
    {
        &object[UDF_NAME_PREFIX.len()..]
    } else {
        object
    };
    fold_procedure_name(object)
}

/// The row-count tracking variable always starts at zero.
fn render_local_variable(declaration: &str) -> String {
    if crate::util::first_word(declaration).eq_ignore_ascii_case(ROW_COUNT_VARIABLE) {
        format!("{ROW_COUNT_VARIABLE} int := 0")
    } else {
        declaration.to_string()
    }
}
