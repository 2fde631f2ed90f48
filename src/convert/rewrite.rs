//! Line classification and text rewriting
//!
//! The converter has no grammar; it relies on an ordered sequence of pattern
//! rewrites. The ordering is load-bearing in two places:
//!
//! * the fixed rewrite table ([`apply_fixed_rewrites`]) uses literal patterns
//!   with no trailing boundary, so entries whose names extend other entries
//!   must come first (`dbo.GetTaskParamTable` before `dbo.GetTaskParam`);
//! * the right-hand-side chain ([`rewrite_expression`]) must run sigil
//!   normalization, concatenation, function renames, and wide-string
//!   normalization in exactly that order — `Convert(varchar(32), @x)` only
//!   resolves correctly when the cast rewrite sees the `_x` form first.
//!
//! All patterns are process-lifetime constants; none carries per-call state.

use once_cell::sync::Lazy;
use regex::Regex;

use inflector::cases::snakecase::to_snake_case;

/// Procedure called under this exact name in the target database; never folded
const SNAKE_CASE_EXCEPTION: &str = "PostLogEntry";

/// Bookkeeping variable for the last T-SQL error code; PostgreSQL signals
/// errors through exceptions, so its declaration is dropped
const ERROR_TRACKING_VARIABLE: &str = "myError";

static SET_NOCOUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*Set\s.*(XACT_ABORT|NoCount).*On\s*$").unwrap());

static DECLARE_ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<ws>\s*)Declare\s+@(?P<name>[^\s=]+)(?P<dtype>[^=]+)=\s*(?P<value>.+)$")
        .unwrap()
});

static DECLARE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<ws>\s*)Declare\s+@(?P<name>[^\s=]+)(?P<dtype>.*)$").unwrap()
});

static SET_STATEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<ws>\s*)Set\s+[@_](?P<name>[^\s=]+)\s*=\s*(?P<value>.*)$").unwrap()
});

static PRINT_VARIABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?P<ws>\s*)Print\s+@(?P<name>[^\s]+)\s*$").unwrap());

static PRINT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?P<ws>\s*)Print\b\s*(?P<expr>.*)$").unwrap());

static SELECT_ROWCOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<ws>\s*)SELECT\s.*?@(?P<name>[^\s=]+)\s*=\s*@@rowcount").unwrap()
});

static SELECT_ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<ws>\s*)SELECT\s.*?@(?P<name>[^\s=]+)\s*=(?P<rest>.*)$").unwrap()
});

static END_STATEMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?P<ws>\s*)End\b(?P<extra>.*)$").unwrap());

static EXEC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<ws>\s*)exec(?:ute)?\s+(?:@(?P<err>[^\s=]+)\s*=\s*)?(?P<rest>\S.*)$")
        .unwrap()
});

/// varchar(10) or wider, and varchar(max), in either n-prefixed form
static VARCHAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)n?varchar\s*\(\s*(?:\d{2,}|max)\s*\)").unwrap());

/// Quoted text followed by `+`
static CONCAT_BEFORE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"('[^']*'\s*)\+").unwrap());

/// `+` followed by quoted text
static CONCAT_AFTER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+(\s*'[^']*')").unwrap());

static LEN_FUNCTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bLen\s*\(").unwrap());

static CHARINDEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bCharIndex\s*\(\s*(?P<find>[^,)]+?)\s*,\s*(?P<search>[^)]+?)\s*\)").unwrap()
});

static CONVERT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bConvert\s*\(\s*(?P<dtype>[^,]+?)\s*,\s*[@_](?P<name>[^\s)]+)\s*\)").unwrap()
});

static NAMED_PARAMETER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s=\s").unwrap());

static ELSE_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\belse\b").unwrap());

/// Fixed, ordered table of literal/pattern rewrites applied to every body
/// line before classification.
///
/// The helper-function entries are literal qualified names with no trailing
/// boundary; `dbo.GetTaskParamTable` must be rewritten before
/// `dbo.GetTaskParam` would match inside it.
static FIXED_REWRITES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (Regex::new(r"(?i)\bIsNull\b").unwrap(), "Coalesce"),
        (Regex::new(r"(?i)\bdatetime\b").unwrap(), "timestamp"),
        (
            Regex::new(r"(?i)\bGetDate\s*\(\s*\)").unwrap(),
            "CURRENT_TIMESTAMP",
        ),
        (Regex::new(r"(?i)\btinyint\b").unwrap(), "int"),
        (Regex::new(r"(?i)\bsmallint\b").unwrap(), "int"),
        (Regex::new(r"(?i)\bSYSTEM_USER\b").unwrap(), "SESSION_USER"),
        (
            Regex::new(r"(?i)dbo\.GetTaskParamTable").unwrap(),
            "public.get_task_param_table",
        ),
        (
            Regex::new(r"(?i)dbo\.GetTaskParam").unwrap(),
            "public.get_task_param",
        ),
        (
            Regex::new(r"(?i)dbo\.udfParseDelimitedList").unwrap(),
            "public.udf_parse_delimited_list",
        ),
        (
            Regex::new(r"(?i)dbo\.udfCombinePaths").unwrap(),
            "public.udf_combine_paths",
        ),
        (
            Regex::new(r"(?i)dbo\.AppendToText").unwrap(),
            "public.append_to_text",
        ),
    ]
});

/// One classified body line.
///
/// Variants are listed (and matched) in pipeline order; later classifiers
/// never see lines consumed by earlier ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyLine {
    /// `Declare @name type = value`
    DeclareAssign {
        leading: String,
        name: String,
        data_type: String,
        value: String,
    },
    /// `Declare @name type`
    Declare {
        leading: String,
        name: String,
        data_type: String,
    },
    /// `Set @name = value`
    SetAssign {
        leading: String,
        name: String,
        value: String,
    },
    /// `Print @name`
    PrintVariable { leading: String, name: String },
    /// `Print <expression>`
    Print { leading: String, expr: String },
    /// `SELECT @name = @@rowcount`
    SelectRowCount { leading: String, name: String },
    /// `SELECT @name = <rest>`
    SelectAssign {
        leading: String,
        name: String,
        rest: String,
    },
    /// `End` with optional trailing tokens
    EndBlock { leading: String, extra: String },
    /// `If <condition>`
    IfHeader,
    /// `While <condition>`
    WhileHeader,
    /// `Goto done`
    GotoDone { leading: String },
    /// `break` / `break;`
    Break { leading: String },
    /// `continue` / `continue;`
    Continue,
    /// `exec [@err =] Target args`; any error-capture prefix already stripped
    ExecCall { leading: String, rest: String },
    /// Anything else
    Other,
}

/// Classify one body line. The input has already passed through
/// [`apply_fixed_rewrites`].
pub fn classify(line: &str) -> BodyLine {
    if let Some(caps) = DECLARE_ASSIGN_RE.captures(line) {
        return BodyLine::DeclareAssign {
            leading: caps["ws"].to_string(),
            name: caps["name"].to_string(),
            data_type: caps["dtype"].trim_end().to_string(),
            value: caps["value"].to_string(),
        };
    }

    if let Some(caps) = DECLARE_RE.captures(line) {
        return BodyLine::Declare {
            leading: caps["ws"].to_string(),
            name: caps["name"].to_string(),
            data_type: caps["dtype"].trim_end().to_string(),
        };
    }

    if let Some(caps) = SET_STATEMENT_RE.captures(line) {
        return BodyLine::SetAssign {
            leading: caps["ws"].to_string(),
            name: caps["name"].to_string(),
            value: caps["value"].to_string(),
        };
    }

    if let Some(caps) = PRINT_VARIABLE_RE.captures(line) {
        return BodyLine::PrintVariable {
            leading: caps["ws"].to_string(),
            name: caps["name"].to_string(),
        };
    }

    if let Some(caps) = PRINT_RE.captures(line) {
        let expr = caps["expr"].trim();
        if !expr.is_empty() {
            return BodyLine::Print {
                leading: caps["ws"].to_string(),
                expr: expr.to_string(),
            };
        }
    }

    if let Some(caps) = SELECT_ROWCOUNT_RE.captures(line) {
        return BodyLine::SelectRowCount {
            leading: caps["ws"].to_string(),
            name: caps["name"].to_string(),
        };
    }

    if let Some(caps) = SELECT_ASSIGN_RE.captures(line) {
        return BodyLine::SelectAssign {
            leading: caps["ws"].to_string(),
            name: caps["name"].to_string(),
            rest: caps["rest"].to_string(),
        };
    }

    let trimmed = line.trim();

    if let Some(caps) = END_STATEMENT_RE.captures(line) {
        return BodyLine::EndBlock {
            leading: caps["ws"].to_string(),
            extra: caps["extra"].to_string(),
        };
    }

    if crate::util::starts_with_ci(trimmed, "If ") {
        return BodyLine::IfHeader;
    }

    if crate::util::starts_with_ci(trimmed, "While ") {
        return BodyLine::WhileHeader;
    }

    if trimmed.eq_ignore_ascii_case("Goto done") {
        return BodyLine::GotoDone {
            leading: crate::util::leading_whitespace(line).to_string(),
        };
    }

    if trimmed.eq_ignore_ascii_case("break") || trimmed.eq_ignore_ascii_case("break;") {
        return BodyLine::Break {
            leading: crate::util::leading_whitespace(line).to_string(),
        };
    }

    if trimmed.eq_ignore_ascii_case("continue") || trimmed.eq_ignore_ascii_case("continue;") {
        return BodyLine::Continue;
    }

    if let Some(caps) = EXEC_RE.captures(line) {
        return BodyLine::ExecCall {
            leading: caps["ws"].to_string(),
            rest: caps["rest"].to_string(),
        };
    }

    BodyLine::Other
}

/// True when the declared variable is the error-tracking bookkeeping variable
/// that is dropped rather than declared.
pub fn is_error_tracking_variable(name: &str) -> bool {
    name.eq_ignore_ascii_case(ERROR_TRACKING_VARIABLE)
}

/// Apply the fixed, ordered rewrite table.
pub fn apply_fixed_rewrites(line: &str) -> String {
    let mut updated = line.to_string();
    for (pattern, replacement) in FIXED_REWRITES.iter() {
        if pattern.is_match(&updated) {
            updated = pattern.replace_all(&updated, *replacement).to_string();
        }
    }
    updated
}

/// `@` variable sigils become `_`.
pub fn update_variable_prefix(line: &str) -> String {
    line.replace('@', "_")
}

/// Quoted-string-adjacent `+` becomes `||`.
pub fn update_concatenation_operator(line: &str) -> String {
    let updated = CONCAT_BEFORE_RE.replace_all(line, "${1}||");
    CONCAT_AFTER_RE.replace_all(&updated, "||${1}").to_string()
}

/// `Len(`, `CharIndex(a, b)` and `Convert(type, @v)` to their PostgreSQL forms.
pub fn update_function_names(line: &str) -> String {
    let mut updated = LEN_FUNCTION_RE.replace_all(line, "char_length(").to_string();

    if let Some(caps) = CHARINDEX_RE.captures(&updated) {
        let replacement = format!("position({} in {})", &caps["find"], &caps["search"]);
        updated = CHARINDEX_RE
            .replace(&updated, regex::NoExpand(&replacement))
            .to_string();
    }

    if let Some(caps) = CONVERT_RE.captures(&updated) {
        let data_type = varchar_to_text(caps["dtype"].trim());
        let cast = format!("_{}::{}", &caps["name"], data_type);
        updated = CONVERT_RE
            .replace(&updated, regex::NoExpand(&cast))
            .to_string();
    }

    updated
}

/// Wide string types become unbounded `text`.
pub fn varchar_to_text(text: &str) -> String {
    VARCHAR_RE.replace_all(text, "text").to_string()
}

/// Right-hand-side rewrite chain, in fixed order: variable sigils, string
/// concatenation, function renames, wide-string normalization.
pub fn rewrite_expression(line: &str) -> String {
    let updated = update_variable_prefix(line);
    let updated = update_concatenation_operator(&updated);
    let updated = update_function_names(&updated);
    varchar_to_text(&updated)
}

/// `Set @name = value` (and declaration initializers) as a `:=` assignment,
/// preserving any trailing inline comment after the terminator.
pub fn reformat_set_statement(leading: &str, name: &str, value: &str) -> String {
    let (value_clean, comment) = match value.find(" --") {
        Some(index) if index > 0 => (&value[..index], &value[index..]),
        _ => (value, ""),
    };

    let expression = rewrite_expression(value_clean.trim_end());
    format!("{leading}_{name} := {expression};{comment}")
}

/// `Print` as a structured informational notice.
pub fn reformat_print(leading: &str, expr: &str) -> String {
    format!("{leading}RAISE INFO '%', {};", rewrite_expression(expr))
}

/// The row-count idiom as a diagnostics accessor.
pub fn reformat_select_rowcount(leading: &str, name: &str) -> String {
    format!("{leading}GET DIAGNOSTICS _{name} = ROW_COUNT;")
}

/// `SELECT @v = rest` as a block-scoped assignment. No terminator is added;
/// the statement frequently continues on the following lines.
pub fn reformat_select_assign(leading: &str, name: &str, rest: &str) -> String {
    format!("{leading}_{name} :={}", rewrite_expression(rest))
}

/// `exec Target args` as a `Call` statement with named-parameter association.
pub fn reformat_exec(leading: &str, rest: &str, fold_names: bool) -> String {
    let rest = rest.trim();
    let (target, args) = match rest.find(char::is_whitespace) {
        Some(index) => (&rest[..index], rest[index..].trim()),
        None => (rest, ""),
    };

    let target = if fold_names {
        fold_procedure_name(target)
    } else {
        target.to_string()
    };

    if args.is_empty() {
        return format!("{leading}Call {target}();");
    }

    let args = update_variable_prefix(args);
    let args = NAMED_PARAMETER_RE.replace_all(&args, " => ");
    format!("{leading}Call {target}({args});")
}

/// Fold a (possibly schema-qualified) procedure name to snake_case.
///
/// The hard-coded exception keeps its exact casing; it already exists in the
/// target database under that name.
pub fn fold_procedure_name(name: &str) -> String {
    name.split('.')
        .map(|part| {
            if part == SNAKE_CASE_EXCEPTION {
                part.to_string()
            } else {
                to_snake_case(part)
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Normalize the casing of the `Else` keyword within a line.
pub fn normalize_else_keyword(line: &str) -> String {
    ELSE_KEYWORD_RE.replace_all(line, "Else").to_string()
}

/// True for session-only directive lines that are dropped outright.
pub fn is_dropped_directive(line: &str, trimmed: &str) -> bool {
    trimmed.eq_ignore_ascii_case("AS")
        || trimmed.eq_ignore_ascii_case("GO")
        || trimmed.eq_ignore_ascii_case("WITH SCHEMABINDING")
        || SET_NOCOUNT_RE.is_match(line)
        || crate::util::starts_with_ci(trimmed, "/****** Object: ")
}

/// True for directive lines that also arm the skip-next-batch-separator flag.
pub fn arms_batch_separator_skip(trimmed: &str) -> bool {
    crate::util::starts_with_ci(trimmed, "SET ANSI_NULLS ON")
        || crate::util::starts_with_ci(trimmed, "SET QUOTED_IDENTIFIER ON")
        || crate::util::starts_with_ci(trimmed, "GRANT EXECUTE")
}
