//! End-to-end conversion tests
//!
//! Most tests drive the converter over in-memory text; the file-based tests
//! at the bottom exercise path handling, encoding fallback, and the name map
//! loader against real temporary files.

use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;

use sqlproc2pg::convert::Converter;
use sqlproc2pg::events::{CollectingSink, Severity};
use sqlproc2pg::{convert_file_with_sink, ConverterOptions, NameMap};

fn convert_with(
    input: &str,
    map: NameMap,
    configure: impl FnOnce(&mut ConverterOptions),
) -> String {
    let mut options = ConverterOptions::new(PathBuf::from("input.sql"));
    configure(&mut options);
    let sink = CollectingSink::new();
    Converter::new(&options, &map, &sink)
        .convert_text(input)
        .unwrap()
}

fn convert(input: &str) -> String {
    convert_with(input, NameMap::new(), |_| {})
}

// ============================================================================
// Segmentation
// ============================================================================

#[test]
fn test_emitted_count_matches_retained_definitions() {
    let input = "\
CREATE PROCEDURE [dbo].[KeepMe]
AS
Set @x = 1
GO

CREATE PROCEDURE [dbo].[EmptyBody]
GO

CREATE PROCEDURE [dbo].[SkipMe]
AS
Set @y = 2
GO
";
    let output = convert_with(input, NameMap::new(), |options| {
        options.parse_skip_list("SkipMe");
    });

    assert_eq!(output.matches("CREATE OR REPLACE PROCEDURE").count(), 1);
    assert!(output.contains("public.KeepMe"));
    assert!(!output.contains("EmptyBody"));
    assert!(!output.contains("SkipMe"));
}

#[test]
fn test_definitions_separated_by_blank_line() {
    let input = "\
CREATE PROCEDURE [dbo].[First]
AS
Set @x = 1
GO
CREATE PROCEDURE [dbo].[Second]
AS
Set @y = 2
GO
";
    let output = convert(input);
    assert!(output.contains("$$;\n\nCOMMENT ON"));
    assert!(output.contains(";\n\nCREATE OR REPLACE PROCEDURE public.Second"));
}

#[test]
fn test_schema_prefix_applied() {
    let input = "CREATE PROCEDURE [dbo].[AddJob]\nAS\nSet @x = 1\nGO\n";
    let output = convert_with(input, NameMap::new(), |options| {
        options.schema_name = "sw".to_string();
    });
    assert!(output.contains("CREATE OR REPLACE PROCEDURE sw.AddJob()"));
    assert!(output.contains("COMMENT ON PROCEDURE sw.AddJob IS 'AddJob';"));
}

#[test]
fn test_unqualified_name_taken_from_line_remainder() {
    let input = "CREATE PROCEDURE AddJob\nAS\nSet @x = 1\nGO\n";
    let output = convert(input);
    assert!(output.contains("CREATE OR REPLACE PROCEDURE public.AddJob()"));
}

// ============================================================================
// Header comment block
// ============================================================================

const COMMENTED_PROCEDURE: &str = "\
CREATE PROCEDURE [dbo].[PostLogEntry]
/*****************************************************
**  Desc: Adds a log entry
**
**  Return values: 0: success, otherwise, error code
**
**  Auth:\tmem
**  Date:\t01/26/2001
**\t\t07/25/2008 - Added exception handling
**
*****************************************************/
(
    @type varchar(32),
    @message varchar(512),
    @postedBy varchar(64) = 'na' -- Person posting the entry
)
AS
Set @message = @message
GO
";

#[test]
fn test_comment_block_labels_reformatted() {
    let output = convert(COMMENTED_PROCEDURE);
    assert!(output.contains("**  Desc:   Adds a log entry"));
    assert!(output.contains("**  Auth:   mem"));
    assert!(output.contains("**  Date:   01/26/2001"));
}

#[test]
fn test_return_value_boilerplate_dropped() {
    let output = convert(COMMENTED_PROCEDURE);
    assert!(!output.contains("Return values"));
}

#[test]
fn test_ported_date_line_inserted_in_date_block() {
    let output = convert(COMMENTED_PROCEDURE);
    assert!(output.contains("- Ported to PostgreSQL"));

    // The synthesized line lands inside the date block, before the bare
    // continuation that closes it
    let ported = output.find("- Ported to PostgreSQL").unwrap();
    let date_label = output.find("**  Date:").unwrap();
    let closing = output.find("*/").unwrap();
    assert!(date_label < ported && ported < closing);
}

#[test]
fn test_argument_comments_spliced_after_auth_label() {
    let output = convert(COMMENTED_PROCEDURE);
    assert!(output.contains("**  Arguments:"));
    assert!(output.contains("**    _postedBy  Person posting the entry"));

    let auth = output.find("**  Auth:").unwrap();
    let arguments = output.find("**  Arguments:").unwrap();
    let date = output.find("**  Date:").unwrap();
    assert!(auth < arguments && arguments < date);
}

#[test]
fn test_empty_parameters_header_dropped() {
    let input = "\
CREATE PROCEDURE [dbo].[WithParamsHeader]
/*****************************************************
**  Desc: test
**
**  Parameters:
**
*****************************************************/
AS
Set @x = 1
GO
";
    let output = convert(input);
    assert!(!output.contains("Parameters:"));
}

// ============================================================================
// Argument list
// ============================================================================

#[test]
fn test_argument_normalization() {
    let output = convert(COMMENTED_PROCEDURE);
    assert!(output.contains("    _type text,"));
    assert!(output.contains("    _message text,"));
    assert!(output.contains("    _postedBy text = 'na'"));
}

#[test]
fn test_output_arguments_become_inout() {
    let input = "\
CREATE PROCEDURE [dbo].[WithOutput]
(
    @job int,
    @message varchar(512) output
)
AS
Set @message = ''
GO
";
    let output = convert(input);
    assert!(output.contains("    INOUT _message text"));
}

#[test]
fn test_narrow_integer_arguments_normalized() {
    let input = "\
CREATE PROCEDURE [dbo].[WithSmallTypes]
(
    @enabled tinyint,
    @state smallint
)
AS
Set @x = 1
GO
";
    let output = convert(input);
    assert!(output.contains("    _enabled int,"));
    assert!(output.contains("    _state int"));
}

#[test]
fn test_empty_argument_list() {
    let input = "\
CREATE PROCEDURE [dbo].[NoArgs]
()
AS
Set @x = 1
GO
";
    let output = convert(input);
    assert!(output.contains("CREATE OR REPLACE PROCEDURE public.NoArgs()"));
}

// ============================================================================
// Declarations and assignments
// ============================================================================

#[test]
fn test_declare_with_initializer() {
    let input = "\
CREATE PROCEDURE [dbo].[DeclareDemo]
AS
Declare @x int = 5
GO
";
    let output = convert(input);
    assert!(output.contains("DECLARE\n    _x int;\n"));
    assert!(output.contains("\n_x := 5;\n"));
}

#[test]
fn test_declare_wide_string_normalized() {
    let input = "\
CREATE PROCEDURE [dbo].[DeclareText]
AS
Declare @message varchar(512)
Set @message = 'ok'
GO
";
    let output = convert(input);
    assert!(output.contains("    _message text;"));
}

#[test]
fn test_error_tracking_variable_dropped() {
    let input = "\
CREATE PROCEDURE [dbo].[WithMyError]
AS
Declare @myError int = 0
Declare @myRowCount int = 0
Set @x = 1
GO
";
    let output = convert(input);
    assert!(!output.contains("_myError"));
    // The designated row-count local always renders with a zero initializer
    assert!(output.contains("    _myRowCount int := 0;"));
}

#[test]
fn test_set_statement_with_inline_comment() {
    let input = "\
CREATE PROCEDURE [dbo].[SetComment]
AS
Set @state = 5 -- complete
GO
";
    let output = convert(input);
    assert!(output.contains("_state := 5; -- complete"));
}

#[test]
fn test_string_concatenation_and_function_renames() {
    let input = "\
CREATE PROCEDURE [dbo].[Rewrites]
AS
Set @msg = 'Job ' + Convert(varchar(12), @job) + ' done'
Set @pos = CharIndex(';', @list)
Set @len = Len(@msg)
Set @value = IsNull(@value, 0)
GO
";
    let output = convert(input);
    assert!(output.contains("_msg := 'Job ' || _job::text || ' done';"));
    assert!(output.contains("_pos := position(';' in _list);"));
    assert!(output.contains("_len := char_length(_msg);"));
    assert!(output.contains("_value := Coalesce(_value, 0);"));
}

#[test]
fn test_print_and_rowcount_idioms() {
    let input = "\
CREATE PROCEDURE [dbo].[Diagnostics]
AS
SELECT @myRowCount = @@rowcount, @myError = @@error
Print @message
Print 'Processing complete'
GO
";
    let output = convert(input);
    assert!(output.contains("GET DIAGNOSTICS _myRowCount = ROW_COUNT;"));
    assert!(output.contains("RAISE INFO '%', _message;"));
    assert!(output.contains("RAISE INFO '%', 'Processing complete';"));
}

#[test]
fn test_select_assignment() {
    let input = "\
CREATE PROCEDURE [dbo].[SelectAssign]
AS
SELECT @jobCount = Count(*)
FROM T_Jobs
GO
";
    let output = convert(input);
    assert!(output.contains("_jobCount := Count(*)"));
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_if_with_single_statement_synthesizes_close() {
    let input = "\
CREATE PROCEDURE [dbo].[IfDemo]
AS
If @x > 0
    Set @y = 1
Set @z = 2
GO
";
    let output = convert(input);
    assert!(output.contains("If _x > 0 Then\n    _y := 1;\nEnd If;\n_z := 2;"));
    assert_eq!(output.matches("End If;").count(), 1);
}

#[test]
fn test_if_begin_end_else_begin_end() {
    let input = "\
CREATE PROCEDURE [dbo].[IfElseDemo]
AS
If @x > 0
Begin
    Set @y = 1
End
Else
Begin
    Set @y = 2
End
GO
";
    let output = convert(input);
    assert!(output.contains("If _x > 0 Then\n    _y := 1;\nElse\n    _y := 2;\nEnd If;"));
    // Exactly one close for the whole construct
    assert_eq!(output.matches("End If;").count(), 1);
}

#[test]
fn test_if_single_statement_with_else() {
    let input = "\
CREATE PROCEDURE [dbo].[IfElseShort]
AS
If @x > 0
    Set @y = 1
Else
    Set @y = 2
Set @z = 3
GO
";
    let output = convert(input);
    assert!(output.contains("If _x > 0 Then\n    _y := 1;\nElse\n    _y := 2;\nEnd If;\n_z := 3;"));
}

#[test]
fn test_begin_with_comment_keeps_comment() {
    let input = "\
CREATE PROCEDURE [dbo].[IfComment]
AS
If @x > 0
Begin -- validate
    Set @y = 1
End
GO
";
    let output = convert(input);
    assert!(output.contains("-- validate"));
    assert!(!output.contains("Begin -- validate"));
}

#[test]
fn test_while_loop() {
    let input = "\
CREATE PROCEDURE [dbo].[WhileDemo]
AS
While @i < 10
Begin
    Set @i = @i + 1
    If @i > 5
        break
End
GO
";
    let output = convert(input);
    assert!(output.contains("While _i < 10 Loop"));
    assert!(output.contains("    _i := _i + 1;"));
    assert!(output.contains("If _i > 5 Then\n        EXIT;\n    End If;"));
    assert!(output.contains("End Loop;"));
    // The Begin after While is discarded, not emitted
    assert!(!output.contains("Loop\nBegin"));
}

#[test]
fn test_nested_if_blocks_balance() {
    let input = "\
CREATE PROCEDURE [dbo].[Nested]
AS
If @x > 0
Begin
    If @y > 0
    Begin
        Set @z = 1
    End
End
GO
";
    let output = convert(input);
    assert_eq!(output.matches(" Then").count(), 2);
    assert_eq!(output.matches("End If;").count(), 2);
}

#[test]
fn test_goto_done_and_continue() {
    let input = "\
CREATE PROCEDURE [dbo].[FlowDemo]
AS
While @i < 10
Begin
    continue
End
Goto done
GO
";
    let output = convert(input);
    assert!(output.contains("    continue;"));
    assert!(output.contains("Return;"));
    assert!(!output.contains("Goto"));
}

#[test]
fn test_exec_with_error_capture_and_snake_case() {
    let input = "\
CREATE PROCEDURE [dbo].[ExecDemo]
AS
exec @err = SomeProc @a = 1, @b = 2
GO
";
    let output = convert_with(input, NameMap::new(), |options| {
        options.snake_case_names = true;
    });
    assert!(output.contains("Call some_proc(_a => 1, _b => 2);"));
}

#[test]
fn test_exec_case_fold_exception() {
    let input = "\
CREATE PROCEDURE [dbo].[LogCaller]
AS
exec PostLogEntry 'Error', @message, 'LogCaller'
GO
";
    let output = convert_with(input, NameMap::new(), |options| {
        options.snake_case_names = true;
    });
    assert!(output.contains("Call PostLogEntry('Error', _message, 'LogCaller');"));
}

// ============================================================================
// UPDATE/DELETE FROM warnings
// ============================================================================

#[test]
fn test_update_from_same_table_warns() {
    let input = "\
CREATE PROCEDURE [dbo].[UpdateWarn]
AS
UPDATE T_Jobs
SET State = 2
FROM T_Jobs INNER JOIN T_Tasks ON T_Jobs.Job = T_Tasks.Job
GO
";
    let output = convert(input);
    assert!(output.contains("This UPDATE query includes the target table name in the FROM clause"));
    assert!(output.contains("self-join"));
    assert!(output.contains("ToDo: Fix this query"));
    assert!(!output.contains("USING"));
}

#[test]
fn test_delete_from_same_table_adds_using_warning() {
    let input = "\
CREATE PROCEDURE [dbo].[DeleteWarn]
AS
DELETE FROM T_Jobs
FROM T_Jobs J INNER JOIN T_Old O ON J.Job = O.Job
GO
";
    let output = convert(input);
    assert!(output.contains("This DELETE query includes the target table name in the FROM clause"));
    assert!(output.contains("USING clause"));
    assert!(output.contains("ToDo: Fix this query"));
}

#[test]
fn test_dml_tracking_resets_on_blank_line() {
    let input = "\
CREATE PROCEDURE [dbo].[NoWarn]
AS
UPDATE T_Jobs
SET State = 2

FROM T_Jobs
GO
";
    let output = convert(input);
    assert!(!output.contains("ToDo: Fix this query"));
}

// ============================================================================
// Output discipline
// ============================================================================

#[test]
fn test_no_consecutive_blank_lines() {
    let input = "\
CREATE PROCEDURE [dbo].[Blanks]
AS
Set @x = 1



Set @y = 2
GO
";
    let output = convert(input);
    assert!(!output.contains("\n\n\n"));
    assert!(output.contains("_x := 1;\n\n_y := 2;"));
}

#[test]
fn test_trailing_terminators_collapsed() {
    let input = "\
CREATE PROCEDURE [dbo].[Semis]
AS
Set @x = 1;
GO
";
    let output = convert(input);
    assert!(output.contains("_x := 1;"));
    assert!(!output.contains(";;"));
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_function_with_return_type() {
    let input = "\
CREATE FUNCTION [dbo].[udfCombinePaths]
(
    @path1 varchar(255),
    @path2 varchar(255)
)
RETURNS varchar(1024)
AS
BEGIN
    Return @path1
END
GO
";
    let output = convert_with(input, NameMap::new(), |options| {
        options.snake_case_names = true;
    });
    assert!(output.contains("CREATE OR REPLACE FUNCTION public.combine_paths"));
    assert!(output.contains("RETURNS text"));
    assert!(output.contains("COMMENT ON FUNCTION public.combine_paths IS 'udfCombinePaths';"));
}

#[test]
fn test_function_return_type_on_following_line() {
    let input = "\
CREATE FUNCTION [dbo].[GetStateName]
()
RETURNS
varchar(64)
AS
BEGIN
    Return @stateName
END
GO
";
    let output = convert(input);
    assert!(output.contains("RETURNS text"));
}

// ============================================================================
// Name map propagation
// ============================================================================

fn job_table_map() -> NameMap {
    let mut map = NameMap::new();
    map.add_table("T_Jobs", "sw", "t_jobs");
    map.add_column("t_jobs", "Job_State_ID", "job_state_id");
    map.add_column("t_jobs", "Results_Folder", "results_folder");
    map
}

#[test]
fn test_name_map_rewrites_whole_block() {
    let input = "\
CREATE PROCEDURE [dbo].[MapDemo]
AS
UPDATE T_Jobs
SET Job_State_ID = 2,
    Results_Folder = @folder
WHERE Job_State_ID = 1 AND
      Results_Folder Is Null
GO
";
    let output = convert_with(input, job_table_map(), |_| {});

    assert!(output.contains("UPDATE sw.t_jobs"));
    // Column renames propagate through all five lines of the block
    assert!(output.contains("SET job_state_id = 2,"));
    assert!(output.contains("    results_folder := _folder")
        || output.contains("    results_folder = _folder"));
    assert!(output.contains("WHERE job_state_id = 1 AND"));
    assert!(output.contains("      results_folder Is Null"));
    assert!(!output.contains("T_Jobs"));
}

#[test]
fn test_name_map_leaves_unrelated_tables_alone() {
    let input = "\
CREATE PROCEDURE [dbo].[MapMiss]
AS
SELECT Job_State_ID
FROM T_Analysis_Jobs
GO
";
    let output = convert_with(input, job_table_map(), |_| {});
    // T_Analysis_Jobs is not in the map; neither it nor its columns change
    assert!(output.contains("FROM T_Analysis_Jobs"));
    assert!(output.contains("SELECT Job_State_ID"));
}

#[test]
fn test_verbose_reports_rewritten_blocks() {
    let input = "\
CREATE PROCEDURE [dbo].[MapVerbose]
AS
SELECT Job_State_ID FROM T_Jobs
GO
";
    let mut options = ConverterOptions::new(PathBuf::from("input.sql"));
    options.verbose = true;
    let sink = CollectingSink::new();
    let map = job_table_map();
    Converter::new(&options, &map, &sink)
        .convert_text(input)
        .unwrap();

    let debug_messages = sink.messages(Severity::Debug);
    assert_eq!(debug_messages.len(), 1);
    assert!(debug_messages[0].contains("t_jobs"));
}

// ============================================================================
// File-level behavior
// ============================================================================

#[test]
fn test_process_file_writes_default_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("procs.sql");
    fs::write(
        &input_path,
        "CREATE PROCEDURE [dbo].[FileDemo]\nAS\nSet @x = 1\nGO\n",
    )
    .unwrap();

    let options = ConverterOptions::new(input_path);
    let sink = CollectingSink::new();
    assert!(convert_file_with_sink(&options, &sink));

    let output_path = dir.path().join("procs_postgres.sql");
    let output = fs::read_to_string(&output_path).unwrap();
    assert!(output.contains("CREATE OR REPLACE PROCEDURE public.FileDemo()"));

    let status = sink.messages(Severity::Status);
    assert!(status
        .iter()
        .any(|message| message.contains("Writing stored procedure public.FileDemo")));
}

#[test]
fn test_missing_input_file_fails_with_warning() {
    let options = ConverterOptions::new(PathBuf::from("/nonexistent/procs.sql"));
    let sink = CollectingSink::new();
    assert!(!convert_file_with_sink(&options, &sink));

    let warnings = sink.messages(Severity::Warning);
    assert!(warnings.iter().any(|message| message.contains("File not found")));
}

#[test]
fn test_missing_name_map_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("procs.sql");
    fs::write(&input_path, "CREATE PROCEDURE [dbo].[X]\nAS\nSet @x = 1\nGO\n").unwrap();

    let mut options = ConverterOptions::new(input_path);
    options.column_map_file = Some(dir.path().join("missing_map.txt"));
    let sink = CollectingSink::new();
    assert!(!convert_file_with_sink(&options, &sink));
    assert!(!sink.messages(Severity::Error).is_empty());
}

#[test]
fn test_name_map_file_applied_from_disk() {
    let dir = tempfile::tempdir().unwrap();

    let map_path = dir.path().join("map.txt");
    fs::write(
        &map_path,
        "SourceTable\tSourceName\tSchema\tNewTable\tNewName\n\
         T_Jobs\tT_Jobs\tsw\tt_jobs\tt_jobs\n\
         T_Jobs\tJob_State_ID\tsw\tt_jobs\tjob_state_id\n",
    )
    .unwrap();

    let input_path = dir.path().join("procs.sql");
    fs::write(
        &input_path,
        "CREATE PROCEDURE [dbo].[MapFromDisk]\nAS\nUPDATE T_Jobs\nSET Job_State_ID = 2\nGO\n",
    )
    .unwrap();

    let mut options = ConverterOptions::new(input_path);
    options.column_map_file = Some(map_path);
    let sink = CollectingSink::new();
    assert!(convert_file_with_sink(&options, &sink));

    let output = fs::read_to_string(dir.path().join("procs_postgres.sql")).unwrap();
    assert!(output.contains("UPDATE sw.t_jobs"));
    assert!(output.contains("SET job_state_id = 2"));
}

#[test]
fn test_windows_1252_input_decoded() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("procs.sql");
    // 0xE9 is é in Windows-1252 but invalid UTF-8
    fs::write(
        &input_path,
        b"CREATE PROCEDURE [dbo].[Enc]\nAS\nSet @msg = 'caf\xE9'\nGO\n",
    )
    .unwrap();

    let options = ConverterOptions::new(input_path);
    let sink = CollectingSink::new();
    assert!(convert_file_with_sink(&options, &sink));

    let output = fs::read_to_string(dir.path().join("procs_postgres.sql")).unwrap();
    assert!(output.contains("_msg := 'café';"));
}
