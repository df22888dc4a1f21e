use std::path::Path;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use vision::{
    compile, CompileLog, Object, RuntimeError, Script, ScriptOptions, SourceFile, Vocabulary,
    DEFAULT_MAX_CALL_DEPTH,
};

fn compile_str(code: &str) -> Result<vision::Program, CompileLog> {
    compile(
        Arc::new(Vocabulary::standard()),
        &[SourceFile::new("main", code)],
    )
}

fn run_str(code: &str) -> (String, Vec<RuntimeError>) {
    let program = compile_str(code).unwrap_or_else(|log| panic!("compile failed:\n{}", log));
    let mut script = Script::new(program);
    let errors = script.start();
    (script.output_log(), errors)
}

fn run_fixture(name: &str) -> String {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    let file = SourceFile::read(&path).unwrap();
    let program = compile(Arc::new(Vocabulary::standard()), &[file])
        .unwrap_or_else(|log| panic!("{} failed to compile:\n{}", name, log));
    let mut script = Script::new(program);
    let errors = script.start();
    assert!(errors.is_empty(), "{} raised {:?}", name, errors);
    script.output_log()
}

fn first_diagnostic(code: &str) -> String {
    compile_str(code).unwrap_err().diagnostics[0].to_string()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[test]
fn hello_world() {
    assert_eq!(run_fixture("hello.vis"), "Hello World");
}

#[test]
fn variables_and_interpolation() {
    assert_eq!(
        run_fixture("variables.vis"),
        "5\n7.5\nHi 7.5!\n#3+2=5# stays as written"
    );
}

#[test]
fn repeat_runs_its_body_each_time() {
    assert_eq!(run_fixture("repeat.vis"), "hi\nhi\nhi");
}

#[test]
fn false_condition_takes_the_else_branch() {
    assert_eq!(run_fixture("if_else.vis"), "b");
}

#[test]
fn only_one_alternative_of_a_chain_runs() {
    assert_eq!(run_fixture("chain.vis"), "two\ndone");
}

#[test]
fn loops_and_early_stop() {
    assert_eq!(
        run_fixture("loops.vis"),
        "tick 1\ncount is 1\n3\n3\n2\n1\nonce"
    );
}

#[test]
fn block_locals_shadow_hat_locals() {
    assert_eq!(run_fixture("scoping.vis"), "inner\ninner\nouter\nshared");
}

#[test]
fn user_definitions_and_recursion() {
    assert_eq!(run_fixture("definitions.vis"), "Hello, Ada!\n120");
}

#[test]
fn list_operations() {
    assert_eq!(
        run_fixture("collections.vis"),
        "[Zed, Ann, Bob, Cid]\n3\nZed\n3\nfalse\nHi Zed\nHi Bob\nHi Cid\ntrue"
    );
}

#[test]
fn custom_objects_fire_their_hat() {
    assert_eq!(
        run_fixture("objects.vis"),
        "book\nDune\nbook{created: yes, title: Dune}"
    );
}

#[test]
fn math_and_string_reporters() {
    assert_eq!(
        run_fixture("math.vis"),
        "21\n10\n1.5\n3\n4\n4\n7\nabc\n5\nb\ntrue"
    );
}

// ---------------------------------------------------------------------------
// Run-time behaviour
// ---------------------------------------------------------------------------

#[test]
fn a_failing_hat_does_not_stop_its_siblings() {
    let (output, errors) = run_str(
        "when started\n\
         print [first]\n\
         print (missing)\n\
         print [unreachable]\n\
         end\n\
         when started\n\
         print [second]\n\
         end",
    );
    assert_eq!(output, "first\nsecond");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Variable 'missing' could not be found!");
    assert_eq!(errors[0].range.line_start, 3);
}

#[test]
fn hat_locals_are_not_shared_between_hats() {
    let (output, errors) = run_str(
        "when started\n\
         set [x] to [1]\n\
         end\n\
         when started\n\
         print (x)\n\
         end",
    );
    assert_eq!(output, "");
    assert_eq!(errors.len(), 1);
}

#[test]
fn stop_ends_the_hat() {
    let (output, errors) = run_str(
        "when started\n\
         repeat [3]\n\
         print [a]\n\
         stop\n\
         end\n\
         print [b]\n\
         end",
    );
    assert_eq!(output, "a");
    assert!(errors.is_empty());
}

#[test]
fn stop_loop_outside_a_block_is_an_error() {
    let (_, errors) = run_str("when started\nstop loop\nend");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("stop loop"));
}

#[test]
fn defined_reporter_must_return() {
    let (_, errors) = run_str(
        "define reporter nothing\n\
         print [side effect]\n\
         end\n\
         when started\n\
         print (nothing)\n\
         end",
    );
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("without returning"));
}

#[test]
fn runaway_recursion_hits_the_call_depth_limit() {
    let program = compile_str(
        "define command spin\n\
         spin\n\
         end\n\
         when started\n\
         spin\n\
         end",
    )
    .unwrap();
    let options = ScriptOptions {
        max_call_depth: 16,
        ..ScriptOptions::default()
    };
    let mut script = Script::with_options(program, options);
    let errors = script.start();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("Maximum call depth of 16"));
}

#[test]
fn recursion_within_the_default_depth_completes() {
    assert_eq!(DEFAULT_MAX_CALL_DEPTH, 64);
    let (output, errors) = run_str(
        "define reporter down [n]\n\
         if ((n) = 0)\n\
         return [0]\n\
         end\n\
         return ((down ((n) - 1)) + 1)\n\
         end\n\
         when started\n\
         print (down [60])\n\
         end",
    );
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(output, "60");
}

#[test]
fn unknown_names_in_expressions_are_errors() {
    let (output, errors) = run_str(
        "when started\n\
         if (flag = true)\n\
         print [yes]\n\
         else\n\
         print [no]\n\
         end\n\
         end",
    );
    assert_eq!(output, "");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "Variable 'flag' could not be found!");
}

#[test]
fn substituted_values_are_not_parsed_again() {
    let (output, errors) = run_str(
        "when started\n\
         set [sum] to [1 + 1]\n\
         set [name] to [flag]\n\
         print ((sum) = 2)\n\
         print ((name) = (name))\n\
         end",
    );
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(output, "false\ntrue");
}

#[test]
fn self_containing_list_prints_a_placeholder() {
    let (output, errors) = run_str(
        "when started\n\
         set [l] to (new list)\n\
         for (l) add (l)\n\
         print (l)\n\
         end",
    );
    assert!(errors.is_empty());
    assert_eq!(output, "[[...]]");
}

#[test]
fn constants_leave_short_names_to_variables() {
    let (output, errors) = run_str(
        "when started\n\
         set [e] to [5]\n\
         print (e)\n\
         print ((e) + 1)\n\
         print (e + 1)\n\
         print (round (e constant))\n\
         print (round ((pi constant) * 100))\n\
         end",
    );
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(output, "5\n6\n6\n3\n314");
}

#[test]
fn list_is_an_ordinary_variable_name() {
    let (output, errors) = run_str(
        "when started\n\
         set [list] to [5]\n\
         print (list)\n\
         print (((list)) + 1)\n\
         end",
    );
    assert!(errors.is_empty(), "{:?}", errors);
    assert_eq!(output, "5\n6");
}

#[test]
fn random_whole_numbers_cover_the_inclusive_range() {
    let program = compile_str(
        "when started\n\
         set global [seen] to (new list)\n\
         repeat [300]\n\
         for (seen) add (random from [1] to [3])\n\
         end\n\
         end",
    )
    .unwrap();
    let mut script = Script::new(program);
    assert!(script.start().is_empty());

    let Some(Object::List(seen)) = script.global("seen") else {
        panic!("seen is not a list");
    };
    let values: Vec<f64> = seen
        .borrow()
        .iter()
        .map(|o| o.as_number().unwrap())
        .collect();
    assert_eq!(values.len(), 300);
    assert!(values.iter().all(|v| v.fract() == 0.0 && (1.0..=3.0).contains(v)));
    assert!(values.contains(&1.0));
    assert!(values.contains(&3.0));
}

#[test]
fn random_fractional_bounds_stay_in_range() {
    let program = compile_str(
        "when started\n\
         set global [seen] to (new list)\n\
         repeat [100]\n\
         for (seen) add (random from [0.5] to [1.5])\n\
         end\n\
         end",
    )
    .unwrap();
    let mut script = Script::new(program);
    assert!(script.start().is_empty());

    let Some(Object::List(seen)) = script.global("seen") else {
        panic!("seen is not a list");
    };
    assert!(seen
        .borrow()
        .iter()
        .all(|o| (0.5..=1.5).contains(&o.as_number().unwrap())));
}

#[test]
fn random_with_reversed_bounds_is_an_error() {
    let (output, errors) = run_str(
        "when started\n\
         print (random from [5] to [1])\n\
         end",
    );
    assert_eq!(output, "");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("greater than"));
}

#[test]
fn reporters_are_evaluated_on_every_read() {
    let (output, _) = run_str(
        "when started\n\
         set [l] to (new list)\n\
         repeat [3]\n\
         for (l) add (for (l) size)\n\
         end\n\
         print (l)\n\
         end",
    );
    assert_eq!(output, "[0, 1, 2]");
}

#[test]
fn hats_can_be_started_with_arguments() {
    let program = compile_str(
        "when custom object (thing) created\n\
         print [got #thing#]\n\
         end",
    )
    .unwrap();
    let mut script = Script::new(program);
    let errors = script.start_with("when custom object () created", &[Object::text("x")]);
    assert!(errors.is_empty());
    assert_eq!(script.output_log(), "got x");
}

#[test]
fn globals_outlive_the_hat() {
    let program = compile_str("when started\nset global [answer] to (6*7)\nend").unwrap();
    let mut script = Script::new(program);
    script.start();
    assert_eq!(script.global("answer").map(|o| o.to_string()), Some("42".to_string()));
}

#[test]
fn custom_vocabulary_is_pluggable() {
    let mut vocabulary = Vocabulary::new();
    vocabulary.add_hat("on ping");
    vocabulary.add_command("shout []", |p| {
        let text = p.str(0)?.to_uppercase();
        p.print(text);
        Ok(())
    });
    let program = compile(
        Arc::new(vocabulary),
        &[SourceFile::new("main", "on ping\nshout [hey]\nend")],
    )
    .unwrap();
    let mut script = Script::new(program);
    assert!(script.start_hat("on ping").is_empty());
    assert_eq!(script.output_log(), "HEY");
}

// ---------------------------------------------------------------------------
// Compile errors
// ---------------------------------------------------------------------------

#[test]
fn unmatched_bracket_is_reported_with_its_position() {
    assert_eq!(
        first_diagnostic("when started\nprint [a] )\nend"),
        "main:2:10-2:11: There are more ')' than '(' in this line. (line imbalance)"
    );
}

#[test]
fn indented_lines_report_their_real_column() {
    assert_eq!(
        first_diagnostic("when started\n\t\tprint [a] )\nend"),
        "main:2:12-2:13: There are more ')' than '(' in this line. (line imbalance)"
    );
}

#[test]
fn every_bracket_error_is_collected() {
    let log = compile_str("when started\nprint (a\nprint {b)\nend").unwrap_err();
    assert_eq!(log.diagnostics.len(), 2);
    assert_eq!(log.diagnostics[1].kind, "parameter mismatch");
}

#[test]
fn missing_and_extra_ends() {
    assert_eq!(
        first_diagnostic("when started\nprint [a]"),
        "main:2:0-2:9: There are not enough 'end's! (end imbalance)"
    );
    assert_eq!(
        first_diagnostic("when started\nend\nend"),
        "main:3:0-3:3: There are more 'end's than Hats or CBlocks! (end imbalance)"
    );
}

#[test]
fn unknown_lines_are_invalid() {
    assert_eq!(
        first_diagnostic("when stopped\nend"),
        "main:1:0-1:12: 'when stopped' is not a valid Hat (invalid code)"
    );
    assert_eq!(
        first_diagnostic("when started\nprint [a] [b]\nend"),
        "main:2:0-2:13: 'print [a] [b]' is not a valid Command (invalid code)"
    );
}

#[test]
fn blocks_do_not_span_files() {
    let files = [
        SourceFile::new("a", "when started\nrepeat [2]\nprint [x]\nend"),
        SourceFile::new("b", "end\nend"),
    ];
    let log = compile(Arc::new(Vocabulary::standard()), &files).unwrap_err();
    assert_eq!(
        log.diagnostics[0].range.as_ref().map(|r| r.file.to_string()),
        Some("a".to_string())
    );
}
