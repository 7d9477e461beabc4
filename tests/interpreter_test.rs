use std::{
    fs::{read_dir, read_to_string},
    path::Path,
    sync::Arc,
};

use arucas::{
    environment::context::BufferedContext,
    error::{
        formatter::{BasicFormatter, ErrorFormatter},
        CodeError, ErrorKind,
    },
    lexer::KEYWORD_HASHMAP,
    native::BuiltInCatalogue,
    value::{Value, ValueKind},
    Interpreter,
};
use color_eyre::{eyre::Context, Result};
use proptest::prelude::*;

struct Run {
    result: Result<Value, CodeError>,
    interpreter: Interpreter,
    context: Arc<BufferedContext>,
}

impl Run {
    fn new(source: &str) -> Self {
        let context = Arc::new(BufferedContext::new());
        let mut interpreter = Interpreter::new(context.clone());
        let result = interpreter.run("test", source);
        interpreter.join_threads();
        Self {
            result,
            interpreter,
            context,
        }
    }

    fn variable(&self, name: &str) -> Value {
        if let Err(error) = &self.result {
            panic!("Program failed: {}", BasicFormatter.format_error(error));
        }
        self.interpreter
            .get_variable(name)
            .unwrap_or_else(|| panic!("{name} should be defined"))
    }

    fn error(&self) -> &CodeError {
        match &self.result {
            Ok(value) => panic!("Expected the program to fail but it produced {value}"),
            Err(error) => error,
        }
    }
}

fn number(value: &Value) -> f64 {
    value
        .as_number()
        .unwrap_or_else(|| panic!("Expected a number but got {value}"))
}

// Scripted programs

struct TestCase {
    name: String,
    source: String,
    output: String,
}

impl TestCase {
    fn check(&self) {
        let run = Run::new(&self.source);
        if let Err(error) = &run.result {
            panic!(
                "Failed test {} at runtime.\n{}",
                self.name,
                BasicFormatter.format_error(error)
            );
        }
        assert_eq!(
            self.output,
            run.context.contents(),
            "Failed test {} at print.",
            self.name
        );
    }
}

fn parse_test_case(input_path: &Path) -> Result<TestCase> {
    let name = input_path.to_string_lossy().into_owned();
    let source = read_to_string(input_path).context("Failed to open input test data file")?;
    let output = source
        .lines()
        .filter_map(|line| {
            let index = line.find("// expect:")?;
            Some(format!("{}\n", line[index + "// expect:".len()..].trim()))
        })
        .collect();
    Ok(TestCase {
        name,
        source,
        output,
    })
}

#[test]
fn test_scripts() -> Result<()> {
    let input_dir = Path::new("./test_data/interpreter");
    let mut succeeded = true;
    for entry in read_dir(input_dir).context("Failed to open input test data folder")? {
        let path = entry?.path();
        if path.extension().map_or(true, |extension| extension != "arucas") {
            continue;
        }
        let test_case = parse_test_case(&path)?;
        println!("Checking {}", test_case.name);
        if std::panic::catch_unwind(|| test_case.check()).is_err() {
            println!("\tFails test case {}", test_case.name);
            succeeded = false;
        }
    }
    assert!(succeeded, "Some scripts failed");
    Ok(())
}

// Scenarios

#[test]
fn function_call_result_is_assigned() {
    let run = Run::new("fun add(x,y){return x+y;} Z = add(2,3);");
    assert_eq!(number(&run.variable("Z")), 5.0);
}

#[test]
fn switch_returns_from_enclosing_function() {
    let run = Run::new("fun pick() { switch(5){case 4,5,6 -> return 'two';} } result = pick();");
    let result = run.variable("result");
    assert!(matches!(&result.kind, ValueKind::String(s) if s == "two"));
}

#[test]
fn missing_constructor_names_the_class() {
    let run = Run::new("class Pair { Pair() {} Pair(a, b) {} } p = new Pair(1);");
    let error = run.error();
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert_eq!(error.message, "No such constructor for Pair");
}

#[test]
fn boolean_operators_short_circuit() {
    let run = Run::new(
        "count = 0;
        fun effect() { count = count + 1; return true; }
        a = false && effect();
        b = true || effect();",
    );
    assert_eq!(number(&run.variable("count")), 0.0);
    assert_eq!(run.variable("a").as_boolean(), Some(false));
    assert_eq!(run.variable("b").as_boolean(), Some(true));
}

#[test]
fn containers_are_shared_and_primitives_copied() {
    let run = Run::new(
        "a = [1]; b = a; a.append(2);
        m = {}; n = m; m.put('k', 'v');
        x = 1; y = x; x = 5;
        s = 'one'; t = s; s = 'two';
        p = true; q = p; p = false;",
    );
    assert_eq!(run.variable("b").to_string(), "[1, 2]");
    assert_eq!(run.variable("n").to_string(), "{k: v}");
    assert_eq!(number(&run.variable("y")), 1.0);
    assert_eq!(run.variable("t").to_string(), "one");
    assert_eq!(run.variable("q").as_boolean(), Some(true));
}

#[test]
fn unknown_identifier() {
    let run = Run::new("print(missing);");
    let error = run.error();
    assert_eq!(error.kind, ErrorKind::UnknownIdentifier);
    assert_eq!(error.message, "missing is not defined");

    let run = Run::new("doesNotExist(1);");
    assert_eq!(run.error().kind, ErrorKind::UnknownIdentifier);
}

#[test]
fn callee_locals_are_not_visible_to_called_functions() {
    let run = Run::new(
        "fun read() { return hidden; }
        fun caller() { hidden = 1; return read(); }
        caller();",
    );
    assert_eq!(run.error().kind, ErrorKind::UnknownIdentifier);
}

#[test]
fn control_flow_outside_its_boundary_fails() {
    for (source, message) in [
        ("break;", "Cannot break here"),
        ("continue;", "Cannot continue here"),
        ("return 1;", "Cannot return here"),
        ("fun f() { break; } f();", "Cannot break here"),
        ("while (true) { fun g() { continue; } g(); }", "Cannot continue here"),
        ("switch (1) { case 1 -> continue; }", "Cannot continue here"),
    ] {
        let run = Run::new(source);
        let error = run.error();
        assert_eq!(error.kind, ErrorKind::Runtime, "{source}");
        assert_eq!(error.message, message, "{source}");
    }
}

#[test]
fn operator_errors_are_illegal_operations() {
    let cases = [
        ("x = 1 / 0;", "Cannot divide by 0"),
        (
            "x = true + 1;",
            "The operation '+' cannot be applied to 'true' and '1'",
        ),
        ("x = -'a';", "The operation '-' cannot be applied to 'a'"),
        ("x = 1 && true;", "The operation '&&' cannot be applied to '1'"),
        (
            "if (1) {}",
            "Condition must result in either 'true' or 'false'",
        ),
    ];
    for (source, message) in cases {
        let run = Run::new(source);
        let error = run.error();
        assert_eq!(error.kind, ErrorKind::IllegalOperation, "{source}");
        assert_eq!(error.message, message, "{source}");
    }
}

#[test]
fn built_in_and_class_names_cannot_be_reused() {
    let run = Run::new("print = 5;");
    assert_eq!(run.error().kind, ErrorKind::IllegalOperation);
    assert_eq!(
        run.error().message,
        "print() is already defined as a built in function"
    );

    let run = Run::new("fun len(x) {}");
    assert_eq!(run.error().kind, ErrorKind::IllegalOperation);

    let run = Run::new("class A {} class A {}");
    assert_eq!(run.error().message, "A is already defined as a class");
}

#[test]
fn arity_mismatches() {
    let run = Run::new("fun f(a) {} f(1, 2);");
    assert_eq!(run.error().message, "1 too many arguments passed into f");

    let run = Run::new("fun f(a, b, c) {} f(1);");
    assert_eq!(run.error().message, "2 too few arguments passed into f");

    let run = Run::new("x = sin('a');");
    assert_eq!(
        run.error().message,
        "Must pass Number into parameter 0 for sin()"
    );
}

#[test]
fn stop_ends_the_program_quietly() {
    let run = Run::new("print('a'); stop(); print('b');");
    assert!(run.result.is_ok());
    assert_eq!(run.context.contents(), "a\n");
}

#[test]
fn input_reads_scripted_lines() {
    let context = Arc::new(BufferedContext::with_input(["Ada"]));
    let mut interpreter = Interpreter::new(context.clone());
    let result = interpreter.run("test", "name = input('Name?'); again = input('More?');");
    assert!(result.is_ok());
    assert_eq!(
        interpreter.get_variable("name").map(|v| v.to_string()),
        Some("Ada".to_string())
    );
    assert!(matches!(
        interpreter.get_variable("again").map(|v| v.kind),
        Some(ValueKind::Null)
    ));
    assert_eq!(context.contents(), "Name?\nMore?\n");
}

#[test]
fn runtime_errors_render_with_their_call_stack() {
    let run = Run::new("fun boom() {\n    throwRuntimeError('bad');\n}\nboom();");
    assert_eq!(
        BasicFormatter.format_error(run.error()),
        "Runtime Error - 'bad'\nFile: test, Line: 2, Column: 5\n  at boom (Line: 1, Column: 1)\n  at test"
    );
}

#[test]
fn syntax_errors_render_their_position() {
    let run = Run::new("x = 1;\ny = ;");
    let error = run.error();
    assert_eq!(error.kind, ErrorKind::IllegalSyntax);
    assert_eq!(error.position(), Some((2, 5)));
}

#[test]
fn host_registered_functions_are_callable() {
    use arucas::native::BuiltInFunction;

    let mut catalogue = BuiltInCatalogue::standard();
    catalogue.register(BuiltInFunction::function(
        "double",
        &["value"],
        |environment, call| {
            let value = call.number(environment, 0)?;
            Ok(Value::number(value * 2.0, call.span))
        },
    ));
    let context = Arc::new(BufferedContext::new());
    let mut interpreter = Interpreter::with_catalogue(context, catalogue);
    let value = interpreter.run("host", "double(21);").expect("Program should run");
    assert_eq!(value.as_number(), Some(42.0));
}

#[test]
fn maps_accept_themselves_as_keys() {
    let run = Run::new(
        "m = {}; m.put({}, 1);
        before = m.containsKey(m);
        m.put(m, 2);
        after = m.containsKey(m);
        value = m.get(m);
        removed = m.remove(m);
        size = len(m);",
    );
    assert_eq!(run.variable("before").as_boolean(), Some(false));
    assert_eq!(run.variable("after").as_boolean(), Some(true));
    assert_eq!(number(&run.variable("value")), 2.0);
    assert_eq!(number(&run.variable("removed")), 2.0);
    assert_eq!(number(&run.variable("size")), 1.0);
}

#[test]
fn cyclic_containers_render_and_compare() {
    let run = Run::new(
        "m = {}; m.put(1, m); print(m);
        a = []; b = [a]; a.append(b); print(a);
        c = []; d = [c]; c.append(d);
        same = a == c;",
    );
    assert_eq!(run.context.contents(), "{1: {...}}\n[[[...]]]\n");
    assert_eq!(run.variable("same").as_boolean(), Some(true));
}

#[test]
fn top_level_return_evaluates_its_operand() {
    let run = Run::new(
        "count = 0;
        fun effect() { count = count + 1; return count; }
        return effect();",
    );
    assert_eq!(run.error().message, "Cannot return here");
    let count = run.interpreter.get_variable("count").and_then(|v| v.as_number());
    assert_eq!(count, Some(1.0));
}

#[test]
fn random_stays_below_its_bound() {
    let run = Run::new(
        "ok = true; i = 0;
        while (i < 50) {
            r = random(10);
            if (r < 0 || r >= 10 || r.round() != r) { ok = false; }
            i = i + 1;
        }",
    );
    assert_eq!(run.variable("ok").as_boolean(), Some(true));

    let run = Run::new("random(0);");
    assert_eq!(run.error().kind, ErrorKind::Runtime);
    assert_eq!(run.error().message, "Bound must be positive");
}

#[test]
fn get_time_is_a_clock_reading() {
    let run = Run::new("t = getTime();");
    let time = run.variable("t").to_string();
    let parts: Vec<_> = time.split(':').collect();
    assert_eq!(parts.len(), 3, "{time}");
    assert!(parts
        .iter()
        .all(|part| part.len() == 2 && part.chars().all(|c| c.is_ascii_digit())));
}

// Property-based tests

proptest! {
    #[test]
    fn division_then_multiplication_recovers_the_dividend(
        a in -1.0e6f64..1.0e6,
        b in prop_oneof![-1.0e6f64..-1.0e-3, 1.0e-3f64..1.0e6],
    ) {
        let run = Run::new(&format!("q = ({a}) / ({b}) * ({b});"));
        let q = number(&run.variable("q"));
        prop_assert!((q - a).abs() <= 1e-9 * a.abs().max(1.0), "{q} != {a}");
    }

    #[test]
    fn assigned_variables_read_back(name in "[a-z][a-zA-Z0-9_]{0,8}", value in 0u32..100_000) {
        prop_assume!(!KEYWORD_HASHMAP.contains_key(name.as_str()));
        prop_assume!(!BuiltInCatalogue::standard().contains(&name));

        let run = Run::new(&format!("{name} = {value};"));
        prop_assert_eq!(number(&run.variable(&name)), value as f64);

        let run = Run::new(&format!("{name};"));
        prop_assert_eq!(run.error().kind, ErrorKind::UnknownIdentifier);
    }
}
