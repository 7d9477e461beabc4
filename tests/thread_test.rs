use std::sync::Arc;

use arucas::{
    environment::context::BufferedContext,
    error::{CodeError, ErrorKind},
    value::Value,
    Interpreter,
};
use color_eyre::Result;

fn run(source: &str) -> (Result<Value, CodeError>, Interpreter, Arc<BufferedContext>) {
    let context = Arc::new(BufferedContext::new());
    let mut interpreter = Interpreter::new(context.clone());
    let result = interpreter.run("threads", source);
    interpreter.join_threads();
    (result, interpreter, context)
}

#[test]
fn concurrent_units_keep_private_locals() -> Result<()> {
    let source = "
        class Counter {
            var value = 0;
            fun increment() {
                this.value = this.value + 1;
            }
        }
        fun work(limit) {
            counter = new Counter();
            i = 0;
            while (i < limit) {
                counter.increment();
                i = i + 1;
            }
            return counter.value;
        }
        first = runThreaded(work, [10000]);
        second = runThreaded(work, [10000]);
        a = joinThread(first);
        b = joinThread(second);
    ";
    let (result, interpreter, _) = run(source);
    result?;
    for name in ["a", "b"] {
        let value = interpreter.get_variable(name).and_then(|v| v.as_number());
        assert_eq!(value, Some(10000.0), "{name}");
    }
    let first = interpreter.get_variable("first").and_then(|v| v.as_number());
    let second = interpreter.get_variable("second").and_then(|v| v.as_number());
    assert_ne!(first, second);
    Ok(())
}

#[test]
fn units_share_globals_of_the_program_root() -> Result<()> {
    let source = "
        results = [];
        fun record(v) {
            results.append(v);
        }
        joinThread(runThreaded(record, [1]));
        joinThread(runThreaded(record, [2]));
    ";
    let (result, interpreter, _) = run(source);
    result?;
    let results = interpreter.get_variable("results").map(|v| v.to_string());
    assert_eq!(results.as_deref(), Some("[1, 2]"));
    Ok(())
}

#[test]
fn stopped_units_report_an_interrupt() -> Result<()> {
    let source = "
        fun spin() {
            while (true) {
                sleep(5);
            }
        }
        id = runThreaded(spin, []);
        sleep(20);
        stopThread(id);
        outcome = joinThread(id);
    ";
    let (result, interpreter, context) = run(source);
    result?;
    assert!(context.contents().starts_with("Program interrupted - ''"));
    assert!(matches!(
        interpreter.get_variable("outcome").map(|v| v.to_string()),
        Some(s) if s == "null"
    ));
    Ok(())
}

#[test]
fn uncaught_errors_stay_inside_their_unit() -> Result<()> {
    let source = "
        fun fail() {
            throwRuntimeError('boom');
        }
        joinThread(runThreaded(fail, []));
        after = 1;
    ";
    let (result, interpreter, context) = run(source);
    result?;
    assert!(context.contents().starts_with("Runtime Error - 'boom'"));
    assert!(interpreter.get_variable("after").is_some());
    Ok(())
}

#[test]
fn stop_inside_a_unit_ends_it_silently() -> Result<()> {
    let source = "
        fun quit() {
            stop();
        }
        joinThread(runThreaded(quit, []));
        print('still running');
    ";
    let (result, _, context) = run(source);
    result?;
    assert_eq!(context.contents(), "still running\n");
    Ok(())
}

#[test]
fn stop_thread_rejects_unknown_and_finished_units() {
    let (result, _, _) = run("stopThread(99);");
    let error = result.unwrap_err();
    assert_eq!(error.kind, ErrorKind::Runtime);
    assert_eq!(error.message, "No thread with id 99");

    let source = "
        fun quick() {
            return 1;
        }
        id = runThreaded(quick, []);
        joinThread(id);
        stopThread(id);
    ";
    let (result, _, _) = run(source);
    assert_eq!(result.unwrap_err().message, "Thread is not alive");
}

#[test]
fn unrepresentable_sleeps_wait_until_stopped() -> Result<()> {
    let source = "
        fun nap() {
            sleep(2 ^ 1000);
        }
        id = runThreaded(nap, []);
        sleep(20);
        stopThread(id);
        joinThread(id);
    ";
    let (result, _, context) = run(source);
    result?;
    assert!(context.contents().starts_with("Program interrupted - ''"));
    Ok(())
}

#[test]
fn joined_units_leave_the_table() -> Result<()> {
    let source = "
        fun quick(v) {
            return v;
        }
        id = runThreaded(quick, [7]);
        first = joinThread(id);
        second = joinThread(id);
    ";
    let (result, interpreter, _) = run(source);
    result?;
    let first = interpreter.get_variable("first").and_then(|v| v.as_number());
    assert_eq!(first, Some(7.0));
    let second = interpreter.get_variable("second").map(|v| v.to_string());
    assert_eq!(second.as_deref(), Some("null"));

    let threads = interpreter
        .environment()
        .map(|environment| environment.threads().is_empty());
    assert_eq!(threads, Some(true));
    Ok(())
}
