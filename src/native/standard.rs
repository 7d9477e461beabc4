use super::{BuiltInCatalogue, BuiltInFunction, NativeCall};
use crate::{
    environment::Environment,
    evaluator::{ControlSignal, EvalResult, TreeWalkEvaluator, Unwind},
    source::SourceFile,
    value::{Value, ValueKind},
};
use std::{
    fs,
    path::Path,
    thread,
    time::{Duration, Instant},
};
use chrono::Local;
use rand::Rng;
use tracing::debug;

const SLEEP_SLICE: Duration = Duration::from_millis(10);

pub(super) fn register(catalogue: &mut BuiltInCatalogue) {
    register_io(catalogue);
    register_program(catalogue);
    register_files(catalogue);
    register_kinds(catalogue);
    register_trigonometry(catalogue);
    register_utilities(catalogue);
}

fn register_io(catalogue: &mut BuiltInCatalogue) {
    catalogue.register(BuiltInFunction::function(
        "print",
        &["printValue"],
        |environment, call| {
            environment.context().println(&call.value(0).to_string());
            Ok(Value::null(call.span))
        },
    ));
    catalogue.register(BuiltInFunction::function(
        "input",
        &["prompt"],
        |environment, call| {
            let prompt = call.string(environment, 0)?;
            environment.check_interrupted(call.span)?;
            environment.context().println(&prompt);
            Ok(match environment.context().read_line() {
                Some(line) => Value::string(line, call.span),
                None => Value::null(call.span),
            })
        },
    ));
    catalogue.register(BuiltInFunction::function(
        "sleep",
        &["milliseconds"],
        |environment, call| {
            let milliseconds = call.number(environment, 0)?.max(0.0);
            // A wait too long to represent lasts until the unit is interrupted.
            let deadline = Duration::try_from_secs_f64(milliseconds / 1000.0)
                .ok()
                .and_then(|duration| Instant::now().checked_add(duration));
            loop {
                environment.check_interrupted(call.span)?;
                let remaining = match deadline {
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        deadline - now
                    }
                    None => SLEEP_SLICE,
                };
                thread::sleep(SLEEP_SLICE.min(remaining));
            }
            Ok(Value::null(call.span))
        },
    ));
}

fn register_program(catalogue: &mut BuiltInCatalogue) {
    catalogue.register(BuiltInFunction::function("stop", &[], |_, _| {
        Err(Unwind::Signal(ControlSignal::Stop))
    }));
    catalogue.register(BuiltInFunction::function("len", &["value"], |environment, call| {
        let value = call.value(0);
        let length = match &value.kind {
            ValueKind::List(list) => list.lock().len(),
            ValueKind::Map(map) => map.lock().len(),
            ValueKind::String(string) => string.chars().count(),
            _ => {
                return Err(environment
                    .runtime_error(format!("Cannot pass {value} into len()"), call.span)
                    .into())
            }
        };
        Ok(Value::number(length as f64, call.span))
    }));
    catalogue.register(BuiltInFunction::function(
        "throwRuntimeError",
        &["message"],
        |environment, call| {
            let message = call.string(environment, 0)?;
            Err(environment.runtime_error(message, call.span).into())
        },
    ));
    catalogue.register(BuiltInFunction::function(
        "callFunctionWithList",
        &["function", "argList"],
        |environment, call| {
            let function = call.function(environment, 0)?;
            let arguments = call.list(environment, 1)?.lock().clone();
            TreeWalkEvaluator.call_function(environment, &function, arguments, call.span)
        },
    ));
    catalogue.register(BuiltInFunction::function(
        "runFromString",
        &["string"],
        |environment, call| {
            let source = call.string(environment, 0)?;
            let file = SourceFile::new("string-run", &source);
            crate::evaluate_source(environment, &file)
        },
    ));
    catalogue.register(BuiltInFunction::function("run", &["path"], run_file));
}

fn run_file(environment: &mut Environment, call: &NativeCall) -> EvalResult {
    let path = call.string(environment, 0)?;
    let text = fs::read_to_string(path.as_str()).map_err(|error| {
        environment.runtime_error(
            format!("Failed to execute script '{path}' \n{error}"),
            call.span,
        )
    })?;
    debug!(%path, "running script");
    let file = SourceFile::new(&path, &text);
    let mut child = environment.fresh_root(&path);
    match crate::evaluate_source(&mut child, &file) {
        Err(Unwind::Signal(ControlSignal::Stop)) => Ok(Value::null(call.span)),
        result => result,
    }
}

fn register_files(catalogue: &mut BuiltInCatalogue) {
    catalogue.register(BuiltInFunction::function(
        "readFile",
        &["path"],
        |environment, call| {
            let path = call.string(environment, 0)?;
            let text = fs::read_to_string(path.as_str()).map_err(|error| {
                environment.runtime_error(
                    format!("There was an error reading the file: \"{path}\"\n{error}"),
                    call.span,
                )
            })?;
            Ok(Value::string(text, call.span))
        },
    ));
    catalogue.register(BuiltInFunction::function(
        "writeFile",
        &["path", "string"],
        |environment, call| {
            let path = call.string(environment, 0)?;
            let contents = call.string(environment, 1)?;
            fs::write(path.as_str(), format!("{contents}\n")).map_err(|error| {
                environment.runtime_error(
                    format!("There was an error writing the file: \"{path}\"\n{error}"),
                    call.span,
                )
            })?;
            Ok(Value::null(call.span))
        },
    ));
    catalogue.register(BuiltInFunction::function(
        "createDirectory",
        &["path"],
        |environment, call| {
            let path = call.string(environment, 0)?;
            let created = !Path::new(path.as_str()).exists()
                && fs::create_dir_all(path.as_str()).is_ok();
            Ok(Value::boolean(created, call.span))
        },
    ));
    catalogue.register(BuiltInFunction::function(
        "doesFileExist",
        &["path"],
        |environment, call| {
            let path = call.string(environment, 0)?;
            Ok(Value::boolean(Path::new(path.as_str()).exists(), call.span))
        },
    ));
    catalogue.register(BuiltInFunction::function(
        "getFileList",
        &["path"],
        |environment, call| {
            let path = call.string(environment, 0)?;
            let entries = fs::read_dir(path.as_str()).map_err(|_| {
                environment.runtime_error("Could not find any files", call.span)
            })?;
            let names = entries
                .filter_map(Result::ok)
                .map(|entry| {
                    Value::string(entry.file_name().to_string_lossy().as_ref(), call.span)
                })
                .collect();
            Ok(Value::list(names, call.span))
        },
    ));
    catalogue.register(BuiltInFunction::function(
        "getDirectory",
        &[],
        |environment, call| {
            let directory = std::env::current_dir().map_err(|error| {
                environment.runtime_error(error.to_string(), call.span)
            })?;
            Ok(Value::string(
                directory.to_string_lossy().as_ref(),
                call.span,
            ))
        },
    ));
}

fn register_kinds(catalogue: &mut BuiltInCatalogue) {
    fn kind_check(
        name: &'static str,
        check: fn(&ValueKind) -> bool,
    ) -> BuiltInFunction {
        BuiltInFunction::function(name, &["value"], move |_, call| {
            Ok(Value::boolean(check(&call.value(0).kind), call.span))
        })
    }

    catalogue.register(kind_check("isNumber", |kind| {
        matches!(kind, ValueKind::Number(_))
    }));
    catalogue.register(kind_check("isString", |kind| {
        matches!(kind, ValueKind::String(_))
    }));
    catalogue.register(kind_check("isBoolean", |kind| {
        matches!(kind, ValueKind::Boolean(_))
    }));
    catalogue.register(kind_check("isFunction", |kind| {
        matches!(kind, ValueKind::Function(_))
    }));
    catalogue.register(kind_check("isList", |kind| matches!(kind, ValueKind::List(_))));
    catalogue.register(kind_check("isMap", |kind| matches!(kind, ValueKind::Map(_))));
}

fn register_trigonometry(catalogue: &mut BuiltInCatalogue) {
    fn unary(name: &'static str, operation: fn(f64) -> f64) -> BuiltInFunction {
        BuiltInFunction::function(name, &["value"], move |environment, call| {
            let value = call.number(environment, 0)?;
            Ok(Value::number(operation(value), call.span))
        })
    }

    catalogue.register(unary("sin", f64::sin));
    catalogue.register(unary("cos", f64::cos));
    catalogue.register(unary("tan", f64::tan));
    catalogue.register(unary("arcsin", f64::asin));
    catalogue.register(unary("arccos", f64::acos));
    catalogue.register(unary("arctan", f64::atan));
    catalogue.register(unary("cosec", |v| 1.0 / v.sin()));
    catalogue.register(unary("sec", |v| 1.0 / v.cos()));
    catalogue.register(unary("cot", |v| 1.0 / v.tan()));
}

fn register_utilities(catalogue: &mut BuiltInCatalogue) {
    catalogue.register(BuiltInFunction::function(
        "random",
        &["bound"],
        |environment, call| {
            let bound = call.number(environment, 0)?.trunc();
            if !(1.0..=i64::MAX as f64).contains(&bound) {
                return Err(environment
                    .runtime_error("Bound must be positive", call.span)
                    .into());
            }
            let value = rand::thread_rng().gen_range(0..bound as i64);
            Ok(Value::number(value as f64, call.span))
        },
    ));
    catalogue.register(BuiltInFunction::function("getTime", &[], |_, call| {
        let now = Local::now().format("%H:%M:%S").to_string();
        Ok(Value::string(now, call.span))
    }));
}
