pub mod environment;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod native;
pub mod parser;
pub mod source;
pub mod value;

use environment::{context::SystemContext, Environment};
use error::{CodeError, ErrorKind};
use evaluator::{ControlSignal, EvalResult, Unwind};
use native::BuiltInCatalogue;
use parser::Parser;
pub use source::SourceFile;
use std::sync::Arc;
use tracing::debug;
use value::Value;

/// Parses `file` and evaluates it at the environment's cursor. Errors leave
/// with `file` attached unless a deeper boundary already attached its own.
pub fn evaluate_source(environment: &mut Environment, file: &Arc<SourceFile>) -> EvalResult {
    let program = Parser::new(file)
        .parse()
        .map_err(|error| CodeError::from(error).with_file(file))?;
    match program.body.visit(environment) {
        Err(Unwind::Error(error)) => Err(Unwind::Error(error.with_file(file))),
        result => result,
    }
}

/// Program entry. Each call to [`Interpreter::run`] starts a new program
/// with its own registry root; the last program stays inspectable.
pub struct Interpreter {
    context: Arc<dyn SystemContext>,
    catalogue: Arc<BuiltInCatalogue>,
    environment: Option<Environment>,
}

impl Interpreter {
    pub fn new(context: Arc<dyn SystemContext>) -> Self {
        Self::with_catalogue(context, BuiltInCatalogue::standard())
    }

    /// Uses a host-extended catalogue, which is frozen from here on.
    pub fn with_catalogue(context: Arc<dyn SystemContext>, catalogue: BuiltInCatalogue) -> Self {
        Self {
            context,
            catalogue: Arc::new(catalogue),
            environment: None,
        }
    }

    pub fn run(&mut self, display_name: &str, source: &str) -> Result<Value, CodeError> {
        debug!(program = display_name, "starting program");
        let file = SourceFile::new(display_name, source);
        let mut environment = Environment::new(
            display_name,
            Arc::clone(&self.catalogue),
            Arc::clone(&self.context),
        );
        let result = evaluate_source(&mut environment, &file);
        self.environment = Some(environment);

        match result {
            Ok(value) => Ok(value),
            Err(Unwind::Signal(ControlSignal::Stop)) => {
                debug!(program = display_name, "program stopped");
                Ok(Value::null(Default::default()))
            }
            Err(Unwind::Signal(signal)) => {
                let message = match signal {
                    ControlSignal::Break => "Cannot break here",
                    ControlSignal::Continue => "Cannot continue here",
                    _ => "Cannot return here",
                };
                Err(CodeError::new(ErrorKind::Runtime, message, Default::default())
                    .with_file(&file))
            }
            Err(Unwind::Error(error)) => Err(error),
        }
    }

    /// Reads a global of the last program run.
    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.environment.as_ref()?.get(name)
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    /// Blocks until every unit spawned by the last program has ended.
    pub fn join_threads(&self) {
        if let Some(environment) = &self.environment {
            environment.threads().join_all();
        }
    }
}
