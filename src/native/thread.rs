use super::{BuiltInCatalogue, BuiltInFunction};
use crate::{
    environment::Environment,
    error::{
        formatter::{BasicFormatter, ErrorFormatter},
        CodeError,
    },
    evaluator::{ControlSignal, TreeWalkEvaluator, Unwind},
    lexer::Span,
    value::{FunctionValue, Value},
};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};
use tracing::{debug, warn};

struct ThreadUnit {
    handle: Option<JoinHandle<Option<Value>>>,
    interrupt: Arc<AtomicBool>,
}

/// Evaluation units spawned by a program, keyed by the id handed back to the
/// script.
#[derive(Default)]
pub struct ThreadTable {
    next_id: AtomicU64,
    units: Mutex<HashMap<u64, ThreadUnit>>,
}

impl std::fmt::Debug for ThreadTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadTable")
            .field("units", &self.units.lock().len())
            .finish_non_exhaustive()
    }
}

impl ThreadTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `function` on a new OS thread against a branch of the program
    /// root. Returns immediately with the unit's id.
    pub fn spawn(
        &self,
        environment: &Environment,
        function: Arc<FunctionValue>,
        arguments: Vec<Value>,
        span: Span,
    ) -> Result<u64, CodeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let interrupt = Arc::new(AtomicBool::new(false));
        let mut branch = environment.root_branch();
        branch.set_interrupt(Arc::clone(&interrupt));

        let handle = thread::Builder::new()
            .name(format!("arucas-{id}"))
            .spawn(move || run_unit(id, branch, &function, arguments, span))
            .map_err(|error| {
                environment.runtime_error(format!("Failed to start thread: {error}"), span)
            })?;
        debug!(id, "spawned thread");

        self.units.lock().insert(
            id,
            ThreadUnit {
                handle: Some(handle),
                interrupt,
            },
        );
        Ok(id)
    }

    /// Whether `id` was ever handed out. Joined units leave the table, so any
    /// id below the counter is still known.
    fn issued(&self, id: u64) -> bool {
        id < self.next_id.load(Ordering::Relaxed)
    }

    /// `None` for an id this table never handed out.
    pub fn is_alive(&self, id: u64) -> Option<bool> {
        let units = self.units.lock();
        match units.get(&id) {
            Some(unit) => Some(unit.handle.as_ref().is_some_and(|handle| !handle.is_finished())),
            None => self.issued(id).then_some(false),
        }
    }

    /// Raises the unit's interrupt flag. It fails at its next checkpoint.
    pub fn interrupt(&self, id: u64) -> bool {
        match self.units.lock().get(&id) {
            Some(unit) => {
                unit.interrupt.store(true, Ordering::Release);
                debug!(id, "interrupted thread");
                true
            }
            None => false,
        }
    }

    /// Blocks until the unit ends and drops it from the table. `None` for an
    /// unknown id, `Some(None)` when the unit failed or was already joined.
    pub fn join(&self, id: u64) -> Option<Option<Value>> {
        let unit = self.units.lock().remove(&id);
        match unit {
            Some(unit) => Some(unit.handle.and_then(|handle| handle.join().ok().flatten())),
            None => self.issued(id).then_some(None),
        }
    }

    /// Units still tracked, finished or not.
    pub fn len(&self) -> usize {
        self.units.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits for every unit, including ones spawned while waiting.
    pub fn join_all(&self) {
        loop {
            let handles: Vec<_> = self
                .units
                .lock()
                .values_mut()
                .filter_map(|unit| unit.handle.take())
                .collect();
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                let _ = handle.join();
            }
        }
    }
}

fn run_unit(
    id: u64,
    mut environment: Environment,
    function: &FunctionValue,
    arguments: Vec<Value>,
    span: Span,
) -> Option<Value> {
    let result = TreeWalkEvaluator.call_function(&mut environment, function, arguments, span);
    match result {
        Ok(value) => {
            debug!(id, "thread finished");
            Some(value)
        }
        Err(Unwind::Signal(ControlSignal::Stop)) => {
            debug!(id, "thread stopped");
            None
        }
        Err(Unwind::Signal(signal)) => {
            warn!(id, ?signal, "thread ended with a stray control signal");
            None
        }
        Err(Unwind::Error(error)) => {
            warn!(id, kind = %error.kind, "thread died with an uncaught error");
            environment
                .context()
                .println(&BasicFormatter.format_error(&error));
            None
        }
    }
}

fn thread_id(value: f64) -> u64 {
    if value < 0.0 || value.fract() != 0.0 {
        u64::MAX
    } else {
        value as u64
    }
}

pub(super) fn register(catalogue: &mut BuiltInCatalogue) {
    catalogue.register(BuiltInFunction::function(
        "runThreaded",
        &["function", "parameters"],
        |environment, call| {
            let function = call.function(environment, 0)?;
            let arguments = call.list(environment, 1)?.lock().clone();
            let threads = Arc::clone(environment.threads());
            let id = threads.spawn(environment, function, arguments, call.span)?;
            Ok(Value::number(id as f64, call.span))
        },
    ));
    catalogue.register(BuiltInFunction::function(
        "stopThread",
        &["threadId"],
        |environment, call| {
            let number = call.number(environment, 0)?;
            let id = thread_id(number);
            match environment.threads().is_alive(id) {
                None => Err(environment
                    .runtime_error(format!("No thread with id {number}"), call.span)
                    .into()),
                Some(false) => Err(environment
                    .runtime_error("Thread is not alive", call.span)
                    .into()),
                Some(true) => {
                    environment.threads().interrupt(id);
                    Ok(Value::null(call.span))
                }
            }
        },
    ));
    catalogue.register(BuiltInFunction::function(
        "joinThread",
        &["threadId"],
        |environment, call| {
            let number = call.number(environment, 0)?;
            let threads = Arc::clone(environment.threads());
            match threads.join(thread_id(number)) {
                Some(result) => Ok(result
                    .map(|value| value.with_span(call.span))
                    .unwrap_or_else(|| Value::null(call.span))),
                None => Err(environment
                    .runtime_error(format!("No thread with id {number}"), call.span)
                    .into()),
            }
        },
    ));
}
