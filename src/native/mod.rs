mod members;
mod standard;
pub mod thread;

use crate::{
    environment::Environment,
    error::CodeError,
    evaluator::EvalResult,
    lexer::Span,
    value::{FunctionValue, SharedList, SharedMap, Value, ValueKind},
};
use compact_str::CompactString;
use std::{cmp::Ordering, collections::HashMap, sync::Arc};

pub type NativeCallback = dyn Fn(&mut Environment, &NativeCall) -> EvalResult + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameters {
    Fixed(&'static [&'static str]),
    Variadic,
}

/// A function implemented by the host. Member functions receive their
/// receiver as the first argument.
pub struct BuiltInFunction {
    pub name: &'static str,
    pub parameters: Parameters,
    pub member: bool,
    callback: Box<NativeCallback>,
}

impl std::fmt::Debug for BuiltInFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltInFunction")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("member", &self.member)
            .finish_non_exhaustive()
    }
}

impl BuiltInFunction {
    pub fn function<F>(
        name: &'static str,
        parameters: &'static [&'static str],
        callback: F,
    ) -> Self
    where
        F: Fn(&mut Environment, &NativeCall) -> EvalResult + Send + Sync + 'static,
    {
        Self {
            name,
            parameters: Parameters::Fixed(parameters),
            member: false,
            callback: Box::new(callback),
        }
    }

    pub fn method<F>(
        name: &'static str,
        parameters: &'static [&'static str],
        callback: F,
    ) -> Self
    where
        F: Fn(&mut Environment, &NativeCall) -> EvalResult + Send + Sync + 'static,
    {
        Self {
            name,
            parameters: Parameters::Fixed(parameters),
            member: true,
            callback: Box::new(callback),
        }
    }

    pub fn variadic<F>(name: &'static str, callback: F) -> Self
    where
        F: Fn(&mut Environment, &NativeCall) -> EvalResult + Send + Sync + 'static,
    {
        Self {
            name,
            parameters: Parameters::Variadic,
            member: false,
            callback: Box::new(callback),
        }
    }

    /// Declared parameter count, receiver included. Variadic functions report 0.
    pub fn arity(&self) -> usize {
        match self.parameters {
            Parameters::Fixed(parameters) => parameters.len(),
            Parameters::Variadic => 0,
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        match self.parameters {
            Parameters::Fixed(parameters) => parameters.len() == count,
            Parameters::Variadic => true,
        }
    }

    pub fn invoke(
        &self,
        environment: &mut Environment,
        arguments: Vec<Value>,
        span: Span,
    ) -> EvalResult {
        if !self.accepts(arguments.len()) {
            let expected = self.arity();
            let actual = arguments.len();
            let message = match actual.cmp(&expected) {
                Ordering::Greater => format!(
                    "{} too many arguments passed into {}",
                    actual - expected,
                    self.name
                ),
                _ => format!(
                    "{} too few arguments passed into {}",
                    expected - actual,
                    self.name
                ),
            };
            return Err(environment.runtime_error(message, span).into());
        }
        let call = NativeCall {
            name: self.name,
            arguments,
            span,
        };
        (self.callback)(environment, &call)
    }
}

/// Call-site metadata handed to a native function.
#[derive(Debug)]
pub struct NativeCall {
    pub name: &'static str,
    pub arguments: Vec<Value>,
    pub span: Span,
}

impl NativeCall {
    pub fn value(&self, index: usize) -> Value {
        self.arguments
            .get(index)
            .cloned()
            .unwrap_or_else(|| Value::null(self.span))
    }

    fn mismatch(&self, environment: &Environment, kind: &str, index: usize) -> CodeError {
        environment.runtime_error(
            format!(
                "Must pass {kind} into parameter {index} for {}()",
                self.name
            ),
            self.span,
        )
    }

    pub fn number(&self, environment: &Environment, index: usize) -> Result<f64, CodeError> {
        match self.arguments.get(index).map(|v| &v.kind) {
            Some(ValueKind::Number(v)) => Ok(*v),
            _ => Err(self.mismatch(environment, "Number", index)),
        }
    }

    pub fn string(
        &self,
        environment: &Environment,
        index: usize,
    ) -> Result<CompactString, CodeError> {
        match self.arguments.get(index).map(|v| &v.kind) {
            Some(ValueKind::String(v)) => Ok(v.clone()),
            _ => Err(self.mismatch(environment, "String", index)),
        }
    }

    pub fn list(&self, environment: &Environment, index: usize) -> Result<SharedList, CodeError> {
        match self.arguments.get(index).map(|v| &v.kind) {
            Some(ValueKind::List(v)) => Ok(Arc::clone(v)),
            _ => Err(self.mismatch(environment, "List", index)),
        }
    }

    pub fn map(&self, environment: &Environment, index: usize) -> Result<SharedMap, CodeError> {
        match self.arguments.get(index).map(|v| &v.kind) {
            Some(ValueKind::Map(v)) => Ok(Arc::clone(v)),
            _ => Err(self.mismatch(environment, "Map", index)),
        }
    }

    pub fn function(
        &self,
        environment: &Environment,
        index: usize,
    ) -> Result<Arc<FunctionValue>, CodeError> {
        match self.arguments.get(index).map(|v| &v.kind) {
            Some(ValueKind::Function(v)) => Ok(Arc::clone(v)),
            _ => Err(self.mismatch(environment, "Function", index)),
        }
    }

    /// A list index argument, checked against `length`.
    pub fn index(
        &self,
        environment: &Environment,
        index: usize,
        length: usize,
    ) -> Result<usize, CodeError> {
        let value = self.number(environment, index)?;
        if value < 0.0 || value.fract() != 0.0 || value as usize >= length {
            return Err(environment.runtime_error(
                format!("Index {value} out of bounds for {}()", self.name),
                self.span,
            ));
        }
        Ok(value as usize)
    }
}

/// Name and arity keyed table of native functions. Hosts register extra
/// functions before handing the catalogue to an interpreter, after which it
/// is only read.
#[derive(Debug, Default)]
pub struct BuiltInCatalogue {
    functions: HashMap<&'static str, Vec<Arc<BuiltInFunction>>>,
}

impl BuiltInCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalogue every program starts with.
    pub fn standard() -> Self {
        let mut catalogue = Self::new();
        standard::register(&mut catalogue);
        thread::register(&mut catalogue);
        members::register(&mut catalogue);
        catalogue
    }

    pub fn register(&mut self, function: BuiltInFunction) {
        self.functions
            .entry(function.name)
            .or_default()
            .push(Arc::new(function));
    }

    pub fn find(&self, name: &str, arity: usize, member: bool) -> Option<Arc<BuiltInFunction>> {
        self.functions
            .get(name)?
            .iter()
            .find(|f| f.member == member && f.accepts(arity))
            .cloned()
    }

    /// First free (non-member) function registered under `name`.
    pub fn find_free(&self, name: &str) -> Option<Arc<BuiltInFunction>> {
        self.functions
            .get(name)?
            .iter()
            .find(|f| !f.member)
            .cloned()
    }

    /// Whether `name` is taken by a free function.
    pub fn contains(&self, name: &str) -> bool {
        self.find_free(name).is_some()
    }
}
