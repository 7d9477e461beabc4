use super::{ControlSignal, EvalResult, TreeWalkEvaluator, Unwind};
use crate::{
    environment::Environment,
    error::CodeError,
    lexer::Span,
    parser::node::{FunctionDecl, Node, NodeKind},
    value::{Callable, FunctionValue, Instance, Value, ValueKind},
};
use std::{cmp::Ordering, sync::Arc};

impl TreeWalkEvaluator {
    pub(super) fn evaluate_call(
        &self,
        environment: &mut Environment,
        callee: &Node,
        arguments: &[Node],
        node: &Node,
    ) -> EvalResult {
        let span = node.span;
        // A bare name that is not a variable refers to the catalogue.
        if let NodeKind::Identifier(name) = &callee.kind {
            if environment.get(name).is_none() {
                let arguments = self.evaluate_arguments(environment, arguments)?;
                let count = arguments.len();
                return match environment.catalogue().find(name, count, false) {
                    Some(function) => function.invoke(environment, arguments, span),
                    None => match environment.catalogue().find_free(name) {
                        Some(function) => Err(arity_error(
                            environment,
                            count,
                            function.arity(),
                            name,
                            span,
                        )
                        .into()),
                        None => Err(CodeError::unknown_identifier(name, callee.span).into()),
                    },
                };
            }
        }

        let callee = self.evaluate(environment, callee)?;
        let arguments = self.evaluate_arguments(environment, arguments)?;
        match &callee.kind {
            ValueKind::Function(function) => {
                self.call_function(environment, function, arguments, span)
            }
            _ => Err(environment
                .runtime_error(
                    format!("Cannot call a non function value '{callee}'"),
                    span,
                )
                .into()),
        }
    }

    pub(super) fn evaluate_member_call(
        &self,
        environment: &mut Environment,
        receiver: &Node,
        member: &str,
        arguments: &[Node],
        node: &Node,
    ) -> EvalResult {
        let span = node.span;
        if let Some(class) = self.static_receiver(environment, receiver) {
            let arguments = self.evaluate_arguments(environment, arguments)?;
            let Some(method) = class.static_method(member, arguments.len()) else {
                return Err(environment
                    .runtime_error(
                        format!(
                            "No such static method {member}() with {} parameters for {}",
                            arguments.len(),
                            class.name()
                        ),
                        span,
                    )
                    .into());
            };
            return self.call_user(environment, method, None, arguments, span);
        }

        let receiver = self.evaluate(environment, receiver)?;
        let arguments = self.evaluate_arguments(environment, arguments)?;
        let count = arguments.len();

        let function = match &receiver.kind {
            ValueKind::Instance(instance) => match instance.class.method(member, count) {
                Some(method) => Some(FunctionValue::method(Arc::clone(method))),
                None => match instance.get_field(member) {
                    // A field holding a function is called without a receiver.
                    Some(field) => match &field.kind {
                        ValueKind::Function(function) => {
                            return self.call_function(environment, function, arguments, span)
                        }
                        _ => {
                            return Err(environment
                                .runtime_error(
                                    format!("Cannot call a non function value '{field}'"),
                                    span,
                                )
                                .into())
                        }
                    },
                    None => None,
                },
            },
            _ => None,
        };
        let function = match function {
            Some(function) => function,
            None => match environment.catalogue().find(member, count + 1, true) {
                Some(native) => FunctionValue::native(native),
                None => match environment.catalogue().find_free(member) {
                    Some(native) => FunctionValue::native(native),
                    None => {
                        return Err(environment
                            .runtime_error(
                                format!(
                                    "No such member function {member}() with {count} parameters for {}",
                                    receiver.kind_name()
                                ),
                                span,
                            )
                            .into())
                    }
                },
            },
        };

        if !function.member {
            return Err(environment
                .runtime_error(
                    format!("Cannot call {}() as a member function", function.name()),
                    span,
                )
                .into());
        }
        let bound = function.bind(receiver.copied(span));
        self.call_function(environment, &bound, arguments, span)
    }

    /// Calls any function value with already evaluated arguments.
    pub fn call_function(
        &self,
        environment: &mut Environment,
        function: &FunctionValue,
        arguments: Vec<Value>,
        span: Span,
    ) -> EvalResult {
        match &function.callable {
            Callable::Native(native) => {
                let mut bound = function.bound.clone();
                bound.extend(arguments);
                native.invoke(environment, bound, span)
            }
            Callable::User(decl) => {
                let receiver = function.bound.first().cloned();
                self.call_user(environment, decl, receiver, arguments, span)
            }
        }
    }

    fn call_user(
        &self,
        environment: &mut Environment,
        decl: &Arc<FunctionDecl>,
        receiver: Option<Value>,
        arguments: Vec<Value>,
        span: Span,
    ) -> EvalResult {
        if arguments.len() != decl.arity() {
            return Err(arity_error(
                environment,
                arguments.len(),
                decl.arity(),
                decl.display_name(),
                span,
            )
            .into());
        }
        environment.check_interrupted(span)?;

        let saved = Arc::clone(environment.current());
        environment.push_function_scope(
            decl.display_name(),
            Some((Arc::clone(&decl.file), decl.span)),
        );
        if let Some(receiver) = receiver {
            environment.set_local("this", receiver);
        }
        for (parameter, argument) in decl.parameters.iter().zip(arguments) {
            let span = argument.span;
            environment.set_local(parameter, argument.copied(span));
        }
        let result = self.interpret_statements(environment, &decl.body);
        let result = match result {
            Ok(_) => Ok(Value::null(span)),
            Err(Unwind::Signal(ControlSignal::Return(value))) => Ok(value),
            Err(Unwind::Signal(ControlSignal::Break)) => {
                Err(environment.runtime_error("Cannot break here", span).into())
            }
            Err(Unwind::Signal(ControlSignal::Continue)) => {
                Err(environment.runtime_error("Cannot continue here", span).into())
            }
            Err(Unwind::Error(error)) => Err(Unwind::Error(error.with_file(&decl.file))),
            Err(stop) => Err(stop),
        };
        environment.move_to(&saved);
        result
    }

    /// Creates an instance of a registered class.
    pub(super) fn construct(
        &self,
        environment: &mut Environment,
        name: &str,
        arguments: Vec<Value>,
        span: Span,
    ) -> EvalResult {
        let class = environment
            .get_class(name)
            .ok_or_else(|| CodeError::unknown_identifier(name, span))?;

        let constructor = class.constructor(arguments.len()).cloned();
        let implicit = class.decl.constructors.is_empty() && arguments.is_empty();
        if constructor.is_none() && !implicit {
            return Err(environment
                .runtime_error(format!("No such constructor for {name}"), span)
                .into());
        }

        let instance = Arc::new(Instance::new(Arc::clone(&class)));
        let this = Value::new(ValueKind::Instance(Arc::clone(&instance)), span);

        // Field defaults run in declaration order in a frame of their own.
        let mut fields = environment.root_branch();
        fields.push_function_scope(
            name,
            Some((Arc::clone(&class.decl.file), class.decl.span)),
        );
        fields.set_local("this", this.clone());
        for field in &class.decl.fields {
            let value = match &field.initializer {
                Some(initializer) => match self.evaluate(&mut fields, initializer) {
                    Ok(value) => value,
                    Err(Unwind::Error(error)) => {
                        return Err(error.with_file(&class.decl.file).into())
                    }
                    Err(signal) => return Err(signal),
                },
                None => Value::null(field.span),
            };
            instance.set_field(&field.name, value);
        }

        if let Some(constructor) = constructor {
            self.call_user(environment, &constructor, Some(this.clone()), arguments, span)?;
        }
        Ok(this)
    }
}

fn arity_error(
    environment: &Environment,
    actual: usize,
    expected: usize,
    name: &str,
    span: Span,
) -> CodeError {
    let message = match actual.cmp(&expected) {
        Ordering::Greater => {
            format!("{} too many arguments passed into {name}", actual - expected)
        }
        _ => format!("{} too few arguments passed into {name}", expected - actual),
    };
    environment.runtime_error(message, span)
}
