use super::{ControlSignal, EvalResult, TreeWalkEvaluator, Unwind};
use crate::{
    environment::Environment,
    error::CodeError,
    parser::node::{CaseLiteral, ClassDecl, FunctionDecl, Node, SwitchCase},
    value::{ClassDefinition, FunctionValue, Value, ValueKind},
};
use std::sync::Arc;
use tracing::debug;

// Declarations
impl TreeWalkEvaluator {
    pub(super) fn interpret_function_declaration(
        &self,
        environment: &mut Environment,
        decl: &Arc<FunctionDecl>,
    ) -> EvalResult {
        let name = decl.display_name();
        environment.throw_if_stack_name_taken(name, decl.span)?;
        environment.set(
            name,
            Value::function(FunctionValue::user(Arc::clone(decl)), decl.span),
        );
        Ok(Value::null(decl.span))
    }

    pub(super) fn interpret_class_declaration(
        &self,
        environment: &mut Environment,
        decl: &Arc<ClassDecl>,
    ) -> EvalResult {
        environment.throw_if_class_name_taken(&decl.name, decl.span)?;
        environment.throw_if_stack_name_taken(&decl.name, decl.span)?;

        let class = Arc::new(ClassDefinition::new(Arc::clone(decl)));
        environment.add_class(Arc::clone(&class));

        // Statics are initialized once, at registration, in their own frame.
        let mut static_environment = environment.root_branch();
        static_environment.push_function_scope(
            &decl.name,
            Some((Arc::clone(&decl.file), decl.span)),
        );
        for field in &decl.static_fields {
            let value = match &field.initializer {
                Some(initializer) => self
                    .evaluate(&mut static_environment, initializer)
                    .map_err(|error| attach_file(error, decl))?,
                None => Value::null(field.span),
            };
            class.set_static(&field.name, value);
        }
        debug!(class = %decl.name, statics = decl.static_fields.len(), "initialized class");
        Ok(Value::null(decl.span))
    }
}

fn attach_file(error: Unwind, decl: &ClassDecl) -> Unwind {
    match error {
        Unwind::Error(error) => Unwind::Error(error.with_file(&decl.file)),
        signal => signal,
    }
}

// Blocks and branches
impl TreeWalkEvaluator {
    /// Evaluates statements in the current frame, producing the last value.
    pub(super) fn interpret_statements(
        &self,
        environment: &mut Environment,
        statements: &[Node],
    ) -> EvalResult {
        let mut last = None;
        for statement in statements {
            last = Some(self.evaluate(environment, statement)?);
        }
        Ok(last.unwrap_or_else(|| Value::null(Default::default())))
    }

    pub(super) fn interpret_block(
        &self,
        environment: &mut Environment,
        statements: &[Node],
        node: &Node,
    ) -> EvalResult {
        self.with_scope(environment, Environment::push_scope, |environment| {
            self.interpret_statements(environment, statements)
        })?;
        Ok(Value::null(node.span))
    }

    pub(super) fn evaluate_condition(
        &self,
        environment: &mut Environment,
        condition: &Node,
    ) -> EvalResult<bool> {
        let value = self.evaluate(environment, condition)?;
        value.as_boolean().ok_or_else(|| {
            CodeError::illegal_operation(
                "Condition must result in either 'true' or 'false'",
                condition.span,
            )
            .into()
        })
    }

    pub(super) fn interpret_if(
        &self,
        environment: &mut Environment,
        branches: &[(Node, Node)],
        otherwise: Option<&Node>,
        node: &Node,
    ) -> EvalResult {
        for (condition, body) in branches {
            if self.evaluate_condition(environment, condition)? {
                self.evaluate(environment, body)?;
                return Ok(Value::null(node.span));
            }
        }
        if let Some(body) = otherwise {
            self.evaluate(environment, body)?;
        }
        Ok(Value::null(node.span))
    }

    pub(super) fn interpret_switch(
        &self,
        environment: &mut Environment,
        subject: &Node,
        cases: &[SwitchCase],
        default: Option<&Node>,
        node: &Node,
    ) -> EvalResult {
        let subject = self.evaluate(environment, subject)?;
        let body = cases
            .iter()
            .find(|case| case.values.iter().any(|value| case_matches(value, &subject)))
            .map(|case| &case.body)
            .or(default);
        let Some(body) = body else {
            return Ok(Value::null(node.span));
        };

        self.with_scope(environment, Environment::push_switch_scope, |environment| {
            match self.evaluate(environment, body) {
                Ok(_) | Err(Unwind::Signal(ControlSignal::Break)) => Ok(()),
                Err(error) => Err(error),
            }
        })?;
        Ok(Value::null(node.span))
    }
}

fn case_matches(literal: &CaseLiteral, subject: &Value) -> bool {
    match (literal, &subject.kind) {
        (CaseLiteral::Number(lhs), ValueKind::Number(rhs)) => lhs == rhs,
        (CaseLiteral::String(lhs), ValueKind::String(rhs)) => lhs == rhs,
        _ => false,
    }
}

// Loops
impl TreeWalkEvaluator {
    pub(super) fn interpret_while(
        &self,
        environment: &mut Environment,
        condition: &Node,
        body: &Node,
        node: &Node,
    ) -> EvalResult {
        self.with_scope(environment, Environment::push_loop_scope, |environment| {
            loop {
                environment.check_interrupted(node.span)?;
                if !self.evaluate_condition(environment, condition)? {
                    return Ok(());
                }
                match self.evaluate(environment, body) {
                    Ok(_) | Err(Unwind::Signal(ControlSignal::Continue)) => {}
                    Err(Unwind::Signal(ControlSignal::Break)) => return Ok(()),
                    Err(error) => return Err(error),
                }
            }
        })?;
        Ok(Value::null(node.span))
    }

    pub(super) fn interpret_foreach(
        &self,
        environment: &mut Environment,
        variable: &str,
        iterable: &Node,
        body: &Node,
        node: &Node,
    ) -> EvalResult {
        let iterable = self.evaluate(environment, iterable)?;
        let items = match &iterable.kind {
            ValueKind::List(list) => list.lock().clone(),
            ValueKind::Map(map) => map.lock().keys(),
            ValueKind::String(string) => string
                .chars()
                .map(|c| Value::string(c.to_string(), iterable.span))
                .collect(),
            _ => {
                return Err(environment
                    .runtime_error(format!("Cannot iterate over '{iterable}'"), iterable.span)
                    .into())
            }
        };

        self.with_scope(environment, Environment::push_loop_scope, |environment| {
            for item in items {
                environment.check_interrupted(node.span)?;
                environment.set_local(variable, item);
                match self.evaluate(environment, body) {
                    Ok(_) | Err(Unwind::Signal(ControlSignal::Continue)) => {}
                    Err(Unwind::Signal(ControlSignal::Break)) => return Ok(()),
                    Err(error) => return Err(error),
                }
            }
            Ok(())
        })?;
        Ok(Value::null(node.span))
    }
}

// Control flow
impl TreeWalkEvaluator {
    pub(super) fn interpret_break(&self, environment: &mut Environment, node: &Node) -> EvalResult {
        if environment.break_scope().is_none() {
            return Err(environment
                .runtime_error("Cannot break here", node.span)
                .into());
        }
        Err(Unwind::Signal(ControlSignal::Break))
    }

    pub(super) fn interpret_continue(
        &self,
        environment: &mut Environment,
        node: &Node,
    ) -> EvalResult {
        if environment.continue_scope().is_none() {
            return Err(environment
                .runtime_error("Cannot continue here", node.span)
                .into());
        }
        Err(Unwind::Signal(ControlSignal::Continue))
    }

    pub(super) fn interpret_return(
        &self,
        environment: &mut Environment,
        value: Option<&Node>,
        node: &Node,
    ) -> EvalResult {
        let value = match value {
            Some(value) => self.evaluate(environment, value)?,
            None => Value::null(node.span),
        };
        if environment.return_scope().is_none() {
            return Err(environment
                .runtime_error("Cannot return here", node.span)
                .into());
        }
        Err(Unwind::Signal(ControlSignal::Return(value)))
    }
}
