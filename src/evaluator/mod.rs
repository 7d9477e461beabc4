mod call;
mod expression;
mod statement;

use crate::{
    environment::Environment,
    error::CodeError,
    parser::node::{Node, NodeKind},
    value::{FunctionValue, Value},
};
use std::sync::Arc;

/// Non-error transfer of control that unwinds to a matching boundary.
#[derive(Debug, Clone)]
pub enum ControlSignal {
    Return(Value),
    Break,
    Continue,
    Stop,
}

/// Everything that can cut evaluation of a node short.
#[derive(Debug, Clone)]
pub enum Unwind {
    Error(CodeError),
    Signal(ControlSignal),
}

impl From<CodeError> for Unwind {
    fn from(value: CodeError) -> Self {
        Self::Error(value)
    }
}

pub type EvalResult<T = Value> = Result<T, Unwind>;

/// Stateless tree-walking evaluator. All state lives in the environment.
pub struct TreeWalkEvaluator;

impl TreeWalkEvaluator {
    pub fn evaluate(&self, environment: &mut Environment, node: &Node) -> EvalResult {
        let span = node.span;
        match &node.kind {
            NodeKind::Null => Ok(Value::null(span)),
            NodeKind::Boolean(v) => Ok(Value::boolean(*v, span)),
            NodeKind::Number(v) => Ok(Value::number(*v, span)),
            NodeKind::String(v) => Ok(Value::string(v.clone(), span)),
            NodeKind::List(elements) => self.evaluate_list(environment, elements, node),
            NodeKind::Map(entries) => self.evaluate_map(environment, entries, node),
            NodeKind::Identifier(name) => self.evaluate_variable(environment, name, node),
            NodeKind::This => environment
                .get("this")
                .map(|v| v.copied(span))
                .ok_or_else(|| CodeError::unknown_identifier("this", span).into()),
            NodeKind::Unary { operator, operand } => {
                self.evaluate_unary(environment, *operator, operand, node)
            }
            NodeKind::Binary { operator, lhs, rhs } => {
                self.evaluate_binary(environment, *operator, lhs, rhs, node)
            }
            NodeKind::Assign { name, value } => {
                self.evaluate_assignment(environment, name, value, node)
            }
            NodeKind::MemberAssign {
                receiver,
                member,
                value,
            } => self.evaluate_member_assignment(environment, receiver, member, value, node),
            NodeKind::Member { receiver, member } => {
                self.evaluate_member_access(environment, receiver, member, node)
            }
            NodeKind::Call { callee, arguments } => {
                self.evaluate_call(environment, callee, arguments, node)
            }
            NodeKind::MemberCall {
                receiver,
                member,
                arguments,
            } => self.evaluate_member_call(environment, receiver, member, arguments, node),
            NodeKind::New { class, arguments } => {
                let arguments = self.evaluate_arguments(environment, arguments)?;
                self.construct(environment, class, arguments, span)
            }
            NodeKind::Lambda(decl) => Ok(Value::function(
                FunctionValue::user(Arc::clone(decl)),
                span,
            )),
            NodeKind::Function(decl) => self.interpret_function_declaration(environment, decl),
            NodeKind::Class(decl) => self.interpret_class_declaration(environment, decl),
            NodeKind::Statements(statements) => self.interpret_statements(environment, statements),
            NodeKind::Block(statements) => self.interpret_block(environment, statements, node),
            NodeKind::If {
                branches,
                otherwise,
            } => self.interpret_if(environment, branches, otherwise.as_deref(), node),
            NodeKind::While { condition, body } => {
                self.interpret_while(environment, condition, body, node)
            }
            NodeKind::Foreach {
                variable,
                iterable,
                body,
            } => self.interpret_foreach(environment, variable, iterable, body, node),
            NodeKind::Switch {
                subject,
                cases,
                default,
            } => self.interpret_switch(environment, subject, cases, default.as_deref(), node),
            NodeKind::Break => self.interpret_break(environment, node),
            NodeKind::Continue => self.interpret_continue(environment, node),
            NodeKind::Return(value) => self.interpret_return(environment, value.as_deref(), node),
        }
    }

    /// Runs `body` inside a freshly pushed frame and restores the cursor to
    /// where it was, however `body` finished.
    fn with_scope<T>(
        &self,
        environment: &mut Environment,
        push: fn(&mut Environment),
        body: impl FnOnce(&mut Environment) -> EvalResult<T>,
    ) -> EvalResult<T> {
        let saved = Arc::clone(environment.current());
        push(environment);
        let result = body(environment);
        environment.move_to(&saved);
        result
    }
}

impl Node {
    pub fn visit(&self, environment: &mut Environment) -> EvalResult {
        TreeWalkEvaluator.evaluate(environment, self)
    }
}
