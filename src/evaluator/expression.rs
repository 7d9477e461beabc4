use super::{EvalResult, TreeWalkEvaluator};
use crate::{
    environment::Environment,
    error::CodeError,
    lexer::Span,
    parser::{
        node::{Node, NodeKind},
        operator::{BinaryOperator, UnaryOperator},
    },
    value::{error::OperationError, ClassDefinition, FunctionValue, Value, ValueKind, ValueMap},
};
use std::sync::Arc;

// Literals and variables
impl TreeWalkEvaluator {
    pub(super) fn evaluate_list(
        &self,
        environment: &mut Environment,
        elements: &[Node],
        node: &Node,
    ) -> EvalResult {
        let values = self.evaluate_arguments(environment, elements)?;
        Ok(Value::list(values, node.span))
    }

    pub(super) fn evaluate_map(
        &self,
        environment: &mut Environment,
        entries: &[(Node, Node)],
        node: &Node,
    ) -> EvalResult {
        let mut map = ValueMap::new();
        for (key, value) in entries {
            let key = self.evaluate(environment, key)?;
            let value = self.evaluate(environment, value)?;
            map.insert(key, value);
        }
        Ok(Value::map(map, node.span))
    }

    pub(super) fn evaluate_variable(
        &self,
        environment: &mut Environment,
        name: &str,
        node: &Node,
    ) -> EvalResult {
        if let Some(value) = environment.get(name) {
            return Ok(value.copied(node.span));
        }
        if let Some(function) = environment.catalogue().find_free(name) {
            return Ok(Value::function(FunctionValue::native(function), node.span));
        }
        Err(CodeError::unknown_identifier(name, node.span).into())
    }

    pub(super) fn evaluate_arguments(
        &self,
        environment: &mut Environment,
        arguments: &[Node],
    ) -> EvalResult<Vec<Value>> {
        arguments
            .iter()
            .map(|argument| self.evaluate(environment, argument))
            .collect()
    }

    pub(super) fn evaluate_assignment(
        &self,
        environment: &mut Environment,
        name: &str,
        value: &Node,
        node: &Node,
    ) -> EvalResult {
        environment.throw_if_stack_name_taken(name, node.span)?;
        let value = self.evaluate(environment, value)?;
        environment.set(name, value.copied(node.span));
        Ok(value)
    }

    /// The class named by a bare identifier receiver, when no variable
    /// shadows it.
    pub(super) fn static_receiver(
        &self,
        environment: &Environment,
        receiver: &Node,
    ) -> Option<Arc<ClassDefinition>> {
        match &receiver.kind {
            NodeKind::Identifier(name) if environment.get(name).is_none() => {
                environment.get_class(name)
            }
            _ => None,
        }
    }
}

// Members
impl TreeWalkEvaluator {
    pub(super) fn evaluate_member_access(
        &self,
        environment: &mut Environment,
        receiver: &Node,
        member: &str,
        node: &Node,
    ) -> EvalResult {
        let span = node.span;
        if let Some(class) = self.static_receiver(environment, receiver) {
            return class.get_static(member).map(|v| v.copied(span)).ok_or_else(|| {
                environment
                    .runtime_error(
                        format!("{member} is not a static member of {}", class.name()),
                        span,
                    )
                    .into()
            });
        }

        let receiver = self.evaluate(environment, receiver)?;
        match &receiver.kind {
            ValueKind::Instance(instance) => {
                instance.get_field(member).map(|v| v.copied(span)).ok_or_else(|| {
                    environment
                        .runtime_error(format!("{receiver} has no field '{member}'"), span)
                        .into()
                })
            }
            _ => Err(environment
                .runtime_error(
                    format!("Cannot access member '{member}' of '{receiver}'"),
                    span,
                )
                .into()),
        }
    }

    pub(super) fn evaluate_member_assignment(
        &self,
        environment: &mut Environment,
        receiver: &Node,
        member: &str,
        value: &Node,
        node: &Node,
    ) -> EvalResult {
        let span = node.span;
        if let Some(class) = self.static_receiver(environment, receiver) {
            let value = self.evaluate(environment, value)?;
            if !class.set_static(member, value.copied(span)) {
                return Err(environment
                    .runtime_error(
                        format!("{member} is not a static member of {}", class.name()),
                        span,
                    )
                    .into());
            }
            return Ok(value);
        }

        let receiver = self.evaluate(environment, receiver)?;
        let ValueKind::Instance(instance) = &receiver.kind else {
            return Err(environment
                .runtime_error(
                    format!("Cannot assign member '{member}' of '{receiver}'"),
                    span,
                )
                .into());
        };
        // Evaluate before touching the fields so the value may read them.
        let value = self.evaluate(environment, value)?;
        if !instance.set_field(member, value.copied(span)) {
            return Err(environment
                .runtime_error(
                    format!(
                        "Cannot assign to field '{member}' of class {}",
                        instance.class.name()
                    ),
                    span,
                )
                .into());
        }
        Ok(value)
    }
}

// Operators
impl TreeWalkEvaluator {
    pub(super) fn evaluate_unary(
        &self,
        environment: &mut Environment,
        operator: UnaryOperator,
        operand: &Node,
        node: &Node,
    ) -> EvalResult {
        let operand = self.evaluate(environment, operand)?;
        let result = match operator {
            UnaryOperator::Not => operand.not(),
            UnaryOperator::Minus => operand.negate(),
        };
        result
            .map(|kind| Value::new(kind, node.span))
            .map_err(|_| {
                CodeError::illegal_operation(
                    format!("The operation '{operator}' cannot be applied to '{operand}'"),
                    node.span,
                )
                .into()
            })
    }

    pub(super) fn evaluate_binary(
        &self,
        environment: &mut Environment,
        operator: BinaryOperator,
        lhs: &Node,
        rhs: &Node,
        node: &Node,
    ) -> EvalResult {
        let span = node.span;
        let lhs = self.evaluate(environment, lhs)?;

        if operator.is_short_circuit() {
            let Some(left) = lhs.as_boolean() else {
                return Err(CodeError::illegal_operation(
                    format!("The operation '{operator}' cannot be applied to '{lhs}'"),
                    span,
                )
                .into());
            };
            match (operator, left) {
                (BinaryOperator::And, false) => return Ok(Value::boolean(false, span)),
                (BinaryOperator::Or, true) => return Ok(Value::boolean(true, span)),
                _ => {}
            }
        }

        let rhs = self.evaluate(environment, rhs)?;
        let result = match operator {
            BinaryOperator::Power => lhs.power_by(&rhs),
            BinaryOperator::Multiply => lhs.multiply_by(&rhs),
            BinaryOperator::Divide => lhs.divide_by(&rhs),
            BinaryOperator::Add => lhs.add_to(&rhs),
            BinaryOperator::Subtract => lhs.subtract_by(&rhs),
            BinaryOperator::LessThan => lhs.less_than(&rhs),
            BinaryOperator::LessThanEqual => lhs.less_than_equal(&rhs),
            BinaryOperator::GreaterThan => lhs.greater_than(&rhs),
            BinaryOperator::GreaterThanEqual => lhs.greater_than_equal(&rhs),
            BinaryOperator::Equal => Ok(ValueKind::Boolean(lhs.is_equal(&rhs))),
            BinaryOperator::NotEqual => Ok(ValueKind::Boolean(!lhs.is_equal(&rhs))),
            BinaryOperator::And => lhs.and_with(&rhs),
            BinaryOperator::Or => lhs.or_with(&rhs),
        };
        result
            .map(|kind| Value::new(kind, span))
            .map_err(|error| operation_error(operator, &lhs, &rhs, error, span).into())
    }
}

fn operation_error(
    operator: BinaryOperator,
    lhs: &Value,
    rhs: &Value,
    error: OperationError,
    span: Span,
) -> CodeError {
    match error {
        OperationError::Mismatch => CodeError::illegal_operation(
            format!("The operation '{operator}' cannot be applied to '{lhs}' and '{rhs}'"),
            span,
        ),
        OperationError::DivisionByZero => CodeError::illegal_operation(error.to_string(), span),
    }
}
