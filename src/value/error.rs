use thiserror::Error;

/// Failure of an operator applied to two values. The evaluator turns this
/// into a positioned Illegal-Operation error naming both operands.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum OperationError {
    #[error("operand kinds do not support this operator")]
    Mismatch,
    #[error("Cannot divide by 0")]
    DivisionByZero,
}
