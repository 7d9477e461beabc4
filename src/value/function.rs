use super::Value;
use crate::{native::BuiltInFunction, parser::node::FunctionDecl};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub enum Callable {
    User(Arc<FunctionDecl>),
    Native(Arc<BuiltInFunction>),
}

/// A callable value. Member calls produce a copy with the receiver bound as
/// the first argument.
#[derive(Debug, Clone)]
pub struct FunctionValue {
    pub callable: Callable,
    pub bound: Vec<Value>,
    /// Whether the function may be called as `receiver.name(...)`.
    pub member: bool,
}

impl FunctionValue {
    pub fn user(decl: Arc<FunctionDecl>) -> Self {
        Self {
            callable: Callable::User(decl),
            bound: Vec::new(),
            member: false,
        }
    }

    pub fn method(decl: Arc<FunctionDecl>) -> Self {
        Self {
            callable: Callable::User(decl),
            bound: Vec::new(),
            member: true,
        }
    }

    pub fn native(function: Arc<BuiltInFunction>) -> Self {
        let member = function.member;
        Self {
            callable: Callable::Native(function),
            bound: Vec::new(),
            member,
        }
    }

    pub fn name(&self) -> &str {
        match &self.callable {
            Callable::User(decl) => decl.display_name(),
            Callable::Native(function) => function.name,
        }
    }

    pub fn bind(&self, receiver: Value) -> Self {
        let mut bound = self.clone();
        bound.bound.insert(0, receiver);
        bound
    }
}
