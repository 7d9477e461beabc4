use super::Value;
use crate::parser::node::{ClassDecl, FunctionDecl};
use compact_str::CompactString;
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};

/// A registered class blueprint together with its static state.
#[derive(Debug)]
pub struct ClassDefinition {
    pub decl: Arc<ClassDecl>,
    statics: Mutex<HashMap<CompactString, Value>>,
}

impl ClassDefinition {
    pub fn new(decl: Arc<ClassDecl>) -> Self {
        Self {
            decl,
            statics: Mutex::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    /// First constructor with the given arity, in declaration order.
    pub fn constructor(&self, arity: usize) -> Option<&Arc<FunctionDecl>> {
        self.decl.constructors.iter().find(|c| c.arity() == arity)
    }

    pub fn method(&self, name: &str, arity: usize) -> Option<&Arc<FunctionDecl>> {
        find_function(&self.decl.methods, name, arity)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.decl.methods.iter().any(|m| m.name.as_deref() == Some(name))
    }

    pub fn static_method(&self, name: &str, arity: usize) -> Option<&Arc<FunctionDecl>> {
        find_function(&self.decl.static_methods, name, arity)
    }

    /// Whether instances of this class declare a field with this name.
    pub fn is_assignable(&self, name: &str) -> bool {
        self.decl.fields.iter().any(|f| f.name == name)
    }

    pub fn get_static(&self, name: &str) -> Option<Value> {
        self.statics.lock().get(name).cloned()
    }

    /// Sets a declared static field. Returns false if no such field exists.
    pub fn set_static(&self, name: &str, value: Value) -> bool {
        if !self.decl.static_fields.iter().any(|f| f.name == name) {
            return false;
        }
        self.statics.lock().insert(name.into(), value);
        true
    }
}

fn find_function<'a>(
    functions: &'a [Arc<FunctionDecl>],
    name: &str,
    arity: usize,
) -> Option<&'a Arc<FunctionDecl>> {
    functions
        .iter()
        .find(|f| f.name.as_deref() == Some(name) && f.arity() == arity)
}

#[derive(Debug)]
pub struct Instance {
    pub class: Arc<ClassDefinition>,
    fields: Mutex<HashMap<CompactString, Value>>,
}

impl Instance {
    pub fn new(class: Arc<ClassDefinition>) -> Self {
        Self {
            class,
            fields: Mutex::new(HashMap::new()),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.fields.lock().get(name).cloned()
    }

    /// Sets a declared field. Returns false if the class has no such field.
    pub fn set_field(&self, name: &str, value: Value) -> bool {
        if !self.class.is_assignable(name) {
            return false;
        }
        self.fields.lock().insert(name.into(), value);
        true
    }
}
