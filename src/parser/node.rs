use super::operator::{BinaryOperator, UnaryOperator};
use crate::{lexer::Span, source::SourceFile};
use compact_str::CompactString;
use std::sync::Arc;

/// One parsed construct. Every node knows the region of source it came from.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    // Literals
    Null,
    Boolean(bool),
    Number(f64),
    String(CompactString),
    List(Vec<Node>),
    Map(Vec<(Node, Node)>),

    // Expressions
    Identifier(CompactString),
    This,
    Unary {
        operator: UnaryOperator,
        operand: Box<Node>,
    },
    Binary {
        operator: BinaryOperator,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Assign {
        name: CompactString,
        value: Box<Node>,
    },
    MemberAssign {
        receiver: Box<Node>,
        member: CompactString,
        value: Box<Node>,
    },
    Member {
        receiver: Box<Node>,
        member: CompactString,
    },
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    MemberCall {
        receiver: Box<Node>,
        member: CompactString,
        arguments: Vec<Node>,
    },
    New {
        class: CompactString,
        arguments: Vec<Node>,
    },
    Lambda(Arc<FunctionDecl>),

    // Declarations
    Function(Arc<FunctionDecl>),
    Class(Arc<ClassDecl>),

    // Statements
    /// A sequence of statements that does not open a scope.
    Statements(Vec<Node>),
    /// A braced block, which opens a scope.
    Block(Vec<Node>),
    If {
        branches: Vec<(Node, Node)>,
        otherwise: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    Foreach {
        variable: CompactString,
        iterable: Box<Node>,
        body: Box<Node>,
    },
    Switch {
        subject: Box<Node>,
        cases: Vec<SwitchCase>,
        default: Option<Box<Node>>,
    },
    Break,
    Continue,
    Return(Option<Box<Node>>),
}

#[derive(Debug)]
pub struct FunctionDecl {
    /// `None` for anonymous functions.
    pub name: Option<CompactString>,
    pub parameters: Vec<CompactString>,
    pub body: Vec<Node>,
    pub span: Span,
    pub file: Arc<SourceFile>,
}

impl FunctionDecl {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<lambda>")
    }

    pub fn arity(&self) -> usize {
        self.parameters.len()
    }
}

#[derive(Debug)]
pub struct FieldDecl {
    pub name: CompactString,
    pub initializer: Option<Node>,
    pub span: Span,
}

#[derive(Debug)]
pub struct ClassDecl {
    pub name: CompactString,
    pub span: Span,
    pub constructors: Vec<Arc<FunctionDecl>>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<Arc<FunctionDecl>>,
    pub static_fields: Vec<FieldDecl>,
    pub static_methods: Vec<Arc<FunctionDecl>>,
    pub file: Arc<SourceFile>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaseLiteral {
    Number(f64),
    String(CompactString),
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    pub values: Vec<CaseLiteral>,
    pub body: Node,
}
