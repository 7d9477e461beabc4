pub mod context;

use crate::{
    error::{CodeError, ErrorKind, TraceFrame},
    lexer::Span,
    native::{thread::ThreadTable, BuiltInCatalogue},
    source::SourceFile,
    value::{ClassDefinition, Value},
};
use compact_str::CompactString;
use context::SystemContext;
use parking_lot::{Mutex, RwLock};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Root,
    Block,
    /// Boundary for `break` and `continue`.
    Loop,
    /// Boundary for `break`.
    Switch,
    /// Boundary for `return`. Lookups skip from here straight to the root.
    Function,
}

/// One frame of the scope chain. Frames only point at their parent.
#[derive(Debug)]
pub struct Scope {
    kind: ScopeKind,
    name: CompactString,
    origin: Option<(Arc<SourceFile>, Span)>,
    bindings: Mutex<HashMap<CompactString, Value>>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    fn new(
        kind: ScopeKind,
        name: CompactString,
        origin: Option<(Arc<SourceFile>, Span)>,
        parent: Option<Arc<Scope>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            name,
            origin,
            bindings: Mutex::new(HashMap::new()),
            parent,
        })
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&Arc<Scope>> {
        self.parent.as_ref()
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        self.bindings.lock().get(name).cloned()
    }

    fn defines(&self, name: &str) -> bool {
        self.bindings.lock().contains_key(name)
    }

    fn bind(&self, name: &str, value: Value) {
        self.bindings.lock().insert(name.into(), value);
    }
}

/// State shared by every environment descending from one program entry.
pub struct Registry {
    display_name: CompactString,
    classes: RwLock<HashMap<CompactString, Arc<ClassDefinition>>>,
    catalogue: Arc<BuiltInCatalogue>,
    context: Arc<dyn SystemContext>,
    threads: Arc<ThreadTable>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("display_name", &self.display_name)
            .field("classes", &self.classes.read().keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// A cursor into a scope chain. Cloning or branching an environment gives an
/// independent cursor over the same frames, registry and catalogue.
#[derive(Debug, Clone)]
pub struct Environment {
    registry: Arc<Registry>,
    root: Arc<Scope>,
    current: Arc<Scope>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl Environment {
    pub fn new(
        display_name: &str,
        catalogue: Arc<BuiltInCatalogue>,
        context: Arc<dyn SystemContext>,
    ) -> Self {
        Self::with_threads(
            display_name,
            catalogue,
            context,
            Arc::new(ThreadTable::new()),
        )
    }

    fn with_threads(
        display_name: &str,
        catalogue: Arc<BuiltInCatalogue>,
        context: Arc<dyn SystemContext>,
        threads: Arc<ThreadTable>,
    ) -> Self {
        let root = Scope::new(ScopeKind::Root, display_name.into(), None, None);
        Self {
            registry: Arc::new(Registry {
                display_name: display_name.into(),
                classes: RwLock::new(HashMap::new()),
                catalogue,
                context,
                threads,
            }),
            current: Arc::clone(&root),
            root,
            interrupt: None,
        }
    }

    /// A new program root that shares this program's catalogue, output sink
    /// and thread table but none of its variables or classes.
    pub fn fresh_root(&self, display_name: &str) -> Self {
        let mut environment = Self::with_threads(
            display_name,
            Arc::clone(&self.registry.catalogue),
            Arc::clone(&self.registry.context),
            Arc::clone(&self.registry.threads),
        );
        environment.interrupt = self.interrupt.clone();
        environment
    }

    pub fn display_name(&self) -> &str {
        &self.registry.display_name
    }

    pub fn context(&self) -> &Arc<dyn SystemContext> {
        &self.registry.context
    }

    pub fn catalogue(&self) -> &Arc<BuiltInCatalogue> {
        &self.registry.catalogue
    }

    pub fn threads(&self) -> &Arc<ThreadTable> {
        &self.registry.threads
    }

    pub fn current(&self) -> &Arc<Scope> {
        &self.current
    }

    pub fn root(&self) -> &Arc<Scope> {
        &self.root
    }

    pub fn shares_registry(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.registry, &other.registry)
    }
}

// Scope pushing and popping
impl Environment {
    fn push(
        &mut self,
        kind: ScopeKind,
        name: CompactString,
        origin: Option<(Arc<SourceFile>, Span)>,
    ) {
        trace!(?kind, %name, "push scope");
        let parent = Arc::clone(&self.current);
        self.current = Scope::new(kind, name, origin, Some(parent));
    }

    pub fn push_scope(&mut self) {
        self.push(ScopeKind::Block, CompactString::default(), None);
    }

    pub fn push_loop_scope(&mut self) {
        self.push(ScopeKind::Loop, CompactString::default(), None);
    }

    pub fn push_switch_scope(&mut self) {
        self.push(ScopeKind::Switch, CompactString::default(), None);
    }

    pub fn push_function_scope(&mut self, name: &str, origin: Option<(Arc<SourceFile>, Span)>) {
        self.push(ScopeKind::Function, name.into(), origin);
    }

    /// Leaves the current frame. The root frame is never popped.
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.current.parent.clone() {
            trace!(kind = ?self.current.kind, "pop scope");
            self.current = parent;
        }
    }

    /// Moves the cursor back to `scope` if it is the current frame or one of
    /// its ancestors. Returns false and leaves the cursor alone otherwise.
    pub fn move_to(&mut self, scope: &Arc<Scope>) -> bool {
        let mut frame = Some(&self.current);
        while let Some(candidate) = frame {
            if Arc::ptr_eq(candidate, scope) {
                self.current = Arc::clone(scope);
                return true;
            }
            frame = candidate.parent.as_ref();
        }
        debug!("refused to move to a scope outside the current chain");
        false
    }
}

// Variables
impl Environment {
    /// Frames visible from the cursor: everything up to and including the
    /// nearest function frame, then the root.
    fn visible_frames(&self) -> impl Iterator<Item = &Arc<Scope>> {
        let mut frame = Some(&self.current);
        let mut reached_root = false;
        std::iter::from_fn(move || {
            let scope = frame?;
            frame = match scope.kind {
                ScopeKind::Function if !reached_root => {
                    reached_root = true;
                    Some(&self.root)
                }
                ScopeKind::Root => None,
                _ => scope.parent.as_ref(),
            };
            Some(scope)
        })
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.visible_frames().find_map(|scope| scope.lookup(name))
    }

    /// Assigns into the nearest visible frame that already holds `name`, or
    /// declares it in the current frame.
    pub fn set(&self, name: &str, value: Value) {
        match self.visible_frames().find(|scope| scope.defines(name)) {
            Some(scope) => scope.bind(name, value),
            None => self.current.bind(name, value),
        }
    }

    pub fn set_local(&self, name: &str, value: Value) {
        self.current.bind(name, value);
    }
}

// Control flow boundaries
impl Environment {
    fn find_boundary(&self, accepts: impl Fn(ScopeKind) -> bool) -> Option<Arc<Scope>> {
        let mut frame = Some(&self.current);
        while let Some(scope) = frame {
            if accepts(scope.kind) {
                return Some(Arc::clone(scope));
            }
            if matches!(scope.kind, ScopeKind::Function | ScopeKind::Root) {
                return None;
            }
            frame = scope.parent.as_ref();
        }
        None
    }

    /// The frame a `break` unwinds to, if any.
    pub fn break_scope(&self) -> Option<Arc<Scope>> {
        self.find_boundary(|kind| matches!(kind, ScopeKind::Loop | ScopeKind::Switch))
    }

    /// The frame a `continue` unwinds to, if any.
    pub fn continue_scope(&self) -> Option<Arc<Scope>> {
        self.find_boundary(|kind| kind == ScopeKind::Loop)
    }

    /// The frame a `return` unwinds to, if any.
    pub fn return_scope(&self) -> Option<Arc<Scope>> {
        self.find_boundary(|kind| kind == ScopeKind::Function)
    }
}

// Branching
impl Environment {
    /// An independent cursor at the same position.
    pub fn branch(&self) -> Self {
        self.clone()
    }

    /// An independent cursor at the program root, as handed to a new thread.
    pub fn root_branch(&self) -> Self {
        let mut branch = self.clone();
        branch.current = Arc::clone(&self.root);
        branch
    }

    /// A cursor at `scope`, which must belong to this program's scope chain.
    pub fn branch_at(&self, scope: &Arc<Scope>) -> Option<Self> {
        let mut frame = Some(scope);
        let mut last = scope;
        while let Some(candidate) = frame {
            last = candidate;
            frame = candidate.parent.as_ref();
        }
        if !Arc::ptr_eq(last, &self.root) {
            return None;
        }
        let mut branch = self.clone();
        branch.current = Arc::clone(scope);
        Some(branch)
    }

    pub fn set_interrupt(&mut self, interrupt: Arc<AtomicBool>) {
        self.interrupt = Some(interrupt);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Cooperative cancellation checkpoint.
    pub fn check_interrupted(&self, span: Span) -> Result<(), CodeError> {
        if self.is_interrupted() {
            return Err(CodeError::new(ErrorKind::Interrupted, "", span));
        }
        Ok(())
    }
}

// Diagnostics
impl Environment {
    /// Active function frames from innermost outwards, ending with the root.
    pub fn stack_trace(&self) -> Vec<TraceFrame> {
        let mut frames = Vec::new();
        let mut frame = Some(&self.current);
        while let Some(scope) = frame {
            if matches!(scope.kind, ScopeKind::Function | ScopeKind::Root) {
                frames.push(TraceFrame {
                    name: scope.name.clone(),
                    origin: scope.origin.clone(),
                });
            }
            frame = scope.parent.as_ref();
        }
        frames
    }

    /// A Runtime error carrying the current call stack.
    pub fn runtime_error(&self, message: impl Into<CompactString>, span: Span) -> CodeError {
        CodeError::new(ErrorKind::Runtime, message, span).with_trace(self.stack_trace())
    }
}

// Classes
impl Environment {
    pub fn throw_if_stack_name_taken(&self, name: &str, span: Span) -> Result<(), CodeError> {
        if self.registry.catalogue.contains(name) {
            return Err(CodeError::illegal_operation(
                format!("{name}() is already defined as a built in function"),
                span,
            ));
        }
        Ok(())
    }

    pub fn throw_if_class_name_taken(&self, name: &str, span: Span) -> Result<(), CodeError> {
        if self.registry.classes.read().contains_key(name) {
            return Err(CodeError::illegal_operation(
                format!("{name} is already defined as a class"),
                span,
            ));
        }
        Ok(())
    }

    pub fn get_class(&self, name: &str) -> Option<Arc<ClassDefinition>> {
        self.registry.classes.read().get(name).cloned()
    }

    pub fn add_class(&self, class: Arc<ClassDefinition>) {
        debug!(class = class.name(), "registered class");
        self.registry
            .classes
            .write()
            .insert(class.name().into(), class);
    }
}
