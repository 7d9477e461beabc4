use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use arucas::{
    environment::{context::BufferedContext, Environment, ScopeKind},
    error::ErrorKind,
    lexer::Span,
    native::BuiltInCatalogue,
    value::Value,
};

fn environment(name: &str) -> Environment {
    Environment::new(
        name,
        Arc::new(BuiltInCatalogue::standard()),
        Arc::new(BufferedContext::new()),
    )
}

fn number(value: f64) -> Value {
    Value::number(value, Span::default())
}

fn read(environment: &Environment, name: &str) -> Option<f64> {
    environment.get(name).and_then(|value| value.as_number())
}

#[test]
fn set_assigns_the_nearest_existing_binding() {
    let mut env = environment("env");
    env.set("a", number(1.0));
    env.push_scope();
    env.set("a", number(2.0));
    env.set_local("b", number(3.0));
    assert_eq!(read(&env, "b"), Some(3.0));
    env.pop_scope();

    assert_eq!(read(&env, "a"), Some(2.0));
    assert_eq!(read(&env, "b"), None);
}

#[test]
fn set_local_shadows_outer_bindings() {
    let mut env = environment("env");
    env.set("a", number(1.0));
    env.push_scope();
    env.set_local("a", number(2.0));
    assert_eq!(read(&env, "a"), Some(2.0));
    env.pop_scope();
    assert_eq!(read(&env, "a"), Some(1.0));
}

#[test]
fn function_frames_only_see_their_locals_and_the_root() {
    let mut env = environment("env");
    env.set("global", number(1.0));
    env.push_scope();
    env.set_local("caller_local", number(2.0));
    env.push_function_scope("callee", None);

    assert_eq!(read(&env, "global"), Some(1.0));
    assert_eq!(read(&env, "caller_local"), None);

    env.set("fresh", number(3.0));
    env.pop_scope();
    assert_eq!(read(&env, "fresh"), None);
}

#[test]
fn boundaries_follow_scope_kinds() {
    let mut env = environment("env");
    assert!(env.break_scope().is_none());
    assert!(env.continue_scope().is_none());
    assert!(env.return_scope().is_none());

    env.push_loop_scope();
    env.push_scope();
    assert_eq!(env.break_scope().map(|s| s.kind()), Some(ScopeKind::Loop));
    assert_eq!(env.continue_scope().map(|s| s.kind()), Some(ScopeKind::Loop));
    assert!(env.return_scope().is_none());

    env.push_switch_scope();
    assert_eq!(env.break_scope().map(|s| s.kind()), Some(ScopeKind::Switch));
    assert_eq!(env.continue_scope().map(|s| s.kind()), Some(ScopeKind::Loop));

    env.push_function_scope("f", None);
    assert!(env.break_scope().is_none());
    assert!(env.continue_scope().is_none());
    assert_eq!(
        env.return_scope().map(|s| s.kind()),
        Some(ScopeKind::Function)
    );
}

#[test]
fn root_is_never_popped() {
    let mut env = environment("env");
    env.pop_scope();
    env.pop_scope();
    assert!(Arc::ptr_eq(env.current(), env.root()));
    assert_eq!(env.current().kind(), ScopeKind::Root);
    assert_eq!(env.current().name(), "env");
}

#[test]
fn move_to_only_accepts_ancestors() {
    let env = environment("env");
    let mut first = env.root_branch();
    first.push_scope();
    let inner = Arc::clone(first.current());
    first.push_loop_scope();
    first.push_scope();
    assert!(first.move_to(&inner));
    assert!(Arc::ptr_eq(first.current(), &inner));

    let mut second = env.root_branch();
    assert!(!second.move_to(&inner));
    assert!(Arc::ptr_eq(second.current(), second.root()));
}

#[test]
fn branches_share_the_registry_but_not_local_state() {
    let env = environment("env");
    env.set("shared", number(1.0));

    let mut first = env.root_branch();
    let mut second = env.root_branch();
    assert!(first.shares_registry(&second));
    first.push_scope();
    second.push_scope();
    first.set_local("x", number(1.0));
    second.set_local("x", number(2.0));
    assert_eq!(read(&first, "x"), Some(1.0));
    assert_eq!(read(&second, "x"), Some(2.0));
    assert_eq!(read(&second, "shared"), Some(1.0));
}

#[test]
fn branch_at_rejects_foreign_scopes() {
    let env = environment("env");
    let mut branch = env.root_branch();
    branch.push_scope();
    let scope = Arc::clone(branch.current());
    assert!(env.branch_at(&scope).is_some());

    let other = environment("other");
    assert!(other.branch_at(&scope).is_none());
    assert!(!other.shares_registry(&env));
}

#[test]
fn fresh_root_shares_catalogue_but_not_bindings() {
    let env = environment("env");
    env.set("a", number(1.0));
    let child = env.fresh_root("child");
    assert_eq!(child.display_name(), "child");
    assert!(Arc::ptr_eq(child.catalogue(), env.catalogue()));
    assert!(Arc::ptr_eq(child.threads(), env.threads()));
    assert!(!child.shares_registry(&env));
    assert_eq!(read(&child, "a"), None);
}

#[test]
fn interrupts_surface_at_checkpoints() {
    let mut env = environment("env");
    assert!(env.check_interrupted(Span::default()).is_ok());

    let flag = Arc::new(AtomicBool::new(false));
    env.set_interrupt(Arc::clone(&flag));
    assert!(!env.is_interrupted());
    flag.store(true, Ordering::Release);
    let error = env.check_interrupted(Span::default()).unwrap_err();
    assert_eq!(error.kind, ErrorKind::Interrupted);
    assert_eq!(error.to_string(), "Program interrupted - ''");
}

#[test]
fn runtime_errors_capture_function_frames() {
    let mut env = environment("main");
    env.push_function_scope("outer", None);
    env.push_scope();
    env.push_function_scope("inner", None);
    let error = env.runtime_error("failed", Span::default());
    let names: Vec<_> = error.trace.iter().map(|frame| frame.name.as_str()).collect();
    assert_eq!(names, ["inner", "outer", "main"]);
}
