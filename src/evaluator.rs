//! Environments and the core reduction engine.
//!
//! An [`Env`] is a shared, live chain of scopes: every handle clones cheaply
//! and points at the same mutable bindings, so a function `def`'d into the
//! root *after* a lambda captured its scope is still visible when the lambda
//! body runs. That is what makes prelude-defined recursive functions work.
//! Reads hand out deep copies, so values retrieved from an environment never
//! alias the environment's own slot.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::MAX_EVAL_DEPTH;
use crate::ast::Lval;
use crate::builtinops;
use crate::parser::parse_program;

struct EnvInner {
    bindings: HashMap<String, Lval>,
    parent: Option<Env>,
}

/// Environment for variable bindings
///
/// Cloning an `Env` clones the handle, not the scope: all clones observe the
/// same bindings. A lambda bound into the very scope it captures therefore
/// forms a reference cycle and leaks; collecting such cycles is out of scope
/// for the interpreter's ownership model.
#[derive(Clone)]
pub struct Env(Rc<RefCell<EnvInner>>);

impl Env {
    /// Create an empty, parent-less environment
    pub fn root() -> Self {
        Env(Rc::new(RefCell::new(EnvInner {
            bindings: HashMap::new(),
            parent: None,
        })))
    }

    /// Create an empty environment chained to `parent`
    pub(crate) fn with_parent(parent: &Env) -> Self {
        Env(Rc::new(RefCell::new(EnvInner {
            bindings: HashMap::new(),
            parent: Some(parent.clone()),
        })))
    }

    fn parent(&self) -> Option<Env> {
        self.0.borrow().parent.clone()
    }

    /// Look up a symbol, searching this scope first and then the parent
    /// chain. Returns a deep copy of the bound value.
    pub fn get(&self, name: &str) -> Option<Lval> {
        if let Some(value) = self.0.borrow().bindings.get(name) {
            return Some(value.clone());
        }
        self.parent().and_then(|parent| parent.get(name))
    }

    /// Insert or overwrite a binding in this scope
    pub fn put_local(&self, name: impl Into<String>, value: Lval) {
        self.0.borrow_mut().bindings.insert(name.into(), value);
    }

    /// Insert or overwrite a binding in the root scope
    pub fn put_global(&self, name: impl Into<String>, value: Lval) {
        match self.parent() {
            Some(parent) => parent.put_global(name, value),
            None => self.put_local(name, value),
        }
    }
}

/// Create the root environment: all built-in operations registered, then
/// the standard prelude loaded on top.
pub fn create_root_env() -> Env {
    let env = Env::root();
    for def in builtinops::builtin_defs() {
        env.put_local(
            def.name,
            Lval::Builtin {
                name: def.name,
                func: def.func,
            },
        );
    }
    crate::prelude::install(&env);
    env
}

/// Evaluate a value (public API)
pub fn eval(env: &Env, value: Lval) -> Lval {
    eval_with_depth(env, value, 0)
}

/// Evaluate a value with depth tracking to prevent host stack overflow
pub(crate) fn eval_with_depth(env: &Env, value: Lval, depth: usize) -> Lval {
    if depth >= MAX_EVAL_DEPTH {
        return Lval::err(format!(
            "Evaluation depth limit exceeded (max: {MAX_EVAL_DEPTH})"
        ));
    }
    match value {
        // Symbols resolve through the environment chain
        Lval::Sym(name) => match env.get(&name) {
            Some(value) => value,
            None => Lval::err(format!("Unbound Symbol: '{name}'")),
        },
        // S-expressions reduce by function application
        Lval::Sexpr(cells) => eval_sexpr(env, cells, depth),
        // Everything else is self-evaluating, Q-expressions included
        other => other,
    }
}

/// Reduce an S-expression: evaluate every child, take the first error if
/// any, unwrap empty/singleton forms, then apply the head to the rest.
fn eval_sexpr(env: &Env, cells: Vec<Lval>, depth: usize) -> Lval {
    let mut cells: Vec<Lval> = cells
        .into_iter()
        .map(|cell| eval_with_depth(env, cell, depth + 1))
        .collect();

    if let Some(i) = cells.iter().position(|cell| matches!(cell, Lval::Err(_))) {
        return cells.swap_remove(i);
    }

    if cells.is_empty() {
        // The empty S-expression is its own value
        return Lval::Sexpr(cells);
    }
    if cells.len() == 1 {
        return cells.remove(0);
    }

    let func = cells.remove(0);
    apply(env, func, cells, depth)
}

/// Apply a function value to already-evaluated arguments
fn apply(env: &Env, func: Lval, args: Vec<Lval>, depth: usize) -> Lval {
    match func {
        Lval::Builtin { func, .. } => func(env, args, depth),
        Lval::Lambda {
            formals,
            body,
            env: captured,
        } => apply_lambda(formals, body, &captured, args, depth),
        other => Lval::err(format!(
            "S-expression does not start with symbol! got: {}",
            other.type_name()
        )),
    }
}

/// Bind arguments to formals in a fresh scope chained to the captured
/// environment. Binding fewer arguments than formals yields a partially
/// applied function; `&` collects the remaining arguments into a Q-expression.
fn apply_lambda(
    formals: Vec<String>,
    body: Vec<Lval>,
    captured: &Env,
    args: Vec<Lval>,
    depth: usize,
) -> Lval {
    let given = args.len();
    let expected = formals.len();
    let local = Env::with_parent(captured);

    let mut formals: VecDeque<String> = formals.into();
    let mut args: VecDeque<Lval> = args.into();

    while let Some(arg) = args.pop_front() {
        let Some(formal) = formals.pop_front() else {
            return Lval::err(format!(
                "Function passed too many arguments. Got: {given}, Expected: {expected}."
            ));
        };

        if formal == "&" {
            // The single formal after '&' takes the rest of the arguments
            let Some(rest_formal) = formals.pop_front() else {
                return variadic_format_error();
            };
            if !formals.is_empty() {
                return variadic_format_error();
            }
            let mut rest = vec![arg];
            rest.extend(args.drain(..));
            local.put_local(rest_formal, Lval::Qexpr(rest));
            break;
        }

        local.put_local(formal, arg);
    }

    // '&' declared but no variadic arguments supplied: bind the empty list
    if formals.front().is_some_and(|f| f == "&") {
        if formals.len() != 2 {
            return variadic_format_error();
        }
        formals.pop_front();
        if let Some(rest_formal) = formals.pop_front() {
            local.put_local(rest_formal, Lval::Qexpr(Vec::new()));
        }
    }

    if !formals.is_empty() {
        // Partial application: close over the bindings made so far
        return Lval::Lambda {
            formals: formals.into_iter().collect(),
            body,
            env: local,
        };
    }

    // Fully applied: evaluate the body as an S-expression in the new scope
    eval_with_depth(&local, Lval::Sexpr(body), depth + 1)
}

fn variadic_format_error() -> Lval {
    Lval::err("Function format invalid. Symbol '&' not followed by single symbol.")
}

/// Parse a line of input and evaluate it as a single S-expression, the way
/// the REPL consumes it. Parse failures surface as error values.
pub fn read_eval(env: &Env, input: &str) -> Lval {
    match parse_program(input) {
        Ok(root) => eval(env, root),
        Err(_) => Lval::err(format!("Failed to parse input: '{input}'")),
    }
}

/// Parse a program and evaluate each top-level expression in order,
/// returning the first error value encountered, or `()` on success.
/// This is the path used by `load` and the prelude.
pub fn run_program(env: &Env, source: &str, depth: usize) -> Lval {
    let root = match parse_program(source) {
        Ok(root) => root,
        Err(_) => {
            return Lval::err(format!("Failed to parse input: '{}'", source.trim()));
        }
    };
    let cells = match root {
        Lval::Sexpr(cells) => cells,
        other => vec![other],
    };
    for expr in cells {
        let result = eval_with_depth(env, expr, depth);
        if matches!(result, Lval::Err(_)) {
            return result;
        }
    }
    Lval::empty()
}
