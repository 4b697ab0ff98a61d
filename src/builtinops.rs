//! Built-in operations registered in the root environment.
//!
//! The registry is a single contiguous table of [`BuiltinDef`] entries for
//! ease of auditing; [`crate::evaluator::create_root_env`] walks it and
//! binds each name to a [`Lval::Builtin`] value. Arithmetic operators are
//! also registered under word aliases (`add`, `sub`, ...) that dispatch to
//! the same implementations; lookup is exact-match on either spelling.
//!
//! Every builtin receives its arguments already evaluated. Q-expressions
//! make special forms unnecessary: `def` gets its name list unevaluated
//! because `{x}` is quoted data, and `if` gets unevaluated branches the
//! same way.
//!
//! All failures are error *values* with messages naming the offending
//! function, e.g. `Function 'head' passed too many arguments: ({1 2} {3})`.

use std::fs;

use crate::ast::{BuiltinFn, Lval, NumberType};
use crate::evaluator::{Env, eval_with_depth, run_program};

/// A named built-in operation
pub struct BuiltinDef {
    pub name: &'static str,
    pub func: BuiltinFn,
}

/// Registry of all built-in operations
static BUILTIN_OPS: &[BuiltinDef] = &[
    // Arithmetic (symbolic and word aliases)
    BuiltinDef { name: "+", func: builtin_add },
    BuiltinDef { name: "-", func: builtin_sub },
    BuiltinDef { name: "*", func: builtin_mul },
    BuiltinDef { name: "/", func: builtin_div },
    BuiltinDef { name: "%", func: builtin_mod },
    BuiltinDef { name: "^", func: builtin_pow },
    BuiltinDef { name: "add", func: builtin_add },
    BuiltinDef { name: "sub", func: builtin_sub },
    BuiltinDef { name: "mul", func: builtin_mul },
    BuiltinDef { name: "div", func: builtin_div },
    BuiltinDef { name: "mod", func: builtin_mod },
    BuiltinDef { name: "pow", func: builtin_pow },
    // List operations
    BuiltinDef { name: "list", func: builtin_list },
    BuiltinDef { name: "head", func: builtin_head },
    BuiltinDef { name: "tail", func: builtin_tail },
    BuiltinDef { name: "join", func: builtin_join },
    BuiltinDef { name: "eval", func: builtin_eval },
    BuiltinDef { name: "cons", func: builtin_cons },
    BuiltinDef { name: "len", func: builtin_len },
    BuiltinDef { name: "init", func: builtin_init },
    // Definition forms
    BuiltinDef { name: "def", func: builtin_def },
    BuiltinDef { name: "=", func: builtin_put },
    BuiltinDef { name: "\\", func: builtin_lambda },
    // Ordering and equality
    BuiltinDef { name: ">", func: builtin_gt },
    BuiltinDef { name: "<", func: builtin_lt },
    BuiltinDef { name: ">=", func: builtin_ge },
    BuiltinDef { name: "<=", func: builtin_le },
    BuiltinDef { name: "==", func: builtin_eq },
    BuiltinDef { name: "!=", func: builtin_ne },
    // Conditional
    BuiltinDef { name: "if", func: builtin_if },
    // String / IO
    BuiltinDef { name: "load", func: builtin_load },
    BuiltinDef { name: "print", func: builtin_print },
    BuiltinDef { name: "error", func: builtin_error },
];

/// All built-in operations, for registration by the evaluator
pub(crate) fn builtin_defs() -> &'static [BuiltinDef] {
    BUILTIN_OPS
}

//
// Error constructors shared by the builtins
//

fn too_many_args(name: &str, args: &[Lval]) -> Lval {
    Lval::err(format!(
        "Function '{name}' passed too many arguments: {}",
        Lval::Sexpr(args.to_vec())
    ))
}

fn incorrect_type(name: &str, got: &Lval, expected: &str) -> Lval {
    Lval::err(format!(
        "Function '{name}' passed incorrect type! Got: {}, Expected: {expected}",
        got.type_name()
    ))
}

fn empty_list(name: &str) -> Lval {
    Lval::err(format!("Function '{name}' passed {{}}!"))
}

//
// Argument extraction helpers
//

fn expect_one(name: &str, mut args: Vec<Lval>) -> Result<Lval, Lval> {
    if args.len() != 1 {
        return Err(too_many_args(name, &args));
    }
    Ok(args.remove(0))
}

fn expect_two(name: &str, mut args: Vec<Lval>) -> Result<(Lval, Lval), Lval> {
    if args.len() != 2 {
        return Err(too_many_args(name, &args));
    }
    let second = args.remove(1);
    let first = args.remove(0);
    Ok((first, second))
}

fn expect_one_qexpr(name: &str, args: Vec<Lval>) -> Result<Vec<Lval>, Lval> {
    match expect_one(name, args)? {
        Lval::Qexpr(cells) => Ok(cells),
        other => Err(incorrect_type(name, &other, "Q-Expression")),
    }
}

//
// Arithmetic
//

/// Wrapping integer exponentiation by squaring
fn wrapping_ipow(mut base: NumberType, mut exp: NumberType) -> NumberType {
    let mut acc: NumberType = 1;
    while exp > 0 {
        if exp & 1 == 1 {
            acc = acc.wrapping_mul(base);
        }
        base = base.wrapping_mul(base);
        exp >>= 1;
    }
    acc
}

/// Fold an arithmetic operator over the arguments, all of which must be
/// numbers. A lone operand folds to itself, except for `-` which negates.
fn builtin_op(args: Vec<Lval>, op: &str) -> Lval {
    let mut nums = Vec::with_capacity(args.len());
    for cell in args {
        match cell {
            Lval::Num(n) => nums.push(n),
            other => {
                return Lval::err(format!(
                    "Cannot operate on non-number: {}",
                    other.type_name()
                ));
            }
        }
    }

    let mut rest = nums.into_iter();
    let Some(first) = rest.next() else {
        return empty_list(op);
    };

    if op == "-" && rest.len() == 0 {
        return Lval::Num(first.wrapping_neg());
    }

    let mut acc = first;
    for y in rest {
        acc = match op {
            "+" => acc.wrapping_add(y),
            "-" => acc.wrapping_sub(y),
            "*" => acc.wrapping_mul(y),
            "/" => {
                if y == 0 {
                    return Lval::err("Division By Zero!");
                }
                acc.wrapping_div(y)
            }
            "%" => {
                if y == 0 {
                    return Lval::err("Division By Zero!");
                }
                acc.wrapping_rem(y)
            }
            "^" => {
                if y < 0 {
                    return Lval::err("Negative Exponent!");
                }
                wrapping_ipow(acc, y)
            }
            _ => return Lval::err(format!("Unknown operator: '{op}'")),
        };
    }
    Lval::Num(acc)
}

macro_rules! arith_builtin {
    ($name:ident, $op:literal) => {
        fn $name(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
            builtin_op(args, $op)
        }
    };
}

arith_builtin!(builtin_add, "+");
arith_builtin!(builtin_sub, "-");
arith_builtin!(builtin_mul, "*");
arith_builtin!(builtin_div, "/");
arith_builtin!(builtin_mod, "%");
arith_builtin!(builtin_pow, "^");

//
// Ordering and equality
//

/// Compare two numbers, producing 1 or 0
fn builtin_ord(args: Vec<Lval>, op: &str) -> Lval {
    let (first, second) = match expect_two(op, args) {
        Ok(pair) => pair,
        Err(e) => return e,
    };
    let (Lval::Num(a), Lval::Num(b)) = (&first, &second) else {
        let offender = if matches!(first, Lval::Num(_)) {
            &second
        } else {
            &first
        };
        return incorrect_type(op, offender, "Number");
    };
    let result = match op {
        ">" => a > b,
        "<" => a < b,
        ">=" => a >= b,
        _ => a <= b,
    };
    Lval::Num(NumberType::from(result))
}

macro_rules! ord_builtin {
    ($name:ident, $op:literal) => {
        fn $name(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
            builtin_ord(args, $op)
        }
    };
}

ord_builtin!(builtin_gt, ">");
ord_builtin!(builtin_lt, "<");
ord_builtin!(builtin_ge, ">=");
ord_builtin!(builtin_le, "<=");

/// Structural equality over any two values, producing 1 or 0
fn builtin_cmp(args: Vec<Lval>, op: &str) -> Lval {
    let (first, second) = match expect_two(op, args) {
        Ok(pair) => pair,
        Err(e) => return e,
    };
    let equal = first == second;
    let result = if op == "==" { equal } else { !equal };
    Lval::Num(NumberType::from(result))
}

fn builtin_eq(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    builtin_cmp(args, "==")
}

fn builtin_ne(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    builtin_cmp(args, "!=")
}

//
// List operations
//

fn builtin_list(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    Lval::Qexpr(args)
}

fn builtin_head(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    let mut cells = match expect_one_qexpr("head", args) {
        Ok(cells) => cells,
        Err(e) => return e,
    };
    if cells.is_empty() {
        return empty_list("head");
    }
    cells.truncate(1);
    Lval::Qexpr(cells)
}

fn builtin_tail(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    let mut cells = match expect_one_qexpr("tail", args) {
        Ok(cells) => cells,
        Err(e) => return e,
    };
    if cells.is_empty() {
        return empty_list("tail");
    }
    cells.remove(0);
    Lval::Qexpr(cells)
}

fn builtin_join(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    let mut joined = Vec::new();
    for arg in args {
        match arg {
            Lval::Qexpr(cells) => joined.extend(cells),
            other => return incorrect_type("join", &other, "Q-Expression"),
        }
    }
    Lval::Qexpr(joined)
}

/// Evaluate a Q-expression as an S-expression in the current environment
fn builtin_eval(env: &Env, args: Vec<Lval>, depth: usize) -> Lval {
    let cells = match expect_one_qexpr("eval", args) {
        Ok(cells) => cells,
        Err(e) => return e,
    };
    eval_with_depth(env, Lval::Sexpr(cells), depth + 1)
}

fn builtin_cons(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    let (head, rest) = match expect_two("cons", args) {
        Ok(pair) => pair,
        Err(e) => return e,
    };
    let mut cells = match rest {
        Lval::Qexpr(cells) => cells,
        other => return incorrect_type("cons", &other, "Q-Expression"),
    };
    cells.insert(0, head);
    Lval::Qexpr(cells)
}

fn builtin_len(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    match expect_one_qexpr("len", args) {
        Ok(cells) => Lval::Num(cells.len() as NumberType),
        Err(e) => e,
    }
}

fn builtin_init(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    let mut cells = match expect_one_qexpr("init", args) {
        Ok(cells) => cells,
        Err(e) => return e,
    };
    if cells.pop().is_none() {
        return empty_list("init");
    }
    Lval::Qexpr(cells)
}

//
// Definition forms
//

/// Bind symbols to values: `def` in the root scope, `=` in the current one
fn builtin_var(env: &Env, mut args: Vec<Lval>, name: &str) -> Lval {
    if args.is_empty() {
        return empty_list(name);
    }
    let symbols = match args.remove(0) {
        Lval::Qexpr(cells) => cells,
        other => return incorrect_type(name, &other, "Q-Expression"),
    };

    let mut names = Vec::with_capacity(symbols.len());
    for cell in symbols {
        match cell {
            Lval::Sym(s) => names.push(s),
            other => {
                return Lval::err(format!(
                    "Function '{name}' cannot define non-symbol! Got: {}, Expected: Symbol",
                    other.type_name()
                ));
            }
        }
    }

    if names.len() != args.len() {
        return Lval::err(format!(
            "Function '{name}' passed mismatched count of symbols and values! Got: {}, Expected: {}",
            args.len(),
            names.len()
        ));
    }

    for (symbol, value) in names.into_iter().zip(args) {
        if name == "def" {
            env.put_global(symbol, value);
        } else {
            env.put_local(symbol, value);
        }
    }
    Lval::empty()
}

fn builtin_def(env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    builtin_var(env, args, "def")
}

fn builtin_put(env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    builtin_var(env, args, "=")
}

/// Construct a user function capturing the current environment
fn builtin_lambda(env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    let (formals_q, body_q) = match expect_two("\\", args) {
        Ok(pair) => pair,
        Err(e) => return e,
    };
    let formal_cells = match formals_q {
        Lval::Qexpr(cells) => cells,
        other => return incorrect_type("\\", &other, "Q-Expression"),
    };
    let body = match body_q {
        Lval::Qexpr(cells) => cells,
        other => return incorrect_type("\\", &other, "Q-Expression"),
    };

    let mut formals = Vec::with_capacity(formal_cells.len());
    for cell in formal_cells {
        match cell {
            Lval::Sym(s) => formals.push(s),
            other => {
                return Lval::err(format!(
                    "Function '\\' cannot define non-symbol! Got: {}, Expected: Symbol",
                    other.type_name()
                ));
            }
        }
    }

    Lval::Lambda {
        formals,
        body,
        env: env.clone(),
    }
}

//
// Conditional
//

fn builtin_if(env: &Env, args: Vec<Lval>, depth: usize) -> Lval {
    let [condition, then_branch, else_branch]: [Lval; 3] = match args.try_into() {
        Ok(args) => args,
        Err(args) => return too_many_args("if", &args),
    };

    let n = match condition {
        Lval::Num(n) => n,
        other => return incorrect_type("if", &other, "Number"),
    };
    let then_cells = match then_branch {
        Lval::Qexpr(cells) => cells,
        other => return incorrect_type("if", &other, "Q-Expression"),
    };
    let else_cells = match else_branch {
        Lval::Qexpr(cells) => cells,
        other => return incorrect_type("if", &other, "Q-Expression"),
    };

    let chosen = if n != 0 { then_cells } else { else_cells };
    eval_with_depth(env, Lval::Sexpr(chosen), depth + 1)
}

//
// String / IO
//

/// Read a file and evaluate each of its expressions in order. Shared with
/// the binary's script-file mode.
pub fn load_file(env: &Env, path: &str, depth: usize) -> Lval {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(_) => return Lval::err(format!("Could not load file \"{path}\"")),
    };
    run_program(env, &source, depth)
}

fn builtin_load(env: &Env, args: Vec<Lval>, depth: usize) -> Lval {
    let path = match expect_one("load", args) {
        Ok(Lval::Str(path)) => path,
        Ok(other) => return incorrect_type("load", &other, "String"),
        Err(e) => return e,
    };
    load_file(env, &path, depth)
}

/// Print the arguments separated by spaces, strings unquoted
fn builtin_print(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    let mut line = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            line.push(' ');
        }
        match arg {
            Lval::Str(s) => line.push_str(s),
            other => line.push_str(&other.to_string()),
        }
    }
    println!("{line}");
    Lval::empty()
}

fn builtin_error(_env: &Env, args: Vec<Lval>, _depth: usize) -> Lval {
    match expect_one("error", args) {
        Ok(Lval::Str(message)) => Lval::Err(message),
        Ok(other) => incorrect_type("error", &other, "String"),
        Err(e) => e,
    }
}
