//! This module defines the core value type of the interpreter. The main
//! enum, [`Lval`], covers every Lispy data type: numbers, symbols, strings,
//! S-expressions, Q-expressions, built-in and user-defined functions, and
//! error values. Display logic follows the language's printer rules
//! (strings are re-escaped, S- and Q-expressions print with their
//! delimiters, functions print as `<builtin>` or `(\ {formals} {body})`),
//! and equality is structural with captured environments ignored.

use crate::evaluator::Env;
use std::fmt;

/// Type alias for number values in the interpreter
pub(crate) type NumberType = i64;

/// Allowed non-alphanumeric characters in Lispy symbol names
/// Includes the lambda symbol "\" and the variadic marker "&"
pub(crate) const SYMBOL_SPECIAL_CHARS: &str = "_+-*/\\=<>!&%^|";

pub(crate) fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || SYMBOL_SPECIAL_CHARS.contains(c)
}

/// Check if a string is a valid symbol name
/// Valid: non-empty, no leading digit, no "-digit" prefix (those are
/// number lexemes), all characters alphanumeric or SYMBOL_SPECIAL_CHARS
pub(crate) fn is_valid_symbol(name: &str) -> bool {
    let mut chars = name.chars();

    let Some(first) = chars.next() else {
        return false;
    };
    if first.is_ascii_digit() {
        return false;
    }
    if first == '-' {
        if let Some(second) = chars.next() {
            if second.is_ascii_digit() {
                return false;
            }
        }
    }

    name.chars().all(is_symbol_char)
}

/// Signature shared by every built-in operation: the environment the call
/// happens in, the already-evaluated arguments, and the current evaluation
/// depth (threaded through so builtins that evaluate can keep tracking it).
pub type BuiltinFn = fn(&Env, Vec<Lval>, usize) -> Lval;

/// Core value type of the interpreter
///
/// Everything the evaluator touches is an `Lval`, including errors: an
/// [`Lval::Err`] short-circuits the enclosing S-expression instead of
/// unwinding the host stack.
#[derive(Clone)]
pub enum Lval {
    /// Numbers (64-bit integers, arithmetic wraps)
    Num(NumberType),
    /// Error values with a human-readable message
    Err(String),
    /// Symbols (identifiers)
    Sym(String),
    /// String literals (contents unescaped, no surrounding quotes)
    Str(String),
    /// S-expressions: evaluated by applying the first child to the rest
    Sexpr(Vec<Lval>),
    /// Q-expressions: quoted data, never implicitly evaluated
    Qexpr(Vec<Lval>),
    /// Built-in functions, compared by name rather than function pointer
    Builtin { name: &'static str, func: BuiltinFn },
    /// User-defined functions: formal parameters, body cells, captured
    /// environment (the scope active at lambda construction)
    Lambda {
        formals: Vec<String>,
        body: Vec<Lval>,
        env: Env,
    },
}

impl Lval {
    /// The type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Lval::Num(_) => "Number",
            Lval::Err(_) => "Error",
            Lval::Sym(_) => "Symbol",
            Lval::Str(_) => "String",
            Lval::Sexpr(_) => "S-Expression",
            Lval::Qexpr(_) => "Q-Expression",
            Lval::Builtin { .. } | Lval::Lambda { .. } => "Function",
        }
    }

    /// Shorthand error constructor
    pub(crate) fn err(message: impl Into<String>) -> Lval {
        Lval::Err(message.into())
    }

    /// The empty S-expression `()`, the result of definitions and `print`
    pub(crate) fn empty() -> Lval {
        Lval::Sexpr(Vec::new())
    }
}

// Helper constructors for building values in tests

#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn num(n: NumberType) -> Lval {
    Lval::Num(n)
}

#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sym<S: AsRef<str>>(name: S) -> Lval {
    Lval::Sym(name.as_ref().to_owned())
}

#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn qexpr(cells: Vec<Lval>) -> Lval {
    Lval::Qexpr(cells)
}

#[cfg_attr(not(test), expect(dead_code))]
pub(crate) fn sexpr(cells: Vec<Lval>) -> Lval {
    Lval::Sexpr(cells)
}

fn write_expr(f: &mut fmt::Formatter<'_>, cells: &[Lval], open: char, close: char) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, cell) in cells.iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        write!(f, "{cell}")?;
    }
    write!(f, "{close}")
}

impl fmt::Display for Lval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lval::Num(n) => write!(f, "{n}"),
            Lval::Err(msg) => write!(f, "Error: {msg}"),
            Lval::Sym(s) => write!(f, "{s}"),
            Lval::Str(s) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    match ch {
                        '\\' => write!(f, "\\\\")?,
                        '"' => write!(f, "\\\"")?,
                        '\n' => write!(f, "\\n")?,
                        '\t' => write!(f, "\\t")?,
                        '\r' => write!(f, "\\r")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Lval::Sexpr(cells) => write_expr(f, cells, '(', ')'),
            Lval::Qexpr(cells) => write_expr(f, cells, '{', '}'),
            Lval::Builtin { .. } => write!(f, "<builtin>"),
            Lval::Lambda { formals, body, .. } => {
                write!(f, "(\\ {{")?;
                for (i, name) in formals.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{name}")?;
                }
                write!(f, "}} ")?;
                write_expr(f, body, '{', '}')?;
                write!(f, ")")
            }
        }
    }
}

// Manual Debug: the captured environment is omitted for lambdas, since a
// function bound into the scope it captures would make a derived impl
// recurse forever.
impl fmt::Debug for Lval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lval::Num(n) => write!(f, "Num({n})"),
            Lval::Err(msg) => write!(f, "Err({msg:?})"),
            Lval::Sym(s) => write!(f, "Sym({s})"),
            Lval::Str(s) => write!(f, "Str({s:?})"),
            Lval::Sexpr(cells) => f.debug_tuple("Sexpr").field(cells).finish(),
            Lval::Qexpr(cells) => f.debug_tuple("Qexpr").field(cells).finish(),
            Lval::Builtin { name, .. } => write!(f, "Builtin({name})"),
            Lval::Lambda { formals, body, .. } => {
                write!(f, "Lambda(formals={formals:?}, body={body:?})")
            }
        }
    }
}

impl PartialEq for Lval {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Lval::Num(a), Lval::Num(b)) => a == b,
            (Lval::Err(a), Lval::Err(b)) => a == b,
            (Lval::Sym(a), Lval::Sym(b)) => a == b,
            (Lval::Str(a), Lval::Str(b)) => a == b,
            (Lval::Sexpr(a), Lval::Sexpr(b)) => a == b,
            (Lval::Qexpr(a), Lval::Qexpr(b)) => a == b,
            // Builtins compare by registered name, not function pointer
            (Lval::Builtin { name: a, .. }, Lval::Builtin { name: b, .. }) => a == b,
            // Lambdas compare structurally; captured environments are ignored
            (
                Lval::Lambda {
                    formals: f1,
                    body: b1,
                    ..
                },
                Lval::Lambda {
                    formals: f2,
                    body: b2,
                    ..
                },
            ) => f1 == f2 && b1 == b2,
            _ => false, // Different variants are never equal
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Env;

    fn dummy_builtin(_env: &Env, _args: Vec<Lval>, _depth: usize) -> Lval {
        Lval::empty()
    }

    #[test]
    fn test_display_data_driven() {
        let test_cases = vec![
            (num(42), "42"),
            (num(-271), "-271"),
            (Lval::Str("hello".to_owned()), "\"hello\""),
            (Lval::Str("a\nb\t\"c\"\\".to_owned()), "\"a\\nb\\t\\\"c\\\"\\\\\""),
            (sym("add-mul"), "add-mul"),
            (Lval::err("Division By Zero!"), "Error: Division By Zero!"),
            (sexpr(vec![]), "()"),
            (qexpr(vec![]), "{}"),
            (
                sexpr(vec![sym("+"), num(1), sexpr(vec![sym("*"), num(7), num(5)])]),
                "(+ 1 (* 7 5))",
            ),
            (
                qexpr(vec![num(1), num(2), qexpr(vec![num(5), num(6)])]),
                "{1 2 {5 6}}",
            ),
            (
                Lval::Builtin {
                    name: "+",
                    func: dummy_builtin,
                },
                "<builtin>",
            ),
            (
                Lval::Lambda {
                    formals: vec!["x".to_owned(), "y".to_owned()],
                    body: vec![sym("+"), sym("x"), sym("y")],
                    env: Env::root(),
                },
                "(\\ {x y} {+ x y})",
            ),
            (
                Lval::Lambda {
                    formals: vec!["f".to_owned(), "&".to_owned(), "xs".to_owned()],
                    body: vec![sym("f"), sym("xs")],
                    env: Env::root(),
                },
                "(\\ {f & xs} {f xs})",
            ),
        ];

        for (i, (value, expected)) in test_cases.iter().enumerate() {
            assert_eq!(
                format!("{value}"),
                *expected,
                "Display test #{} failed",
                i + 1
            );
        }
    }

    #[test]
    fn test_structural_equality() {
        // Same tag, same payload
        assert_eq!(num(5), num(5));
        assert_ne!(num(5), num(6));
        assert_eq!(sym("x"), sym("x"));
        assert_eq!(
            qexpr(vec![num(1), qexpr(vec![num(2)])]),
            qexpr(vec![num(1), qexpr(vec![num(2)])]),
        );

        // Different tags are never equal, even with matching children
        assert_ne!(sexpr(vec![num(1)]), qexpr(vec![num(1)]));
        assert_ne!(num(0), qexpr(vec![]));
        assert_ne!(sym("x"), Lval::Str("x".to_owned()));

        // Errors compare by message
        assert_eq!(Lval::err("boom"), Lval::err("boom"));
        assert_ne!(Lval::err("boom"), Lval::err("bang"));
    }

    #[test]
    fn test_function_equality() {
        let plus = Lval::Builtin {
            name: "+",
            func: dummy_builtin,
        };
        let add = Lval::Builtin {
            name: "add",
            func: dummy_builtin,
        };
        // Builtins compare by name only
        assert_eq!(plus.clone(), plus.clone());
        assert_ne!(plus, add);

        // Lambdas compare by formals and body; captured environments differ
        // here but are ignored
        let env_a = Env::root();
        let env_b = Env::root();
        env_b.put_local("x", num(99));
        let make = |env: Env| Lval::Lambda {
            formals: vec!["x".to_owned()],
            body: vec![sym("x")],
            env,
        };
        assert_eq!(make(env_a), make(env_b));

        let other_body = Lval::Lambda {
            formals: vec!["x".to_owned()],
            body: vec![num(1)],
            env: Env::root(),
        };
        assert_ne!(
            make(Env::root()),
            other_body,
            "lambdas with different bodies must not compare equal"
        );
    }

    #[test]
    fn test_symbol_validation() {
        assert!(is_valid_symbol("foo"));
        assert!(is_valid_symbol("add-mul"));
        assert!(is_valid_symbol("+"));
        assert!(is_valid_symbol("-"));
        assert!(is_valid_symbol("\\"));
        assert!(is_valid_symbol("&"));
        assert!(is_valid_symbol(">="));
        assert!(is_valid_symbol("var123"));
        assert!(is_valid_symbol("-abc"));

        assert!(!is_valid_symbol(""));
        assert!(!is_valid_symbol("123var"));
        assert!(!is_valid_symbol("-42"));
        assert!(!is_valid_symbol("has space"));
        assert!(!is_valid_symbol("has;semi"));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(num(1).type_name(), "Number");
        assert_eq!(sym("x").type_name(), "Symbol");
        assert_eq!(Lval::Str(String::new()).type_name(), "String");
        assert_eq!(Lval::err("e").type_name(), "Error");
        assert_eq!(sexpr(vec![]).type_name(), "S-Expression");
        assert_eq!(qexpr(vec![]).type_name(), "Q-Expression");
        assert_eq!(
            Lval::Builtin {
                name: "+",
                func: dummy_builtin
            }
            .type_name(),
            "Function"
        );
    }
}
