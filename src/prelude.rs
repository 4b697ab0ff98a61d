//! The standard prelude: a short Lispy program evaluated into the root
//! environment after the built-ins are registered.

use crate::ast::Lval;
use crate::evaluator::{Env, run_program};

/// Prelude source, embedded in the binary
pub const PRELUDE: &str = r#"
; Atoms
(def {nil} {})
(def {true} 1)
(def {false} 0)

; Define a named function: (fun {name args...} {body})
(def {fun} (\ {args body} {def (head args) (\ (tail args) body)}))

; Apply a function to a list of arguments, and the reverse
(fun {unpack f xs} {eval (join (list f) xs)})
(fun {pack f & xs} {f xs})
(def {curry} unpack)
(def {uncurry} pack)

; Recursion helpers
(fun {reverse l} {
  if (== l {})
    {{}}
    {join (reverse (tail l)) (head l)}
})
(fun {map f l} {
  if (== l {})
    {{}}
    {join (list (f (eval (head l)))) (map f (tail l))}
})
(fun {filter f l} {
  if (== l {})
    {{}}
    {join (if (f (eval (head l))) {head l} {{}}) (filter f (tail l))}
})
"#;

/// Evaluate the prelude into `env`. The prelude is part of the interpreter;
/// a failure to load it is a bug, not a user error.
pub(crate) fn install(env: &Env) {
    let result = run_program(env, PRELUDE, 0);
    assert!(
        !matches!(result, Lval::Err(_)),
        "standard prelude failed to load: {result}"
    );
}
