//! Registry of built-in operations.
//!
//! Every name the evaluator knows natively lives in one table, [`get_builtin_ops`]:
//!
//! - **Native procedures** (`+`, `car`, `sqrt`, ...) take already-evaluated arguments.
//!   They are bound in the global environment and in every call frame, so they can be
//!   passed around like any other procedure value.
//! - **Special forms** (`if`, `define`, `defun`, `set!`, `quit`) receive their
//!   arguments unevaluated. They are dispatched by name and are never bound.
//!
//! Arity is checked against the table before an operation runs.
//!
//! ## Numeric arguments
//!
//! Arithmetic and comparisons work on 64-bit integers and wrap on overflow. They
//! also accept the decimal symbols produced by `sqrt` and `pow` by reading their
//! leading integer digits, so `(+ (sqrt 2) 1)` is `2`.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::Error;
use crate::ast::{NumberType, Value, ValueKind};
use crate::evaluator::{
    Arity, Depth, Environment, eval_define, eval_defun, eval_if, eval_quit, eval_set,
};

/// Signature of a native procedure body
pub type NativeImpl = fn(&[Value]) -> Result<Value, Error>;

/// Signature of a special form: unevaluated arguments, the current environment and
/// the current evaluation depth
pub type SpecialFormFn = fn(&[Value], &Environment, Depth) -> Result<Value, Error>;

#[derive(Debug, Clone, Copy)]
pub enum OpKind {
    Native(NativeImpl),
    SpecialForm(SpecialFormFn),
}

/// Definition of a built-in operation
#[derive(Debug, Clone, Copy)]
pub struct BuiltinOp {
    pub name: &'static str,
    pub kind: OpKind,
    pub arity: Arity,
}

impl BuiltinOp {
    pub fn is_special_form(&self) -> bool {
        matches!(self.kind, OpKind::SpecialForm(_))
    }
}

//
// Argument coercion
//

/// Read an integer argument. A symbol contributes its leading signed decimal digits
/// and the rest is ignored, so `1.9` reads as `1` and `1e3` as `1`.
fn integer_arg(name: &str, value: &Value) -> Result<NumberType, Error> {
    match &value.kind {
        ValueKind::Number(n) => Ok(*n),
        ValueKind::Symbol(text) => leading_integer(text)
            .ok_or_else(|| Error::type_mismatch(name, "a number", value)),
        _ => Err(Error::type_mismatch(name, "a number", value)),
    }
}

/// `None` without at least one digit, or when the digits overflow
fn leading_integer(text: &str) -> Option<NumberType> {
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    let digits = unsigned.len() - unsigned.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let sign = text.len() - unsigned.len();
    text[..sign + digits].parse().ok()
}

fn float_arg(name: &str, value: &Value) -> Result<f64, Error> {
    match &value.kind {
        ValueKind::Number(n) => Ok(*n as f64),
        ValueKind::Symbol(text) => text
            .parse::<f64>()
            .map_err(|_| Error::type_mismatch(name, "a number", value)),
        _ => Err(Error::type_mismatch(name, "a number", value)),
    }
}

fn list_arg<'a>(name: &str, value: &'a Value) -> Result<&'a [Value], Error> {
    match &value.kind {
        ValueKind::List(items) => Ok(items),
        _ => Err(Error::type_mismatch(name, "a list", value)),
    }
}

/// Render a float with six decimals, then strip trailing zeros and a trailing point
fn float_symbol(result: f64) -> Value {
    let text = format!("{result:.6}");
    let text = if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text.as_str()
    };
    Value::symbol(text)
}

//
// Native procedure implementations
//

/// Left fold with the first argument as the seed
fn fold_integers(
    name: &str,
    args: &[Value],
    op: impl Fn(NumberType, NumberType) -> Result<NumberType, Error>,
) -> Result<Value, Error> {
    let Some((first, rest)) = args.split_first() else {
        return Err(Error::arity_mismatch(name, Arity::AtLeast(1), 0));
    };
    let mut acc = integer_arg(name, first)?;
    for arg in rest {
        acc = op(acc, integer_arg(name, arg)?)?;
    }
    Ok(Value::number(acc))
}

fn builtin_add(args: &[Value]) -> Result<Value, Error> {
    fold_integers("+", args, |a, b| Ok(a.wrapping_add(b)))
}

fn builtin_sub(args: &[Value]) -> Result<Value, Error> {
    fold_integers("-", args, |a, b| Ok(a.wrapping_sub(b)))
}

fn builtin_mul(args: &[Value]) -> Result<Value, Error> {
    fold_integers("*", args, |a, b| Ok(a.wrapping_mul(b)))
}

fn builtin_div(args: &[Value]) -> Result<Value, Error> {
    fold_integers("/", args, |a, b| {
        if b == 0 {
            Err(Error::DivideByZero)
        } else {
            Ok(a.wrapping_div(b))
        }
    })
}

// Compare the first argument against every later one
macro_rules! numeric_comparison {
    ($name:ident, $op:tt, $id:expr) => {
        fn $name(args: &[Value]) -> Result<Value, Error> {
            let Some((first, rest)) = args.split_first() else {
                return Err(Error::arity_mismatch($id, Arity::AtLeast(1), 0));
            };
            let first = integer_arg($id, first)?;
            for arg in rest {
                if !(first $op integer_arg($id, arg)?) {
                    return Ok(Value::NIL);
                }
            }
            Ok(Value::T)
        }
    };
}

numeric_comparison!(builtin_gt, >, ">");
numeric_comparison!(builtin_lt, <, "<");
numeric_comparison!(builtin_eq, ==, "=");
numeric_comparison!(builtin_ne, !=, "!=");

fn builtin_and(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::boolean(!args.iter().any(Value::is_nil)))
}

fn builtin_or(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::boolean(args.iter().any(Value::is_true)))
}

fn builtin_not(args: &[Value]) -> Result<Value, Error> {
    Ok(Value::boolean(!args.iter().any(Value::is_true)))
}

/// First element; `NIL` for the empty list
fn builtin_car(args: &[Value]) -> Result<Value, Error> {
    let [list] = args else {
        return Err(Error::arity_mismatch("car", Arity::Exact(1), args.len()));
    };
    Ok(list_arg("car", list)?.first().cloned().unwrap_or(Value::NIL))
}

/// Everything but the first element; `()` for the empty list
fn builtin_cdr(args: &[Value]) -> Result<Value, Error> {
    let [list] = args else {
        return Err(Error::arity_mismatch("cdr", Arity::Exact(1), args.len()));
    };
    let items = list_arg("cdr", list)?;
    Ok(Value::list(items.iter().skip(1).cloned().collect()))
}

/// Prepend to a list. `NIL` counts as the empty list.
fn builtin_cons(args: &[Value]) -> Result<Value, Error> {
    let [head, tail] = args else {
        return Err(Error::arity_mismatch("cons", Arity::Exact(2), args.len()));
    };
    let tail: &[Value] = if tail.is_nil() {
        &[]
    } else {
        list_arg("cons", tail)?
    };

    let mut items = Vec::with_capacity(tail.len() + 1);
    items.push(head.clone());
    items.extend_from_slice(tail);
    Ok(Value::list(items))
}

fn builtin_sqrt(args: &[Value]) -> Result<Value, Error> {
    let [x] = args else {
        return Err(Error::arity_mismatch("sqrt", Arity::Exact(1), args.len()));
    };
    Ok(float_symbol(float_arg("sqrt", x)?.sqrt()))
}

fn builtin_pow(args: &[Value]) -> Result<Value, Error> {
    let [base, exponent] = args else {
        return Err(Error::arity_mismatch("pow", Arity::Exact(2), args.len()));
    };
    Ok(float_symbol(
        float_arg("pow", base)?.powf(float_arg("pow", exponent)?),
    ))
}

/// Global registry of all built-in operations, built once on first use.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    fn native(name: &'static str, arity: Arity, func: NativeImpl) -> BuiltinOp {
        BuiltinOp {
            name,
            kind: OpKind::Native(func),
            arity,
        }
    }

    fn special(name: &'static str, arity: Arity, form: SpecialFormFn) -> BuiltinOp {
        BuiltinOp {
            name,
            kind: OpKind::SpecialForm(form),
            arity,
        }
    }

    vec![
        // Arithmetic
        native("+", Arity::AtLeast(1), builtin_add),
        native("-", Arity::AtLeast(1), builtin_sub),
        native("*", Arity::AtLeast(1), builtin_mul),
        native("/", Arity::AtLeast(1), builtin_div),
        // Comparison
        native(">", Arity::AtLeast(1), builtin_gt),
        native("<", Arity::AtLeast(1), builtin_lt),
        native("=", Arity::AtLeast(1), builtin_eq),
        native("!=", Arity::AtLeast(1), builtin_ne),
        // Logic
        native("and", Arity::Any, builtin_and),
        native("or", Arity::Any, builtin_or),
        native("not", Arity::Exact(1), builtin_not),
        // Lists
        native("car", Arity::Exact(1), builtin_car),
        native("cdr", Arity::Exact(1), builtin_cdr),
        native("cons", Arity::Exact(2), builtin_cons),
        // Floating point
        native("sqrt", Arity::Exact(1), builtin_sqrt),
        native("pow", Arity::Exact(2), builtin_pow),
        // Special forms
        special("if", Arity::Exact(3), eval_if),
        special("define", Arity::Exact(2), eval_define),
        special("defun", Arity::Exact(3), eval_defun),
        special("set!", Arity::Exact(2), eval_set),
        special("quit", Arity::Any, eval_quit),
    ]
});

static BUILTIN_INDEX: LazyLock<HashMap<&'static str, &'static BuiltinOp>> = LazyLock::new(|| {
    let ops: &'static [BuiltinOp] = BUILTIN_OPS.as_slice();
    ops.iter().map(|op| (op.name, op)).collect()
});

/// All built-in operations, natives first
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

pub fn find_builtin_op(name: &str) -> Option<&'static BuiltinOp> {
    BUILTIN_INDEX.get(name).copied()
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{nil, sym, val};

    /// Invoke a native through the registry, checking arity the way a bound
    /// procedure value does
    fn call_builtin(name: &str, args: &[Value]) -> Result<Value, Error> {
        let op = find_builtin_op(name).unwrap();
        let OpKind::Native(func) = op.kind else {
            panic!("expected a native procedure, got special form: {name}");
        };
        op.arity.validate(name, args.len())?;
        func(args)
    }

    macro_rules! test {
        ($name:expr, $args:expr, $expected:expr) => {
            ($name, call_builtin($name, $args), $expected)
        };
    }

    #[test]
    fn test_builtin_ops_registry() {
        let car = find_builtin_op("car").unwrap();
        assert_eq!(car.arity, Arity::Exact(1));
        assert!(!car.is_special_form());

        for form in ["if", "define", "defun", "set!", "quit"] {
            assert!(find_builtin_op(form).unwrap().is_special_form(), "{form}");
        }

        assert!(find_builtin_op("lambda").is_none());
        assert_eq!(get_builtin_ops().len(), 21);

        let mut names: Vec<_> = get_builtin_ops().iter().map(|op| op.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), get_builtin_ops().len(), "duplicate registry entry");
    }

    #[test]
    #[expect(clippy::too_many_lines)] // Comprehensive test coverage is intentionally thorough
    fn test_builtin_function_implementations() {
        type TestCase = (&'static str, Result<Value, Error>, Option<Value>);

        let many_ones: Vec<Value> = (0..100).map(|_| val(1)).collect();
        let abc = val(vec![sym("a"), sym("b"), sym("c")]);

        let test_cases: Vec<TestCase> = vec![
            // ===== ARITHMETIC =====
            test!("+", &[val(1), val(2), val(3)], Some(val(6))),
            test!("+", &[val(7)], Some(val(7))),
            test!("+", &many_ones, Some(val(100))),
            test!("+", &[val(i64::MAX), val(1)], Some(val(i64::MIN))),
            test!("-", &[val(10), val(3), val(2)], Some(val(5))),
            test!("-", &[val(5)], Some(val(5))),
            test!("-", &[val(i64::MIN), val(1)], Some(val(i64::MAX))),
            test!("*", &[val(2), val(3), val(4)], Some(val(24))),
            test!("*", &[val(-2), val(3)], Some(val(-6))),
            test!("/", &[val(100), val(5), val(2)], Some(val(10))),
            test!("/", &[val(-7), val(2)], Some(val(-3))),
            test!("/", &[val(i64::MIN), val(-1)], Some(val(i64::MIN))),
            test!("/", &[val(4), val(0)], None),
            test!("/", &[val(0), val(4), val(0)], None),
            test!("+", &[], None),
            test!("+", &[val(1), val(true)], None),
            test!("+", &[val(1), val([1])], None),
            // Symbols contribute their leading signed digits
            test!("+", &[sym("1.9"), val(1)], Some(val(2))),
            test!("+", &[sym("-1.9"), val(1)], Some(val(0))),
            test!("*", &[sym("-5"), val(2)], Some(val(-10))),
            test!("+", &[sym("1e3"), val(1)], Some(val(2))),
            test!("+", &[sym("+7x")], Some(val(7))),
            test!("+", &[sym("abc")], None),
            test!("+", &[sym("NaN")], None),
            test!("+", &[sym("inf")], None),
            test!("+", &[sym("-")], None),
            test!("+", &[sym(".5")], None),
            test!("+", &[sym("99999999999999999999")], None),
            // ===== COMPARISON =====
            test!(">", &[val(3), val(2)], Some(val(true))),
            test!(">", &[val(3), val(3)], Some(val(false))),
            test!(">", &[val(5), val(1), val(6)], Some(val(false))),
            test!("<", &[val(1), val(2), val(3)], Some(val(true))),
            test!("<", &[val(1), val(0)], Some(val(false))),
            test!("=", &[val(2), val(2), val(2)], Some(val(true))),
            test!("=", &[val(2), val(3)], Some(val(false))),
            test!("!=", &[val(2), val(3), val(4)], Some(val(true))),
            test!("!=", &[val(2), val(3), val(2)], Some(val(false))),
            test!("=", &[val(7)], Some(val(true))),
            test!(">", &[], None),
            test!("<", &[val(1), sym("x")], None),
            // ===== LOGIC =====
            test!("and", &[], Some(val(true))),
            test!("and", &[val(true), val(1)], Some(val(true))),
            test!("and", &[val(true), val(false)], Some(val(false))),
            test!("or", &[], Some(val(false))),
            test!("or", &[val(false), val(true)], Some(val(true))),
            test!("or", &[val(1), val(2)], Some(val(false))),
            test!("not", &[val(true)], Some(val(false))),
            test!("not", &[val(false)], Some(val(true))),
            test!("not", &[nil()], Some(val(true))),
            test!("not", &[], None),
            test!("not", &[val(true), val(true)], None),
            // ===== LISTS =====
            test!("car", &[abc.clone()], Some(sym("a"))),
            test!("car", &[nil()], Some(val(false))),
            test!("car", &[val(1)], None),
            test!("cdr", &[abc.clone()], Some(val(vec![sym("b"), sym("c")]))),
            test!("cdr", &[val([1])], Some(nil())),
            test!("cdr", &[nil()], Some(nil())),
            test!("cdr", &[sym("x")], None),
            test!("cons", &[val(1), val([2, 3])], Some(val([1, 2, 3]))),
            test!("cons", &[val(1), nil()], Some(val([1]))),
            test!("cons", &[val(1), val(false)], Some(val([1]))),
            test!("cons", &[nil(), nil()], Some(val(vec![nil()]))),
            test!("cons", &[val(1), val(2)], None),
            test!("cons", &[val(1)], None),
            // ===== FLOATING POINT =====
            test!("sqrt", &[val(16)], Some(sym("4"))),
            test!("sqrt", &[val(2)], Some(sym("1.414214"))),
            test!("sqrt", &[val(0)], Some(sym("0"))),
            test!("sqrt", &[sym("6.25")], Some(sym("2.5"))),
            test!("sqrt", &[val(-1)], Some(sym("NaN"))),
            test!("sqrt", &[val(true)], None),
            test!("pow", &[val(2), val(10)], Some(sym("1024"))),
            test!("pow", &[val(2), val(-1)], Some(sym("0.5"))),
            test!("pow", &[sym("1.5"), val(2)], Some(sym("2.25"))),
            test!("pow", &[val(10), val(2)], Some(sym("100"))),
            test!("pow", &[val(10), val(20)], Some(sym("100000000000000000000"))),
            test!("pow", &[val(2)], None),
        ];

        for (name, result, expected) in test_cases {
            match (result, expected) {
                (Ok(actual), Some(expected)) => {
                    assert_eq!(actual, expected, "{name}: value mismatch");
                }
                (Err(_), None) => {}
                (Ok(actual), None) => panic!("{name}: expected an error, got {actual:?}"),
                (Err(err), Some(expected)) => {
                    panic!("{name}: expected {expected:?}, got error {err:?}")
                }
            }
        }
    }

    #[test]
    fn test_specific_error_kinds() {
        assert_eq!(
            call_builtin("/", &[val(1), val(0)]),
            Err(Error::DivideByZero)
        );
        assert_eq!(
            call_builtin("car", &[]),
            Err(Error::arity_mismatch("car", Arity::Exact(1), 0))
        );
        assert_eq!(
            call_builtin("car", &[val(5)]).unwrap_err().to_string(),
            "car expects a list, got number 5"
        );
        assert_eq!(
            call_builtin("+", &[sym("x")]).unwrap_err().to_string(),
            "+ expects a number, got symbol x"
        );
    }

    #[test]
    fn test_float_symbol_formatting() {
        let test_cases = [
            (4.0, "4"),
            (1.5, "1.5"),
            (0.1, "0.1"),
            (100.0, "100"),
            (1_234.5678, "1234.5678"),
            (2.0_f64.sqrt(), "1.414214"),
            (0.000_000_1, "0"),
        ];

        for (input, expected) in test_cases {
            assert_eq!(float_symbol(input), sym(expected), "formatting {input}");
        }
    }
}
