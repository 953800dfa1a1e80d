use lazy_static::lazy_static;
use log::trace;

use crate::ast::*;
use crate::error::LispError;
use crate::evaluator::*;

lazy_static! {
    /// Every builtin, in registration order.
    pub static ref BUILTINS: Vec<(&'static str, Builtin)> = vec![
        ("list", list_impl as Builtin),
        ("head", head_impl as Builtin),
        ("tail", tail_impl as Builtin),
        ("join", join_impl as Builtin),
        ("eval", eval_impl as Builtin),
        ("def", def_impl as Builtin),
        ("\\", lambda_impl as Builtin),
        ("if", if_impl as Builtin),
        ("+", add as Builtin),
        ("-", sub as Builtin),
        ("*", mul as Builtin),
        ("/", div as Builtin),
        (">", gt as Builtin),
        ("<", lt as Builtin),
        (">=", ge as Builtin),
        ("<=", le as Builtin),
        ("==", eq as Builtin),
        ("!=", ne as Builtin),
    ];
}

/// Checks the argument count and hands the arguments back by value.
fn take<const N: usize>(name: &'static str, args: Vec<Value>) -> Result<[Value; N], LispError> {
    let got = args.len();
    args.try_into().map_err(|_| LispError::Arity {
        function: name,
        got,
        expected: N,
    })
}

fn check_min_arity(name: &'static str, args: &[Value], min: usize) -> Result<(), LispError> {
    if args.len() < min {
        return Err(LispError::Arity {
            function: name,
            got: args.len(),
            expected: min,
        });
    }
    Ok(())
}

fn number_arg(name: &'static str, index: usize, val: &Value) -> Result<i64, LispError> {
    val.as_number().ok_or(LispError::Type {
        function: name,
        index,
        got: val.get_type(),
        expected: Kind::Number,
    })
}

fn qexpr_arg(name: &'static str, index: usize, val: Value) -> Result<Vec<Value>, LispError> {
    val.try_into_qexpr().map_err(|val| LispError::Type {
        function: name,
        index,
        got: val.get_type(),
        expected: Kind::QExpr,
    })
}

fn symbol_names(name: &'static str, items: Vec<Value>) -> Result<Vec<String>, LispError> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Symbol(s) => Ok(s),
            other => Err(LispError::NonSymbol {
                function: name,
                got: other.get_type(),
            }),
        })
        .collect()
}

pub fn list_impl(_env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
    Ok(Value::QExpr(args))
}

pub fn head_impl(_env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
    let [list] = take::<1>("head", args)?;
    let list = qexpr_arg("head", 0, list)?;

    match list.into_iter().next() {
        Some(first) => Ok(Value::QExpr(vec![first])),
        None => Err(LispError::EmptyList("head")),
    }
}

pub fn tail_impl(_env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
    let [list] = take::<1>("tail", args)?;
    let list = qexpr_arg("tail", 0, list)?;

    if list.is_empty() {
        return Err(LispError::EmptyList("tail"));
    }

    Ok(Value::QExpr(list.into_iter().skip(1).collect()))
}

pub fn join_impl(_env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
    let lists = args
        .into_iter()
        .enumerate()
        .map(|(i, list)| qexpr_arg("join", i, list))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Value::QExpr(lists.into_iter().flatten().collect()))
}

pub fn eval_impl(env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
    let [expr] = take::<1>("eval", args)?;
    let expr = qexpr_arg("eval", 0, expr)?;

    eval_sexpr(&expr, env)
}

pub fn def_impl(env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
    check_min_arity("def", &args, 2)?;

    let mut values = args;
    let names = values.remove(0);
    let names = symbol_names("def", qexpr_arg("def", 0, names)?)?;

    if names.len() != values.len() {
        return Err(LispError::Arity {
            function: "def",
            got: values.len(),
            expected: names.len(),
        });
    }

    for (name, val) in names.into_iter().zip(values) {
        trace!("def '{name}' = {val}");
        env.define_global(name, val);
    }

    Ok(Value::unit())
}

pub fn lambda_impl(env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
    let [formals, body] = take::<2>("\\", args)?;
    let formals = qexpr_arg("\\", 0, formals)?;
    let body = qexpr_arg("\\", 1, body)?;
    let formals = symbol_names("\\", formals)?;

    Ok(Value::Function(Function::lambda(formals, body, env.clone())))
}

pub fn if_impl(env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
    let [cond, then_branch, else_branch] = take::<3>("if", args)?;
    let then_branch = qexpr_arg("if", 1, then_branch)?;
    let else_branch = qexpr_arg("if", 2, else_branch)?;

    let truthy = matches!(cond, Value::Number(n) if n != 0);
    if truthy {
        eval_sexpr(&then_branch, env)
    } else {
        eval_sexpr(&else_branch, env)
    }
}

/// Left fold over one or more numbers. Every argument is type checked
/// before any arithmetic happens.
fn fold_numbers(
    name: &'static str,
    args: &[Value],
    op: fn(i64, i64) -> Result<i64, LispError>,
) -> Result<Value, LispError> {
    check_min_arity(name, args, 1)?;

    let nums = args
        .iter()
        .enumerate()
        .map(|(i, arg)| number_arg(name, i, arg))
        .collect::<Result<Vec<_>, _>>()?;

    nums[1..]
        .iter()
        .try_fold(nums[0], |acc, &n| op(acc, n))
        .map(Value::Number)
}

macro_rules! impl_arith_op {
    () => {};

    (@once pub fn $name:ident => $sym:literal, $op:expr) => {
        pub fn $name(_env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
            fold_numbers($sym, &args, $op)
        }
    };

    (pub fn $name:ident => $sym:literal, $op:expr; $($tail:tt)*) => {
        impl_arith_op! { @once pub fn $name => $sym, $op }
        impl_arith_op! { $($tail)* }
    };
}

impl_arith_op! {
    pub fn add => "+", |a: i64, b: i64| a.checked_add(b).ok_or(LispError::Overflow);
    pub fn mul => "*", |a: i64, b: i64| a.checked_mul(b).ok_or(LispError::Overflow);
    pub fn div => "/", |a: i64, b: i64| {
        if b == 0 {
            Err(LispError::DivisionByZero)
        } else {
            a.checked_div(b).ok_or(LispError::Overflow)
        }
    };
}

/// `-` negates a single operand and subtracts otherwise.
pub fn sub(_env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
    if let [operand] = args.as_slice() {
        let n = number_arg("-", 0, operand)?;
        return n.checked_neg().map(Value::Number).ok_or(LispError::Overflow);
    }

    fold_numbers("-", &args, |a: i64, b: i64| a.checked_sub(b).ok_or(LispError::Overflow))
}

macro_rules! impl_cmp_op {
    () => {};

    (@once pub fn $name:ident => $op:tt) => {
        pub fn $name(_env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
            const NAME: &str = stringify!($op);

            let [lhs, rhs] = take::<2>(NAME, args)?;
            let lhs = number_arg(NAME, 0, &lhs)?;
            let rhs = number_arg(NAME, 1, &rhs)?;

            Ok(Value::Number((lhs $op rhs) as i64))
        }
    };

    (pub fn $name:ident => $op:tt; $($tail:tt)*) => {
        impl_cmp_op! { @once pub fn $name => $op }
        impl_cmp_op! { $($tail)* }
    };
}

impl_cmp_op! {
    pub fn gt => >;
    pub fn lt => <;
    pub fn ge => >=;
    pub fn le => <=;
}

pub fn eq(_env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
    let [lhs, rhs] = take::<2>("==", args)?;
    Ok(Value::Number((lhs == rhs) as i64))
}

pub fn ne(_env: &Environment, args: Vec<Value>) -> Result<Value, LispError> {
    let [lhs, rhs] = take::<2>("!=", args)?;
    Ok(Value::Number((lhs != rhs) as i64))
}
