use std::fmt::{ self, Debug, Display, Formatter };

use crate::error::LispError;
use crate::evaluator::Environment;

/// Signature shared by every native operation in the builtin table.
pub type Builtin = fn(&Environment, Vec<Value>) -> Result<Value, LispError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(i64),
    Symbol(String),
    SExpr(Vec<Value>),
    QExpr(Vec<Value>),
    Function(Function),
    Error(String),
}

#[derive(Clone)]
pub enum Function {
    Lib {
        name: &'static str,
        ptr: Builtin,
    },
    /// A user lambda. `formals` holds only the parameters that are still
    /// unbound; `env` is shared with every partial application derived from it.
    Lambda {
        formals: Vec<String>,
        body: Vec<Value>,
        env: Environment,
    },
}

/// The kind names used in type errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Number,
    Symbol,
    SExpr,
    QExpr,
    Function,
    Error,
}

impl Value {
    /// The unit value, `()`.
    pub fn unit() -> Value {
        Value::SExpr(Vec::new())
    }

    pub fn symbol(name: impl ToString) -> Value {
        Value::Symbol(name.to_string())
    }

    pub fn get_type(&self) -> Kind {
        use Value::*;

        match self {
            Number(_)   => Kind::Number,
            Symbol(_)   => Kind::Symbol,
            SExpr(_)    => Kind::SExpr,
            QExpr(_)    => Kind::QExpr,
            Function(_) => Kind::Function,
            Error(_)    => Kind::Error,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        if let Self::Number(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    pub fn try_into_qexpr(self) -> Result<Vec<Value>, Self> {
        if let Self::QExpr(v) = self {
            Ok(v)
        } else {
            Err(self)
        }
    }
}

impl Function {
    pub fn builtin(name: &'static str, ptr: Builtin) -> Self {
        Function::Lib { name, ptr }
    }

    pub fn lambda(formals: Vec<String>, body: Vec<Value>, env: Environment) -> Self {
        Function::Lambda { formals, body, env }
    }
}

impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        use Function::*;

        match (self, other) {
            (Lib { name: lhs, .. }, Lib { name: rhs, .. }) => lhs == rhs,
            (
                Lambda { formals: lhs_formals, body: lhs_body, .. },
                Lambda { formals: rhs_formals, body: rhs_body, .. },
            ) => lhs_formals == rhs_formals && lhs_body == rhs_body,
            _ => false,
        }
    }
}

fn write_seq<'a, T: Display + 'a>(
    f: &mut Formatter,
    open: char,
    items: impl IntoIterator<Item = &'a T>,
    close: char,
) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            write!(f, " ")?;
        }
        Display::fmt(item, f)?;
    }
    write!(f, "{close}")
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use Value::*;

        match self {
            Number(n)     => Display::fmt(n, f),
            Symbol(s)     => Display::fmt(s, f),
            SExpr(items)  => write_seq(f, '(', items, ')'),
            QExpr(items)  => write_seq(f, '{', items, '}'),
            Function(fun) => Display::fmt(fun, f),
            Error(msg)    => write!(f, "Error: {msg}"),
        }
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Function::Lib { .. } => write!(f, "<builtin>"),
            Function::Lambda { formals, body, .. } => {
                write!(f, "(\\ ")?;
                write_seq(f, '{', formals, '}')?;
                write!(f, " ")?;
                write_seq(f, '{', body, '}')?;
                write!(f, ")")
            }
        }
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use Function::*;

        match self {
            Lib { name, .. } => write!(f, "lib function '{}'", name),
            Lambda { formals, .. } => {
                write!(f, "user function with {} unbound formals", formals.len())
            }
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        use Kind::*;

        let name = match self {
            Number   => "Number",
            Symbol   => "Symbol",
            SExpr    => "S-Expression",
            QExpr    => "Q-Expression",
            Function => "Function",
            Error    => "Error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_nested_aggregates() {
        let value = Value::QExpr(vec![
            Value::Number(1),
            Value::SExpr(vec![Value::symbol("+"), Value::Number(5), Value::Number(6)]),
            Value::QExpr(vec![]),
        ]);
        assert_eq!(value.to_string(), "{1 (+ 5 6) {}}");
        assert_eq!(Value::unit().to_string(), "()");
        assert_eq!(Value::Number(-100).to_string(), "-100");
    }

    #[test]
    fn renders_errors_without_brackets() {
        let err = Value::Error(String::from("Division By Zero"));
        assert_eq!(err.to_string(), "Error: Division By Zero");
    }

    #[test]
    fn renders_lambda_with_formals_and_body() {
        let lambda = Function::lambda(
            vec![String::from("y")],
            vec![Value::symbol("+"), Value::symbol("x"), Value::symbol("y")],
            Environment::new(),
        );
        assert_eq!(Value::Function(lambda).to_string(), "(\\ {y} {+ x y})");
    }

    #[test]
    fn kind_names() {
        assert_eq!(Value::unit().get_type().to_string(), "S-Expression");
        assert_eq!(Value::QExpr(vec![]).get_type().to_string(), "Q-Expression");
        assert_eq!(Value::Number(0).get_type().to_string(), "Number");
        assert_eq!(Value::Error(String::new()).get_type().to_string(), "Error");
    }

    #[test]
    fn lambdas_compare_by_formals_and_body() {
        let body = vec![Value::symbol("x")];
        let lhs = Function::lambda(vec![String::from("x")], body.clone(), Environment::new());
        let rhs = Function::lambda(vec![String::from("x")], body, Environment::new());
        assert_eq!(lhs, rhs);
    }
}
