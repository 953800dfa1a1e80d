use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{ self, Debug, Formatter };
use std::rc::Rc;

use log::trace;

use crate::ast::*;
use crate::error::LispError;
use crate::std_lib::BUILTINS;

struct Scope {
    vars: HashMap<String, Value>,
    parent: Option<Environment>,
}

/// A scope in the chain of environments. Cloning is cheap and yields a
/// handle to the same scope, so closures and the calls that created them
/// share their bindings.
#[derive(Clone)]
pub struct Environment(Rc<RefCell<Scope>>);

impl Environment {
    /// An empty root environment.
    pub fn new() -> Self {
        Environment(Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: None,
        })))
    }

    /// A root environment holding every builtin.
    pub fn with_builtins() -> Self {
        let env = Environment::new();
        for &(name, ptr) in BUILTINS.iter() {
            env.register_external_fun(name, ptr);
        }
        env
    }

    pub fn child(&self) -> Self {
        Environment(Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent: Some(self.clone()),
        })))
    }

    fn parent(&self) -> Option<Environment> {
        self.0.borrow().parent.clone()
    }

    pub fn root(&self) -> Environment {
        let mut env = self.clone();
        while let Some(parent) = env.parent() {
            env = parent;
        }
        env
    }

    pub fn register_external_fun(&self, name: &'static str, ptr: Builtin) {
        self.define_local(name, Value::Function(Function::builtin(name, ptr)));
    }

    pub fn define_local(&self, name: impl ToString, val: Value) {
        self.0.borrow_mut().vars.insert(name.to_string(), val);
    }

    pub fn define_global(&self, name: impl ToString, val: Value) {
        self.root().define_local(name, val);
    }

    pub fn lookup(&self, name: impl AsRef<str>) -> Result<Value, LispError> {
        let name = name.as_ref();
        let mut env = self.clone();
        loop {
            if let Some(val) = env.0.borrow().vars.get(name) {
                return Ok(val.clone());
            }
            match env.parent() {
                Some(parent) => env = parent,
                None => return Err(LispError::UnboundSymbol(name.to_string())),
            }
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let scope = self.0.borrow();
        let mut names: Vec<_> = scope.vars.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("is_root", &scope.parent.is_none())
            .finish()
    }
}

/// Evaluates `expr`. Failures come back as `Value::Error`.
pub fn evaluate(expr: &Value, env: &Environment) -> Value {
    match eval(expr, env) {
        Ok(val) => val,
        Err(e) => Value::Error(e.to_string()),
    }
}

pub fn eval(expr: &Value, env: &Environment) -> Result<Value, LispError> {
    match expr {
        Value::Symbol(name) => env.lookup(name),
        Value::SExpr(items) => eval_sexpr(items, env),
        Value::Error(msg) => Err(LispError::Raised(msg.clone())),
        other => Ok(other.clone()),
    }
}

/// Evaluates the members of an S-Expression left to right and applies the
/// head to the rest. The first failure stops evaluation.
pub fn eval_sexpr(items: &[Value], env: &Environment) -> Result<Value, LispError> {
    let Some((head, rest)) = items.split_first() else {
        return Ok(Value::unit());
    };

    let head = eval(head, env)?;
    if rest.is_empty() {
        return Ok(head);
    }

    let fun = match head {
        Value::Function(fun) => fun,
        other => return Err(LispError::NotAFunction(other.get_type())),
    };

    let args = rest
        .iter()
        .map(|arg| eval(arg, env))
        .collect::<Result<Vec<_>, _>>()?;

    call(&fun, args, env)
}

pub fn call(func: &Function, args: Vec<Value>, env: &Environment) -> Result<Value, LispError> {
    match func {
        Function::Lib { ptr, .. } => (*ptr)(env, args),

        Function::Lambda { formals, body, env: captured } => {
            let given = args.len();
            let call_env = captured.child();
            let mut remaining = formals.as_slice();
            let mut args = args.into_iter();

            while let Some(arg) = args.next() {
                let Some((formal, rest)) = remaining.split_first() else {
                    return Err(LispError::Arity {
                        function: "\\",
                        got: given,
                        expected: formals.len(),
                    });
                };

                if formal == "&" {
                    let [variadic] = rest else {
                        return Err(LispError::BadVariadic);
                    };
                    let mut tail = vec![arg];
                    tail.extend(args.by_ref());
                    call_env.define_local(variadic, Value::QExpr(tail));
                    remaining = &[];
                    break;
                }

                call_env.define_local(formal, arg);
                remaining = rest;
            }

            // An unfilled variadic tail binds to the empty list.
            if let Some((formal, rest)) = remaining.split_first() {
                if formal == "&" {
                    let [variadic] = rest else {
                        return Err(LispError::BadVariadic);
                    };
                    call_env.define_local(variadic, Value::QExpr(Vec::new()));
                    remaining = &[];
                }
            }

            if remaining.is_empty() {
                trace!("applying lambda with {given} argument(s)");
                eval_sexpr(body, &call_env)
            } else {
                trace!("partial application, {} formal(s) left", remaining.len());
                Ok(Value::Function(Function::lambda(
                    remaining.to_vec(),
                    body.clone(),
                    call_env,
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read;

    fn run(src: &str, env: &Environment) -> String {
        evaluate(&read(src).unwrap(), env).to_string()
    }

    #[test]
    fn lookup_walks_to_root() {
        let root = Environment::new();
        root.define_local("x", Value::Number(1));
        let child = root.child().child();
        assert_eq!(child.lookup("x"), Ok(Value::Number(1)));
        assert_eq!(
            child.lookup("y"),
            Err(LispError::UnboundSymbol(String::from("y"))),
        );
    }

    #[test]
    fn local_shadows_parent() {
        let root = Environment::new();
        root.define_local("x", Value::Number(1));
        let child = root.child();
        child.define_local("x", Value::Number(2));
        assert_eq!(child.lookup("x"), Ok(Value::Number(2)));
        assert_eq!(root.lookup("x"), Ok(Value::Number(1)));
    }

    #[test]
    fn global_definition_targets_root() {
        let root = Environment::new();
        let child = root.child().child();
        child.define_global("x", Value::Number(7));
        assert!(child.lookup("x").is_ok());
        assert!(child.0.borrow().vars.is_empty());
        assert_eq!(root.lookup("x"), Ok(Value::Number(7)));
    }

    #[test]
    fn self_evaluating_values() {
        let env = Environment::with_builtins();
        assert_eq!(run("{1 2 (+ 5 6) 4}", &env), "{1 2 (+ 5 6) 4}");
        assert_eq!(run("5", &env), "5");
        assert_eq!(run("", &env), "()");
        assert_eq!(run("()", &env), "()");
    }

    #[test]
    fn error_values_short_circuit() {
        let env = Environment::with_builtins();
        let expr = Value::SExpr(vec![
            Value::symbol("+"),
            Value::Error(String::from("boom")),
            Value::symbol("undefined"),
        ]);
        assert_eq!(evaluate(&expr, &env), Value::Error(String::from("boom")));
    }

    #[test]
    fn head_must_be_function() {
        let env = Environment::with_builtins();
        assert_eq!(
            run("1 2 3", &env),
            "Error: S-Expression starts with incorrect type. Got Number, Expected Function.",
        );
    }

    #[test]
    fn partial_application_keeps_bound_prefix() {
        let env = Environment::with_builtins();
        let partial = evaluate(&read("(\\ {x y} {- x y}) 10").unwrap(), &env);
        assert_eq!(partial.to_string(), "(\\ {y} {- x y})");

        let fun = match partial {
            Value::Function(fun) => fun,
            other => panic!("expected a lambda, got {other}"),
        };
        assert_eq!(call(&fun, vec![Value::Number(3)], &env), Ok(Value::Number(7)));
        assert_eq!(call(&fun, vec![Value::Number(4)], &env), Ok(Value::Number(6)));
    }

    #[test]
    fn variadic_formals() {
        let env = Environment::with_builtins();
        assert_eq!(run("(\\ {x & xs} {xs}) 1 2 3", &env), "{2 3}");
        assert_eq!(run("(\\ {x & xs} {xs}) 1", &env), "{}");
        assert_eq!(run("(\\ {& xs} {xs})", &env), "(\\ {& xs} {xs})");
        assert_eq!(
            run("(\\ {x &} {x}) 1 2", &env),
            "Error: Function format invalid. Symbol '&' not followed by single symbol.",
        );
    }

    #[test]
    fn too_many_arguments() {
        let env = Environment::with_builtins();
        assert_eq!(
            run("(\\ {x y} {x}) 1 2 3", &env),
            "Error: Function '\\' passed incorrect number of arguments. Got 3, Expected 2.",
        );
        assert_eq!(
            run("(\\ {x} {x}) 1 2", &env),
            "Error: Function '\\' passed incorrect number of arguments. Got 2, Expected 1.",
        );
    }
}
