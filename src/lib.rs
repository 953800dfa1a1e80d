mod ast;
mod error;
mod evaluator;
mod reader;
mod std_lib;


use log::debug;

pub use ast::{Builtin, Function, Kind, Value};
pub use error::{LispError, ParseError};
pub use evaluator::{evaluate, Environment};
pub use reader::read;

/// Text printed before every line the interpreter reads.
pub const PROMPT: &str = "lispy>";

/// One interpreter session. Definitions made with `def` persist across
/// every line evaluated in the same session.
pub struct Session {
    env: Environment,
}

impl Session {
    pub fn new() -> Self {
        Session {
            env: Environment::with_builtins(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Reads and evaluates one line as an implicit S-Expression. Parse
    /// failures come back as `Error` values too.
    pub fn eval_line(&mut self, line: &str) -> Value {
        debug!("evaluating line: {line:?}");

        match read(line) {
            Ok(tree) => evaluate(&tree, &self.env),
            Err(e) => Value::Error(e.to_string()),
        }
    }

    /// `eval_line`, rendered to its one-line text form.
    pub fn run_line(&mut self, line: &str) -> String {
        self.eval_line(line).to_string()
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}
