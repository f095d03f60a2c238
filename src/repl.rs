use rustyline::{error::ReadlineError, DefaultEditor};

use crate::{
    ast::SourceSet,
    diagnostics::Result,
    parser,
    runtime::{self, Env},
    value::Value,
};

/// Interactive session over one persistent scope: bindings made on one
/// line are visible on the next.
pub struct Repl {
    env: Env,
}

impl Repl {
    pub fn new() -> Self {
        Self { env: Env::new() }
    }

    pub fn with_env(env: Env) -> Self {
        Self { env }
    }

    pub fn run(&mut self) -> Result<()> {
        let sources = SourceSet::new();
        let scope = self.env.scope(&sources)?;
        let mut editor = DefaultEditor::new().map_err(readline_failure)?;
        let mut buffer = String::new();
        loop {
            let prompt = if buffer.is_empty() { "> " } else { ". " };
            let line = match editor.readline(prompt) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => return Err(readline_failure(err).into()),
            };
            let trimmed = line.trim();
            if buffer.is_empty() {
                if trimmed == "exit" {
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
            }
            if !trimmed.is_empty() {
                editor.add_history_entry(trimmed).ok();
            }
            if !buffer.is_empty() {
                buffer.push('\n');
            }
            buffer.push_str(&line);
            let node = match parser::parse(&sources, "", &buffer) {
                Ok(node) => node,
                // An unclosed form keeps accumulating input; any other
                // parse failure abandons the buffer.
                Err(err) if err.message.ends_with("missing )") => continue,
                Err(err) => {
                    buffer.clear();
                    eprintln!("{err}");
                    continue;
                }
            };
            buffer.clear();
            match runtime::eval(&scope, &node) {
                Ok(Value::Nil) => {}
                Ok(value) => println!("{value}"),
                Err(err) => eprintln!("{err}"),
            }
        }
        Ok(())
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

fn readline_failure(err: ReadlineError) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err)
}
