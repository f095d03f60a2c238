use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};

use sorrel::{Env, Program, Repl, SorrelError, Value};

#[derive(Parser)]
#[command(author, version, about = "Sorrel expression language interpreter")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a sorrel script file
    Run { script: PathBuf },
    /// Start an interactive REPL session
    Repl,
    /// Evaluate a snippet of sorrel code
    Eval { source: String },
}

fn main() -> Result<(), SorrelError> {
    let args = Args::parse();
    match args.command.unwrap_or(Command::Repl) {
        Command::Run { script } => run_script(script),
        Command::Repl => {
            let mut repl = Repl::new();
            repl.run()
        }
        Command::Eval { source } => {
            let program = Program::new(&source)?;
            report(program.eval(&Env::new())?);
            Ok(())
        }
    }
}

fn run_script(path: PathBuf) -> Result<(), SorrelError> {
    let source = fs::read_to_string(&path)?;
    let program = Program::with_name(&source, &path.display().to_string())?;
    report(program.eval(&Env::new())?);
    Ok(())
}

fn report(value: Value) {
    if !matches!(value, Value::Nil) {
        println!("{value}");
    }
}
