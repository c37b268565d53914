use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::debug;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use gisp_engine::error::{Error, Result};
use gisp_engine::{Interp, Value};

/// The Gisp interpreter.
///
/// Without a script this starts an interactive session. A script named
/// `-` is read from standard input. Files ending in `.gisp` use the
/// curly-brace surface syntax; everything else is read as
/// s-expressions.
#[derive(Parser)]
#[command(name = "gisp", version, about)]
struct Args {
    /// Script to run, or `-` for standard input.
    #[arg(allow_hyphen_values = true)]
    script: Option<String>,

    /// Arguments exposed to the program as the `*argv*` list.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    script_args: Vec<String>,
}

fn main() -> ExitCode {
    pretty_env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut interp = Interp::new()?;
    bind_argv(&mut interp, &args.script_args);

    match args.script.as_deref() {
        None => {
            repl(&mut interp);
            Ok(())
        }
        Some("-") => {
            let mut source = String::new();
            std::io::stdin().read_to_string(&mut source)?;
            run_source(&mut interp, &source, false)
        }
        Some(path) => {
            let source = fs::read_to_string(path)?;
            run_source(&mut interp, &source, path.ends_with(".gisp"))
        }
    }
}

/// Expose the command-line arguments after the script name as a proper
/// list of strings.
fn bind_argv(interp: &mut Interp, args: &[String]) {
    let argv: Vec<Value> = args
        .iter()
        .map(|arg| Value::string(arg.as_str()))
        .collect();
    interp
        .global()
        .borrow_mut()
        .define("*argv*", Value::list(&argv));
}

fn run_source(interp: &mut Interp, source: &str, is_gisp: bool) -> Result<()> {
    let source = strip_shebang(source);
    let forms = if is_gisp {
        gisp_engine::gisp::compile(source)
    } else {
        gisp_engine::parse(source)
    }
    .map_err(|err| with_location(err, source))?;
    interp.eval_all(&forms)?;
    Ok(())
}

/// Prefix read and parse errors with the line and column they point at.
fn with_location(err: Error, source: &str) -> Error {
    let span = match err.span() {
        Some(span) => span,
        None => return err,
    };
    let (line, col) = span.line_col(source);
    match err {
        Error::Reader {
            message,
            incomplete,
            ..
        } => Error::Reader {
            message: format!("{line}:{col}: {message}"),
            span: Some(span),
            incomplete,
        },
        Error::Parser {
            message,
            incomplete,
            ..
        } => Error::Parser {
            message: format!("{line}:{col}: {message}"),
            span: Some(span),
            incomplete,
        },
        other => other,
    }
}

/// Executable scripts may start with `#!/usr/bin/env gisp`; drop that
/// line before parsing.
fn strip_shebang(source: &str) -> &str {
    if let Some(rest) = source.strip_prefix("#!") {
        match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => "",
        }
    } else {
        source
    }
}

fn history_path() -> Option<PathBuf> {
    home::home_dir().map(|dir| dir.join(".gisp_history"))
}

/// Interactive session. Incomplete input keeps accumulating under the
/// continuation prompt; errors are reported and the session continues.
fn repl(interp: &mut Interp) {
    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(err) => {
            eprintln!("error: {err}");
            return;
        }
    };

    let history = history_path();
    if let Some(path) = &history {
        // A missing history file is normal on first launch.
        let _ = editor.load_history(path);
    }

    let mut buffer = String::new();
    loop {
        let prompt = if buffer.is_empty() { "gisp> " } else { ".... " };
        match editor.readline(prompt) {
            Ok(line) => {
                buffer.push_str(&line);
                buffer.push('\n');

                match gisp_engine::gisp::compile(&buffer) {
                    Ok(forms) => {
                        let _ = editor.add_history_entry(buffer.trim_end());
                        buffer.clear();
                        match interp.eval_all(&forms) {
                            // Don't echo the "nothing" value.
                            Ok(Value::Empty) => {}
                            Ok(value) => println!("{}", value.repr()),
                            Err(err) => eprintln!("error: {err}"),
                        }
                    }
                    Err(err) if err.is_incomplete() => {
                        debug!("waiting for more input: {err}");
                    }
                    Err(err) => {
                        let _ = editor.add_history_entry(buffer.trim_end());
                        buffer.clear();
                        eprintln!("error: {err}");
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("error: {err}");
                break;
            }
        }
    }

    if let Some(path) = &history {
        let _ = editor.save_history(path);
    }
}
