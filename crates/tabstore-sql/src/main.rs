//! `tabstore` interactive shell.
//!
//! Reads one statement per line from stdin. `.exit` or `exit` quits.
//! The storage root comes from `TABSTORE_ROOT` (default `./data`), and
//! log verbosity from `RUST_LOG` (default `warn`).

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use tabstore_core::Config;
use tabstore_sql::{render, Session};
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "> ";

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let root = std::env::var_os("TABSTORE_ROOT").unwrap_or_else(|| "./data".into());
    let mut session = match Session::new(Config::durable().with_root(root)) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    println!("tabstore shell, type .exit to quit");
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{}", PROMPT);
        if stdout.flush().is_err() {
            return ExitCode::FAILURE;
        }

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(err)) => {
                eprintln!("error: failed to read input: {}", err);
                return ExitCode::FAILURE;
            }
            None => break,
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == ".exit" || line.eq_ignore_ascii_case("exit") {
            break;
        }

        match session.run(line) {
            Ok(outcome) => print!("{}", render(&outcome)),
            Err(err) => println!("error: {}", err),
        }
    }

    println!("bye");
    ExitCode::SUCCESS
}
