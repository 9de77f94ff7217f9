mod app;

use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::error;

use app::{build_app, run_interactive, run_script, Runner, StartupOverrides};

enum RunMode {
    Interactive,
    Script { path: PathBuf },
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!(reason = %message, "trainer_failed");
            eprintln!("{message}");
            ExitCode::from(1)
        }
    }
}

fn run_cli() -> Result<(), String> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.first().is_some_and(|arg| arg == "-h" || arg == "--help") {
        print_usage();
        return Ok(());
    }

    let mut overrides = StartupOverrides::default();
    let mut index = 0usize;
    while index < args.len() {
        match args[index].as_str() {
            "--procedure" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --procedure".to_string())?;
                overrides.procedure_file = Some(PathBuf::from(value));
                index += 2;
            }
            "--catalog" => {
                let value = args
                    .get(index + 1)
                    .ok_or_else(|| "missing value for --catalog".to_string())?;
                overrides.catalog_file = Some(PathBuf::from(value));
                index += 2;
            }
            _ => break,
        }
    }

    let mode = match args.get(index).map(String::as_str) {
        None => RunMode::Interactive,
        Some("script") => {
            let path = args
                .get(index + 1)
                .ok_or_else(|| "script requires a file path".to_string())?;
            if let Some(extra) = args.get(index + 2) {
                return Err(format!("unexpected argument '{extra}' after script path"));
            }
            RunMode::Script {
                path: PathBuf::from(path),
            }
        }
        Some(other) => return Err(format!("unknown subcommand '{other}'\n{}", usage_text())),
    };

    let wiring = build_app(overrides)?;
    let mut runner = Runner::new(wiring, io::stdout(), io::stdout(), io::stdout());
    match mode {
        RunMode::Interactive => run_interactive(&mut runner, io::BufReader::new(io::stdin())),
        RunMode::Script { path } => run_script(&mut runner, &path),
    }
}

fn print_usage() {
    println!("{}", usage_text());
}

fn usage_text() -> String {
    [
        "usage: trainer [--procedure <file.xml>] [--catalog <file.json>] [script <file>]",
        "",
        "Without a subcommand, commands are read from stdin (type `help`).",
        "Environment: TRAINER_ROOT, TRAINER_PROCEDURE_FILE, TRAINER_CATALOG_FILE, RUST_LOG",
    ]
    .join("\n")
}
