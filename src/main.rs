use clap::{Arg, ArgAction, Command};
use ldrx::evaluator::{Evaluator, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NESTING};
use ldrx::repl;
use ldrx::runner::{self, RunConfig};
use std::fs;
use std::path::Path;
use std::process::ExitCode;

fn main() -> ExitCode {
    let matches = Command::new("ldrx")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Interpreter for the LDRX scripting language")
        .arg(
            Arg::new("file")
                .help("The script file to execute")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("code")
                .short('c')
                .long("code")
                .help("Execute SOURCE instead of a file")
                .value_name("SOURCE")
                .conflicts_with("file"),
        )
        .arg(
            Arg::new("interactive")
                .short('i')
                .long("interactive")
                .help("Start in interactive REPL mode (after running FILE, if given)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("newline")
                .short('n')
                .long("newline")
                .help("Print a newline after each print statement")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .help("Maximum nested call depth before the program is stopped")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("max-nesting")
                .long("max-nesting")
                .help("Maximum nesting of blocks and expressions while running")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("explain")
                .long("explain")
                .help("Also print a detailed error report on stderr")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("trace")
                .long("trace")
                .help("Log interpreter activity to stderr")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    init_tracing(matches.get_flag("trace"));

    let mut config = RunConfig {
        max_depth: matches
            .get_one::<usize>("max-depth")
            .copied()
            .unwrap_or(DEFAULT_MAX_DEPTH),
        max_nesting: matches
            .get_one::<usize>("max-nesting")
            .copied()
            .unwrap_or(DEFAULT_MAX_NESTING),
        print_newline: matches.get_flag("newline"),
        explain: matches.get_flag("explain"),
        ..RunConfig::default()
    };
    let interactive = matches.get_flag("interactive");

    let source = if let Some(code) = matches.get_one::<String>("code") {
        config.source_name = "<code>".to_string();
        code.clone()
    } else if let Some(file_path) = matches.get_one::<String>("file") {
        let path = Path::new(file_path);
        config.source_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.clone());
        match read_file(path) {
            Some(source) => source,
            None => return ExitCode::FAILURE,
        }
    } else {
        repl::start(&config);
        return ExitCode::SUCCESS;
    };

    let mut evaluator = Evaluator::new().with_settings(config.settings());
    let result = runner::run_in(&mut evaluator, &source, &config);

    if interactive {
        repl::start_with(&mut evaluator, &config);
        return ExitCode::SUCCESS;
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

fn read_file(path: &Path) -> Option<String> {
    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        return None;
    }

    match fs::read_to_string(path) {
        Ok(source) => Some(source),
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            None
        }
    }
}

/// Logs go to stderr so program output stays clean. Enabled by `--trace`
/// or by setting `RUST_LOG`.
fn init_tracing(trace: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if trace {
        EnvFilter::new("ldrx=trace")
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        return;
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
