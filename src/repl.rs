use crate::evaluator::{Evaluator, VERSION};
use crate::lexer::{Lexer, TokenKind};
use crate::runner::{self, RunConfig};
use std::io::{self, Write};

/// Interactive session. Each line runs against the same memory, so names
/// and functions defined earlier stay available.
pub fn start(config: &RunConfig) {
    let mut evaluator = Evaluator::new().with_settings(repl_config(config).settings());
    start_with(&mut evaluator, config);
}

/// Continues an existing session, e.g. after running a file with `-i`.
pub fn start_with(evaluator: &mut Evaluator, config: &RunConfig) {
    let config = repl_config(config);
    evaluator.settings = config.settings();

    println!("{}", VERSION);
    println!("Type 'exit' or press Ctrl+D to quit");
    println!();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            break;
        }

        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                // EOF reached (Ctrl+D or piped input ended)
                println!();
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "exit" || line == "quit" {
                    println!("Goodbye!");
                    break;
                }

                run_repl_command(line, evaluator, &config);
            }
            Err(error) => {
                eprintln!("Error reading input: {}", error);
                break;
            }
        }
    }
}

fn repl_config(config: &RunConfig) -> RunConfig {
    RunConfig {
        source_name: "<repl>".to_string(),
        print_newline: true,
        ..config.clone()
    }
}

fn run_repl_command(line: &str, evaluator: &mut Evaluator, config: &RunConfig) {
    // A line that is only an expression is echoed, as `print` would show it
    let source = if is_bare_expression(line) {
        format!("print {};", line)
    } else {
        line.to_string()
    };

    // The diagnostic has already been written to the output
    let _ = runner::run_in(evaluator, &source, config);
}

/// True when `line` lexes to expression tokens only (no keywords, `:` or `;`).
pub fn is_bare_expression(line: &str) -> bool {
    let Ok(tokens) = Lexer::new(line).scan_tokens() else {
        return false;
    };
    tokens.len() > 1
        && tokens.iter().all(|token| {
            !matches!(
                token.kind,
                TokenKind::Keyword | TokenKind::Assign | TokenKind::Semicolon
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_expressions_are_detected() {
        assert!(is_bare_expression("1 + 2"));
        assert!(is_bare_expression("f(1, 'a')"));
        assert!(is_bare_expression("LDRX"));
        assert!(!is_bare_expression("x: 1"));
        assert!(!is_bare_expression("print 1"));
        assert!(!is_bare_expression("f();"));
        assert!(!is_bare_expression("'open"));
        assert!(!is_bare_expression("   "));
    }
}
