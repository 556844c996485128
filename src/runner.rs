use crate::error::LdrxError;
use crate::evaluator::{Evaluator, Settings, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NESTING};

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name shown in diagnostics in place of the file.
    pub source_name: String,
    pub max_depth: usize,
    pub max_nesting: usize,
    pub print_newline: bool,
    /// Also render a full report on stderr for each error.
    pub explain: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source_name: "<stdin>".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
            print_newline: false,
            explain: false,
        }
    }
}

impl RunConfig {
    pub fn settings(&self) -> Settings {
        Settings {
            max_depth: self.max_depth,
            max_nesting: self.max_nesting,
            print_newline: self.print_newline,
        }
    }
}

/// Runs a whole program against stdin and stdout.
pub fn run(source: &str, config: &RunConfig) -> Result<(), LdrxError> {
    let mut evaluator = Evaluator::new().with_settings(config.settings());
    run_in(&mut evaluator, source, config)
}

/// Runs `source` on an existing evaluator. Any error is sent to the
/// evaluator's output as a diagnostic line before being returned.
pub fn run_in(evaluator: &mut Evaluator, source: &str, config: &RunConfig) -> Result<(), LdrxError> {
    tracing::debug!(source = %config.source_name, chars = source.chars().count(), "run");

    let result = evaluator.run_source(source);
    if let Err(ref error) = result {
        tracing::debug!(kind = ?error.kind, position = error.span.start, "run failed");
        evaluator.emit_diagnostic(error, &config.source_name);
        if config.explain {
            error.report(source, Some(&config.source_name));
        }
    }
    result
}
