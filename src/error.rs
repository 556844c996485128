use ariadne::{Color, Fmt, Label, Report, ReportKind, Source};
use std::fmt;

/// Marker placed between the source name and the offset in a diagnostic line.
pub const DIAGNOSTIC_MARKER: &str = "<ldrx-run>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Internal dispatch reached a state it does not handle.
    Interpreter,
    /// The lexer met a character it cannot classify.
    Character,
    /// The parser met a token sequence outside the grammar.
    Syntax,
    /// Call nesting went past the configured depth.
    StackExhausted,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Interpreter => "Interpreter Error",
            ErrorKind::Character => "Unexpected character",
            ErrorKind::Syntax => "Invalid syntax",
            ErrorKind::StackExhausted => "Stack overflow",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LdrxError {
    pub kind: ErrorKind,
    pub span: Span,
    /// Text of the offending token or character.
    pub text: String,
    pub message: String,
    pub help: Option<String>,
}

impl LdrxError {
    pub fn new(kind: ErrorKind, span: Span, text: String, message: String) -> Self {
        Self {
            kind,
            span,
            text,
            message,
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn character_error(pos: usize, text: String, message: String) -> Self {
        Self::new(ErrorKind::Character, Span::single(pos), text, message)
    }

    pub fn syntax_error(span: Span, text: String, message: String) -> Self {
        Self::new(ErrorKind::Syntax, span, text, message)
    }

    pub fn interpreter_error(span: Span, text: String, message: String) -> Self {
        Self::new(ErrorKind::Interpreter, span, text, message)
    }

    pub fn stack_exhausted(pos: usize, name: String, max_depth: usize) -> Self {
        Self::new(
            ErrorKind::StackExhausted,
            Span::new(pos, pos + name.chars().count().max(1)),
            name,
            format!("call depth exceeded the limit of {}", max_depth),
        )
        .with_help("A function that keeps calling itself needs a return path that stops the recursion.")
    }

    pub fn nesting_exhausted(pos: usize, text: String, max_nesting: usize) -> Self {
        Self::new(
            ErrorKind::StackExhausted,
            Span::new(pos, pos + text.chars().count().max(1)),
            text,
            format!("program nests deeper than the limit of {}", max_nesting),
        )
        .with_help("Split long expressions or deeply nested blocks into smaller steps.")
    }

    /// One-line diagnostic in the form sent to the output sink.
    pub fn diagnostic(&self, source_name: &str) -> String {
        format!(
            "ERROR [{}] At '{}' At {}{}char:{}",
            self.kind.label(),
            self.text,
            source_name,
            DIAGNOSTIC_MARKER,
            self.span.start
        )
    }

    pub fn report(&self, source: &str, filename: Option<&str>) {
        let filename = filename.unwrap_or("<repl>");

        let color = match self.kind {
            ErrorKind::Character => Color::Red,
            ErrorKind::Syntax => Color::Yellow,
            ErrorKind::Interpreter => Color::Blue,
            ErrorKind::StackExhausted => Color::Magenta,
        };

        // Offsets past the end (EOF) are clamped so the label stays renderable.
        let length = source.chars().count();
        let start = self.span.start.min(length);
        let end = self.span.end.min(length).max(start);

        let mut report_builder = Report::build(ReportKind::Error, filename, start)
            .with_message(format!("{}: {}", self.kind.label().fg(color), self.message))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        // A failed write to stderr has nowhere else to go.
        let _ = report_builder
            .finish()
            .eprint((filename, Source::from(source)));
    }
}

impl fmt::Display for LdrxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for LdrxError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn diagnostic_line_format() {
        let error = LdrxError::syntax_error(
            Span::single(12),
            ")".to_string(),
            "unexpected ')'".to_string(),
        );
        assert_eq!(
            error.diagnostic("main.ldrx"),
            "ERROR [Invalid syntax] At ')' At main.ldrx<ldrx-run>char:12"
        );
    }

    #[test]
    fn labels_per_kind() {
        assert_eq!(ErrorKind::Interpreter.label(), "Interpreter Error");
        assert_eq!(ErrorKind::Character.label(), "Unexpected character");
        assert_eq!(ErrorKind::Syntax.label(), "Invalid syntax");
    }

    #[test]
    fn nesting_exhausted_is_a_stack_overflow() {
        let error = LdrxError::nesting_exhausted(4, "+".to_string(), 100);
        assert_eq!(error.kind, ErrorKind::StackExhausted);
        assert_eq!(
            error.diagnostic("main.ldrx"),
            "ERROR [Stack overflow] At '+' At main.ldrx<ldrx-run>char:4"
        );
        assert!(error.message.contains("100"));
    }
}
