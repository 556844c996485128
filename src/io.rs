//! Boundary between the interpreter and whatever embeds it: where printed
//! text goes and where `ask` reads from.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::rc::Rc;

pub trait Output {
    /// Receives the text of every `print`, in order.
    fn append(&mut self, text: &str);

    /// Receives a one-line error diagnostic.
    fn diagnostic(&mut self, line: &str) {
        self.append(line);
    }
}

pub trait Input {
    /// Blocks until a line is available. The line ending is stripped; end of
    /// input reads as an empty line.
    fn read_line(&mut self) -> String;
}

#[derive(Debug, Default)]
pub struct StdOutput;

impl Output for StdOutput {
    fn append(&mut self, text: &str) {
        let mut stdout = io::stdout().lock();
        // Output is best effort once stdout is gone (e.g. a closed pipe)
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn diagnostic(&mut self, line: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }
}

#[derive(Debug, Default)]
pub struct StdInput;

impl Input for StdInput {
    fn read_line(&mut self) -> String {
        let mut line = String::new();
        if let Err(error) = io::stdin().lock().read_line(&mut line) {
            tracing::warn!(%error, "failed to read input line");
            return String::new();
        }
        trim_line_ending(&mut line);
        line
    }
}

/// In-memory output. Clones share the same buffer, so a handle kept by the
/// caller sees everything the interpreter appended.
#[derive(Debug, Clone, Default)]
pub struct CaptureOutput {
    buffer: Rc<RefCell<String>>,
}

impl CaptureOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        self.buffer.borrow().clone()
    }
}

impl Output for CaptureOutput {
    fn append(&mut self, text: &str) {
        self.buffer.borrow_mut().push_str(text);
    }
}

/// Input fed from prepared lines.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    lines: VecDeque<String>,
}

impl ScriptedInput {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl Input for ScriptedInput {
    fn read_line(&mut self) -> String {
        self.lines.pop_front().unwrap_or_default()
    }
}

fn trim_line_ending(line: &mut String) {
    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_handles_share_a_buffer() {
        let handle = CaptureOutput::new();
        let mut sink = handle.clone();
        sink.append("a");
        sink.diagnostic("b");
        assert_eq!(handle.contents(), "ab");
    }

    #[test]
    fn scripted_input_runs_dry_with_empty_lines() {
        let mut input = ScriptedInput::new(["first"]);
        assert_eq!(input.read_line(), "first");
        assert_eq!(input.read_line(), "");
    }

    #[test]
    fn line_endings_are_stripped() {
        let mut line = "text\r\n".to_string();
        trim_line_ending(&mut line);
        assert_eq!(line, "text");
    }
}
