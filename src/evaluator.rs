use crate::ast::{Ast, NodeId, NodeTag};
use crate::error::LdrxError;
use crate::io::{Input, Output, StdInput, StdOutput};
use crate::lexer::Lexer;
use crate::memory::Memory;
use crate::parser::Parser;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

pub const VERSION: &str = concat!("LDRX (MIT) v", env!("CARGO_PKG_VERSION"));

/// Default limit on nested calls before a run is stopped.
pub const DEFAULT_MAX_DEPTH: usize = 10_000;

/// Default limit on how deep bodies and expressions may nest while running.
/// A call chain at `DEFAULT_MAX_DEPTH` stays below it.
pub const DEFAULT_MAX_NESTING: usize = 40_000;

#[derive(Debug, Clone)]
pub struct Settings {
    pub max_depth: usize,
    pub max_nesting: usize,
    /// Append a newline after each `print`.
    pub print_newline: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_nesting: DEFAULT_MAX_NESTING,
            print_newline: false,
        }
    }
}

/// Value of an expression, plus the parameter list when the value is callable.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub value: Value,
    pub params: Option<NodeId>,
}

impl Evaluation {
    pub fn of(value: Value) -> Self {
        Self {
            value,
            params: None,
        }
    }
}

/// Interpreter state: the AST arena every run parses into, the memory
/// table, and the host's input and output.
pub struct Evaluator {
    pub(crate) ast: Ast,
    pub(crate) memory: Memory,
    pub(crate) root: NodeId,
    pub(crate) output: Box<dyn Output>,
    pub(crate) input: Box<dyn Input>,
    pub(crate) settings: Settings,
    pub(crate) depth: usize,
    pub(crate) nesting: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Evaluator wired to stdin and stdout.
    pub fn new() -> Self {
        Self::with_io(Box::new(StdOutput), Box::new(StdInput))
    }

    pub fn with_io(output: Box<dyn Output>, input: Box<dyn Input>) -> Self {
        let mut ast = Ast::new();
        let root = ast.add(NodeTag::Root, "root", 0);

        let mut memory = Memory::new();
        let now = chrono::Local::now();
        memory.seed("LDRX", Value::String(VERSION.to_string()));
        memory.seed("DATE", Value::String(now.format("%a %b %d %Y").to_string()));
        memory.seed("TIME", Value::Number(now.timestamp_millis() as f64));

        Self {
            ast,
            memory,
            root,
            output,
            input,
            settings: Settings::default(),
            depth: 0,
            nesting: 0,
        }
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Parses `source` onto the end of the program. Returns the index of the
    /// first new top-level statement. A failed parse leaves the program as it was.
    pub fn load(&mut self, source: &str) -> Result<usize, LdrxError> {
        let tokens = Lexer::new(source).scan_tokens()?;
        let first = self.ast.children(self.root).len();
        let checkpoint = self.ast.len();

        if let Err(error) = Parser::new(tokens, &mut self.ast, self.root).parse() {
            self.ast.truncate(checkpoint);
            return Err(error);
        }
        Ok(first)
    }

    /// Parses and runs `source`. Top-level bindings persist for later calls.
    pub fn run_source(&mut self, source: &str) -> Result<(), LdrxError> {
        let first = self.load(source)?;
        tracing::debug!(first, "executing");
        self.execute_from(self.root, first)?;
        Ok(())
    }

    /// Sends the one-line form of `error` to the output.
    pub fn emit_diagnostic(&mut self, error: &LdrxError, source_name: &str) {
        self.output.diagnostic(&error.diagnostic(source_name));
    }

    pub(crate) fn print(&mut self, text: &str) {
        self.output.append(text);
        if self.settings.print_newline {
            self.output.append("\n");
        }
    }

    /// Runs `step` one level deeper in the tree walk, growing the host stack
    /// as needed. Nesting past `max_nesting` stops the program.
    pub(crate) fn nested<R>(
        &mut self,
        node: NodeId,
        step: impl FnOnce(&mut Self) -> Result<R, LdrxError>,
    ) -> Result<R, LdrxError> {
        if self.nesting >= self.settings.max_nesting {
            let text = match self.ast.tag(node) {
                NodeTag::Body => "{",
                _ => self.ast.text(node),
            };
            return Err(LdrxError::nesting_exhausted(
                self.ast.node(node).position,
                text.to_string(),
                self.settings.max_nesting,
            ));
        }

        self.nesting += 1;
        let result = ensure_sufficient_stack(|| step(self));
        self.nesting -= 1;
        result
    }

    pub fn evaluate(&mut self, node: Option<NodeId>) -> Result<Evaluation, LdrxError> {
        let Some(node) = node else {
            return Ok(Evaluation::of(Value::Null));
        };
        self.nested(node, |this| this.evaluate_node(node))
    }

    fn evaluate_node(&mut self, node: NodeId) -> Result<Evaluation, LdrxError> {
        let evaluation = match self.ast.tag(node) {
            NodeTag::StringLit => Evaluation::of(Value::String(self.ast.text(node).to_string())),
            NodeTag::NumberLit => {
                let number = self.ast.text(node).parse::<f64>().unwrap_or(0.0);
                Evaluation::of(Value::Number(number))
            }
            NodeTag::Get => match self.memory.resolve(&self.ast, self.ast.text(node), node) {
                Some(binding) => Evaluation {
                    value: binding.value.clone(),
                    params: binding.params,
                },
                None => Evaluation::of(Value::Undefined),
            },
            NodeTag::Call => {
                let name = self.ast.text(node).to_string();
                let args = self.ast.child(node, 0);
                Evaluation::of(self.run_call(&name, args, node)?)
            }
            NodeTag::Body => Evaluation::of(self.execute(node)?.unwrap_or(Value::Null)),
            NodeTag::Operator => {
                // Both sides always run, even for && and ||
                let left = self.evaluate(self.ast.child(node, 0))?.value;
                let right = self.evaluate(self.ast.child(node, 1))?.value;
                Evaluation::of(apply_operator(self.ast.text(node), &left, &right))
            }
            _ => Evaluation::of(Value::Number(0.0)),
        };

        Ok(evaluation)
    }
}

fn flag(condition: bool) -> Value {
    Value::Number(if condition { 1.0 } else { 0.0 })
}

fn loose_equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => l == r,
        (Value::Number(_), _) | (_, Value::Number(_)) => left.to_number() == right.to_number(),
        _ => left.to_string() == right.to_string(),
    }
}

fn compare(operator: &str, left: &Value, right: &Value) -> bool {
    let is_number = |value: &Value| matches!(value, Value::Number(_));

    if !is_number(left) && !is_number(right) {
        let (l, r) = (left.to_string(), right.to_string());
        return match operator {
            "<" => l < r,
            ">" => l > r,
            "<=" => l <= r,
            _ => l >= r,
        };
    }

    let (l, r) = (left.to_number(), right.to_number());
    match operator {
        "<" => l < r,
        ">" => l > r,
        "<=" => l <= r,
        _ => l >= r,
    }
}

/// Applies a binary operator. Numbers stay numeric, anything else acts as
/// its text. A falsy or failed result comes back as 0.
pub fn apply_operator(operator: &str, left: &Value, right: &Value) -> Value {
    let result = match operator {
        "+" => match (left, right) {
            (Value::Number(l), Value::Number(r)) => Value::Number(l + r),
            _ => Value::String(format!("{}{}", left, right)),
        },
        "-" => Value::Number(left.to_number() - right.to_number()),
        "*" => Value::Number(left.to_number() * right.to_number()),
        "/" => Value::Number(left.to_number() / right.to_number()),
        "%" => Value::Number(left.to_number() % right.to_number()),
        "**" => Value::Number(left.to_number().powf(right.to_number())),
        "^" => Value::Number(f64::from(left.to_int32() ^ right.to_int32())),
        "&" => Value::Number(f64::from(left.to_int32() & right.to_int32())),
        "|" => Value::Number(f64::from(left.to_int32() | right.to_int32())),
        "<" | ">" | "<=" | ">=" => flag(compare(operator, left, right)),
        "==" => flag(loose_equals(left, right)),
        "!=" => flag(!loose_equals(left, right)),
        "&&" => flag(left.is_truthy() && right.is_truthy()),
        "||" => flag(left.is_truthy() || right.is_truthy()),
        _ => {
            tracing::debug!(operator, "unknown operator");
            Value::Number(0.0)
        }
    };

    if result.is_truthy() {
        result
    } else {
        Value::Number(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn text(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn arithmetic() {
        assert_eq!(apply_operator("+", &num(1.0), &num(2.0)), num(3.0));
        assert_eq!(apply_operator("-", &num(1.0), &num(2.0)), num(-1.0));
        assert_eq!(apply_operator("/", &num(7.0), &num(2.0)), num(3.5));
        assert_eq!(apply_operator("%", &num(-7.0), &num(3.0)), num(-1.0));
        assert_eq!(apply_operator("**", &num(2.0), &num(10.0)), num(1024.0));
        assert_eq!(apply_operator("/", &num(1.0), &num(0.0)), num(f64::INFINITY));
    }

    #[test]
    fn bitwise_operators_truncate() {
        assert_eq!(apply_operator("^", &num(2.0), &num(3.0)), num(1.0));
        assert_eq!(apply_operator("&", &num(6.5), &num(3.0)), num(2.0));
        assert_eq!(apply_operator("|", &num(4.0), &num(1.0)), num(5.0));
    }

    #[test]
    fn plus_concatenates_when_either_side_is_text() {
        assert_eq!(apply_operator("+", &text("a"), &num(1.0)), text("a1"));
        assert_eq!(apply_operator("+", &num(2.5), &text("b")), text("2.5b"));
        assert_eq!(apply_operator("+", &text("x"), &Value::Undefined), text("xUndefined"));
    }

    #[test]
    fn other_arithmetic_coerces_text() {
        assert_eq!(apply_operator("-", &text("5"), &num(2.0)), num(3.0));
        assert_eq!(apply_operator("*", &text(" 4 "), &text("2")), num(8.0));
        // NaN is falsy and becomes 0
        assert_eq!(apply_operator("-", &text("a"), &num(1.0)), num(0.0));
    }

    #[test]
    fn comparisons_yield_one_or_zero() {
        assert_eq!(apply_operator("<", &num(1.0), &num(2.0)), num(1.0));
        assert_eq!(apply_operator(">=", &num(1.0), &num(2.0)), num(0.0));
        assert_eq!(apply_operator("<", &text("apple"), &text("banana")), num(1.0));
        assert_eq!(apply_operator("<", &text("10"), &num(9.0)), num(0.0));
        assert_eq!(apply_operator("<", &text("10"), &text("9")), num(1.0));
    }

    #[test]
    fn loose_equality() {
        assert_eq!(apply_operator("==", &text("1"), &num(1.0)), num(1.0));
        assert_eq!(apply_operator("==", &text("a"), &text("a")), num(1.0));
        assert_eq!(apply_operator("!=", &text("a"), &text("b")), num(1.0));
        assert_eq!(apply_operator("==", &num(f64::NAN), &num(f64::NAN)), num(0.0));
    }

    #[test]
    fn logic_uses_truthiness() {
        assert_eq!(apply_operator("&&", &text("a"), &num(2.0)), num(1.0));
        assert_eq!(apply_operator("&&", &text("a"), &Value::Null), num(0.0));
        assert_eq!(apply_operator("||", &Value::Undefined, &text("")), num(0.0));
        assert_eq!(apply_operator("||", &num(0.0), &num(3.0)), num(1.0));
    }

    #[test]
    fn falsy_results_become_zero() {
        assert_eq!(apply_operator("+", &text(""), &text("")), num(0.0));
        assert_eq!(apply_operator("-", &num(2.0), &num(2.0)), num(0.0));
        assert_eq!(apply_operator("?", &num(1.0), &num(1.0)), num(0.0));
    }
}
