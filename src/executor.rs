use crate::ast::{NodeId, NodeTag};
use crate::error::LdrxError;
use crate::evaluator::{Evaluation, Evaluator};
use crate::value::Value;

impl Evaluator {
    /// Runs the statements of `body` in order. `Some` carries a `return`
    /// value up to the nearest call or top level; `None` means the body ran
    /// to its end.
    pub fn execute(&mut self, body: NodeId) -> Result<Option<Value>, LdrxError> {
        self.execute_from(body, 0)
    }

    pub(crate) fn execute_from(
        &mut self,
        body: NodeId,
        start: usize,
    ) -> Result<Option<Value>, LdrxError> {
        self.nested(body, |this| this.run_statements(body, start))
    }

    fn run_statements(&mut self, body: NodeId, start: usize) -> Result<Option<Value>, LdrxError> {
        let mut index = start;
        while let Some(statement) = self.ast.child(body, index) {
            if let Some(returned) = self.execute_statement(statement)? {
                return Ok(Some(returned));
            }
            index += 1;
        }
        Ok(None)
    }

    fn execute_statement(&mut self, node: NodeId) -> Result<Option<Value>, LdrxError> {
        let tag = self.ast.tag(node);
        let name = self.ast.text(node).to_string();
        // Statements always sit in a body; the root is its own scope
        let scope = self.ast.parent(node).unwrap_or(node);
        tracing::trace!(?tag, name = %name, position = self.ast.node(node).position, "statement");

        match tag {
            NodeTag::Store => {
                let evaluation = self.evaluate(self.ast.child(node, 0))?;
                self.memory.store(
                    &self.ast,
                    &name,
                    evaluation.value,
                    evaluation.params,
                    scope,
                );
            }
            NodeTag::Function => {
                let params = self.ast.child(node, 0);
                let value = self
                    .ast
                    .child(node, 1)
                    .map(Value::Body)
                    .unwrap_or(Value::Null);
                self.memory.store(&self.ast, &name, value, params, scope);
            }
            NodeTag::Remove => {
                self.memory.remove(&self.ast, &name, scope);
            }
            NodeTag::Input => {
                let line = self.input.read_line();
                self.memory
                    .store(&self.ast, &name, Value::String(line), None, scope);
            }
            NodeTag::Call => {
                self.run_call(&name, self.ast.child(node, 0), node)?;
            }
            NodeTag::If => {
                // Children alternate condition, body, condition, body, ...
                let branches = self.ast.children(node).to_vec();
                for branch in branches.chunks(2) {
                    if self.evaluate(Some(branch[0]))?.value.is_truthy() {
                        if let Some(&body) = branch.get(1) {
                            return self.execute(body);
                        }
                        break;
                    }
                }
            }
            NodeTag::While => {
                let condition = self.ast.child(node, 0);
                let body = self.ast.child(node, 1);
                while self.evaluate(condition)?.value.is_truthy() {
                    if let Some(body) = body {
                        if let Some(returned) = self.execute(body)? {
                            return Ok(Some(returned));
                        }
                    }
                }
            }
            NodeTag::Output => {
                let value = self.evaluate(self.ast.child(node, 0))?.value;
                self.print(&value.to_string());
            }
            NodeTag::Return => {
                let value = self.evaluate(self.ast.child(node, 0))?.value;
                return Ok(Some(value));
            }
            _ => {}
        }

        Ok(None)
    }

    /// Calls the function bound to `name` as seen from `access`.
    ///
    /// Arguments are bound positionally into the function's body scope, the
    /// same cells every invocation of that function uses, then the body runs.
    pub fn run_call(
        &mut self,
        name: &str,
        args: Option<NodeId>,
        access: NodeId,
    ) -> Result<Value, LdrxError> {
        let Some(binding) = self.memory.resolve(&self.ast, name, access) else {
            tracing::debug!(name, "call to unbound name");
            return Ok(Value::Undefined);
        };
        let (value, params) = (binding.value.clone(), binding.params);

        let Value::Body(body) = value else {
            return Ok(Value::Null);
        };

        if self.depth >= self.settings.max_depth {
            return Err(LdrxError::stack_exhausted(
                self.ast.node(access).position,
                name.to_string(),
                self.settings.max_depth,
            ));
        }

        if let Some(params) = params {
            let names: Vec<String> = self
                .ast
                .children(params)
                .iter()
                .map(|&param| self.ast.text(param).to_string())
                .collect();

            for (position, param) in names.iter().enumerate() {
                let argument = args.and_then(|args| self.ast.child(args, position));
                let evaluation = match argument {
                    Some(argument) => self.evaluate(Some(argument))?,
                    None => Evaluation::of(Value::Undefined),
                };
                self.memory.store(
                    &self.ast,
                    param,
                    evaluation.value,
                    evaluation.params,
                    body,
                );
            }
        }

        self.depth += 1;
        tracing::debug!(name, depth = self.depth, "call");
        let result = self.execute(body);
        self.depth -= 1;

        Ok(result?.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use crate::evaluator::{Evaluator, Settings};
    use crate::io::{CaptureOutput, ScriptedInput};
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    fn evaluator(output: &CaptureOutput) -> Evaluator {
        Evaluator::with_io(Box::new(output.clone()), Box::new(ScriptedInput::default()))
    }

    #[test]
    fn top_level_return_stops_the_program() {
        let output = CaptureOutput::new();
        let mut evaluator = evaluator(&output);
        evaluator.run_source("print 1; return 5; print 2;").unwrap();
        assert_eq!(output.contents(), "1");
    }

    #[test]
    fn function_binding_holds_body_and_params() {
        let output = CaptureOutput::new();
        let mut evaluator = evaluator(&output);
        evaluator.run_source("fn f(a) { return a; }").unwrap();

        let root = evaluator.root();
        let binding = evaluator.memory().resolve(evaluator.ast(), "f", root).unwrap();
        assert!(matches!(binding.value, Value::Body(_)));
        assert!(binding.params.is_some());
    }

    #[test]
    fn depth_limit_stops_runaway_recursion() {
        let output = CaptureOutput::new();
        let mut evaluator = evaluator(&output).with_settings(Settings {
            max_depth: 50,
            ..Settings::default()
        });
        let error = evaluator
            .run_source("fn loop_forever() { return loop_forever(); } loop_forever();")
            .unwrap_err();
        assert_eq!(error.text, "loop_forever");
        assert_eq!(evaluator.depth, 0);
    }

    #[test]
    fn calling_a_plain_value_yields_null() {
        let output = CaptureOutput::new();
        let mut evaluator = evaluator(&output);
        evaluator.run_source("x: 3; print x(); print nope();").unwrap();
        assert_eq!(output.contents(), "NullUndefined");
    }
}
