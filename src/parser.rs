use crate::ast::{Ast, NodeId, NodeTag};
use crate::error::{LdrxError, Span};
use crate::lexer::{Lexer, Token, TokenKind};
use crate::stack::ensure_sufficient_stack;

/// Threshold that admits every operator group.
const TOP_PRECEDENCE: u8 = 0xF;

/// Operator group, tightest first. Only exact members match a group; every
/// other operator (`** == != >= && ||`) falls to the loosest group.
pub fn precedence(operator: &str) -> u8 {
    match operator {
        "/" | "*" | "%" | "^" => 0,
        "+" | "-" => 1,
        "<" | ">" | "<=" => 2,
        "&" | "|" => 3,
        _ => 4,
    }
}

pub struct Parser<'a> {
    tokens: Vec<Token>,
    current: usize,
    ast: &'a mut Ast,
    root: NodeId,
    /// Body that receives the next statement.
    scope: NodeId,
}

impl<'a> Parser<'a> {
    /// Parser that appends statements under `root`, an existing node of `ast`.
    pub fn new(mut tokens: Vec<Token>, ast: &'a mut Ast, root: NodeId) -> Self {
        if tokens.last().map(|token| token.kind) != Some(TokenKind::Eof) {
            let end = tokens.last().map(|token| token.position + token.text.chars().count());
            tokens.push(Token::new(TokenKind::Eof, String::new(), end.unwrap_or(0)));
        }

        Self {
            tokens,
            current: 0,
            ast,
            root,
            scope: root,
        }
    }

    pub fn parse(mut self) -> Result<NodeId, LdrxError> {
        while !self.is_at_end() {
            self.statement()?;
        }

        tracing::debug!(nodes = self.ast.len(), "parsed program");
        Ok(self.root)
    }

    fn statement(&mut self) -> Result<(), LdrxError> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::Semicolon => {
                self.advance();
                let pass = self.ast.add(NodeTag::Pass, token.text, token.position);
                self.ast.push_child(self.scope, pass);
                Ok(())
            }
            TokenKind::Keyword => {
                self.advance();
                self.keyword(token)
            }
            TokenKind::Name => self.name_statement(),
            _ => Err(self
                .error_at(&token, format!("Unexpected '{}' at start of statement", token.text))
                .with_help("Statements start with a keyword, a name, '{', '}' or ';'.")),
        }
    }

    fn keyword(&mut self, keyword: Token) -> Result<(), LdrxError> {
        match keyword.text.as_str() {
            "if" | "while" | "print" | "return" => {
                let tag = match keyword.text.as_str() {
                    "if" => NodeTag::If,
                    "while" => NodeTag::While,
                    "print" => NodeTag::Output,
                    _ => NodeTag::Return,
                };
                let node = self.ast.add(tag, keyword.text, keyword.position);
                if let Some(operand) = self.optional_expression() {
                    self.ast.push_child(node, operand);
                }
                self.ast.push_child(self.scope, node);
                Ok(())
            }
            "else" => self.else_branch(keyword),
            "rem" | "ask" => {
                let tag = if keyword.text == "rem" {
                    NodeTag::Remove
                } else {
                    NodeTag::Input
                };
                let name = self.consume(
                    TokenKind::Name,
                    &format!("Expected a name after '{}'", keyword.text),
                )?;
                let node = self.ast.add(tag, name.text, name.position);
                self.ast.push_child(self.scope, node);
                Ok(())
            }
            "fn" => self.function(),
            "{" => self.open_body(keyword),
            "}" => self.close_body(keyword),
            _ => Err(LdrxError::interpreter_error(
                Span::single(keyword.position),
                keyword.text.clone(),
                format!("No handler for keyword '{}'", keyword.text),
            )),
        }
    }

    fn else_branch(&mut self, keyword: Token) -> Result<(), LdrxError> {
        let guarded = self
            .ast
            .parent(self.scope)
            .filter(|&parent| self.ast.tag(parent) == NodeTag::If);
        let Some(if_node) = guarded else {
            return Err(self
                .error_at(&keyword, "'else' outside of an 'if' body".to_string())
                .with_help("Write 'else' inside the braces of the if: if c { ...; else ...; }"));
        };

        let body = self.ast.add(NodeTag::Body, "body", keyword.position);
        let condition = match self.optional_expression() {
            Some(condition) => condition,
            None => self.ast.add(NodeTag::NumberLit, "1", keyword.position),
        };

        self.ast.push_child(if_node, condition);
        self.ast.push_child(if_node, body);
        self.scope = body;
        Ok(())
    }

    fn function(&mut self) -> Result<(), LdrxError> {
        let name = self.consume(TokenKind::Name, "Expected function name after 'fn'")?;
        let open = self.consume(TokenKind::Open, "Expected '(' after function name")?;

        let function = self.ast.add(NodeTag::Function, name.text, name.position);
        let params = self.ast.add(NodeTag::ArgList, "arg", open.position);

        if !self.check(TokenKind::Close) {
            loop {
                let param = self.consume(TokenKind::Name, "Expected parameter name")?;
                let store = self.ast.add(NodeTag::Store, param.text, param.position);
                self.ast.push_child(params, store);

                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::Close, "Expected ')' after parameters")?;

        self.ast.push_child(function, params);
        self.ast.push_child(self.scope, function);
        Ok(())
    }

    fn open_body(&mut self, brace: Token) -> Result<(), LdrxError> {
        let Some(owner) = self.ast.last_child(self.scope) else {
            return Err(self
                .error_at(&brace, "'{' must follow a statement".to_string())
                .with_help("A body belongs to the statement before it, e.g. if c { ... }"));
        };

        let body = self.ast.add(NodeTag::Body, "body", brace.position);
        self.ast.push_child(owner, body);
        self.scope = body;
        Ok(())
    }

    fn close_body(&mut self, brace: Token) -> Result<(), LdrxError> {
        if self.scope == self.root {
            return Err(self.error_at(&brace, "Unmatched '}'".to_string()));
        }

        let enclosing = self
            .ast
            .parent(self.scope)
            .and_then(|owner| self.ast.parent(owner));
        match enclosing {
            Some(enclosing) => {
                self.scope = enclosing;
                Ok(())
            }
            None => Err(LdrxError::interpreter_error(
                Span::single(brace.position),
                brace.text,
                "Open body is detached from the tree".to_string(),
            )),
        }
    }

    fn name_statement(&mut self) -> Result<(), LdrxError> {
        let Some(node) = self.call_or_get() else {
            let token = self.peek().clone();
            return Err(self.error_at(&token, format!("Unexpected '{}' in call", token.text)));
        };

        if self.ast.tag(node) == NodeTag::Get {
            if !self.match_kind(TokenKind::Assign) {
                let token = self.peek().clone();
                return Err(self
                    .error_at(&token, format!("Expected ':' after '{}'", self.ast.text(node)))
                    .with_help("Assign with name: value; or call with name(...)."));
            }

            self.ast.retag(node, NodeTag::Store);
            if let Some(value) = self.optional_expression() {
                self.ast.push_child(node, value);
            }
        }

        self.ast.push_child(self.scope, node);
        Ok(())
    }

    /// Parses an expression if one starts here; otherwise leaves the cursor untouched.
    fn optional_expression(&mut self) -> Option<NodeId> {
        let checkpoint = self.current;
        let expression = self.expression(TOP_PRECEDENCE);
        if expression.is_none() {
            self.current = checkpoint;
        }
        expression
    }

    fn expression(&mut self, threshold: u8) -> Option<NodeId> {
        let mut left = self.primary()?;

        while self.check(TokenKind::Operator) {
            let operator = self.peek().clone();
            let group = precedence(&operator.text);
            if group >= threshold {
                break;
            }
            self.advance();

            let right = self.expression(group)?;
            let node = self
                .ast
                .add(NodeTag::Operator, operator.text, operator.position);
            self.ast.push_child(node, left);
            self.ast.push_child(node, right);
            left = node;
        }

        Some(left)
    }

    fn primary(&mut self) -> Option<NodeId> {
        let token = self.peek().clone();

        match token.kind {
            TokenKind::String | TokenKind::Number => {
                self.advance();
                let tag = if token.kind == TokenKind::String {
                    NodeTag::StringLit
                } else {
                    NodeTag::NumberLit
                };
                Some(self.ast.add(tag, token.text, token.position))
            }
            TokenKind::Name => self.call_or_get(),
            _ => None,
        }
    }

    fn call_or_get(&mut self) -> Option<NodeId> {
        let name = self.advance().clone();

        if !self.check(TokenKind::Open) {
            return Some(self.ast.add(NodeTag::Get, name.text, name.position));
        }
        let open = self.advance().clone();

        let call = self.ast.add(NodeTag::Call, name.text, name.position);
        let args = self.ast.add(NodeTag::ArgList, "arg", open.position);

        if !self.match_kind(TokenKind::Close) {
            loop {
                let arg = ensure_sufficient_stack(|| self.expression(TOP_PRECEDENCE))?;
                self.ast.push_child(args, arg);

                if self.match_kind(TokenKind::Comma) {
                    continue;
                }
                if self.match_kind(TokenKind::Close) {
                    break;
                }
                return None;
            }
        }

        self.ast.push_child(call, args);
        Some(call)
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> Result<Token, LdrxError> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }

        let token = self.peek().clone();
        Err(self.error_at(&token, message.to_string()))
    }

    fn error_at(&self, token: &Token, message: String) -> LdrxError {
        let width = token.text.chars().count().max(1);
        LdrxError::syntax_error(
            Span::new(token.position, token.position + width),
            token.text.clone(),
            message,
        )
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }
}

/// Lexes and parses `source` into a fresh arena.
pub fn parse(source: &str) -> Result<(Ast, NodeId), LdrxError> {
    let tokens = Lexer::new(source).scan_tokens()?;
    let mut ast = Ast::new();
    let root = ast.add(NodeTag::Root, "root", 0);
    Parser::new(tokens, &mut ast, root).parse()?;
    Ok((ast, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    fn outline(source: &str) -> String {
        let (ast, root) = parse(source).unwrap();
        ast.dump(root)
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        assert_eq!(
            outline("print 1 + 2 * 3;"),
            "Root \"root\"\n  Output \"print\"\n    Operator \"+\"\n      NumberLit \"1\"\n      Operator \"*\"\n        NumberLit \"2\"\n        NumberLit \"3\"\n  Pass \";\"\n"
        );
    }

    #[test]
    fn power_is_in_the_loosest_group() {
        assert_eq!(
            outline("print 1 + 2 ** 3"),
            "Root \"root\"\n  Output \"print\"\n    Operator \"**\"\n      Operator \"+\"\n        NumberLit \"1\"\n        NumberLit \"2\"\n      NumberLit \"3\"\n"
        );
    }

    #[test]
    fn operators_fold_left() {
        assert_eq!(
            outline("print 8 - 2 - 1"),
            "Root \"root\"\n  Output \"print\"\n    Operator \"-\"\n      Operator \"-\"\n        NumberLit \"8\"\n        NumberLit \"2\"\n      NumberLit \"1\"\n"
        );
    }

    #[test]
    fn precedence_table_quirks() {
        assert_eq!(precedence("<="), 2);
        assert_eq!(precedence(">="), 4);
        assert_eq!(precedence("&"), 3);
        assert_eq!(precedence("&&"), 4);
        assert_eq!(precedence("^"), 0);
        assert_eq!(precedence("**"), 4);
    }

    #[test]
    fn function_with_body() {
        assert_eq!(
            outline("fn add(a, b) { return a + b; }"),
            "Root \"root\"\n  Function \"add\"\n    ArgList \"arg\"\n      Store \"a\"\n      Store \"b\"\n    Body \"body\"\n      Return \"return\"\n        Operator \"+\"\n          Get \"a\"\n          Get \"b\"\n      Pass \";\"\n"
        );
    }

    #[test]
    fn store_and_call_statements() {
        assert_eq!(
            outline("x: f(1, y)\nz:"),
            "Root \"root\"\n  Store \"x\"\n    Call \"f\"\n      ArgList \"arg\"\n        NumberLit \"1\"\n        Get \"y\"\n  Store \"z\"\n"
        );
    }

    #[test]
    fn else_branches_extend_the_if() {
        assert_eq!(
            outline("if a { print 1 else b print 2 else print 3 }"),
            "Root \"root\"\n  If \"if\"\n    Get \"a\"\n    Body \"body\"\n      Output \"print\"\n        NumberLit \"1\"\n    Get \"b\"\n    Body \"body\"\n      Output \"print\"\n        NumberLit \"2\"\n    NumberLit \"1\"\n    Body \"body\"\n      Output \"print\"\n        NumberLit \"3\"\n"
        );
    }

    #[test]
    fn bare_return_keeps_cursor() {
        assert_eq!(
            outline("return; rem x; ask y"),
            "Root \"root\"\n  Return \"return\"\n  Pass \";\"\n  Remove \"x\"\n  Pass \";\"\n  Input \"y\"\n"
        );
    }

    #[test]
    fn syntax_errors_point_at_the_token() {
        let error = parse("print 1);").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Syntax);
        assert_eq!(error.text, ")");
        assert_eq!(error.span.start, 7);

        let error = parse("x 1").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Syntax);
        assert_eq!(error.text, "1");

        let error = parse("f(1 2)").unwrap_err();
        assert_eq!(error.text, "2");

        let error = parse("{ print 1; }").unwrap_err();
        assert_eq!(error.text, "{");

        let error = parse("}").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Syntax);

        let error = parse("print 1; else print 2;").unwrap_err();
        assert_eq!(error.text, "else");

        let error = parse("fn (a) {}").unwrap_err();
        assert_eq!(error.text, "(");

        let error = parse("fn f(a b) {}").unwrap_err();
        assert_eq!(error.text, "b");
    }

    #[test]
    fn lexer_errors_surface_through_parse() {
        let error = parse("print 'open").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Character);
    }
}
