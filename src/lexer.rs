use crate::error::LdrxError;

pub const KEYWORDS: [&str; 8] = ["fn", "return", "print", "while", "if", "else", "rem", "ask"];

pub const OPERATORS: [&str; 17] = [
    "<=", ">=", "==", "!=", "&&", "||", "**", "*", "/", "%", "^", "+", "-", "&", "|", "<", ">",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Name,
    Open,
    Close,
    Comma,
    String,
    Number,
    Assign,
    Keyword,
    Operator,
    Semicolon,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Character offset of the token's first character.
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: String, position: usize) -> Self {
        Self {
            kind,
            text,
            position,
        }
    }
}

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    pub fn scan_tokens(mut self) -> Result<Vec<Token>, LdrxError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }

        self.tokens
            .push(Token::new(TokenKind::Eof, String::new(), self.source.len()));

        tracing::debug!(count = self.tokens.len(), "scanned tokens");
        Ok(self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn scan_token(&mut self) -> Result<(), LdrxError> {
        let c = self.advance();

        match c {
            c if c.is_whitespace() => {}
            '\\' => {
                // Comment runs to end of line
                while !matches!(self.peek(), '\n' | '\r') && !self.is_at_end() {
                    self.advance();
                }
            }
            ';' => self.add_token(TokenKind::Semicolon),
            ',' => self.add_token(TokenKind::Comma),
            ':' => self.add_token(TokenKind::Assign),
            '{' | '}' => self.add_token(TokenKind::Keyword),
            '(' => self.add_token(TokenKind::Open),
            ')' => self.add_token(TokenKind::Close),
            c if self.starts_operator(c) => self.operator(c),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier(),
            c if c.is_ascii_digit() => self.number(),
            '\'' | '"' | '`' => self.string(c)?,
            _ => {
                return Err(LdrxError::character_error(
                    self.start,
                    c.to_string(),
                    format!("Unexpected character: '{}'", c),
                ));
            }
        }

        Ok(())
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        if !self.is_at_end() {
            self.current += 1;
        }
        c
    }

    fn peek(&self) -> char {
        self.source.get(self.current).copied().unwrap_or('\0')
    }

    fn starts_operator(&self, c: char) -> bool {
        is_operator(&c.to_string()) || is_operator(&self.pair_with_next(c))
    }

    fn pair_with_next(&self, c: char) -> String {
        let mut pair = c.to_string();
        if !self.is_at_end() {
            pair.push(self.peek());
        }
        pair
    }

    fn operator(&mut self, c: char) {
        // Two-character operators win over their one-character prefix
        if is_operator(&self.pair_with_next(c)) {
            self.advance();
        }
        self.add_token(TokenKind::Operator);
    }

    fn identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = self.lexeme(self.start, self.current);
        let kind = if KEYWORDS.contains(&text.as_str()) {
            TokenKind::Keyword
        } else {
            TokenKind::Name
        };

        self.push(kind, text);
    }

    fn number(&mut self) {
        let mut seen_dot = false;
        loop {
            let next = self.peek();
            if next.is_ascii_digit() {
                self.advance();
            } else if next == '.' && !seen_dot {
                seen_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        self.add_token(TokenKind::Number);
    }

    fn string(&mut self, quote: char) -> Result<(), LdrxError> {
        while self.peek() != quote && !self.is_at_end() {
            self.advance();
        }

        if self.is_at_end() {
            return Err(LdrxError::character_error(
                self.start,
                quote.to_string(),
                "Unterminated string".to_string(),
            )
            .with_help(format!("Close the string with a matching {}", quote)));
        }

        // Consume the closing quote
        self.advance();

        let content = self.lexeme(self.start + 1, self.current - 1);
        self.tokens
            .push(Token::new(TokenKind::String, content, self.start + 1));
        Ok(())
    }

    fn lexeme(&self, from: usize, to: usize) -> String {
        self.source[from..to].iter().collect()
    }

    fn add_token(&mut self, kind: TokenKind) {
        let text = self.lexeme(self.start, self.current);
        self.push(kind, text);
    }

    fn push(&mut self, kind: TokenKind, text: String) {
        self.tokens.push(Token::new(kind, text, self.start));
    }
}

pub fn is_operator(text: &str) -> bool {
    OPERATORS.contains(&text)
}

/// Renders tokens back to source text that lexes to the same kinds.
pub fn render(tokens: &[Token]) -> String {
    tokens
        .iter()
        .filter(|token| token.kind != TokenKind::Eof)
        .map(|token| match token.kind {
            TokenKind::String => {
                let quote = ['"', '\'', '`']
                    .into_iter()
                    .find(|q| !token.text.contains(*q))
                    .unwrap_or('"');
                format!("{}{}{}", quote, token.text, quote)
            }
            _ => token.text.clone(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
