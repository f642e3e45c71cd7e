use crate::ParseError;

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) enum TokenKind {
    Const(u64),
    Reg(String),
    Var(String),

    Spawn,
    Join,
    Lock,
    Unlock,
    Assert,
    Nop,
    If,
    Else,

    Semi,
    Assign,
    EqEq,
    NotEq,
    Plus,
    LBrace,
    RBrace,
    LParen,
    RParen,

    Eof,
}

impl TokenKind {
    /// How the token reads in an "unexpected ..." diagnostic.
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::Const(n) => format!("'{n}'"),
            TokenKind::Reg(name) => format!("'${name}'"),
            TokenKind::Var(name) => format!("'{name}'"),
            TokenKind::Spawn => "'spawn'".into(),
            TokenKind::Join => "'join'".into(),
            TokenKind::Lock => "'lock'".into(),
            TokenKind::Unlock => "'unlock'".into(),
            TokenKind::Assert => "'assert'".into(),
            TokenKind::Nop => "'nop'".into(),
            TokenKind::If => "'if'".into(),
            TokenKind::Else => "'else'".into(),
            TokenKind::Semi => "';'".into(),
            TokenKind::Assign => "'='".into(),
            TokenKind::EqEq => "'=='".into(),
            TokenKind::NotEq => "'!='".into(),
            TokenKind::Plus => "'+'".into(),
            TokenKind::LBrace => "'{'".into(),
            TokenKind::RBrace => "'}'".into(),
            TokenKind::LParen => "'('".into(),
            TokenKind::RParen => "')'".into(),
            TokenKind::Eof => "end of input".into(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct Token {
    pub(crate) kind: TokenKind,
    pub(crate) line: u32,
    pub(crate) col: u32,
}

/// Byte-walking lexer with line/column tracking for diagnostics.
pub(crate) struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the entire input, ending with an `Eof` token.
    pub(crate) fn tokenize(source: &'a str) -> Result<Vec<Token>, ParseError> {
        let mut lexer = Self::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments();

        let (line, col) = (self.line, self.col);
        let token = |kind| Token { kind, line, col };

        let Some(ch) = self.peek() else {
            return Ok(token(TokenKind::Eof));
        };

        let kind = match ch {
            b'0'..=b'9' => self.lex_number()?,
            b'$' => {
                self.advance();
                match self.lex_name() {
                    Some(name) => TokenKind::Reg(name),
                    None => {
                        return Err(ParseError::UnexpectedChar {
                            line,
                            col,
                            found: '$',
                        })
                    }
                }
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let name = self.lex_name().expect("first byte already matched");
                match name.as_str() {
                    "spawn" => TokenKind::Spawn,
                    "join" => TokenKind::Join,
                    "lock" => TokenKind::Lock,
                    "unlock" => TokenKind::Unlock,
                    "assert" => TokenKind::Assert,
                    "nop" => TokenKind::Nop,
                    "if" => TokenKind::If,
                    "else" => TokenKind::Else,
                    _ => TokenKind::Var(name),
                }
            }
            b';' => {
                self.advance();
                TokenKind::Semi
            }
            b'+' => {
                self.advance();
                TokenKind::Plus
            }
            b'{' => {
                self.advance();
                TokenKind::LBrace
            }
            b'}' => {
                self.advance();
                TokenKind::RBrace
            }
            b'(' => {
                self.advance();
                TokenKind::LParen
            }
            b')' => {
                self.advance();
                TokenKind::RParen
            }
            b'=' => {
                self.advance();
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            b'!' if self.peek_at(1) == Some(b'=') => {
                self.advance();
                self.advance();
                TokenKind::NotEq
            }
            other => {
                return Err(ParseError::UnexpectedChar {
                    line,
                    col,
                    found: other as char,
                })
            }
        };
        Ok(token(kind))
    }

    fn lex_number(&mut self) -> Result<TokenKind, ParseError> {
        let (line, col) = (self.line, self.col);
        let mut value: u64 = 0;
        while let Some(digit @ b'0'..=b'9') = self.peek() {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(digit - b'0')))
                .ok_or(ParseError::IntegerOutOfRange { line, col })?;
            self.advance();
        }
        Ok(TokenKind::Const(value))
    }

    fn lex_name(&mut self) -> Option<String> {
        let start = self.pos;
        if !matches!(self.peek(), Some(b'a'..=b'z' | b'A'..=b'Z' | b'_')) {
            return None;
        }
        while matches!(
            self.peek(),
            Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_')
        ) {
            self.advance();
        }
        Some(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r' | b'\n') => {
                    self.advance();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += 1;
            if ch == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }
}
