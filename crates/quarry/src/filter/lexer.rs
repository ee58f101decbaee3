//! Tokenizer for the filter language.
//!
//! [`Lexer`] produces every token including whitespace; [`Tokens`] is the
//! stream the parser reads, which skips whitespace and caches one token of
//! lookahead.

use crate::error::LexError;
use crate::filter::token::{Token, TokenKind};

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn text_from(&self, start: usize) -> String {
        self.input[start..self.position].iter().collect()
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        let start = self.position;
        self.advance();
        Token::new(kind, self.text_from(start), start)
    }

    fn double(&mut self, kind: TokenKind) -> Token {
        let start = self.position;
        self.advance();
        self.advance();
        Token::new(kind, self.text_from(start), start)
    }

    fn read_whitespace(&mut self) -> Token {
        let start = self.position;
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
        Token::new(TokenKind::Whitespace, self.text_from(start), start)
    }

    fn read_word(&mut self) -> Token {
        let start = self.position;
        while self
            .current_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }
        let word = self.text_from(start);
        let kind = match word.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "any" => TokenKind::Any,
            "all" => TokenKind::All,
            "in" => TokenKind::In,
            _ => TokenKind::Identifier,
        };
        Token::new(kind, word, start)
    }

    /// Reads a quoted string; only the opening quote and a backslash escape it.
    fn read_string(&mut self, quote: char) -> Result<Token, LexError> {
        let start = self.position;
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(Token::new(TokenKind::String, result, start));
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some(c) if c == quote || c == '\\' => result.push(c),
                        Some(c) => {
                            result.push('\\');
                            result.push(c);
                        }
                        None => break,
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedString { position: start })
    }

    fn read_digits(&mut self) -> usize {
        let mut count = 0;
        while self.current_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            count += 1;
        }
        count
    }

    /// Reads `[+-]? digits ('.' digits)? ([eE] [+-]? digits)?`.
    fn read_number(&mut self) -> Result<Token, LexError> {
        let start = self.position;
        if matches!(self.current_char(), Some('+' | '-')) {
            self.advance();
        }
        self.read_digits();

        if self.current_char() == Some('.') {
            self.advance();
            if self.read_digits() == 0 {
                return Err(self.malformed(start));
            }
        }

        if matches!(self.current_char(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.current_char(), Some('+' | '-')) {
                self.advance();
            }
            if self.read_digits() == 0 {
                return Err(self.malformed(start));
            }
        }

        Ok(Token::new(TokenKind::Number, self.text_from(start), start))
    }

    fn malformed(&self, start: usize) -> LexError {
        LexError::MalformedNumber {
            text: self.text_from(start),
            position: start,
        }
    }

    /// Returns the next token, including whitespace.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        let Some(ch) = self.current_char() else {
            return Ok(Token::new(TokenKind::End, "", self.position));
        };
        let next = self.peek_char(1);

        let token = match (ch, next) {
            (c, _) if c.is_whitespace() => self.read_whitespace(),

            ('(', _) => self.single(TokenKind::LParen),
            (')', _) => self.single(TokenKind::RParen),
            ('[', _) => self.single(TokenKind::LBracket),
            (']', _) => self.single(TokenKind::RBracket),
            (',', _) => self.single(TokenKind::Comma),
            ('.', _) => self.single(TokenKind::Dot),
            (':', _) => self.single(TokenKind::Colon),

            ('&', Some('&')) => self.double(TokenKind::And),
            ('|', Some('|')) => self.double(TokenKind::Or),

            ('!', Some('=')) => self.double(TokenKind::Ne),
            ('!', _) => self.single(TokenKind::Not),

            ('=', Some('=')) => self.double(TokenKind::Eq),
            ('<', Some('=')) => self.double(TokenKind::Lte),
            ('<', _) => self.single(TokenKind::Lt),
            ('>', Some('=')) => self.double(TokenKind::Gte),
            ('>', _) => self.single(TokenKind::Gt),
            ('%', Some('=')) => self.double(TokenKind::Contains),
            ('^', Some('=')) => self.double(TokenKind::StartsWith),
            ('$', Some('=')) => self.double(TokenKind::EndsWith),

            (c, _) if c.is_ascii_alphabetic() || c == '_' => self.read_word(),

            (c, _) if c.is_ascii_digit() => self.read_number()?,
            ('+' | '-', Some(d)) if d.is_ascii_digit() => self.read_number()?,

            ('"' | '\'', _) => self.read_string(ch)?,

            (c, _) => {
                return Err(LexError::UnexpectedChar {
                    ch: c,
                    position: self.position,
                })
            }
        };

        Ok(token)
    }
}

/// Token stream with single-token lookahead.
///
/// Whitespace is dropped; the end token repeats once input is exhausted.
pub struct Tokens {
    lexer: Lexer,
    peeked: Option<Token>,
}

impl Tokens {
    pub fn new(input: &str) -> Self {
        Tokens {
            lexer: Lexer::new(input),
            peeked: None,
        }
    }

    fn fetch(&mut self) -> Result<Token, LexError> {
        loop {
            let token = self.lexer.next_token()?;
            if !token.is(TokenKind::Whitespace) {
                return Ok(token);
            }
        }
    }

    /// Consumes and returns the next token.
    pub fn next(&mut self) -> Result<Token, LexError> {
        match self.peeked.take() {
            Some(token) => Ok(token),
            None => self.fetch(),
        }
    }

    /// Returns the next token without consuming it.
    pub fn peek(&mut self) -> Result<&Token, LexError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.fetch()?,
        };
        Ok(self.peeked.insert(token))
    }
}
