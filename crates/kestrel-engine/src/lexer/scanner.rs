//! The scanner that produces tokens from source text.

use super::{Span, Token, TokenKind};

/// A scanner that tokenizes JavaScript source code.
pub struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    saw_newline: bool,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            current_pos: 0,
            saw_newline: false,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.saw_newline = false;
        if let Err(comment_start) = self.skip_whitespace_and_comments() {
            return Token {
                kind: TokenKind::Invalid("unterminated comment".into()),
                span: Span::new(comment_start, self.current_pos),
                newline_before: self.saw_newline,
            };
        }

        let start = self.current_pos;
        let newline_before = self.saw_newline;

        let Some((_pos, ch)) = self.advance() else {
            let mut eof = Token::new(TokenKind::Eof, Span::new(start, start));
            eof.newline_before = newline_before;
            return eof;
        };

        let kind = match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Question,

            '.' if matches!(self.peek(), Some('0'..='9')) => self.scan_number('.'),
            '.' => TokenKind::Dot,
            '+' => self.scan_repeat_or_assign('+', TokenKind::Plus, TokenKind::PlusPlus, TokenKind::PlusEqual),
            '-' => self.scan_repeat_or_assign('-', TokenKind::Minus, TokenKind::MinusMinus, TokenKind::MinusEqual),
            '*' => self.scan_assign(TokenKind::Star, TokenKind::StarEqual),
            '/' => self.scan_assign(TokenKind::Slash, TokenKind::SlashEqual),
            '%' => self.scan_assign(TokenKind::Percent, TokenKind::PercentEqual),
            '^' => self.scan_assign(TokenKind::Caret, TokenKind::CaretEqual),
            '<' => self.scan_less_than(),
            '>' => self.scan_greater_than(),
            '=' => self.scan_equal(),
            '!' => self.scan_bang(),
            '&' => self.scan_logical('&', TokenKind::Ampersand, TokenKind::AmpersandAmpersand, TokenKind::AmpersandEqual),
            '|' => self.scan_logical('|', TokenKind::Pipe, TokenKind::PipePipe, TokenKind::PipeEqual),

            '"' | '\'' => self.scan_string(ch),

            '0'..='9' => self.scan_number(ch),

            _ if is_id_start(ch) => self.scan_identifier(ch),

            _ => TokenKind::Invalid(format!("unexpected character '{}'", ch)),
        };

        Token {
            kind,
            span: Span::new(start, self.current_pos),
            newline_before,
        }
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Fails with the start offset of a block comment that never closes.
    fn skip_whitespace_and_comments(&mut self) -> Result<(), usize> {
        loop {
            match self.peek() {
                Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    self.saw_newline = true;
                    self.advance();
                }
                Some(ch) if ch.is_whitespace() || ch == '\u{feff}' => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        while let Some(ch) = self.peek() {
                            if ch == '\n' || ch == '\r' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        let start = self.current_pos;
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        loop {
                            let Some((_, ch)) = self.advance() else {
                                return Err(start);
                            };
                            if ch == '\n' || ch == '\r' {
                                self.saw_newline = true;
                            }
                            if prev == '*' && ch == '/' {
                                break;
                            }
                            prev = ch;
                        }
                    }
                    _ => return Ok(()),
                },
                _ => return Ok(()),
            }
        }
    }

    fn scan_assign(&mut self, plain: TokenKind, assign: TokenKind) -> TokenKind {
        if self.eat('=') { assign } else { plain }
    }

    fn scan_repeat_or_assign(
        &mut self,
        ch: char,
        plain: TokenKind,
        doubled: TokenKind,
        assign: TokenKind,
    ) -> TokenKind {
        if self.eat(ch) {
            doubled
        } else if self.eat('=') {
            assign
        } else {
            plain
        }
    }

    fn scan_logical(
        &mut self,
        ch: char,
        bitwise: TokenKind,
        logical: TokenKind,
        assign: TokenKind,
    ) -> TokenKind {
        self.scan_repeat_or_assign(ch, bitwise, logical, assign)
    }

    fn scan_less_than(&mut self) -> TokenKind {
        if self.eat('<') {
            self.scan_assign(TokenKind::LeftShift, TokenKind::LeftShiftEqual)
        } else {
            self.scan_assign(TokenKind::LessThan, TokenKind::LessThanEqual)
        }
    }

    fn scan_greater_than(&mut self) -> TokenKind {
        if self.eat('>') {
            if self.eat('>') {
                self.scan_assign(TokenKind::UnsignedRightShift, TokenKind::UnsignedRightShiftEqual)
            } else {
                self.scan_assign(TokenKind::RightShift, TokenKind::RightShiftEqual)
            }
        } else {
            self.scan_assign(TokenKind::GreaterThan, TokenKind::GreaterThanEqual)
        }
    }

    fn scan_equal(&mut self) -> TokenKind {
        if self.eat('=') {
            self.scan_assign(TokenKind::EqualEqual, TokenKind::StrictEqual)
        } else {
            TokenKind::Equal
        }
    }

    fn scan_bang(&mut self) -> TokenKind {
        if self.eat('=') {
            self.scan_assign(TokenKind::NotEqual, TokenKind::StrictNotEqual)
        } else {
            TokenKind::Bang
        }
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                None | Some((_, '\n')) => {
                    return TokenKind::Invalid("unterminated string literal".into());
                }
                Some((_, ch)) if ch == quote => break,
                Some((_, '\\')) => {
                    let Some((_, escaped)) = self.advance() else {
                        return TokenKind::Invalid("unterminated string literal".into());
                    };
                    match escaped {
                        'n' => value.push('\n'),
                        'r' => value.push('\r'),
                        't' => value.push('\t'),
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'v' => value.push('\u{b}'),
                        '0' => value.push('\0'),
                        'x' => match self.scan_hex_escape(2) {
                            Some(c) => value.push(c),
                            None => return TokenKind::Invalid("malformed \\x escape".into()),
                        },
                        'u' => match self.scan_hex_escape(4) {
                            Some(c) => value.push(c),
                            None => return TokenKind::Invalid("malformed \\u escape".into()),
                        },
                        // Line continuation
                        '\n' => {}
                        '\r' => {
                            self.eat('\n');
                        }
                        other => value.push(other),
                    }
                }
                Some((_, ch)) => value.push(ch),
            }
        }

        TokenKind::String(value)
    }

    fn scan_hex_escape(&mut self, digits: usize) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let (_, ch) = self.advance()?;
            code = code * 16 + ch.to_digit(16)?;
        }
        char::from_u32(code)
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        if first == '0' && matches!(self.peek(), Some('x' | 'X')) {
            return self.scan_hex_number();
        }

        let mut value = String::from(first);
        let mut seen_dot = first == '.';

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if matches!(self.peek(), Some('e' | 'E')) {
            value.push('e');
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                value.push(sign);
                self.advance();
            }
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() {
                    value.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if self.peek().is_some_and(is_id_start) {
            return TokenKind::Invalid("identifier starts immediately after numeric literal".into());
        }

        match value.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Invalid(format!("malformed number '{}'", value)),
        }
    }

    fn scan_hex_number(&mut self) -> TokenKind {
        self.advance(); // consume 'x'
        let mut value = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_ascii_hexdigit() {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match u64::from_str_radix(&value, 16) {
            Ok(n) => TokenKind::Number(n as f64),
            Err(_) => TokenKind::Invalid(format!("malformed hex literal '0x{}'", value)),
        }
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);

        while let Some(ch) = self.peek() {
            if is_id_continue(ch) {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        TokenKind::keyword(&name).unwrap_or(TokenKind::Identifier(name))
    }
}

/// Checks if a character can start an identifier.
fn is_id_start(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Checks if a character can continue an identifier.
fn is_id_continue(ch: char) -> bool {
    ch == '_' || ch == '$' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}
