// NDB - Native Process Debugger
// Copyright (C) 2024 The NDB Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use ndb_common::Pointer;

use super::error::EvalError;

/// Operator tokens of the expression language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*` (multiplication, or pointer dereference in unary position)
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `~`
    BitNot,
    /// `!`
    Not,
    /// `<<`
    Shl,
    /// `>>`
    Shr,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `=`
    Assign,
    /// `@` (pointer dereference in unary position)
    At,
}

/// Punctuation tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PunctKind {
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `:` (member access; a `:` inside an identifier belongs to the
    /// identifier instead)
    Colon,
}

/// The payload of a [`Token`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// An integer literal, already parsed.
    Number(Pointer),
    /// An identifier: register, symbol, function, or user-variable name.
    Ident(String),
    /// A quoted string literal, unescaped.
    Str(String),
    /// An operator.
    Op(OpKind),
    /// Punctuation.
    Punct(PunctKind),
    /// End of the expression.
    End,
}

/// A single token with its byte offset in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token payload.
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub offset: usize,
}

impl Token {
    fn new(kind: TokenKind, offset: usize) -> Self {
        Self { kind, offset }
    }
}

/// Convert expression text into tokens, terminated by [`TokenKind::End`].
///
/// The tokenizer does not recover: the first unrecognized character fails the
/// whole expression with [`EvalError::Lexical`].
pub fn tokenize(text: &str) -> Result<Vec<Token>, EvalError> {
    Tokenizer { text, pos: 0 }.run()
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || matches!(c, '_' | '.' | '$')
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$')
}

struct Tokenizer<'a> {
    text: &'a str,
    pos: usize,
}

impl Tokenizer<'_> {
    fn run(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            let offset = self.pos;
            if c.is_ascii_whitespace() {
                self.bump();
                continue;
            }
            let kind = if c.is_ascii_digit() {
                self.scan_number()?
            } else if is_ident_start(c) {
                self.scan_identifier()
            } else if c == '"' {
                self.scan_string()?
            } else {
                self.scan_operator()?
            };
            tokens.push(Token::new(kind, offset));
        }
        tokens.push(Token::new(TokenKind::End, self.pos));
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.text[self.pos..].chars().nth(ahead)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Scan a numeric literal.
    ///
    /// Hexadecimal is written either with a `0x` prefix or with a trailing
    /// `h` on a digit-initial token (`0ah` == `0xa`); everything else is
    /// decimal.
    fn scan_number(&mut self) -> Result<TokenKind, EvalError> {
        let start = self.pos;

        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x' | 'X')) {
            self.bump();
            self.bump();
            let digits_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
            }
            let digits = &self.text[digits_start..self.pos];
            if digits.is_empty() {
                return Err(EvalError::Syntax {
                    offset: self.pos,
                    expected: "hexadecimal digits after '0x'".into(),
                });
            }
            self.reject_trailing_ident()?;
            return self.parse_radix(digits, 16, start);
        }

        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric()) {
            self.bump();
        }
        let body = &self.text[start..self.pos];

        // A trailing 'h' marks the token as hexadecimal.
        if let Some(digits) = body.strip_suffix(['h', 'H']) {
            if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                self.reject_trailing_ident()?;
                return self.parse_radix(digits, 16, start);
            }
        }
        if body.bytes().all(|b| b.is_ascii_digit()) {
            self.reject_trailing_ident()?;
            return self.parse_radix(body, 10, start);
        }

        Err(EvalError::Syntax {
            offset: start,
            expected: "a decimal or hexadecimal literal".into(),
        })
    }

    /// Numbers must not run straight into identifier characters ("12foo$").
    fn reject_trailing_ident(&self) -> Result<(), EvalError> {
        match self.peek() {
            Some(c) if is_ident_continue(c) => Err(EvalError::Syntax {
                offset: self.pos,
                expected: "an operator or end of expression after a numeric literal".into(),
            }),
            _ => Ok(()),
        }
    }

    fn parse_radix(&self, digits: &str, radix: u32, offset: usize) -> Result<TokenKind, EvalError> {
        Pointer::from_str_radix(digits, radix).map(TokenKind::Number).map_err(|_| {
            EvalError::Syntax {
                offset,
                expected: "a numeric literal that fits in 64 bits".into(),
            }
        })
    }

    /// Scan an identifier.
    ///
    /// Identifiers are alphanumeric plus `_`, `.`, `$`, and may contain `:`
    /// in their interior to name module-qualified symbols
    /// (`ntdll.dll:RtlGetVersion`). A `:` not followed by an identifier
    /// character ends the identifier and lexes as punctuation.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;
        loop {
            match self.peek() {
                Some(c) if is_ident_continue(c) => {
                    self.bump();
                }
                Some(':') if self.peek_at(1).is_some_and(is_ident_continue) => {
                    self.bump();
                }
                _ => break,
            }
        }
        TokenKind::Ident(self.text[start..self.pos].to_string())
    }

    fn scan_string(&mut self) -> Result<TokenKind, EvalError> {
        let start = self.pos;
        self.bump(); // opening quote
        let mut contents = String::new();
        loop {
            match self.bump() {
                Some('"') => return Ok(TokenKind::Str(contents)),
                Some('\\') => match self.bump() {
                    Some(c @ ('"' | '\\')) => contents.push(c),
                    Some(c) => {
                        return Err(EvalError::Lexical { offset: self.pos - c.len_utf8(), character: c })
                    }
                    None => break,
                },
                Some(c) => contents.push(c),
                None => break,
            }
        }
        Err(EvalError::Syntax { offset: start, expected: "a closing '\"'".into() })
    }

    fn scan_operator(&mut self) -> Result<TokenKind, EvalError> {
        let offset = self.pos;
        let c = self.bump().expect("caller checked a character is present");
        let two = |tok: &mut Self, kind| {
            tok.bump();
            Ok(TokenKind::Op(kind))
        };
        match c {
            '+' => Ok(TokenKind::Op(OpKind::Add)),
            '-' => Ok(TokenKind::Op(OpKind::Sub)),
            '*' => Ok(TokenKind::Op(OpKind::Mul)),
            '/' => Ok(TokenKind::Op(OpKind::Div)),
            '%' => Ok(TokenKind::Op(OpKind::Mod)),
            '~' => Ok(TokenKind::Op(OpKind::BitNot)),
            '^' => Ok(TokenKind::Op(OpKind::BitXor)),
            '@' => Ok(TokenKind::Op(OpKind::At)),
            '&' if self.peek() == Some('&') => two(self, OpKind::And),
            '&' => Ok(TokenKind::Op(OpKind::BitAnd)),
            '|' if self.peek() == Some('|') => two(self, OpKind::Or),
            '|' => Ok(TokenKind::Op(OpKind::BitOr)),
            '<' if self.peek() == Some('<') => two(self, OpKind::Shl),
            '<' if self.peek() == Some('=') => two(self, OpKind::Le),
            '<' => Ok(TokenKind::Op(OpKind::Lt)),
            '>' if self.peek() == Some('>') => two(self, OpKind::Shr),
            '>' if self.peek() == Some('=') => two(self, OpKind::Ge),
            '>' => Ok(TokenKind::Op(OpKind::Gt)),
            '=' if self.peek() == Some('=') => two(self, OpKind::Eq),
            '=' => Ok(TokenKind::Op(OpKind::Assign)),
            '!' if self.peek() == Some('=') => two(self, OpKind::Ne),
            '!' => Ok(TokenKind::Op(OpKind::Not)),
            '(' => Ok(TokenKind::Punct(PunctKind::LParen)),
            ')' => Ok(TokenKind::Punct(PunctKind::RParen)),
            ',' => Ok(TokenKind::Punct(PunctKind::Comma)),
            '[' => Ok(TokenKind::Punct(PunctKind::LBracket)),
            ']' => Ok(TokenKind::Punct(PunctKind::RBracket)),
            ':' => Ok(TokenKind::Punct(PunctKind::Colon)),
            _ => Err(EvalError::Lexical { offset, character: c }),
        }
    }
}
