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

//! Operator-precedence parser for the expression language.
//!
//! A single top-down pass over the token sequence with one token of
//! lookahead (two where the `byte:[...]` width prefix must be distinguished
//! from member access). Postfix sugar lowers into the core [`Expr`] variants
//! here:
//!
//! - `base[index]` becomes a pointer-width dereference of
//!   `base + index * 8`;
//! - `byte:[e]` / `word:[e]` / `dword:[e]` / `qword:[e]` become sized
//!   dereferences;
//! - `expr:field` becomes `field(expr)` — structured OS-object fields are
//!   registry functions taking the object address;
//! - a quoted string becomes an [`Expr::Ident`], quoting protecting names
//!   that contain operator characters.

use ndb_common::POINTER_SIZE;

use super::ast::{BinaryOp, Expr, MemWidth, UnaryOp};
use super::error::EvalError;
use super::tokenizer::{OpKind, PunctKind, Token, TokenKind};

/// Parse a token sequence into an expression tree.
///
/// The sequence must be `tokenize` output (terminated by `End`). Trailing
/// tokens after a complete expression are a syntax error.
pub fn parse(tokens: Vec<Token>) -> Result<Expr, EvalError> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_assignment()?;
    match parser.peek().kind {
        TokenKind::End => Ok(expr),
        _ => Err(parser.expected("end of expression")),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek2(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat_op(&mut self, op: OpKind) -> bool {
        if self.peek().kind == TokenKind::Op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_punct(&mut self, punct: PunctKind) -> bool {
        if self.peek().kind == TokenKind::Punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: PunctKind, expected: &str) -> Result<(), EvalError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.expected(expected))
        }
    }

    fn expected(&self, expected: &str) -> EvalError {
        EvalError::Syntax { offset: self.peek().offset, expected: expected.to_string() }
    }

    /// Lowest precedence: `=`, right-associative. The left side must be an
    /// identifier or a memory dereference.
    fn parse_assignment(&mut self) -> Result<Expr, EvalError> {
        let lhs = self.parse_logical_or()?;
        if !self.eat_op(OpKind::Assign) {
            return Ok(lhs);
        }
        let value = self.parse_assignment()?;
        match lhs {
            Expr::Ident(_) | Expr::Deref { .. } => {
                Ok(Expr::Assign { target: Box::new(lhs), value: Box::new(value) })
            }
            _ => Err(self.expected("an identifier or memory location on the left of '='")),
        }
    }

    fn parse_logical_or(&mut self) -> Result<Expr, EvalError> {
        let mut node = self.parse_logical_and()?;
        while self.eat_op(OpKind::Or) {
            let rhs = self.parse_logical_and()?;
            node = binary(BinaryOp::Or, node, rhs);
        }
        Ok(node)
    }

    fn parse_logical_and(&mut self) -> Result<Expr, EvalError> {
        let mut node = self.parse_bit_or()?;
        while self.eat_op(OpKind::And) {
            let rhs = self.parse_bit_or()?;
            node = binary(BinaryOp::And, node, rhs);
        }
        Ok(node)
    }

    fn parse_bit_or(&mut self) -> Result<Expr, EvalError> {
        let mut node = self.parse_bit_xor()?;
        while self.eat_op(OpKind::BitOr) {
            let rhs = self.parse_bit_xor()?;
            node = binary(BinaryOp::BitOr, node, rhs);
        }
        Ok(node)
    }

    fn parse_bit_xor(&mut self) -> Result<Expr, EvalError> {
        let mut node = self.parse_bit_and()?;
        while self.eat_op(OpKind::BitXor) {
            let rhs = self.parse_bit_and()?;
            node = binary(BinaryOp::BitXor, node, rhs);
        }
        Ok(node)
    }

    fn parse_bit_and(&mut self) -> Result<Expr, EvalError> {
        let mut node = self.parse_equality()?;
        while self.eat_op(OpKind::BitAnd) {
            let rhs = self.parse_equality()?;
            node = binary(BinaryOp::BitAnd, node, rhs);
        }
        Ok(node)
    }

    fn parse_equality(&mut self) -> Result<Expr, EvalError> {
        let mut node = self.parse_relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Op(OpKind::Eq) => BinaryOp::Eq,
                TokenKind::Op(OpKind::Ne) => BinaryOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_relational()?;
            node = binary(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_relational(&mut self) -> Result<Expr, EvalError> {
        let mut node = self.parse_shift()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Op(OpKind::Lt) => BinaryOp::Lt,
                TokenKind::Op(OpKind::Le) => BinaryOp::Le,
                TokenKind::Op(OpKind::Gt) => BinaryOp::Gt,
                TokenKind::Op(OpKind::Ge) => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_shift()?;
            node = binary(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_shift(&mut self) -> Result<Expr, EvalError> {
        let mut node = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Op(OpKind::Shl) => BinaryOp::Shl,
                TokenKind::Op(OpKind::Shr) => BinaryOp::Shr,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            node = binary(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        let mut node = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Op(OpKind::Add) => BinaryOp::Add,
                TokenKind::Op(OpKind::Sub) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            node = binary(op, node, rhs);
        }
        Ok(node)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, EvalError> {
        let mut node = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Op(OpKind::Mul) => BinaryOp::Mul,
                TokenKind::Op(OpKind::Div) => BinaryOp::Div,
                TokenKind::Op(OpKind::Mod) => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            node = binary(op, node, rhs);
        }
        Ok(node)
    }

    /// `- ~ !`, plus `*` and `@` as pointer-width dereference in unary
    /// position.
    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek().kind {
            TokenKind::Op(OpKind::Sub) => Some(UnaryOp::Negate),
            TokenKind::Op(OpKind::BitNot) => Some(UnaryOp::BitNot),
            TokenKind::Op(OpKind::Not) => Some(UnaryOp::Not),
            TokenKind::Op(OpKind::Mul | OpKind::At) => {
                self.advance();
                let operand = self.parse_unary()?;
                return Ok(Expr::Deref { addr: Box::new(operand), width: MemWidth::Qword });
            }
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let operand = self.parse_unary()?;
                Ok(Expr::Unary { op, operand: Box::new(operand) })
            }
            None => self.parse_postfix(),
        }
    }

    /// Function calls, indexing and member access.
    fn parse_postfix(&mut self) -> Result<Expr, EvalError> {
        let mut node = self.parse_primary()?;
        loop {
            if self.peek().kind == TokenKind::Punct(PunctKind::LParen) {
                let Expr::Ident(name) = node else {
                    return Err(self.expected("a function name before '('"));
                };
                self.advance();
                let args = self.parse_call_args()?;
                node = Expr::Call { name, args };
            } else if self.eat_punct(PunctKind::LBracket) {
                let index = self.parse_assignment()?;
                self.expect_punct(PunctKind::RBracket, "a closing ']'")?;
                let scaled = binary(BinaryOp::Mul, index, Expr::literal(POINTER_SIZE as u64));
                let addr = binary(BinaryOp::Add, node, scaled);
                node = Expr::Deref { addr: Box::new(addr), width: MemWidth::Qword };
            } else if self.eat_punct(PunctKind::Colon) {
                let TokenKind::Ident(field) = self.advance().kind else {
                    return Err(self.expected("a field name after ':'"));
                };
                node = Expr::Call { name: field, args: vec![node] };
            } else {
                return Ok(node);
            }
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>, EvalError> {
        let mut args = Vec::new();
        if self.eat_punct(PunctKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_assignment()?);
            if self.eat_punct(PunctKind::Comma) {
                continue;
            }
            self.expect_punct(PunctKind::RParen, "',' or ')' in argument list")?;
            return Ok(args);
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.peek().kind.clone() {
            TokenKind::Number(value) => {
                self.advance();
                Ok(Expr::literal(value))
            }
            // Quoted names resolve exactly like bare identifiers.
            TokenKind::Str(name) => {
                self.advance();
                Ok(Expr::Ident(name))
            }
            TokenKind::Ident(name) => {
                self.advance();
                if let Some(width) = self.peek_width_prefix(&name) {
                    self.advance(); // ':'
                    self.advance(); // '['
                    let addr = self.parse_assignment()?;
                    self.expect_punct(PunctKind::RBracket, "a closing ']'")?;
                    return Ok(Expr::Deref { addr: Box::new(addr), width });
                }
                Ok(Expr::Ident(name))
            }
            TokenKind::Punct(PunctKind::LParen) => {
                self.advance();
                let inner = self.parse_assignment()?;
                self.expect_punct(PunctKind::RParen, "a closing ')'")?;
                Ok(inner)
            }
            TokenKind::Punct(PunctKind::LBracket) => {
                self.advance();
                let addr = self.parse_assignment()?;
                self.expect_punct(PunctKind::RBracket, "a closing ']'")?;
                Ok(Expr::Deref { addr: Box::new(addr), width: MemWidth::Qword })
            }
            _ => Err(self.expected("an expression")),
        }
    }

    /// Detect `byte:[` / `word:[` / `dword:[` / `qword:[` after consuming the
    /// width identifier. This needs the parser's only second token of
    /// lookahead: a width name followed by ':' but not '[' is ordinary
    /// member access.
    fn peek_width_prefix(&self, name: &str) -> Option<MemWidth> {
        let width = MemWidth::from_prefix(name)?;
        if self.peek().kind == TokenKind::Punct(PunctKind::Colon)
            && self.peek2().map(|t| &t.kind) == Some(&TokenKind::Punct(PunctKind::LBracket))
        {
            Some(width)
        } else {
            None
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::super::tokenizer::tokenize;
    use super::*;

    fn parse_text(text: &str) -> Result<Expr, EvalError> {
        parse(tokenize(text).unwrap())
    }

    fn ident(name: &str) -> Expr {
        Expr::Ident(name.into())
    }

    #[test]
    fn test_precedence_mul_over_add() {
        assert_eq!(
            parse_text("1+2*3").unwrap(),
            binary(BinaryOp::Add, Expr::literal(1), binary(BinaryOp::Mul, Expr::literal(2), Expr::literal(3)))
        );
    }

    #[test]
    fn test_parentheses_override_precedence() {
        assert_eq!(
            parse_text("(1+2)*3").unwrap(),
            binary(BinaryOp::Mul, binary(BinaryOp::Add, Expr::literal(1), Expr::literal(2)), Expr::literal(3))
        );
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(
            parse_text("8-4-2").unwrap(),
            binary(BinaryOp::Sub, binary(BinaryOp::Sub, Expr::literal(8), Expr::literal(4)), Expr::literal(2))
        );
    }

    #[test]
    fn test_assignment_right_associative() {
        assert_eq!(
            parse_text("a=b=1").unwrap(),
            Expr::Assign {
                target: Box::new(ident("a")),
                value: Box::new(Expr::Assign {
                    target: Box::new(ident("b")),
                    value: Box::new(Expr::literal(1)),
                }),
            }
        );
    }

    #[test]
    fn test_assignment_target_must_be_writable() {
        assert!(matches!(parse_text("1+2=3"), Err(EvalError::Syntax { .. })));
        // Memory locations are valid targets.
        assert!(matches!(parse_text("[0x1000]=1"), Ok(Expr::Assign { .. })));
    }

    #[test]
    fn test_logical_below_bitwise() {
        // a&&b|c parses as a && (b|c)
        assert_eq!(
            parse_text("a&&b|c").unwrap(),
            binary(BinaryOp::And, ident("a"), binary(BinaryOp::BitOr, ident("b"), ident("c")))
        );
    }

    #[test]
    fn test_unary_deref_forms() {
        let expected = Expr::Deref { addr: Box::new(ident("rax")), width: MemWidth::Qword };
        assert_eq!(parse_text("*rax").unwrap(), expected);
        assert_eq!(parse_text("@rax").unwrap(), expected);
        assert_eq!(parse_text("[rax]").unwrap(), expected);
    }

    #[test]
    fn test_sized_deref_prefix() {
        assert_eq!(
            parse_text("byte:[rsp]").unwrap(),
            Expr::Deref { addr: Box::new(ident("rsp")), width: MemWidth::Byte }
        );
        assert_eq!(
            parse_text("DWORD:[0x1000]").unwrap(),
            Expr::Deref { addr: Box::new(Expr::literal(0x1000)), width: MemWidth::Dword }
        );
    }

    #[test]
    fn test_indexing_desugars_to_scaled_deref() {
        assert_eq!(
            parse_text("buf[2]").unwrap(),
            Expr::Deref {
                addr: Box::new(binary(
                    BinaryOp::Add,
                    ident("buf"),
                    binary(BinaryOp::Mul, Expr::literal(2), Expr::literal(8)),
                )),
                width: MemWidth::Qword,
            }
        );
    }

    #[test]
    fn test_member_access_desugars_to_call() {
        assert_eq!(
            parse_text("teb():stackbase").unwrap(),
            Expr::Call {
                name: "stackbase".into(),
                args: vec![Expr::Call { name: "teb".into(), args: vec![] }],
            }
        );
    }

    #[test]
    fn test_call_arguments() {
        assert_eq!(
            parse_text("srcline(rip)").unwrap(),
            Expr::Call { name: "srcline".into(), args: vec![ident("rip")] }
        );
        assert_eq!(
            parse_text("f(1,2,3)").unwrap(),
            Expr::Call {
                name: "f".into(),
                args: vec![Expr::literal(1), Expr::literal(2), Expr::literal(3)],
            }
        );
        assert_eq!(parse_text("peb()").unwrap(), Expr::Call { name: "peb".into(), args: vec![] });
    }

    #[test]
    fn test_string_argument_is_identifier() {
        assert_eq!(
            parse_text("modbase(\"ntdll.dll\")").unwrap(),
            Expr::Call { name: "modbase".into(), args: vec![ident("ntdll.dll")] }
        );
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse_text("1+2 3").unwrap_err();
        assert_eq!(err, EvalError::Syntax { offset: 4, expected: "end of expression".into() });
    }

    #[test]
    fn test_unclosed_paren() {
        assert!(matches!(parse_text("(1+2"), Err(EvalError::Syntax { .. })));
        assert!(matches!(parse_text("f(1,"), Err(EvalError::Syntax { .. })));
        assert!(matches!(parse_text("[rax"), Err(EvalError::Syntax { .. })));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(parse_text(""), Err(EvalError::Syntax { offset: 0, .. })));
    }

    #[test]
    fn test_call_on_non_identifier_rejected() {
        assert!(matches!(parse_text("(1+2)(3)"), Err(EvalError::Syntax { .. })));
    }
}
