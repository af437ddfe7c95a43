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

use ndb_common::Value;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Arithmetic negation (`-`), two's complement.
    Negate,
    /// Bitwise complement (`~`).
    BitNot,
    /// Logical negation (`!`).
    Not,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `*`
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
    /// `&&`, short-circuiting
    And,
    /// `||`, short-circuiting
    Or,
}

/// Width of a memory access, selected by the `byte:`/`word:`/`dword:`/
/// `qword:` prefix on a bracketed dereference. Plain `[...]`, `*` and `@`
/// read the full pointer width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemWidth {
    /// 1 byte.
    Byte,
    /// 2 bytes.
    Word,
    /// 4 bytes.
    Dword,
    /// 8 bytes; also the pointer width of the 64-bit targets NDB drives.
    Qword,
}

impl MemWidth {
    /// The access width in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::Dword => 4,
            Self::Qword => 8,
        }
    }

    /// The width-prefix identifier for this width, if `name` is one.
    pub fn from_prefix(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "byte" => Some(Self::Byte),
            "word" => Some(Self::Word),
            "dword" => Some(Self::Dword),
            "qword" => Some(Self::Qword),
            _ => None,
        }
    }
}

/// An expression tree node.
///
/// Nodes are immutable and strictly tree-shaped (no back-references), so
/// evaluation is a plain post-order recursion. Trees live for a single
/// evaluation call and own no external resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// An integer literal.
    Literal(Value),
    /// An unresolved name; resolution is deferred to evaluation.
    Ident(String),
    /// A unary operation.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// The operand.
        operand: Box<Expr>,
    },
    /// A binary operation. Operands evaluate left to right.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// A function call. Arguments evaluate left to right at evaluation time.
    Call {
        /// The function name as written.
        name: String,
        /// Ordered argument expressions.
        args: Vec<Expr>,
    },
    /// A sized memory read at a computed address.
    Deref {
        /// Address expression.
        addr: Box<Expr>,
        /// Access width.
        width: MemWidth,
    },
    /// An assignment. `target` is restricted to `Ident` or `Deref` by the
    /// parser.
    Assign {
        /// The assignment target.
        target: Box<Expr>,
        /// The value expression.
        value: Box<Expr>,
    },
}

impl Expr {
    /// Shorthand for a boxed literal, used by the parser's desugaring.
    pub(crate) fn literal(value: u64) -> Self {
        Self::Literal(Value::new(value))
    }
}
