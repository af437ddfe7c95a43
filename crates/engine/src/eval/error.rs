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

use std::fmt;

use ndb_common::Pointer;
use thiserror::Error;

/// Whether a failed memory access was a read or a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryAccessKind {
    /// A dereference or sized read.
    Read,
    /// A write through an assignment target.
    Write,
}

impl fmt::Display for MemoryAccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// A structured expression-evaluation error.
///
/// Any of these aborts the in-progress evaluation immediately; callers treat
/// them as "condition false" / "value unavailable" and surface the message to
/// the user without halting the debugger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The tokenizer hit a character outside the expression alphabet.
    #[error("unrecognized character {character:?} at offset {offset}")]
    Lexical {
        /// Byte offset of the offending character in the source text.
        offset: usize,
        /// The offending character.
        character: char,
    },

    /// The token sequence does not form a single well-formed expression.
    #[error("syntax error at offset {offset}: expected {expected}")]
    Syntax {
        /// Byte offset where parsing failed.
        offset: usize,
        /// Description of the construct the parser was expecting.
        expected: String,
    },

    /// An identifier matched no register, pseudo-register, user variable,
    /// symbol or module name.
    #[error("undefined identifier '{0}'")]
    UndefinedIdentifier(String),

    /// A call named a function absent from the registry.
    #[error("undefined function '{0}'")]
    UndefinedFunction(String),

    /// A call passed the wrong number of arguments.
    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        /// The function name as written.
        name: String,
        /// The registered argument count.
        expected: usize,
        /// The number of arguments supplied.
        got: usize,
    },

    /// The left side of an assignment is not a writable target.
    #[error("not assignable: {0}")]
    NotAssignable(String),

    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// The context reported a failed memory access.
    #[error("memory {kind} failed at {address:#x}")]
    MemoryAccess {
        /// The faulting address.
        address: Pointer,
        /// Whether the access was a read or a write.
        kind: MemoryAccessKind,
    },

    /// A function argument violated its domain.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

impl EvalError {
    /// The source offset associated with the error, if it has one.
    ///
    /// Lexical and syntax errors point at the offending position in the
    /// expression text; evaluation errors do not carry positions.
    pub fn source_offset(&self) -> Option<usize> {
        match self {
            Self::Lexical { offset, .. } | Self::Syntax { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EvalError::Lexical { offset: 3, character: '#' };
        assert_eq!(err.to_string(), "unrecognized character '#' at offset 3");

        let err = EvalError::MemoryAccess { address: 0x1000, kind: MemoryAccessKind::Read };
        assert_eq!(err.to_string(), "memory read failed at 0x1000");

        let err =
            EvalError::ArityMismatch { name: "bswap".into(), expected: 1, got: 2 };
        assert_eq!(err.to_string(), "function 'bswap' expects 1 argument(s), got 2");
    }

    #[test]
    fn test_source_offset() {
        assert_eq!(
            EvalError::Syntax { offset: 7, expected: "an expression".into() }.source_offset(),
            Some(7)
        );
        assert_eq!(EvalError::DivisionByZero.source_offset(), None);
    }
}
