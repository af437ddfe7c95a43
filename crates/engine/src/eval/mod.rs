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

//! Expression evaluation.
//!
//! Everything the debugger accepts as "an expression" -- command arguments,
//! conditional-breakpoint conditions, watch expressions, goto targets --
//! flows through this module. The pipeline is stateless per call:
//!
//! ```text
//! text -> tokenize -> parse -> ExpressionEvaluator::evaluate_node -> Value
//! ```
//!
//! with all target-process state reached through a [`DebugContext`]
//! borrowed for the duration of the call.
//!
//! [`DebugContext`]: crate::context::DebugContext

mod ast;
mod error;
mod evaluator;
mod functions;
mod parser;
mod tokenizer;

pub use ast::{BinaryOp, Expr, MemWidth, UnaryOp};
pub use error::{EvalError, MemoryAccessKind};
pub use evaluator::{ExpressionEvaluator, ResolveScope, DEFAULT_RESOLUTION_ORDER};
pub use functions::{builtin_registry, FunctionEntry, FunctionHandler, FunctionRegistry};
pub use parser::parse;
pub use tokenizer::{tokenize, OpKind, PunctKind, Token, TokenKind};

use ndb_common::Value;

use crate::context::DebugContext;

/// Evaluate one expression with the default evaluator configuration.
///
/// Callers that evaluate in a loop (watch windows, trace conditions) should
/// hold an [`ExpressionEvaluator`] instead of paying its construction per
/// call.
pub fn evaluate(text: &str, ctx: &dyn DebugContext) -> Result<Value, EvalError> {
    ExpressionEvaluator::new().eval(text, ctx)
}
