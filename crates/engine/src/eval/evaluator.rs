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

use std::sync::Arc;

use ndb_common::{Pointer, Value};
use tracing::{debug, trace};

use super::ast::{BinaryOp, Expr, MemWidth, UnaryOp};
use super::error::{EvalError, MemoryAccessKind};
use super::functions::{builtin_registry, FunctionRegistry};
use super::parser::parse;
use super::tokenizer::tokenize;
use crate::context::DebugContext;

/// One step of identifier resolution. The evaluator tries each scope in
/// order; the first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveScope {
    /// CPU register names.
    Register,
    /// Zero-argument registry functions callable without parentheses:
    /// the per-view selection pseudo-registers (`disasmsel`, `dumpsel`,
    /// `stacksel`) and the OS-block getters.
    PseudoFunction,
    /// Named user variables.
    UserVariable,
    /// Loaded-module exports and debug symbols.
    Symbol,
    /// Module names, resolving to the module's base address.
    ModuleBase,
}

/// The default resolution order: register, selection pseudo-register, user
/// variable, symbol, module base.
pub const DEFAULT_RESOLUTION_ORDER: [ResolveScope; 5] = [
    ResolveScope::Register,
    ResolveScope::PseudoFunction,
    ResolveScope::UserVariable,
    ResolveScope::Symbol,
    ResolveScope::ModuleBase,
];

/// The expression evaluator.
///
/// Holds the function registry and the identifier-resolution order; all
/// target state comes through the [`DebugContext`] passed to each call, so
/// one evaluator can serve any number of sessions.
#[derive(Clone)]
pub struct ExpressionEvaluator {
    registry: Arc<FunctionRegistry>,
    resolution: Vec<ResolveScope>,
}

impl Default for ExpressionEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEvaluator {
    /// An evaluator with the built-in registry and default resolution order.
    pub fn new() -> Self {
        Self { registry: builtin_registry(), resolution: DEFAULT_RESOLUTION_ORDER.to_vec() }
    }

    /// Replace the function registry.
    pub fn with_registry(mut self, registry: Arc<FunctionRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the identifier-resolution order. Some command contexts want
    /// symbols ahead of user variables; the engine does not hardcode one
    /// order.
    pub fn with_resolution_order(mut self, order: Vec<ResolveScope>) -> Self {
        self.resolution = order;
        self
    }

    /// Tokenize, parse and evaluate one expression in a single stateless
    /// pass.
    pub fn eval(&self, text: &str, ctx: &dyn DebugContext) -> Result<Value, EvalError> {
        trace!(expression = text, "evaluating");
        let tokens = tokenize(text)?;
        let ast = parse(tokens)?;
        self.evaluate_node(&ast, ctx)
    }

    /// Post-order recursive evaluation of an expression tree.
    pub fn evaluate_node(&self, expr: &Expr, ctx: &dyn DebugContext) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(*value),
            Expr::Ident(name) => self.resolve_identifier(name, ctx),
            Expr::Unary { op, operand } => {
                let value = self.evaluate_node(operand, ctx)?;
                Ok(apply_unary(*op, value))
            }
            Expr::Binary { op: BinaryOp::And, lhs, rhs } => {
                // Short-circuit: the right side is not evaluated (and has no
                // side effects) when the left side already decides.
                if !self.evaluate_node(lhs, ctx)?.is_true() {
                    return Ok(Value::from(false));
                }
                Ok(Value::from(self.evaluate_node(rhs, ctx)?.is_true()))
            }
            Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
                if self.evaluate_node(lhs, ctx)?.is_true() {
                    return Ok(Value::from(true));
                }
                Ok(Value::from(self.evaluate_node(rhs, ctx)?.is_true()))
            }
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.evaluate_node(lhs, ctx)?;
                let rhs = self.evaluate_node(rhs, ctx)?;
                apply_binary(*op, lhs, rhs)
            }
            Expr::Call { name, args } => self.evaluate_call(name, args, ctx),
            Expr::Deref { addr, width } => {
                let addr = self.evaluate_node(addr, ctx)?;
                read_memory(addr.value, *width, ctx)
            }
            Expr::Assign { target, value } => {
                let value = self.evaluate_node(value, ctx)?;
                self.assign(target, value, ctx)?;
                // The expression's value is the assigned value, marked
                // silent so front ends don't echo it.
                Ok(value.silenced())
            }
        }
    }

    /// Resolution order per [`Self::with_resolution_order`]; first match
    /// wins.
    fn resolve_identifier(&self, name: &str, ctx: &dyn DebugContext) -> Result<Value, EvalError> {
        for scope in &self.resolution {
            match scope {
                ResolveScope::Register => {
                    if let Some(value) = ctx.register(name) {
                        return Ok(Value::new(value));
                    }
                }
                ResolveScope::PseudoFunction => {
                    if let Some(entry) = self.registry.get(name) {
                        if entry.arity == 0 {
                            return (entry.handler)(&[], ctx);
                        }
                    }
                }
                ResolveScope::UserVariable => {
                    if let Some(value) = ctx.user_variable(name) {
                        return Ok(value);
                    }
                }
                ResolveScope::Symbol => {
                    if let Some(addr) = ctx.lookup_symbol(name) {
                        return Ok(Value::new(addr));
                    }
                }
                ResolveScope::ModuleBase => {
                    if let Some(module) = ctx.module_by_name(name) {
                        return Ok(Value::new(module.base));
                    }
                }
            }
        }
        Err(EvalError::UndefinedIdentifier(name.to_string()))
    }

    fn evaluate_call(
        &self,
        name: &str,
        args: &[Expr],
        ctx: &dyn DebugContext,
    ) -> Result<Value, EvalError> {
        // Lookup and arity check happen before any argument evaluates, so
        // an unknown name fails without argument side effects.
        let entry = self
            .registry
            .get(name)
            .ok_or_else(|| EvalError::UndefinedFunction(name.to_string()))?;
        if entry.arity != args.len() {
            return Err(EvalError::ArityMismatch {
                name: name.to_string(),
                expected: entry.arity,
                got: args.len(),
            });
        }
        let values = args
            .iter()
            .map(|arg| self.evaluate_node(arg, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        (entry.handler)(&values, ctx)
    }

    /// Assign to a register, user variable, or dereferenced memory location.
    fn assign(&self, target: &Expr, value: Value, ctx: &dyn DebugContext) -> Result<(), EvalError> {
        match target {
            Expr::Ident(name) => {
                if ctx.register(name).is_some() {
                    if !ctx.set_register(name, value.value) {
                        return Err(EvalError::NotAssignable(format!(
                            "register '{name}' is read-only"
                        )));
                    }
                    debug!(register = %name, value = format_args!("{:#x}", value.value), "register write");
                    return Ok(());
                }
                // Anything that is not a register becomes a user variable,
                // created on first assignment.
                ctx.set_user_variable(name, Value::new(value.value));
                Ok(())
            }
            Expr::Deref { addr, width } => {
                let addr = self.evaluate_node(addr, ctx)?.value;
                let bytes = value.value.to_le_bytes();
                if !ctx.write_memory(addr, &bytes[..width.bytes()]) {
                    return Err(EvalError::MemoryAccess {
                        address: addr,
                        kind: MemoryAccessKind::Write,
                    });
                }
                Ok(())
            }
            // The parser only builds Ident/Deref targets.
            _ => Err(EvalError::NotAssignable("target is not a register, variable or memory location".into())),
        }
    }
}

/// Apply a unary operator. Negation wraps modulo 2^64.
fn apply_unary(op: UnaryOp, value: Value) -> Value {
    let result = match op {
        UnaryOp::Negate => Value::new(value.value.wrapping_neg()),
        UnaryOp::BitNot => Value::new(!value.value),
        UnaryOp::Not => Value::from(!value.is_true()),
    };
    // Logical negation of an invalid value is well-defined (invalid is never
    // true); arithmetic on one is not.
    if !value.valid && op != UnaryOp::Not {
        Value { valid: false, ..result }
    } else {
        result
    }
}

/// Apply a non-short-circuiting binary operator with native machine-word
/// semantics: wrapping on overflow, x86-style masked shift counts.
fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    let (l, r) = (lhs.value, rhs.value);
    let result = match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                return Err(EvalError::DivisionByZero);
            }
            l / r
        }
        BinaryOp::Mod => {
            if r == 0 {
                return Err(EvalError::DivisionByZero);
            }
            l % r
        }
        BinaryOp::BitAnd => l & r,
        BinaryOp::BitOr => l | r,
        BinaryOp::BitXor => l ^ r,
        BinaryOp::Shl => l.wrapping_shl(r as u32),
        BinaryOp::Shr => l.wrapping_shr(r as u32),
        BinaryOp::Eq => (l == r) as Pointer,
        BinaryOp::Ne => (l != r) as Pointer,
        BinaryOp::Lt => (l < r) as Pointer,
        BinaryOp::Le => (l <= r) as Pointer,
        BinaryOp::Gt => (l > r) as Pointer,
        BinaryOp::Ge => (l >= r) as Pointer,
        // Short-circuiting operators are handled before operand evaluation.
        BinaryOp::And | BinaryOp::Or => unreachable!("handled in evaluate_node"),
    };
    // Once an operand is invalid the result stays invalid.
    Ok(Value { value: result, valid: lhs.valid && rhs.valid, silent: false })
}

/// Read `width` bytes at `addr` through the context, little-endian.
fn read_memory(addr: Pointer, width: MemWidth, ctx: &dyn DebugContext) -> Result<Value, EvalError> {
    let bytes = ctx
        .read_memory(addr, width.bytes())
        .ok_or(EvalError::MemoryAccess { address: addr, kind: MemoryAccessKind::Read })?;
    let mut raw = [0u8; 8];
    raw[..width.bytes()].copy_from_slice(&bytes);
    Ok(Value::new(Pointer::from_le_bytes(raw)))
}
