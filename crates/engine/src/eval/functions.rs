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

//! The built-in function registry.
//!
//! A closed, tagged dispatch table from function name to a typed handler
//! `(args, context) -> Value-or-error`, built once and immutable afterwards.
//! All built-ins are pure functions of their arguments and the context
//! snapshot; none retain state between calls.

use std::collections::HashMap;
use std::sync::Arc;

use itertools::Itertools;
use ndb_common::{ModuleParty, OsBlockKind, Pointer, Value, ViewKind, POINTER_SIZE};
use once_cell::sync::Lazy;

use super::error::{EvalError, MemoryAccessKind};
use crate::context::DebugContext;

/// Signature of a built-in function implementation.
pub type FunctionHandler =
    Box<dyn Fn(&[Value], &dyn DebugContext) -> Result<Value, EvalError> + Send + Sync>;

/// A registered built-in function.
pub struct FunctionEntry {
    /// Canonical (lowercase) name.
    pub name: String,
    /// Required argument count.
    pub arity: usize,
    /// The implementation.
    pub handler: FunctionHandler,
}

/// The function registry: case-insensitive exact-name lookup to a
/// [`FunctionEntry`].
///
/// Registration only exists at build time; after construction the registry is
/// shared immutably (see [`builtin_registry`]).
#[derive(Default)]
pub struct FunctionRegistry {
    entries: HashMap<String, FunctionEntry>,
}

impl FunctionRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry of all built-ins.
    pub fn with_builtins() -> Self {
        Self::new()
            .register("srcline", 1, |args, ctx| {
                let addr = arg_addr(args, 0, "srcline")?;
                Ok(Value::new(ctx.source_line(addr).map_or(0, |l| l.line)))
            })
            .register("srcdisp", 1, |args, ctx| {
                let addr = arg_addr(args, 0, "srcdisp")?;
                Ok(Value::new(ctx.source_line(addr).map_or(0, |l| l.displacement(addr))))
            })
            .register("modparty", 1, |args, ctx| {
                let addr = arg_addr(args, 0, "modparty")?;
                let party = ctx.module_at(addr).map_or(ModuleParty::Unknown, |m| m.party);
                Ok(Value::new(party as u8 as Pointer))
            })
            .register("modbase", 1, |args, ctx| {
                let addr = arg_addr(args, 0, "modbase")?;
                Ok(Value::new(ctx.module_at(addr).map_or(0, |m| m.base)))
            })
            .register("modsize", 1, |args, ctx| {
                let addr = arg_addr(args, 0, "modsize")?;
                Ok(Value::new(ctx.module_at(addr).map_or(0, |m| m.size)))
            })
            .register("disasmsel", 0, |_, ctx| Ok(Value::new(ctx.selection(ViewKind::Disasm))))
            .register("dumpsel", 0, |_, ctx| Ok(Value::new(ctx.selection(ViewKind::Dump))))
            .register("stacksel", 0, |_, ctx| Ok(Value::new(ctx.selection(ViewKind::Stack))))
            .register("peb", 0, |_, ctx| Ok(Value::new(ctx.os_block(OsBlockKind::Peb))))
            .register("teb", 0, |_, ctx| Ok(Value::new(ctx.os_block(OsBlockKind::Teb))))
            .register("bswap", 1, |args, _| {
                let value = arg_addr(args, 0, "bswap")?;
                Ok(Value::new(value.swap_bytes()))
            })
            .register("readbyte", 1, |args, ctx| read_sized(args, ctx, "readbyte", 1))
            .register("readword", 1, |args, ctx| read_sized(args, ctx, "readword", 2))
            .register("readdword", 1, |args, ctx| read_sized(args, ctx, "readdword", 4))
            .register("readqword", 1, |args, ctx| read_sized(args, ctx, "readqword", 8))
            .register("readptr", 1, |args, ctx| read_sized(args, ctx, "readptr", POINTER_SIZE))
    }

    /// Register a function under a case-insensitive name. Build-time only.
    pub fn register<F>(mut self, name: &str, arity: usize, handler: F) -> Self
    where
        F: Fn(&[Value], &dyn DebugContext) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        let name = name.to_ascii_lowercase();
        self.entries.insert(
            name.clone(),
            FunctionEntry { name, arity, handler: Box::new(handler) },
        );
        self
    }

    /// Look up a function by name, case-insensitively.
    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries.get(&name.to_ascii_lowercase())
    }

    /// All registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).sorted_unstable().collect()
    }
}

/// The shared built-in registry, constructed on first use.
pub fn builtin_registry() -> Arc<FunctionRegistry> {
    static BUILTINS: Lazy<Arc<FunctionRegistry>> =
        Lazy::new(|| Arc::new(FunctionRegistry::with_builtins()));
    Arc::clone(&BUILTINS)
}

/// Extract argument `index` as an address/value, rejecting invalid values.
fn arg_addr(args: &[Value], index: usize, name: &str) -> Result<Pointer, EvalError> {
    let arg = args[index];
    if !arg.valid {
        return Err(EvalError::TypeMismatch(format!(
            "argument {} of '{name}' is not a valid value",
            index + 1
        )));
    }
    Ok(arg.value)
}

fn read_sized(
    args: &[Value],
    ctx: &dyn DebugContext,
    name: &str,
    width: usize,
) -> Result<Value, EvalError> {
    let addr = arg_addr(args, 0, name)?;
    let bytes = ctx
        .read_memory(addr, width)
        .ok_or(EvalError::MemoryAccess { address: addr, kind: MemoryAccessKind::Read })?;
    let mut raw = [0u8; 8];
    raw[..width].copy_from_slice(&bytes);
    Ok(Value::new(Pointer::from_le_bytes(raw)))
}
