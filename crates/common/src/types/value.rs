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

/// A pointer-width unsigned integer in the debuggee's address space.
///
/// The engine targets 64-bit debuggees; all expression arithmetic is modular
/// in 64 bits.
pub type Pointer = u64;

/// Width of a [`Pointer`] in bytes.
pub const POINTER_SIZE: usize = std::mem::size_of::<Pointer>();

/// The universal runtime value of the expression engine.
///
/// A `Value` is a pointer-width unsigned integer plus two flags:
///
/// - `valid` is cleared when an operation's result is undefined (for example
///   division by zero). Once invalid, a value stays invalid through further
///   operations unless a short-circuiting operator discards it.
/// - `silent` marks results that front ends must not echo, set on the result
///   of assignment expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Value {
    /// The raw pointer-width integer.
    pub value: Pointer,
    /// Whether the value is the result of a well-defined computation.
    pub valid: bool,
    /// Whether front ends should suppress printing this result.
    pub silent: bool,
}

impl Value {
    /// A valid, non-silent value.
    pub const fn new(value: Pointer) -> Self {
        Self { value, valid: true, silent: false }
    }

    /// An invalid value carrying `0`.
    pub const fn invalid() -> Self {
        Self { value: 0, valid: false, silent: false }
    }

    /// The same value with the silent flag set.
    pub const fn silenced(self) -> Self {
        Self { silent: true, ..self }
    }

    /// Whether the value is valid and non-zero.
    ///
    /// This is the truth test used by `&&`, `||`, `!` and breakpoint
    /// conditions: an invalid value is never true.
    pub const fn is_true(&self) -> bool {
        self.valid && self.value != 0
    }
}

impl From<Pointer> for Value {
    fn from(value: Pointer) -> Self {
        Self::new(value)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::new(b as Pointer)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            write!(f, "{:#x}", self.value)
        } else {
            write!(f, "???")
        }
    }
}
