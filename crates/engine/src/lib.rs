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

//! NDB Engine - the expression and condition evaluation engine.
//!
//! This crate implements the expression sub-language embedded in NDB's
//! breakpoint conditions, watch panels, command arguments and logging
//! strings. Expressions reference CPU registers, debuggee memory, loaded
//! modules and view-selection state, all consumed through the
//! [`DebugContext`] contract so the engine never touches the OS directly.

pub mod context;
pub use context::*;

pub mod eval;
pub use eval::*;
