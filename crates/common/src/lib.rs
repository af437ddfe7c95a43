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

//! NDB Common - Shared functionality for NDB components
//!
//! This crate provides the leaf types shared between the expression engine
//! and its front ends: the pointer-width runtime [`Value`](types::Value),
//! loaded-module records, view-selection enums, source-line records, and the
//! centralized logging setup.

/// Common types used throughout NDB, including the runtime value, module
/// records, and view-selection kinds
pub mod types;

/// Expression-string helpers shared by front ends
pub mod expression;
/// Logging setup and utilities for consistent logging across NDB components
pub mod logging;

pub use expression::*;
pub use types::*;
