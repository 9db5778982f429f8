// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Utility modules
//!
//! Terminal helpers for the mlpipe CLI.

pub mod spinner;

pub use spinner::*;
