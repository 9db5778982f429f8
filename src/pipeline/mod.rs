// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mlpipe contributors

//! Pipeline definitions and types
//!
//! This module defines the declarative stage graph: stages, their inputs
//! and outputs, executor bindings, and named parameters.

mod builder;
mod dag;
mod definition;
mod params;
mod template;
mod validation;

pub use builder::PipelineBuilder;
pub use dag::DagBuilder;
pub use definition::*;
pub use params::{placeholders, ParameterBindings};
pub use template::standard_pipeline;
pub use validation::{PipelineValidator, ValidationResult, BUILTIN_PARAMETERS};
