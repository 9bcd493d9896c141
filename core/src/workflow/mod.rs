// core/src/workflow/mod.rs

//! A small step-pipeline engine for the storefront's multi-step flows.
//!
//! A pipeline is an ordered list of named steps, each with one or more
//! handlers operating on a shared [`ContextData`]. The first handler error
//! aborts the run.

pub mod context_data;
pub mod pipeline;

pub use context_data::ContextData;
pub use pipeline::{Handler, Pipeline, SkipCondition, StepDef};
