// core/src/lib.rs

//! Instashop Flow: a small async step-pipeline engine.
//!
//! A workflow is declared as a `Pipeline<TData, Err>`: an ordered list of
//! named steps, each with `before`, `on` and `after` handlers. Handlers share
//! the run's state through a `ContextData<TData>` and either let the run
//! continue or stop it early. Any handler error aborts the run and is
//! returned to the caller unchanged.
//!
//! Pipelines are registered in a `FlowRegistry`, keyed by the type of data
//! they operate on, so callers only need to build a context to run a flow.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod registry;

pub use crate::core::context::Handler;
pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{FlowError, FlowResult};

pub use crate::registry::FlowRegistry;
