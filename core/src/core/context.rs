// core/src/core/context.rs

//! The boxed handler type stored by pipelines.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineControl;
use std::future::Future;
use std::pin::Pin;

/// A pipeline step handler.
///
/// A handler receives its own clone of the run's `ContextData<TData>` and
/// resolves to `Ok(PipelineControl)` or the pipeline's error type.
///
/// Handlers must drop every lock guard taken on the context before the next
/// `.await`. The guards are blocking `parking_lot` guards.
pub type Handler<TData, Err> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = Result<PipelineControl, Err>> + Send>>
    + Send
    + Sync,
>;
