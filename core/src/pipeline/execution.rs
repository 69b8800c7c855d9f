// core/src/pipeline/execution.rs

//! `Pipeline::run`: executes steps in order against a shared context.

use crate::core::context::Handler;
use crate::core::context_data::ContextData;
use crate::core::control::{PipelineControl, PipelineResult};
use crate::error::FlowError;
use crate::pipeline::definition::Pipeline;
use tracing::{event, info_span, instrument, Instrument, Level};

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in order.
  ///
  /// For each step the skip condition is checked first, then the `before`,
  /// `on` and `after` handlers run in registration order. The first handler
  /// error aborts the run and is returned as is. A required step with no
  /// handlers at all fails with `FlowError::HandlerMissing`.
  #[instrument(
    name = "Pipeline::run",
    skip_all,
    fields(
      context_type = %std::any::type_name::<TData>(),
      num_steps = self.steps.len(),
    ),
    err(Display)
  )]
  pub async fn run(&self, ctx_data: ContextData<TData>) -> Result<PipelineResult, Err> {
    event!(Level::DEBUG, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx_data.clone()) {
          event!(Level::DEBUG, %step_name, "Step skipped by its skip condition.");
          continue;
        }
      }

      let before = self.before.get(step_name).map(Vec::as_slice).unwrap_or_default();
      let on = self.on.get(step_name).map(Vec::as_slice).unwrap_or_default();
      let after = self.after.get(step_name).map(Vec::as_slice).unwrap_or_default();

      if before.is_empty() && on.is_empty() && after.is_empty() {
        if step_def.optional {
          event!(Level::DEBUG, %step_name, "Optional step has no handlers, skipping.");
          continue;
        }
        event!(Level::ERROR, %step_name, "Required step has no handlers.");
        return Err(Err::from(FlowError::HandlerMissing {
          step_name: step_def.name.clone(),
        }));
      }

      let step_span = info_span!("pipeline_step", step_name, step_index = step_idx);
      let outcome = async {
        for (phase, handlers) in [("before", before), ("on", on), ("after", after)] {
          if run_phase(phase, handlers, &ctx_data).await? == PipelineControl::Stop {
            return Ok(PipelineControl::Stop);
          }
        }
        Ok::<_, Err>(PipelineControl::Continue)
      }
      .instrument(step_span)
      .await?;

      if outcome == PipelineControl::Stop {
        event!(Level::INFO, %step_name, "Pipeline stopped by handler.");
        return Ok(PipelineResult::Stopped);
      }
    }

    event!(Level::DEBUG, "Pipeline execution completed.");
    Ok(PipelineResult::Completed)
  }
}

async fn run_phase<TData, Err>(
  phase: &'static str,
  handlers: &[Handler<TData, Err>],
  ctx_data: &ContextData<TData>,
) -> Result<PipelineControl, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + Send + Sync + 'static,
{
  for handler in handlers {
    match handler(ctx_data.clone()).await {
      Ok(PipelineControl::Continue) => {}
      Ok(PipelineControl::Stop) => return Ok(PipelineControl::Stop),
      Err(e) => {
        event!(Level::WARN, phase, error = %e, "Handler failed.");
        return Err(e);
      }
    }
  }
  Ok(PipelineControl::Continue)
}
