// core/src/pipeline/definition.rs

//! The `Pipeline<TData, Err>` struct and its structural operations.

use crate::core::context::Handler;
use crate::core::step::{SkipCondition, StepDef};
use crate::error::{FlowError, FlowResult};
use std::collections::HashMap;
use tracing::{event, Level};

/// An ordered list of named steps with their handlers.
///
/// `Err` is the error type handlers return. It must be constructible from
/// `FlowError` so that engine failures (a required step without handlers,
/// for instance) come back through the same channel.
pub struct Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) steps: Vec<StepDef<TData>>,

  pub(crate) before: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) on: HashMap<String, Vec<Handler<TData, Err>>>,
  pub(crate) after: HashMap<String, Vec<Handler<TData, Err>>>,
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: 'static + Send + Sync,
  Err: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Creates a pipeline from `(name, optional, skip_if)` triples.
  ///
  /// Fails with `FlowError::DuplicateStep` if a name appears twice.
  pub fn new(step_defs: &[(&str, bool, Option<SkipCondition<TData>>)]) -> FlowResult<Self> {
    let mut pipeline = Self {
      steps: Vec::with_capacity(step_defs.len()),
      before: HashMap::new(),
      on: HashMap::new(),
      after: HashMap::new(),
    };

    for (name, optional, skip_if) in step_defs {
      pipeline.ensure_step_not_exists(name)?;
      pipeline.steps.push(StepDef {
        name: (*name).to_string(),
        optional: *optional,
        skip_if: skip_if.clone(),
      });
    }

    Ok(pipeline)
  }

  pub(crate) fn position_of(&self, step_name: &str) -> FlowResult<usize> {
    self
      .steps
      .iter()
      .position(|s| s.name == step_name)
      .ok_or_else(|| FlowError::StepNotFound {
        step_name: step_name.to_string(),
      })
  }

  fn ensure_step_not_exists(&self, step_name: &str) -> FlowResult<()> {
    if self.steps.iter().any(|s| s.name == step_name) {
      return Err(FlowError::DuplicateStep {
        step_name: step_name.to_string(),
      });
    }
    Ok(())
  }

  /// Step names in execution order.
  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn insert_before_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> FlowResult<()> {
    let idx = self.position_of(existing_step_name)?;
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name)?;
    self.steps.insert(idx, StepDef { name, optional, skip_if });
    Ok(())
  }

  pub fn insert_after_step<S: Into<String>>(
    &mut self,
    existing_step_name: &str,
    new_step_name: S,
    optional: bool,
    skip_if: Option<SkipCondition<TData>>,
  ) -> FlowResult<()> {
    let idx = self.position_of(existing_step_name)?;
    let name: String = new_step_name.into();
    self.ensure_step_not_exists(&name)?;
    self.steps.insert(idx + 1, StepDef { name, optional, skip_if });
    Ok(())
  }

  /// Removes a step together with all of its handlers.
  pub fn remove_step(&mut self, step_name: &str) -> FlowResult<()> {
    let idx = self.position_of(step_name)?;
    self.steps.remove(idx);
    self.before.remove(step_name);
    self.on.remove(step_name);
    self.after.remove(step_name);
    event!(Level::DEBUG, %step_name, "Step removed.");
    Ok(())
  }

  pub fn set_optional(&mut self, step_name: &str, optional: bool) -> FlowResult<()> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].optional = optional;
    Ok(())
  }

  pub fn set_skip_condition(&mut self, step_name: &str, skip_if: Option<SkipCondition<TData>>) -> FlowResult<()> {
    let idx = self.position_of(step_name)?;
    self.steps[idx].skip_if = skip_if;
    Ok(())
  }
}
