// core/src/workflow/pipeline.rs

//! The `Pipeline<TData>` definition, handler registration and the run loop.

use crate::error::{ShopError, ShopResult};
use crate::workflow::context_data::ContextData;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{event, info_span, Instrument, Level};

pub type Handler<TData> = Box<
  dyn Fn(ContextData<TData>) -> Pin<Box<dyn Future<Output = ShopResult<()>> + Send>>
    + Send
    + Sync,
>;

/// Evaluated before a step runs; `true` skips the step.
pub type SkipCondition<TData> = Arc<dyn Fn(ContextData<TData>) -> bool + Send + Sync + 'static>;

#[derive(Clone)]
pub struct StepDef<TData: 'static + Send + Sync> {
  pub name: String,
  pub skip_if: Option<SkipCondition<TData>>,
}

impl<TData: 'static + Send + Sync> std::fmt::Debug for StepDef<TData> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepDef")
      .field("name", &self.name)
      .field("skip_if_present", &self.skip_if.is_some())
      .finish()
  }
}

pub struct Pipeline<TData>
where
  TData: 'static + Send + Sync,
{
  name: &'static str,
  steps: Vec<StepDef<TData>>,
  on: HashMap<String, Vec<Handler<TData>>>,
}

impl<TData> std::fmt::Debug for Pipeline<TData>
where
  TData: 'static + Send + Sync,
{
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Pipeline")
      .field("name", &self.name)
      .field("steps", &self.steps)
      .finish()
  }
}

impl<TData> Pipeline<TData>
where
  TData: 'static + Send + Sync,
{
  /// Creates a pipeline from `(name, skip_if)` step definitions. Every step
  /// needs at least one handler before the pipeline runs.
  pub fn new(name: &'static str, step_defs: &[(&str, Option<SkipCondition<TData>>)]) -> Self {
    let steps = step_defs
      .iter()
      .map(|(step_name, skip_if)| StepDef {
        name: (*step_name).to_string(),
        skip_if: skip_if.clone(),
      })
      .collect();

    Self {
      name,
      steps,
      on: HashMap::new(),
    }
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  /// Registering against an undeclared step is a programming error caught at startup.
  fn ensure_step_exists(&self, step_name: &str) {
    if !self.steps.iter().any(|s| s.name == step_name) {
      panic!(
        "pipeline '{}' setup error: step '{}' is not declared",
        self.name, step_name
      );
    }
  }

  pub fn on_root<F>(&mut self, step_name: &str, handler_fn: impl Fn(ContextData<TData>) -> F + Send + Sync + 'static)
  where
    F: Future<Output = ShopResult<()>> + Send + 'static,
  {
    self.ensure_step_exists(step_name);
    let handler: Handler<TData> = Box::new(move |ctx_data| Box::pin(handler_fn(ctx_data)));
    self.on.entry(step_name.to_string()).or_default().push(handler);
  }

  /// Runs every step in order against `ctx_data`.
  ///
  /// The first handler error aborts the run and is returned unchanged.
  pub async fn run(&self, ctx_data: ContextData<TData>) -> ShopResult<()> {
    event!(Level::DEBUG, pipeline = self.name, "Pipeline execution starting.");

    for (step_idx, step_def) in self.steps.iter().enumerate() {
      let step_name = step_def.name.as_str();

      if let Some(skip_if) = &step_def.skip_if {
        if skip_if(ctx_data.clone()) {
          event!(Level::DEBUG, pipeline = self.name, step = step_name, "Step skipped.");
          continue;
        }
      }

      let Some(handlers) = self.on.get(step_name).filter(|v| !v.is_empty()) else {
        return Err(ShopError::Workflow {
          step_name: step_def.name.clone(),
          message: "step has no handlers".to_string(),
        });
      };

      let step_span = info_span!(
        "pipeline_step",
        pipeline = self.name,
        step_name = step_name,
        step_index = step_idx
      );

      async {
        for handler_fn in handlers {
          if let Err(e) = handler_fn(ctx_data.clone()).await {
            event!(Level::WARN, error = %e, "Step handler failed.");
            return Err(e);
          }
        }
        Ok(())
      }
      .instrument(step_span)
      .await?;
    }

    event!(Level::DEBUG, pipeline = self.name, "Pipeline execution completed.");
    Ok(())
  }
}
