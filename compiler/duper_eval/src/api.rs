//! Entry points: factory compilation and one-shot duplication.
//!
//! `deep_dups` compiles a reusable deep-duplication procedure for a value;
//! `deep_dupe` is its one-shot form. `dups` / `dupe` are the shallow
//! counterparts. All four share one failure policy, configured through
//! [`Options`]: fail outright, warn and substitute the recursive one-shot
//! duplicator, or delegate to a caller-supplied handler.

use std::sync::Arc;

use duper_ir::{DupError, DupResult, Memo, Value};

use crate::builder::build_plan;
use crate::classify::{classify, Classified};
use crate::compile::{CodeBuilder, Procedure};
use crate::fallback::deep_clone;
use crate::shallow::{shallow_clone, shallow_factory};

/// Pluggable procedure factory, invoked when classification needs a plan.
pub type FactoryFn = Arc<dyn Fn(&Value) -> DupResult<Procedure> + Send + Sync>;

/// Caller-supplied failure recovery: `(source, alias table, factory, error)`.
/// The factory is the one that failed (or would have been used), so a
/// handler can retry it under its own terms.
pub type FailureHandler = Arc<
    dyn Fn(&Value, Option<&Memo>, &FactoryFn, &DupError) -> DupResult<Procedure> + Send + Sync,
>;

/// What to do when a procedure cannot be compiled.
#[derive(Clone, Default)]
pub enum OnFailure {
    /// Surface the error.
    #[default]
    Fail,
    /// Log a warning and substitute the recursive one-shot duplicator.
    WarnFallback,
    /// Delegate to a handler.
    Handler(FailureHandler),
}

/// Knobs for factory compilation.
#[derive(Clone)]
pub struct Options {
    factory: Option<FactoryFn>,
    on_failure: OnFailure,
    validate: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            factory: None,
            on_failure: OnFailure::Fail,
            validate: true,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Options::default()
    }

    /// Replace the plan pipeline with a custom procedure factory.
    pub fn with_factory(
        mut self,
        factory: impl Fn(&Value) -> DupResult<Procedure> + Send + Sync + 'static,
    ) -> Self {
        self.factory = Some(Arc::new(factory));
        self
    }

    pub fn on_failure(mut self, on_failure: OnFailure) -> Self {
        self.on_failure = on_failure;
        self
    }

    /// Sanity-invoke each compiled procedure once before handing it out.
    /// Enabled by default.
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }
}

/// The default factory: build a plan and compile it.
pub fn plan_factory(value: &Value) -> DupResult<Procedure> {
    let built = build_plan(value)?;
    CodeBuilder::new(&built.plan, &built.namespace).finish(built.root, procedure_name(value))
}

/// Compile a reusable deep-duplication procedure.
pub fn deep_dups(value: &Value) -> DupResult<Procedure> {
    deep_dups_with(value, &Options::default())
}

pub fn deep_dups_with(value: &Value, options: &Options) -> DupResult<Procedure> {
    if let Classified::Fast(procedure) = classify(value)? {
        return Ok(procedure);
    }
    let factory = deep_factory(options);
    match compile_checked(value, &factory, options) {
        Ok(procedure) => Ok(procedure),
        Err(error) => handle_failure(value, None, &factory, options, error),
    }
}

/// Produce one deep duplicate.
pub fn deep_dupe(value: &Value) -> DupResult<Value> {
    deep_dupe_with(value, None, &Options::default())
}

/// One-shot deep duplication with an optional caller-provided alias table.
///
/// The compiled pipeline cannot honor a pre-seeded alias table, so passing
/// one forces the failure path: under the default policy it is an error,
/// under `WarnFallback` the recursive duplicator runs seeded with the table.
pub fn deep_dupe_with(
    value: &Value,
    memo: Option<&Memo>,
    options: &Options,
) -> DupResult<Value> {
    if let Some(memo) = memo {
        let factory = deep_factory(options);
        let procedure =
            handle_failure(value, Some(memo), &factory, options, DupError::MemoUnsupported)?;
        return procedure.call();
    }
    deep_dups_with(value, options)?.call()
}

/// Compile a reusable shallow-duplication procedure.
pub fn dups(value: &Value) -> DupResult<Procedure> {
    dups_with(value, &Options::default())
}

pub fn dups_with(value: &Value, options: &Options) -> DupResult<Procedure> {
    let factory: FactoryFn = Arc::new(shallow_factory);
    match shallow_checked(value, options) {
        Ok(procedure) => Ok(procedure),
        Err(error) => match &options.on_failure {
            OnFailure::Fail => Err(error),
            OnFailure::WarnFallback => {
                warn_fallback(value, &error);
                let source = value.clone();
                Ok(Procedure::from_fn(procedure_name(value), move || {
                    shallow_clone(&source)
                }))
            }
            OnFailure::Handler(handler) => (handler.as_ref())(value, None, &factory, &error),
        },
    }
}

/// Produce one shallow duplicate.
pub fn dupe(value: &Value) -> DupResult<Value> {
    dupe_with(value, &Options::default())
}

pub fn dupe_with(value: &Value, options: &Options) -> DupResult<Value> {
    dups_with(value, options)?.call()
}

/// The factory deep compilation will use under the given options.
fn deep_factory(options: &Options) -> FactoryFn {
    match &options.factory {
        Some(factory) => Arc::clone(factory),
        None => Arc::new(plan_factory),
    }
}

fn compile_checked(value: &Value, factory: &FactoryFn, options: &Options) -> DupResult<Procedure> {
    let procedure = (factory.as_ref())(value)?;
    validate(&procedure, options)?;
    Ok(procedure)
}

fn shallow_checked(value: &Value, options: &Options) -> DupResult<Procedure> {
    let procedure = shallow_factory(value)?;
    validate(&procedure, options)?;
    Ok(procedure)
}

/// Sanity-invoke a freshly compiled procedure and discard the result.
fn validate(procedure: &Procedure, options: &Options) -> DupResult<()> {
    if !options.validate {
        return Ok(());
    }
    if let Err(cause) = procedure.call() {
        return Err(DupError::Validation {
            cause: Box::new(cause),
        });
    }
    Ok(())
}

fn handle_failure(
    value: &Value,
    memo: Option<&Memo>,
    factory: &FactoryFn,
    options: &Options,
    error: DupError,
) -> DupResult<Procedure> {
    match &options.on_failure {
        OnFailure::Fail => Err(error),
        OnFailure::WarnFallback => {
            warn_fallback(value, &error);
            Ok(fallback_procedure(value, memo))
        }
        OnFailure::Handler(handler) => (handler.as_ref())(value, memo, factory, &error),
    }
}

fn warn_fallback(value: &Value, error: &DupError) {
    tracing::warn!(
        target: "duper",
        type_name = %value.type_name(),
        %error,
        "compilation failed; substituting the one-shot duplicator"
    );
}

/// The substitute procedure: a fresh recursive duplication per call, seeded
/// with a clone of the caller's alias table when one was provided.
fn fallback_procedure(value: &Value, seed: Option<&Memo>) -> Procedure {
    let source = value.clone();
    let seed = seed.cloned();
    Procedure::from_fn(procedure_name(value), move || {
        let mut memo = seed.clone().unwrap_or_default();
        deep_clone(&source, &mut memo)
    })
}

fn procedure_name(value: &Value) -> String {
    format!("produce_{}", value.type_name())
}
