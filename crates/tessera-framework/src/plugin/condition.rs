//! Activation conditions.

use std::fmt;
use std::sync::Arc;

use tessera_core::BoxError;

use crate::module::ModuleArgs;

type Predicate = Arc<dyn Fn(&ModuleArgs) -> Result<bool, BoxError> + Send + Sync>;

/// A predicate over `(document, options, capabilities)` gating whether a
/// registry entry may load or run.
#[derive(Clone)]
pub struct Condition {
    predicate: Predicate,
}

impl Condition {
    /// Wraps an infallible predicate.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&ModuleArgs) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(move |args| Ok(f(args))),
        }
    }

    /// Wraps a predicate that may fail.  The registries treat a failure as
    /// `false`.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&ModuleArgs) -> Result<bool, BoxError> + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(f),
        }
    }

    pub fn evaluate(&self, args: &ModuleArgs) -> Result<bool, BoxError> {
        (self.predicate)(args)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}
