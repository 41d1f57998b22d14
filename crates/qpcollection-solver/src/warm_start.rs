use qpcollection_types::QpDims;
use serde::{Deserialize, Serialize};

/// Warm-start state of an adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartState {
    /// No reusable previous solve
    Cold,
    /// Previous solve succeeded with the cached dimensions
    Warm,
}

/// Tracks the shape and outcome of the previous solve.
///
/// An adapter asks [`WarmStart::plan`] which path to take, then reports the
/// outcome through [`WarmStart::record`].
#[derive(Debug, Clone, Default)]
pub struct WarmStart {
    cached_dims: Option<QpDims>,
    last_succeeded: bool,
}

impl WarmStart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> StartState {
        if self.cached_dims.is_some() && self.last_succeeded {
            StartState::Warm
        } else {
            StartState::Cold
        }
    }

    /// Decide the start path for a problem of the given shape
    pub fn plan(&self, dims: QpDims, force_initialize: bool) -> StartState {
        if force_initialize || self.cached_dims != Some(dims) {
            return StartState::Cold;
        }
        self.state()
    }

    pub fn record(&mut self, dims: QpDims, succeeded: bool) {
        self.cached_dims = Some(dims);
        self.last_succeeded = succeeded;
    }

    pub fn cached_dims(&self) -> Option<QpDims> {
        self.cached_dims
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
