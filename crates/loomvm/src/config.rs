//! Resource limits: the ambient configuration layer bounding how much an
//! evaluation is allowed to consume before it fails with a resource error
//! rather than exhausting host memory or the Rust call stack.
//!
//! Grounded in the same shape as a pluggable resource-tracker policy: a
//! plain data struct of optional ceilings, checked at the handful of
//! points that can runaway (frame recursion, arena growth, data-stack
//! growth), rather than a pervasive accounting hook on every allocation.

#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    pub max_frame_depth: Option<usize>,
    pub max_guard_depth: Option<usize>,
    pub max_data_stack_depth: Option<usize>,
    pub max_arena_nodes: Option<usize>,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_frame_depth: Some(10_000),
            max_guard_depth: Some(100_000),
            max_data_stack_depth: Some(1_000_000),
            max_arena_nodes: None,
        }
    }
}

impl ResourceLimits {
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_frame_depth: None,
            max_guard_depth: None,
            max_data_stack_depth: None,
            max_arena_nodes: None,
        }
    }

    #[must_use]
    pub fn check_frame_depth(&self, depth: usize) -> Result<(), crate::error::EvalError> {
        match self.max_frame_depth {
            Some(limit) if depth > limit => Err(crate::error::EvalError::resource(format!(
                "frame recursion exceeded limit of {limit}"
            ))),
            _ => Ok(()),
        }
    }

    #[must_use]
    pub fn check_data_stack_depth(&self, depth: usize) -> Result<(), crate::error::EvalError> {
        match self.max_data_stack_depth {
            Some(limit) if depth > limit => Err(crate::error::EvalError::resource(format!(
                "data stack exceeded limit of {limit}"
            ))),
            _ => Ok(()),
        }
    }
}
