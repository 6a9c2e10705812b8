use crate::record::ChildRecord;

/// Represents the result of a generation run.
///
/// - [`GenerationOutcome::Ready`] carries the children for the parent, either
///   freshly generated or copied from the cache.
/// - [`GenerationOutcome::Cancelled`] means the caller's token fired before
///   the run finished. Nothing was cached.
///
/// Cancellation is an expected early exit, not an error, which is why it is
/// a variant here rather than an `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// The run completed (or hit the cache).
    Ready {
        /// Children in generation order.
        children: Vec<ChildRecord>,
    },
    /// The run was abandoned at item granularity.
    Cancelled {
        /// The last progress value this run published. Progress is left
        /// frozen at this value, so it must not be read as completion.
        progress: f64,
    },
}

impl GenerationOutcome {
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns the children if the run completed.
    pub fn into_children(self) -> Option<Vec<ChildRecord>> {
        match self {
            Self::Ready { children } => Some(children),
            Self::Cancelled { .. } => None,
        }
    }
}
