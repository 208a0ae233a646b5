//! Process-wide default target.
//!
//! # Design Decisions
//! - Stored as an atomically swapped `Arc<ProxyTarget>` (arc-swap): readers
//!   never block and always see a whole target
//! - Validation happens before the swap; a bad input leaves state untouched
//! - Each request takes one snapshot and uses it for its whole lifetime

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::routing::{ProxyTarget, TargetError};

/// Holds the current default target.
#[derive(Debug, Default)]
pub struct ProxyState {
    current: ArcSwapOption<ProxyTarget>,
}

impl ProxyState {
    pub fn new(initial: Option<ProxyTarget>) -> Self {
        Self {
            current: ArcSwapOption::from(initial.map(Arc::new)),
        }
    }

    /// Snapshot of the current target.
    pub fn current(&self) -> Option<Arc<ProxyTarget>> {
        self.current.load_full()
    }

    /// Current target as text, empty when unset.
    pub fn describe(&self) -> String {
        self.current().map(|t| t.to_string()).unwrap_or_default()
    }

    /// Replace the current target, returning the previous one.
    pub fn set(&self, target: ProxyTarget) -> Option<Arc<ProxyTarget>> {
        self.current.swap(Some(Arc::new(target)))
    }

    /// Validate `input` and swap it in. State is unchanged on error.
    pub fn set_from_str(&self, input: Option<&str>) -> Result<Arc<ProxyTarget>, TargetError> {
        let target = Arc::new(ProxyTarget::parse(input.ok_or(TargetError::Missing)?)?);
        self.current.store(Some(target.clone()));
        Ok(target)
    }
}
