//! Liveness tokens for objects that own instance handlers.
//!
//! A descriptor never keeps its owner alive. The owner holds an
//! [`InstanceToken`] and calls [`InstanceToken::dispose`] when it goes away;
//! the registry checks [`InstanceToken::is_alive`] lazily at dispatch time
//! and prunes handlers whose owner is gone.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use labext_core::types::InstanceId;

/// Shared liveness flag for one owning object.
#[derive(Debug, Clone)]
pub struct InstanceToken {
    id: InstanceId,
    disposed: Arc<AtomicBool>,
}

impl InstanceToken {
    /// Creates a token for a new live owner.
    pub fn new() -> Self {
        Self {
            id: InstanceId::new(),
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the owner's identifier.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Marks the owner as gone. Every clone observes the change.
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    /// Returns whether the owner is still alive.
    pub fn is_alive(&self) -> bool {
        !self.disposed.load(Ordering::Acquire)
    }

    /// Compares two optional owners. `None` only matches `None`.
    pub fn same_owner(a: Option<&InstanceToken>, b: Option<&InstanceToken>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(a), Some(b)) => a.id == b.id,
            _ => false,
        }
    }
}

impl Default for InstanceToken {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for InstanceToken {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for InstanceToken {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispose_is_shared() {
        let token = InstanceToken::new();
        let clone = token.clone();
        assert!(clone.is_alive());
        token.dispose();
        assert!(!clone.is_alive());
    }

    #[test]
    fn test_same_owner() {
        let a = InstanceToken::new();
        let b = InstanceToken::new();
        assert!(InstanceToken::same_owner(None, None));
        assert!(InstanceToken::same_owner(Some(&a), Some(&a.clone())));
        assert!(!InstanceToken::same_owner(Some(&a), Some(&b)));
        assert!(!InstanceToken::same_owner(Some(&a), None));
    }
}
