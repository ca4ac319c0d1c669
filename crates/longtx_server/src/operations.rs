//! Retained asynchronous operations.

use longtx_protocol::Operation;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use uuid::Uuid;

/// Prefix of asynchronous operation ids.
pub const OPERATION_ID_PREFIX: &str = "ydb://operation/longtx/";

#[derive(Debug, Default)]
struct Inner {
    operations: HashMap<String, Operation>,
    order: VecDeque<String>,
}

/// Finished operations awaiting `GetOperation` polls.
///
/// Holds at most `capacity` operations; the oldest are dropped first.
#[derive(Debug)]
pub struct OperationRegistry {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl OperationRegistry {
    /// Creates a registry holding at most `capacity` operations.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capacity,
        }
    }

    /// Stores a finished operation and returns its new id.
    pub fn retain(&self, mut operation: Operation) -> String {
        let id = format!("{OPERATION_ID_PREFIX}{}", Uuid::new_v4().simple());
        operation.id = id.clone();

        let mut inner = self.inner.lock();
        inner.operations.insert(id.clone(), operation);
        inner.order.push_back(id.clone());
        while inner.order.len() > self.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.operations.remove(&oldest);
            }
        }
        id
    }

    /// Returns a retained operation.
    pub fn get(&self, id: &str) -> Option<Operation> {
        self.inner.lock().operations.get(id).cloned()
    }

    /// Drops a retained operation. Returns false if it was unknown.
    pub fn forget(&self, id: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.operations.remove(id).is_none() {
            return false;
        }
        inner.order.retain(|known| known != id);
        true
    }

    /// Returns the number of retained operations.
    pub fn len(&self) -> usize {
        self.inner.lock().operations.len()
    }

    /// Returns true if no operations are retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use longtx_protocol::StatusCode;

    #[test]
    fn retain_assigns_id() {
        let registry = OperationRegistry::new(10);
        let id = registry.retain(Operation::failure(StatusCode::NotFound, vec![]));

        assert!(id.starts_with(OPERATION_ID_PREFIX));
        let op = registry.get(&id).unwrap();
        assert_eq!(op.id, id);
        assert!(op.ready);
    }

    #[test]
    fn forget_removes() {
        let registry = OperationRegistry::new(10);
        let id = registry.retain(Operation::failure(StatusCode::NotFound, vec![]));

        assert!(registry.forget(&id));
        assert!(!registry.forget(&id));
        assert!(registry.get(&id).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn capacity_drops_oldest() {
        let registry = OperationRegistry::new(2);
        let first = registry.retain(Operation::default());
        let second = registry.retain(Operation::default());
        let third = registry.retain(Operation::default());

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&first).is_none());
        assert!(registry.get(&second).is_some());
        assert!(registry.get(&third).is_some());
    }
}
