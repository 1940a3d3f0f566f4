//! Short-circuit rules applied by every combinator builder.
//!
//! One table of pure predicates over child states, so the empty-operand
//! propagation rules cannot drift between the AND, OR, and WEAK-AND build
//! sites.

use crate::executor::Executor;

/// An intersection matches nothing when it has no children or any child is
/// empty.
pub(crate) fn and_forced_empty(children: &[Box<dyn Executor>]) -> bool {
    children.is_empty() || children.iter().any(|c| c.is_empty())
}

/// A union matches nothing when every child is empty.
pub(crate) fn or_forced_empty(children: &[Box<dyn Executor>]) -> bool {
    children.iter().all(|c| c.is_empty())
}

/// A weak-and matches nothing when fewer than `min_should_match` children
/// can still match.
pub(crate) fn weak_and_forced_empty(total: usize, empty: usize, min_should_match: u32) -> bool {
    let k = min_should_match.max(1) as usize;
    total == 0 || k > total || empty > total - k
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::EmptyExecutor;

    fn empties(n: usize) -> Vec<Box<dyn Executor>> {
        (0..n)
            .map(|_| Box::new(EmptyExecutor::new()) as Box<dyn Executor>)
            .collect()
    }

    #[test]
    fn test_and_rule() {
        assert!(and_forced_empty(&[]));
        assert!(and_forced_empty(&empties(1)));
    }

    #[test]
    fn test_or_rule() {
        assert!(or_forced_empty(&empties(2)));
    }

    #[test]
    fn test_weak_and_rule() {
        // 3 children, 1 empty, k=2: two live children remain, can match
        assert!(!weak_and_forced_empty(3, 1, 2));
        // 3 children, 2 empty, k=2: only one live child remains
        assert!(weak_and_forced_empty(3, 2, 2));
        assert!(weak_and_forced_empty(0, 0, 1));
        assert!(weak_and_forced_empty(2, 0, 3));
    }
}
