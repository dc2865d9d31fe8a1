//! The stack of active lexer states.
//!
//! Array-backed; the bottom entry is always the root state and can never be removed. Depth is
//! capped so pathological input cannot grow the stack without bound.

use super::rule::StateId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateStack {
    states: Vec<StateId>,
    max_depth: usize,
}

impl StateStack {
    /// A stack holding only `root`. `max_depth` counts the root and is at least 1.
    pub fn new(root: StateId, max_depth: usize) -> Self {
        Self {
            states: vec![root],
            max_depth: max_depth.max(1),
        }
    }

    /// The state whose rules are currently eligible.
    pub fn top(&self) -> StateId {
        self.states[self.states.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.states.len()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Push `state`. Returns `false`, leaving the stack unchanged, when the stack is full.
    pub fn push(&mut self, state: StateId) -> bool {
        if self.states.len() >= self.max_depth {
            return false;
        }
        self.states.push(state);
        true
    }

    /// Pop up to `count` states, never the root.
    pub fn pop(&mut self, count: usize) {
        let keep = self.states.len().saturating_sub(count).max(1);
        self.states.truncate(keep);
    }

    /// Replace the top state. On a root-only stack the root stays and `state` is pushed, which
    /// can fail like [`push`](Self::push).
    pub fn switch(&mut self, state: StateId) -> bool {
        if self.states.len() == 1 {
            return self.push(state);
        }
        let last = self.states.len() - 1;
        self.states[last] = state;
        true
    }

    pub fn as_slice(&self) -> &[StateId] {
        &self.states
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_root() {
        let stack = StateStack::new(0, 8);
        assert_eq!(stack.top(), 0);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_pop_never_removes_root() {
        let mut stack = StateStack::new(0, 8);
        stack.push(3);
        stack.push(4);
        stack.pop(5);
        assert_eq!(stack.as_slice(), &[0]);
        stack.pop(1);
        assert_eq!(stack.as_slice(), &[0]);
    }

    #[test]
    fn test_switch_replaces_top() {
        let mut stack = StateStack::new(0, 8);
        assert!(stack.switch(2));
        assert_eq!(stack.as_slice(), &[0, 2]);
        assert!(stack.switch(5));
        assert_eq!(stack.as_slice(), &[0, 5]);
    }

    #[test]
    fn test_push_respects_max_depth() {
        let mut stack = StateStack::new(0, 3);
        assert!(stack.push(1));
        assert!(stack.push(2));
        assert!(!stack.push(3));
        assert_eq!(stack.as_slice(), &[0, 1, 2]);
    }

    #[test]
    fn test_zero_max_depth_still_holds_root() {
        let mut stack = StateStack::new(7, 0);
        assert_eq!(stack.max_depth(), 1);
        assert!(!stack.push(1));
        assert_eq!(stack.top(), 7);
    }
}
