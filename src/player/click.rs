use std::fmt;

use super::Callback;
use crate::timer::TimerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaiterId(pub(super) u64);

impl fmt::Display for WaiterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "waiter:{}", self.0)
    }
}

/// Who registered a click waiter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaiterOrigin {
    /// A message bubble; at most one is pending at a time.
    Popover,
    /// A named element, e.g. the compile button.
    Element,
}

/// A continuation released by a click on one of its selectors.
pub(super) struct ClickWaiter {
    pub id: WaiterId,
    pub selectors: Vec<String>,
    pub origin: WaiterOrigin,
    pub callback: Callback,
    /// Timeout that releases the waiter on its own.
    pub timer: Option<TimerId>,
}

impl ClickWaiter {
    pub fn new(id: WaiterId, selectors: &str, origin: WaiterOrigin, callback: Callback) -> Self {
        Self {
            id,
            selectors: selectors
                .split(',')
                .map(str::trim)
                .filter(|selector| !selector.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            origin,
            callback,
            timer: None,
        }
    }

    pub fn matches(&self, target: &str) -> bool {
        let target = target.trim();
        self.selectors.iter().any(|selector| selector == target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selectors_are_split_and_trimmed() {
        let waiter = ClickWaiter::new(
            WaiterId(0),
            ".codeplayer-compile, .tooltip ,",
            WaiterOrigin::Element,
            Box::new(|_| Ok(())),
        );
        assert_eq!(waiter.selectors, vec![".codeplayer-compile", ".tooltip"]);
        assert!(waiter.matches(" .tooltip"));
        assert!(!waiter.matches(".codeplayer-roadmap"));
    }
}
