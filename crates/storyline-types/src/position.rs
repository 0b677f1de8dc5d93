//! Positions in a chat's branching history.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A point in the chat tree: a message and the swipe variant shown for it.
///
/// Positions order by message first, then swipe. Only one swipe per message
/// is active at a time; which one is decided by the event store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export, export_to = "bindings/")]
pub struct BranchPosition {
    /// Zero-based index of the message in the chat.
    pub message_id: u32,
    /// Zero-based index of the swipe variant for that message.
    pub swipe_id: u32,
}

impl BranchPosition {
    /// Create a position.
    pub const fn new(message_id: u32, swipe_id: u32) -> Self {
        Self {
            message_id,
            swipe_id,
        }
    }

    /// The greatest position that still belongs to `message_id`.
    ///
    /// Used as an inclusive upper bound for range scans over a message.
    pub const fn end_of_message(message_id: u32) -> Self {
        Self {
            message_id,
            swipe_id: u32::MAX,
        }
    }
}

impl core::fmt::Display for BranchPosition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.message_id, self.swipe_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_message_then_swipe() {
        let mut positions = vec![
            BranchPosition::new(2, 0),
            BranchPosition::new(1, 3),
            BranchPosition::new(1, 0),
        ];
        positions.sort();
        assert_eq!(
            positions,
            vec![
                BranchPosition::new(1, 0),
                BranchPosition::new(1, 3),
                BranchPosition::new(2, 0),
            ]
        );
        assert!(BranchPosition::end_of_message(1) < BranchPosition::new(2, 0));
    }

    #[test]
    fn display_format() {
        assert_eq!(BranchPosition::new(4, 1).to_string(), "4:1");
    }
}
