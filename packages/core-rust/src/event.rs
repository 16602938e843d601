//! Change notifications emitted by order managers.

use serde::{Deserialize, Serialize};

use crate::key::OrderParticipantKey;

/// What happened to the participants carried by an [`OrderChangeEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderChangeType {
    /// Participants became active.
    Activated,
    /// Participants became inactive but remain managed.
    Deactivated,
    /// Participants were assigned new order values.
    OrderChanged,
}

/// A batch of participant changes of a single [`OrderChangeType`].
///
/// Changes are kept sorted ascending by order value, so listeners can apply
/// them in compositing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderChangeEvent {
    change_type: OrderChangeType,
    changes: Vec<(OrderParticipantKey, i32)>,
}

impl OrderChangeEvent {
    #[must_use]
    pub fn new(change_type: OrderChangeType, mut changes: Vec<(OrderParticipantKey, i32)>) -> Self {
        changes.sort_by_key(|(_, order)| *order);
        Self {
            change_type,
            changes,
        }
    }

    #[must_use]
    pub fn change_type(&self) -> OrderChangeType {
        self.change_type
    }

    /// Participant/order pairs, ascending by order.
    #[must_use]
    pub fn changes(&self) -> &[(OrderParticipantKey, i32)] {
        &self.changes
    }

    /// The order carried for `key`, if the event mentions it.
    #[must_use]
    pub fn order_of(&self, key: &OrderParticipantKey) -> Option<i32> {
        self.changes
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, order)| *order)
    }

    pub fn keys(&self) -> impl Iterator<Item = &OrderParticipantKey> {
        self.changes.iter().map(|(key, _)| key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
