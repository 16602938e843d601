//! Bidirectional participant/order index.
//!
//! [`OrderIndex`] owns both directions of the mapping, so a participant and
//! its order value can only be inserted, moved, or removed together. An
//! insertion that would put two participants on the same order value is
//! rejected instead of overwriting the existing holder.

use std::collections::{BTreeMap, HashMap};

use zorder_core::OrderParticipantKey;

use crate::error::OrderError;

/// Participants keyed by order value, with a secondary index by participant.
#[derive(Debug, Default, Clone)]
pub struct OrderIndex {
    by_order: BTreeMap<i32, OrderParticipantKey>,
    by_key: HashMap<OrderParticipantKey, i32>,
}

impl OrderIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &OrderParticipantKey) -> Option<i32> {
        self.by_key.get(key).copied()
    }

    #[must_use]
    pub fn contains(&self, key: &OrderParticipantKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Participant currently holding `order`.
    #[must_use]
    pub fn key_at(&self, order: i32) -> Option<&OrderParticipantKey> {
        self.by_order.get(&order)
    }

    /// Lowest-ordered participant.
    #[must_use]
    pub fn first(&self) -> Option<(&OrderParticipantKey, i32)> {
        self.by_order.first_key_value().map(|(order, key)| (key, *order))
    }

    /// Highest-ordered participant.
    #[must_use]
    pub fn last(&self) -> Option<(&OrderParticipantKey, i32)> {
        self.by_order.last_key_value().map(|(order, key)| (key, *order))
    }

    /// All entries, ascending by order.
    pub fn iter(&self) -> impl Iterator<Item = (&OrderParticipantKey, i32)> {
        self.by_order.iter().map(|(order, key)| (key, *order))
    }

    /// Assigns `order` to a participant that has none.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::DuplicateParticipant`] if `key` already has an
    /// order, or [`OrderError::DuplicateOrder`] if another participant holds
    /// `order`. The index is unchanged in both cases.
    pub fn insert(&mut self, key: OrderParticipantKey, order: i32) -> Result<(), OrderError> {
        if self.by_key.contains_key(&key) {
            return Err(OrderError::DuplicateParticipant {
                id: key.id().to_string(),
            });
        }
        if let Some(existing) = self.by_order.get(&order) {
            return Err(OrderError::DuplicateOrder {
                order,
                existing: existing.id().to_string(),
                incoming: key.id().to_string(),
            });
        }
        self.by_order.insert(order, key.clone());
        self.by_key.insert(key, order);
        Ok(())
    }

    /// Removes a participant, returning the order it held.
    pub fn remove(&mut self, key: &OrderParticipantKey) -> Option<i32> {
        let order = self.by_key.remove(key)?;
        self.by_order.remove(&order);
        Some(order)
    }

    /// Moves `key` to `target`, shifting every participant between its old
    /// and new position by exactly one slot toward the vacated one.
    ///
    /// Returns the participants whose order changed (including `key`) with
    /// their new orders. Moving a participant onto its own order is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Unmanaged`] if `key` has no order.
    pub fn relocate(
        &mut self,
        key: &OrderParticipantKey,
        target: i32,
    ) -> Result<Vec<(OrderParticipantKey, i32)>, OrderError> {
        let Some(from) = self.remove(key) else {
            return Err(OrderError::Unmanaged {
                id: key.id().to_string(),
            });
        };
        if from == target {
            self.insert(key.clone(), from)?;
            return Ok(Vec::new());
        }

        let (span, delta) = if target > from {
            (from + 1..=target, -1)
        } else {
            (target..=from - 1, 1)
        };
        let shifted: Vec<(i32, OrderParticipantKey)> = self
            .by_order
            .range(span)
            .map(|(order, key)| (*order, key.clone()))
            .collect();
        for (order, _) in &shifted {
            self.by_order.remove(order);
        }

        let mut changes = Vec::with_capacity(shifted.len() + 1);
        for (order, shifted_key) in shifted {
            let new_order = order + delta;
            self.by_order.insert(new_order, shifted_key.clone());
            self.by_key.insert(shifted_key.clone(), new_order);
            changes.push((shifted_key, new_order));
        }
        self.insert(key.clone(), target)?;
        changes.push((key.clone(), target));
        Ok(changes)
    }

    /// Renumbers all participants to consecutive orders starting at `start`,
    /// preserving their relative order.
    ///
    /// Returns only the participants whose order actually changed.
    ///
    /// Numbering stops at `i32::MAX`; any entries left over keep their
    /// order if it is still free and are dropped otherwise. Managers never
    /// hold more participants than their range has slots, so with `start`
    /// at the range minimum every entry is renumbered.
    pub fn compress(&mut self, start: i32) -> Vec<(OrderParticipantKey, i32)> {
        let entries = std::mem::take(&mut self.by_order);
        let mut changes = Vec::new();
        let mut next = Some(start);
        for (order, key) in entries {
            let Some(slot) = next else {
                if self.by_order.contains_key(&order) {
                    self.by_key.remove(&key);
                } else {
                    self.by_order.insert(order, key);
                }
                continue;
            };
            if slot != order {
                self.by_key.insert(key.clone(), slot);
                changes.push((key.clone(), slot));
            }
            self.by_order.insert(slot, key);
            next = slot.checked_add(1);
        }
        changes
    }
}
