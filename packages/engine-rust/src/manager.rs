//! Order manager: dense integer z-orders for one `(family, category)` domain.
//!
//! An [`OrderManager`] assigns each participant a unique order value inside
//! its category's range, tracks which participants are active, and supports
//! atomic reordering. Every state access happens under one manager-wide
//! mutex; change events are queued to the manager's [`ChangeNotifier`] while
//! the lock is held, so listeners see them in mutation order.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, warn};
use zorder_core::{
    OrderCategory, OrderChangeEvent, OrderChangeType, OrderManagerConfig, OrderParticipantKey,
    ParticipantOrder,
};

use crate::error::OrderError;
use crate::index::OrderIndex;
use crate::listener::{ListenerId, OrderChangeListener};
use crate::notifier::ChangeNotifier;
use crate::registry::RegistryShared;

/// Where a participant lands relative to its reference participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    /// Immediately greater order than the reference.
    Above,
    /// Immediately smaller order than the reference.
    Below,
}

#[derive(Debug, Default)]
struct ManagerState {
    index: OrderIndex,
    active: HashSet<OrderParticipantKey>,
}

/// Assigns and maintains order values for the participants of one category
/// within one family.
///
/// Misuse (unknown participants, a full category) never panics: it is
/// logged and returned as an [`OrderError`].
pub struct OrderManager {
    family: String,
    category: OrderCategory,
    state: Mutex<ManagerState>,
    notifier: ChangeNotifier,
    owner: Option<Weak<RegistryShared>>,
}

impl fmt::Debug for OrderManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("OrderManager")
            .field("family", &self.family)
            .field("category", &self.category)
            .field("participants", &state.index.len())
            .field("active", &state.active.len())
            .finish_non_exhaustive()
    }
}

impl OrderManager {
    /// Creates an empty manager with no persistence.
    #[must_use]
    pub fn new(family: impl Into<String>, category: OrderCategory) -> Self {
        Self::build(family.into(), category, OrderIndex::new(), None)
    }

    /// Creates a manager with no persistence, hydrated from `config`.
    ///
    /// See [`OrderManagerRegistry`](crate::OrderManagerRegistry) for how
    /// inconsistent records are repaired or discarded.
    #[must_use]
    pub fn from_config(config: &OrderManagerConfig) -> Self {
        Self::hydrated(&config.family, config.category.clone(), &config.participants, None)
    }

    pub(crate) fn hydrated(
        family: &str,
        category: OrderCategory,
        participants: &[ParticipantOrder],
        owner: Option<Weak<RegistryShared>>,
    ) -> Self {
        let index = hydrate_index(family, &category, participants);
        Self::build(family.to_string(), category, index, owner)
    }

    fn build(
        family: String,
        category: OrderCategory,
        index: OrderIndex,
        owner: Option<Weak<RegistryShared>>,
    ) -> Self {
        let notifier = ChangeNotifier::start(&format!("{family}::{}", category.id()));
        Self {
            family,
            category,
            state: Mutex::new(ManagerState {
                index,
                active: HashSet::new(),
            }),
            notifier,
            owner,
        }
    }

    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    #[must_use]
    pub fn category(&self) -> &OrderCategory {
        &self.category
    }

    /// Number of managed participants, active or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().index.is_empty()
    }

    // -----------------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------------

    /// Subscribes `listener` to this manager's change events.
    ///
    /// The listener stays subscribed until [`remove_listener`](Self::remove_listener).
    pub fn add_listener(&self, listener: Arc<dyn OrderChangeListener>) -> ListenerId {
        self.notifier.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.notifier.remove_listener(id)
    }

    /// Blocks until all change events emitted so far have been delivered.
    ///
    /// Returns `false` if called from a listener or if delivery is unavailable.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn flush_notifications(&self) -> bool {
        self.notifier.flush()
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Assigns an order to `key`, or returns its existing order.
    ///
    /// The first participant receives the range minimum; later ones receive
    /// one more than the highest order in use.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::CapacityExhausted`] if every order in the range is taken.
    pub fn add_participant(&self, key: &OrderParticipantKey) -> Result<i32, OrderError> {
        let mut state = self.state.lock();
        let (order, added) = self.add_locked(&mut state, key)?;
        if added {
            self.persist(&state);
        }
        Ok(order)
    }

    /// Adds `key` if needed and marks it active.
    ///
    /// Emits [`OrderChangeType::Activated`] only if `key` was not already active.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::CapacityExhausted`] if `key` is new and the range is full.
    pub fn activate_participant(&self, key: &OrderParticipantKey) -> Result<i32, OrderError> {
        let mut state = self.state.lock();
        let (order, added) = self.add_locked(&mut state, key)?;
        if added {
            self.persist(&state);
        }
        if state.active.insert(key.clone()) {
            self.emit(OrderChangeType::Activated, vec![(key.clone(), order)]);
        }
        Ok(order)
    }

    /// Batch form of [`activate_participant`](Self::activate_participant).
    ///
    /// Emits one event for the participants whose active state changed and
    /// returns those participants with their orders. Participants that could
    /// not be added are logged and skipped.
    pub fn activate_participants(
        &self,
        keys: &[OrderParticipantKey],
    ) -> Vec<(OrderParticipantKey, i32)> {
        let mut state = self.state.lock();
        let mut activated = Vec::new();
        let mut added_any = false;
        for key in keys {
            let Ok((_, added)) = self.add_locked(&mut state, key) else {
                continue;
            };
            added_any |= added;
            if state.active.insert(key.clone()) {
                activated.push(key.clone());
            }
        }
        if added_any {
            self.persist(&state);
        }
        // An add may have compressed the range, so read orders after the loop.
        let changed: Vec<(OrderParticipantKey, i32)> = activated
            .into_iter()
            .filter_map(|key| state.index.get(&key).map(|order| (key, order)))
            .collect();
        self.emit(OrderChangeType::Activated, changed.clone());
        changed
    }

    /// Marks `key` inactive while keeping its order.
    ///
    /// Emits [`OrderChangeType::Deactivated`] only if `key` was active.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Unmanaged`] if `key` has no order.
    pub fn deactivate_participant(&self, key: &OrderParticipantKey) -> Result<i32, OrderError> {
        let mut state = self.state.lock();
        let Some(order) = state.index.get(key) else {
            warn!(family = %self.family, category = %self.category.id(),
                participant = %key.id(), "cannot deactivate unmanaged participant");
            return Err(unmanaged(key));
        };
        if state.active.remove(key) {
            self.emit(OrderChangeType::Deactivated, vec![(key.clone(), order)]);
        }
        Ok(order)
    }

    /// Batch form of [`deactivate_participant`](Self::deactivate_participant).
    ///
    /// Unmanaged participants are logged and skipped. Returns the
    /// participants whose active state changed.
    pub fn deactivate_participants(
        &self,
        keys: &[OrderParticipantKey],
    ) -> Vec<(OrderParticipantKey, i32)> {
        let mut state = self.state.lock();
        let mut changed = Vec::new();
        for key in keys {
            let Some(order) = state.index.get(key) else {
                warn!(family = %self.family, category = %self.category.id(),
                    participant = %key.id(), "cannot deactivate unmanaged participant");
                continue;
            };
            if state.active.remove(key) {
                changed.push((key.clone(), order));
            }
        }
        self.emit(OrderChangeType::Deactivated, changed.clone());
        changed
    }

    /// Forgets `key` entirely and closes the gap it leaves.
    ///
    /// Returns the order `key` held before removal.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Unmanaged`] if `key` has no order.
    pub fn expunge_participant(&self, key: &OrderParticipantKey) -> Result<i32, OrderError> {
        let mut state = self.state.lock();
        let Some(order) = state.index.get(key) else {
            error!(family = %self.family, category = %self.category.id(),
                participant = %key.id(), "cannot expunge unmanaged participant");
            return Err(unmanaged(key));
        };
        if state.active.remove(key) {
            self.emit(OrderChangeType::Deactivated, vec![(key.clone(), order)]);
        }
        state.index.remove(key);
        self.compress_locked(&mut state);
        self.persist(&state);
        Ok(order)
    }

    /// Batch form of [`expunge_participant`](Self::expunge_participant).
    ///
    /// Unmanaged participants are skipped silently. Returns the removed
    /// participants with the orders they held.
    pub fn expunge_participants(
        &self,
        keys: &[OrderParticipantKey],
    ) -> Vec<(OrderParticipantKey, i32)> {
        let mut state = self.state.lock();
        let mut deactivated = Vec::new();
        let mut removed = Vec::new();
        for key in keys {
            let Some(order) = state.index.remove(key) else {
                continue;
            };
            if state.active.remove(key) {
                deactivated.push((key.clone(), order));
            }
            removed.push((key.clone(), order));
        }
        self.emit(OrderChangeType::Deactivated, deactivated);
        if !removed.is_empty() {
            self.compress_locked(&mut state);
            self.persist(&state);
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Reordering
    // -----------------------------------------------------------------------

    /// Places `participant` directly above `reference`: its order becomes
    /// the reference's order plus one.
    ///
    /// Participants between the old and new position shift by one slot.
    /// Moving a participant relative to itself, or into the position it
    /// already holds, returns its current order unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Unmanaged`] if either participant has no order.
    pub fn move_above(
        &self,
        participant: &OrderParticipantKey,
        reference: &OrderParticipantKey,
    ) -> Result<i32, OrderError> {
        let mut state = self.state.lock();
        self.move_locked(&mut state, participant, reference, Placement::Above)
    }

    /// Places `participant` directly below `reference`: its order becomes
    /// the reference's order minus one.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Unmanaged`] if either participant has no order.
    pub fn move_below(
        &self,
        participant: &OrderParticipantKey,
        reference: &OrderParticipantKey,
    ) -> Result<i32, OrderError> {
        let mut state = self.state.lock();
        self.move_locked(&mut state, participant, reference, Placement::Below)
    }

    /// Moves `participant` above the current highest-ordered participant.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Unmanaged`] if `participant` has no order.
    pub fn move_to_top(&self, participant: &OrderParticipantKey) -> Result<i32, OrderError> {
        let mut state = self.state.lock();
        let top = state.index.last().map(|(key, _)| key.clone());
        self.move_to_extreme(&mut state, participant, top, Placement::Above)
    }

    /// Moves `participant` below the current lowest-ordered participant.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Unmanaged`] if `participant` has no order.
    pub fn move_to_bottom(&self, participant: &OrderParticipantKey) -> Result<i32, OrderError> {
        let mut state = self.state.lock();
        let bottom = state.index.first().map(|(key, _)| key.clone());
        self.move_to_extreme(&mut state, participant, bottom, Placement::Below)
    }

    /// Renumbers all participants to consecutive orders from the range
    /// minimum, preserving relative order.
    ///
    /// Returns how many participants were renumbered; nothing is emitted or
    /// persisted when that is zero.
    pub fn compress_orders(&self) -> usize {
        let mut state = self.state.lock();
        let renumbered = self.compress_locked(&mut state);
        if renumbered > 0 {
            self.persist(&state);
        }
        renumbered
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Active participants, ascending by order (compositing order).
    #[must_use]
    pub fn get_active_participants(&self) -> Vec<OrderParticipantKey> {
        let state = self.state.lock();
        let mut active: Vec<(i32, OrderParticipantKey)> = state
            .active
            .iter()
            .filter_map(|key| state.index.get(key).map(|order| (order, key.clone())))
            .collect();
        active.sort_by_key(|(order, _)| *order);
        active.into_iter().map(|(_, key)| key).collect()
    }

    /// All managed participants with their orders, ascending.
    #[must_use]
    pub fn participant_orders(&self) -> Vec<(OrderParticipantKey, i32)> {
        let state = self.state.lock();
        state.index.iter().map(|(key, order)| (key.clone(), order)).collect()
    }

    /// # Errors
    ///
    /// Returns [`OrderError::Unmanaged`] if `key` has no order.
    pub fn get_order(&self, key: &OrderParticipantKey) -> Result<i32, OrderError> {
        let state = self.state.lock();
        state.index.get(key).ok_or_else(|| {
            debug!(family = %self.family, category = %self.category.id(),
                participant = %key.id(), "order requested for unmanaged participant");
            unmanaged(key)
        })
    }

    #[must_use]
    pub fn is_managed(&self, key: &OrderParticipantKey) -> bool {
        self.state.lock().index.contains(key)
    }

    #[must_use]
    pub fn is_active(&self, key: &OrderParticipantKey) -> bool {
        self.state.lock().active.contains(key)
    }

    /// Whether any active participant has the given id.
    #[must_use]
    pub fn has_active_participant(&self, id: &str) -> bool {
        self.state.lock().active.iter().any(|key| key.id() == id)
    }

    /// Snapshot of the durable state as a persistable record.
    #[must_use]
    pub fn to_config(&self) -> OrderManagerConfig {
        let state = self.state.lock();
        self.config_from(&state)
    }

    /// Runs `write` with a fresh snapshot while holding the manager lock, so
    /// concurrent persists cannot land out of order.
    pub(crate) fn persist_with(&self, write: impl FnOnce(&OrderManagerConfig)) {
        let state = self.state.lock();
        write(&self.config_from(&state));
    }

    // -----------------------------------------------------------------------
    // Internals (caller holds the state lock)
    // -----------------------------------------------------------------------

    fn add_locked(
        &self,
        state: &mut ManagerState,
        key: &OrderParticipantKey,
    ) -> Result<(i32, bool), OrderError> {
        if let Some(order) = state.index.get(key) {
            return Ok((order, false));
        }
        if !key.belongs_to(&self.family, &self.category) {
            warn!(family = %self.family, category = %self.category.id(),
                participant = %key, "participant key names a different ordering domain");
        }

        let capacity = self.category.capacity();
        if state.index.len() >= capacity {
            error!(family = %self.family, category = %self.category.id(),
                participant = %key.id(), capacity, "order range exhausted, cannot add participant");
            return Err(OrderError::CapacityExhausted {
                category: self.category.id().to_string(),
                capacity,
            });
        }

        let order = match self.next_order(&state.index) {
            Some(order) => order,
            None => {
                // Gaps pushed the highest order to the end of the range.
                self.compress_locked(state);
                self.next_order(&state.index).unwrap_or(self.category.min())
            }
        };
        state.index.insert(key.clone(), order).map_err(|err| {
            error!(family = %self.family, category = %self.category.id(),
                error = %err, "order index rejected new participant");
            err
        })?;
        debug!(family = %self.family, category = %self.category.id(),
            participant = %key.id(), order, "participant added");
        Ok((order, true))
    }

    fn next_order(&self, index: &OrderIndex) -> Option<i32> {
        match index.last() {
            None => Some(self.category.min()),
            Some((_, highest)) => highest
                .checked_add(1)
                .filter(|next| *next <= self.category.max()),
        }
    }

    fn move_to_extreme(
        &self,
        state: &mut ManagerState,
        participant: &OrderParticipantKey,
        extreme: Option<OrderParticipantKey>,
        placement: Placement,
    ) -> Result<i32, OrderError> {
        match extreme {
            Some(extreme) if extreme != *participant => {
                self.move_locked(state, participant, &extreme, placement)
            }
            _ => state.index.get(participant).ok_or_else(|| {
                error!(family = %self.family, category = %self.category.id(),
                    participant = %participant.id(), "cannot move unmanaged participant");
                unmanaged(participant)
            }),
        }
    }

    fn move_locked(
        &self,
        state: &mut ManagerState,
        participant: &OrderParticipantKey,
        reference: &OrderParticipantKey,
        placement: Placement,
    ) -> Result<i32, OrderError> {
        let Some(from) = state.index.get(participant) else {
            error!(family = %self.family, category = %self.category.id(),
                participant = %participant.id(), "cannot move unmanaged participant");
            return Err(unmanaged(participant));
        };
        let Some(anchor) = state.index.get(reference) else {
            error!(family = %self.family, category = %self.category.id(),
                reference = %reference.id(), "cannot move relative to unmanaged participant");
            return Err(unmanaged(reference));
        };
        if participant == reference {
            warn!(family = %self.family, category = %self.category.id(),
                participant = %participant.id(), "participant cannot be moved relative to itself");
            return Ok(from);
        }

        let target = match placement {
            Placement::Above if from < anchor => anchor,
            Placement::Above => anchor + 1,
            Placement::Below if from > anchor => anchor,
            Placement::Below => anchor - 1,
        };
        if target == from {
            return Ok(from);
        }

        let changes = state.index.relocate(participant, target)?;
        debug!(family = %self.family, category = %self.category.id(),
            participant = %participant.id(), from, to = target, shifted = changes.len() - 1,
            "participant moved");
        self.emit(OrderChangeType::OrderChanged, changes);
        self.persist(state);
        Ok(target)
    }

    fn compress_locked(&self, state: &mut ManagerState) -> usize {
        let changes = state.index.compress(self.category.min());
        let renumbered = changes.len();
        self.emit(OrderChangeType::OrderChanged, changes);
        renumbered
    }

    fn emit(&self, change_type: OrderChangeType, changes: Vec<(OrderParticipantKey, i32)>) {
        if !changes.is_empty() {
            self.notifier.dispatch(OrderChangeEvent::new(change_type, changes));
        }
    }

    fn persist(&self, state: &ManagerState) {
        if let Some(owner) = self.owner.as_ref().and_then(Weak::upgrade) {
            owner.save_config(&self.config_from(state));
        }
    }

    fn config_from(&self, state: &ManagerState) -> OrderManagerConfig {
        let participants = state
            .index
            .iter()
            .map(|(key, order)| ParticipantOrder {
                id: key.id().to_string(),
                order,
            })
            .collect();
        OrderManagerConfig::new(self.family.clone(), self.category.clone(), participants)
    }
}

fn unmanaged(key: &OrderParticipantKey) -> OrderError {
    OrderError::Unmanaged {
        id: key.id().to_string(),
    }
}

/// Rebuilds an index from persisted entries.
///
/// More entries than the range holds discards the record. A repeated order
/// drops the later entry. Entries outside the range are renumbered from the
/// range minimum, keeping their relative order.
fn hydrate_index(
    family: &str,
    category: &OrderCategory,
    participants: &[ParticipantOrder],
) -> OrderIndex {
    let mut index = OrderIndex::new();
    if participants.len() > category.capacity() {
        warn!(family, category = %category.id(), persisted = participants.len(),
            capacity = category.capacity(), "persisted orders exceed category range, discarding");
        return index;
    }

    let mut sorted = participants.to_vec();
    sorted.sort_by_key(|entry| entry.order);
    let mut out_of_range = false;
    for entry in sorted {
        out_of_range |= !category.contains(entry.order);
        let key = OrderParticipantKey::new(family, category.clone(), entry.id);
        if let Err(err) = index.insert(key, entry.order) {
            error!(family, category = %category.id(), error = %err,
                "dropping inconsistent persisted participant");
        }
    }
    if out_of_range {
        warn!(family, category = %category.id(),
            "persisted orders fall outside category range, renumbering");
        index.compress(category.min());
    }
    index
}
