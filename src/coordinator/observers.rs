//! Observer registry and the event queue used to fan events out.

use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use super::events::PlayerEvent;

/// A surface that mirrors coordinator state.
///
/// Callbacks run on the coordinator's thread, one event at a time. An
/// observer may call coordinator operations from inside `on_event`; the
/// events those produce are queued and delivered after the current one.
pub trait PlayerObserver {
    fn on_event(&self, event: &PlayerEvent);
}

/// Handle returned by registration, used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(super) u64);

/// Registered observers in registration order.
///
/// Entries are held weakly: a surface that was dropped without deregistering
/// is skipped and pruned on the next fan-out.
#[derive(Default)]
pub(super) struct ObserverRegistry {
    entries: Vec<(ObserverId, Weak<dyn PlayerObserver>)>,
}

impl ObserverRegistry {
    pub(super) fn insert(&mut self, id: ObserverId, observer: Weak<dyn PlayerObserver>) {
        if !self.entries.iter().any(|(existing, _)| *existing == id) {
            self.entries.push((id, observer));
        }
    }

    pub(super) fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| *existing != id);
        self.entries.len() != before
    }

    /// Upgrade all live observers, dropping entries whose target is gone.
    pub(super) fn live(&mut self) -> Vec<(ObserverId, Rc<dyn PlayerObserver>)> {
        self.entries.retain(|(_, weak)| weak.strong_count() > 0);
        self.entries
            .iter()
            .filter_map(|(id, weak)| weak.upgrade().map(|rc| (*id, rc)))
            .collect()
    }

    pub(super) fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, weak)| weak.strong_count() > 0)
            .count()
    }
}

pub(super) enum RegistryChange {
    Add(ObserverId, Weak<dyn PlayerObserver>),
    Remove(ObserverId),
}

/// Events waiting for delivery, plus registry changes requested while a
/// delivery was in progress.
#[derive(Default)]
pub(super) struct Dispatch {
    pub(super) queue: VecDeque<PlayerEvent>,
    pub(super) delivering: bool,
    pub(super) deferred: Vec<RegistryChange>,
}

impl Dispatch {
    /// Whether `id` was asked to leave during the current delivery.
    pub(super) fn is_leaving(&self, id: ObserverId) -> bool {
        self.deferred
            .iter()
            .rev()
            .find_map(|change| match change {
                RegistryChange::Remove(r) if *r == id => Some(true),
                RegistryChange::Add(a, _) if *a == id => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }
}
