use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;

use crate::audio::config::EQ_BANDS;
use crate::audio::types::{PlayerEvent, PlayerState, PlayerStateKind};

// --- Pending Event Slot ---

/// Mailbox of capacity one between input producers and the player worker.
///
/// Posting into a full slot overwrites the pending event: bursts of input
/// faster than one player period collapse to the last event.
#[derive(Clone, Default)]
pub struct EventSlot {
    pending: Arc<Mutex<Option<PlayerEvent>>>,
}

impl EventSlot {
    pub fn new() -> Self {
        EventSlot::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<PlayerEvent>> {
        self.pending.lock().unwrap_or_else(|poisoned| {
            log::warn!("Event Slot: Mutex poisoned, recovering pending event");
            poisoned.into_inner()
        })
    }

    /// Stores `event`, returning the unconsumed event it displaced.
    pub fn post(&self, event: PlayerEvent) -> Option<PlayerEvent> {
        let displaced = self.lock().replace(event);
        if let Some(lost) = displaced {
            log::debug!("Event Slot: {:?} overwritten by {:?}", lost, event);
        }
        displaced
    }

    /// Takes the pending event and leaves the slot empty.
    pub fn take(&self) -> Option<PlayerEvent> {
        self.lock().take()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_some()
    }
}

// --- Shutdown ---

/// Cooperative exit flag, checked by every worker once per period.
#[derive(Clone, Default, Debug)]
pub struct ShutdownToken {
    requested: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        ShutdownToken::default()
    }

    pub fn request(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            log::info!("Shutdown: Requested");
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

// --- Player Handle ---

/// Cheap, cloneable access to a running player from other threads: send
/// events in, read consistent snapshots out.
#[derive(Clone)]
pub struct PlayerHandle {
    slot: EventSlot,
    snapshots: watch::Receiver<PlayerState>,
}

impl PlayerHandle {
    pub fn new(slot: EventSlot, snapshots: watch::Receiver<PlayerState>) -> Self {
        PlayerHandle { slot, snapshots }
    }

    /// Hands `event` to the player for its next period. Returns the event it
    /// replaced if the previous one was not consumed yet.
    pub fn dispatch(&self, event: PlayerEvent) -> Option<PlayerEvent> {
        self.slot.post(event)
    }

    /// Copy of the state published by the last completed player period.
    pub fn snapshot(&self) -> PlayerState {
        self.snapshots.borrow().clone()
    }

    pub fn state(&self) -> PlayerStateKind {
        self.snapshots.borrow().state
    }

    pub fn time(&self) -> f64 {
        self.snapshots.borrow().time
    }

    pub fn duration(&self) -> f64 {
        self.snapshots.borrow().duration
    }

    pub fn track_name(&self) -> String {
        self.snapshots.borrow().track_name.clone()
    }

    pub fn time_data(&self) -> i16 {
        self.snapshots.borrow().time_data
    }

    pub fn bits(&self) -> u16 {
        self.snapshots.borrow().bits
    }

    /// Original and filtered spectra from the same period.
    pub fn spectra(&self) -> (Vec<f32>, Vec<f32>) {
        let state = self.snapshots.borrow();
        (state.orig_spect.clone(), state.filt_spect.clone())
    }

    pub fn dynamic_range(&self) -> f32 {
        self.snapshots.borrow().dynamic_range
    }

    pub fn freq_spacing(&self) -> f32 {
        self.snapshots.borrow().freq_spacing
    }

    pub fn volume(&self) -> u32 {
        self.snapshots.borrow().volume
    }

    pub fn eq_gains(&self) -> [f32; EQ_BANDS] {
        self.snapshots.borrow().eq_gain
    }

    pub fn deadline_misses(&self) -> u64 {
        self.snapshots.borrow().deadline_misses
    }
}
