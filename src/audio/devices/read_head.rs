use std::sync::atomic::{AtomicU64, Ordering};

/// Never produced by `f64::to_bits` of a valid position.
const NO_SEEK: u64 = u64::MAX;

/// Fractional play position shared between a control thread and an audio
/// callback.
///
/// The callback owns the running head: it loads it with `begin` and stores it
/// back with `commit`. Repositioning from the control side goes through a
/// separate seek request, which the next `begin` consumes, so a seek landing
/// in the middle of a callback is never overwritten by that callback's
/// `commit`.
pub struct ReadHead {
    head: AtomicU64,
    seek: AtomicU64,
}

impl ReadHead {
    pub fn new(position: f64) -> Self {
        ReadHead {
            head: AtomicU64::new(position.to_bits()),
            seek: AtomicU64::new(NO_SEEK),
        }
    }

    /// Control side: move playback to `position` from the next callback on.
    pub fn request_seek(&self, position: f64) {
        self.seek.store(position.to_bits(), Ordering::SeqCst);
    }

    pub fn has_pending_seek(&self) -> bool {
        self.seek.load(Ordering::SeqCst) != NO_SEEK
    }

    /// Current position as seen from the control side. A pending seek wins
    /// over the callback's last committed head.
    pub fn position(&self) -> f64 {
        match self.seek.load(Ordering::SeqCst) {
            NO_SEEK => f64::from_bits(self.head.load(Ordering::SeqCst)),
            pending => f64::from_bits(pending),
        }
    }

    /// Callback side: the head to start this buffer from.
    pub fn begin(&self) -> f64 {
        match self.seek.swap(NO_SEEK, Ordering::SeqCst) {
            NO_SEEK => f64::from_bits(self.head.load(Ordering::SeqCst)),
            pending => {
                self.head.store(pending, Ordering::SeqCst);
                f64::from_bits(pending)
            }
        }
    }

    /// Callback side: where this buffer ended.
    pub fn commit(&self, head: f64) {
        self.head.store(head.to_bits(), Ordering::SeqCst);
    }
}
