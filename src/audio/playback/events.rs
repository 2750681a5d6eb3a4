use tokio::sync::watch;

use crate::audio::types::{PlayerState, PlayerStateKind};

/// Publishes whole `PlayerState` values; readers never see a mix of two
/// periods.
pub(crate) struct SnapshotPublisher {
    sender: watch::Sender<PlayerState>,
    last_state: PlayerStateKind,
}

impl SnapshotPublisher {
    pub(crate) fn new(initial: PlayerState) -> (Self, watch::Receiver<PlayerState>) {
        let last_state = initial.state;
        let (sender, receiver) = watch::channel(initial);
        (SnapshotPublisher { sender, last_state }, receiver)
    }

    pub(crate) fn publish(&mut self, snapshot: PlayerState) {
        if snapshot.state != self.last_state {
            log::debug!(
                "Player Worker: Publishing state change {} -> {} at {:.2} s",
                self.last_state,
                snapshot.state,
                snapshot.time
            );
            self.last_state = snapshot.state;
        }
        self.sender.send_replace(snapshot);
    }
}
