//! Event types for LoopSonic

use crossbeam_channel::{Sender, TrySendError};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum LoopSonicEvent {
    /// The read cursor wrapped from the loop end back to the loop start.
    Looped,
    /// The stream produced fewer bytes than requested; the track is over.
    TrackFinished,
    EngineStarted,
    EngineStopped,
    EngineError {
        error: String,
    },
}

impl LoopSonicEvent {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::EngineError { .. })
    }

    pub fn is_stream_event(&self) -> bool {
        matches!(self, Self::Looped | Self::TrackFinished)
    }
}

/// Callback invoked once per loop wrap.
pub type LoopedCallback = dyn Fn() + Send + Sync;

/// Observers of a single loop stream: plain callbacks plus channel senders.
///
/// Senders are expected to be bounded. A full queue drops the event instead of
/// blocking the audio thread; a disconnected receiver unregisters its sender.
#[derive(Default)]
pub(crate) struct LoopObservers {
    callbacks: Vec<Arc<LoopedCallback>>,
    senders: Vec<Sender<LoopSonicEvent>>,
}

impl LoopObservers {
    pub(crate) fn add_callback(&mut self, callback: Arc<LoopedCallback>) {
        self.callbacks.push(callback);
    }

    /// Registers `sender` unless a sender into the same channel is already present.
    pub(crate) fn add_sender(&mut self, sender: Sender<LoopSonicEvent>) {
        if !self.senders.iter().any(|s| s.same_channel(&sender)) {
            self.senders.push(sender);
        }
    }

    /// Sends one [`LoopSonicEvent::Looped`] into every registered channel.
    pub(crate) fn send_looped(&mut self) {
        self.senders
            .retain(|sender| match sender.try_send(LoopSonicEvent::Looped) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    log::warn!("Loop notification dropped: event queue is full");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }

    /// Handles to the registered callbacks, to be invoked once the lock
    /// guarding the observers has been released.
    pub(crate) fn callbacks(&self) -> Vec<Arc<LoopedCallback>> {
        self.callbacks.clone()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.callbacks.is_empty() && self.senders.is_empty()
    }
}

impl std::fmt::Debug for LoopObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopObservers")
            .field("callbacks", &self.callbacks.len())
            .field("senders", &self.senders.len())
            .finish()
    }
}
