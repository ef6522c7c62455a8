//! Configuration for LoopSonic

/// Configuration descriptor for a [`LoopSonicEngine`](crate::LoopSonicEngine).
///
/// Sample rate and channel count are not part of the descriptor: the output
/// stream always runs at the native format of the track being played.
#[derive(Debug, Clone)]
pub struct LoopSonicEngineDesc {
    /// Number of frames requested from the device per callback
    pub block_size: usize,
    /// Initial output volume (0.0 = silent, 1.0 = full volume)
    pub volume: f32,
    /// Capacity of the bounded queue carrying stream notifications to the engine
    pub event_capacity: usize,
}

impl Default for LoopSonicEngineDesc {
    fn default() -> Self {
        Self {
            block_size: 1024,
            volume: 1.0,
            event_capacity: 64,
        }
    }
}

impl LoopSonicEngineDesc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    pub fn volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}
