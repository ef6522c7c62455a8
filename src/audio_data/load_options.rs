use std::time::Duration;

/// Options for controlling audio file loading behavior.
///
/// ```no_run
/// # use loopsonic::audio_data::LoadOptions;
/// # use std::time::Duration;
/// // Only decode the first 30 seconds
/// let options = LoadOptions::new().max_duration(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Maximum duration to decode (None = decode the entire file)
    pub max_duration: Option<Duration>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    /// Frame limit implied by `max_duration` at the given sample rate.
    pub(crate) fn max_frames(&self, sample_rate: u32) -> usize {
        self.max_duration
            .map(|d| (d.as_secs_f64() * sample_rate as f64) as usize)
            .unwrap_or(usize::MAX)
    }
}
