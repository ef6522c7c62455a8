use crate::audio_data::{LoadOptions, LoopSonicAudioData};
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Trait for loading audio data from file paths.
///
/// LoopSonic ships a Symphonia-based [`DefaultAudioLoader`](super::DefaultAudioLoader);
/// implement this trait to bring a decoder for other formats.
///
/// ```ignore
/// use loopsonic::audio_data::{AudioDataLoader, LoadOptions, LoopSonicAudioData};
/// use loopsonic::error::Result;
/// use std::path::Path;
/// use std::sync::Arc;
///
/// struct MyCustomLoader;
///
/// impl AudioDataLoader for MyCustomLoader {
///     fn load(&self, path: &Path, options: &LoadOptions) -> Result<Arc<LoopSonicAudioData>> {
///         todo!()
///     }
/// }
/// ```
pub trait AudioDataLoader {
    /// Decodes the file at `path` into interleaved `f32` samples.
    ///
    /// # Errors
    ///
    /// Returns a `LoopSonicError` if the file cannot be loaded or decoded.
    fn load(&self, path: &Path, options: &LoadOptions) -> Result<Arc<LoopSonicAudioData>>;
}
