//! LoopSonic: loop-region playback for decoded PCM audio.
//!
//! A [`LoopStream`] wraps a seekable decoded source and presents a virtual track
//! with an intro, a loop region repeated a configurable number of times, and an
//! outro. [`LoopStreamProvider`] builds such streams from audio files and stored
//! loop points; [`LoopSonicEngine`] plays them on the default output device.
//!
//! ```no_run
//! use loopsonic::{LoopPoints, LoopSonicEngine, LoopSonicEngineDesc, LoopStreamProvider};
//! use std::sync::Arc;
//!
//! # fn main() -> loopsonic::error::Result<()> {
//! let provider = LoopStreamProvider::new("music/stage1.ogg")
//!     .with_points(LoopPoints::new().loop_start(88_200).loop_end(1_411_200).loops(2));
//! let stream = Arc::new(provider.create_stream()?);
//!
//! let mut engine = LoopSonicEngine::new(LoopSonicEngineDesc::default())?;
//! engine.play(stream)?;
//! # Ok(())
//! # }
//! ```

pub mod audio_data;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod playback;
pub mod provider;
pub mod stream;

pub use audio_data::{LoadOptions, LoopSonicAudioData};
pub use config::LoopSonicEngineDesc;
pub use engine::LoopSonicEngine;
pub use error::LoopSonicError;
pub use events::LoopSonicEvent;
pub use playback::{PlayState, PlaybackInfo};
pub use provider::{LoopPoints, LoopStreamProvider, StreamProvider};
pub use stream::{DecodedSource, LoopCount, LoopRegion, LoopStream, PcmSource, RegionUpdate};
