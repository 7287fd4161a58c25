mod engine;
pub mod pcm;
mod probe;
#[cfg(feature = "cpal-backend")]
mod real;

pub use engine::{
    MediaElement, MediaError, MediaEvent, MediaResult, MediaSource, SimulatedMediaElement,
};
pub use probe::probe_duration;
#[cfg(feature = "cpal-backend")]
pub use real::CpalMediaElement;
