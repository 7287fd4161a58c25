mod controller;

pub use controller::{PlayOutcome, PlaybackController, PlaybackError, PlaybackState};
