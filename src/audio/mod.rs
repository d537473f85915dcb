//! # Audio Module
//!
//! Fits the chosen music track to the composed timeline.
//!
//! The track is looped when it is shorter than the timeline and trimmed
//! otherwise, so the output audio always lasts exactly as long as the video.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shorts_factory::audio::AudioMixer;
//!
//! let mixer = AudioMixer::new();
//! let track = mixer.prepare_track(music_handle, timeline.duration());
//! let timeline = mixer.attach_audio(timeline, track);
//! ```

pub mod mixer;

pub use mixer::{AudioFit, AudioMixer, AudioTrack};
