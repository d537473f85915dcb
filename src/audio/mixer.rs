use tracing::{debug, info};

use crate::composition::Timeline;
use crate::video::MediaHandle;

/// How the source is fitted to the timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFit {
    /// Source repeats until the timeline ends
    Loop,
    /// Source is cut at the timeline end
    Trim,
}

/// A music source fitted to an exact duration
#[derive(Debug)]
pub struct AudioTrack {
    handle: MediaHandle,
    pub fit: AudioFit,

    /// Output duration (seconds); always the timeline's total
    pub duration: f64,
}

impl AudioTrack {
    pub fn handle(&self) -> &MediaHandle {
        &self.handle
    }

    /// Native length of the source clip
    pub fn source_duration(&self) -> f64 {
        self.handle.duration()
    }

    /// Number of times the source starts playing (partial last pass included)
    pub fn passes(&self) -> u32 {
        let source = self.source_duration();
        if source <= 0.0 {
            return 0;
        }
        (self.duration / source).ceil().max(1.0) as u32
    }
}

/// Reconciles music length with the composed timeline
#[derive(Debug, Default, Clone, Copy)]
pub struct AudioMixer;

impl AudioMixer {
    pub fn new() -> Self {
        Self
    }

    /// Loop or trim `music` so it lasts exactly `total_duration`
    pub fn prepare_track(&self, music: MediaHandle, total_duration: f64) -> AudioTrack {
        let fit = if music.duration() < total_duration {
            AudioFit::Loop
        } else {
            AudioFit::Trim
        };

        debug!(
            "Fitting {:?} ({:.2}s) to {:.2}s by {:?}",
            music.path(),
            music.duration(),
            total_duration,
            fit
        );

        AudioTrack {
            handle: music,
            fit,
            duration: total_duration,
        }
    }

    /// Make `track` the timeline's only audio source
    ///
    /// Audio embedded in the background and outro clips is never mapped
    /// into the output, so the bound track is all that is heard.
    pub fn attach_audio(&self, mut timeline: Timeline, track: AudioTrack) -> Timeline {
        info!(
            "   Music bound: {:.1}s ({:?}, {} pass(es))",
            track.duration,
            track.fit,
            track.passes()
        );
        if let Some(previous) = timeline.set_audio(track) {
            debug!("Replaced previously bound audio {:?}", previous.handle().path());
        }
        timeline
    }
}
