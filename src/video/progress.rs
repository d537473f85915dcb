//! Encoder progress parsing (`-progress pipe:2` output).

/// Progress information reported by the encoder
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderProgress {
    /// Current frame number
    pub frame: u64,
    /// Current encoding fps
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    pub is_complete: bool,
}

impl RenderProgress {
    /// Progress percentage given the timeline duration in seconds
    pub fn percentage(&self, total_seconds: f64) -> f64 {
        if total_seconds <= 0.0 {
            return 0.0;
        }
        let done = self.out_time_ms as f64 / 1000.0;
        ((done / total_seconds) * 100.0).clamp(0.0, 100.0)
    }
}

/// Fold one `key=value` line into `current`.
///
/// Returns a snapshot at the end of each progress block.
pub fn parse_progress_line(line: &str, current: &mut RenderProgress) -> Option<RenderProgress> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        "out_time_us" | "out_time_ms" => {
            // ffmpeg reports microseconds under both keys
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return Some(current.clone());
        }
        _ => {}
    }

    None
}
