//! Caption wrapping.
//!
//! The encoder draws text without wrapping, so captions are broken into
//! lines here using an average glyph width estimate.

/// How many characters fit in `fraction` of the frame width
pub fn chars_per_line(frame_width: u32, fraction: f64, font_size: u32, char_width_ratio: f64) -> usize {
    let available = frame_width as f64 * fraction;
    let glyph = (font_size as f64 * char_width_ratio).max(1.0);
    ((available / glyph).floor() as usize).max(1)
}

/// Greedy word wrap. Words longer than a line are split.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let current_len = current.chars().count();
        if !current.is_empty() && current_len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_caption_width() {
        // 1080 * 0.9 / (80 * 0.55)
        assert_eq!(chars_per_line(1080, 0.9, 80, 0.55), 22);
    }

    #[test]
    fn test_tiny_frames_still_fit_one_char() {
        assert_eq!(chars_per_line(10, 0.1, 200, 0.55), 1);
    }

    #[test]
    fn test_wraps_on_word_boundaries() {
        let lines = wrap_text("Dogs can smell your feelings from across the room", 16);
        assert_eq!(
            lines,
            vec!["Dogs can smell", "your feelings", "from across the", "room"]
        );
        assert!(lines.iter().all(|l| l.chars().count() <= 16));
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(wrap_text("  a \n b  ", 10), vec!["a b"]);
        assert!(wrap_text("   ", 10).is_empty());
    }

    #[test]
    fn test_splits_overlong_words() {
        let lines = wrap_text("hi supercalifragilistic", 8);
        assert_eq!(lines, vec!["hi", "supercal", "ifragili", "stic"]);
    }
}
