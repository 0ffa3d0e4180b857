//! Small numeric and console helpers

use std::io::{self, Write};

/// Dots printed before [`ProgressDots`] starts a new line
pub const DOTS_PER_LINE: u32 = 50;

/// Exponential moving average
///
/// `alpha` runs from 0.0 (keep the old value) to 1.0 (take the new one).
///
/// ```
/// use device_utils::util::smooth;
///
/// assert_eq!(smooth(10.0, 0.0, 0.5), 5.0);
/// ```
pub fn smooth(latest: f32, smoothed: f32, alpha: f32) -> f32 {
    latest * alpha + smoothed * (1.0 - alpha)
}

/// Prints a dot per step as a progress marker, wrapping every 50 dots
pub struct ProgressDots<W: Write = io::Stdout> {
    writer: W,
    count: u32,
}

impl ProgressDots<io::Stdout> {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for ProgressDots<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> ProgressDots<W> {
    pub fn with_writer(writer: W) -> Self {
        Self { writer, count: 0 }
    }

    /// Emit one progress marker
    pub fn tick(&mut self) -> io::Result<()> {
        self.writer.write_all(b".")?;
        self.count += 1;
        if self.count >= DOTS_PER_LINE {
            self.count = 0;
            self.writer.write_all(b"\n")?;
        }
        self.writer.flush()
    }

    /// Dots on the current line
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_bounds() {
        assert_eq!(smooth(8.0, 2.0, 1.0), 8.0);
        assert_eq!(smooth(8.0, 2.0, 0.0), 2.0);
        assert!((smooth(8.0, 2.0, 0.25) - 3.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_progress_wraps() {
        let mut dots = ProgressDots::with_writer(Vec::new());
        for _ in 0..52 {
            dots.tick().unwrap();
        }
        assert_eq!(dots.count(), 2);

        let out = String::from_utf8(dots.into_inner()).unwrap();
        assert_eq!(out, format!("{}\n..", ".".repeat(50)));
    }
}
