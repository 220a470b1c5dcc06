//! Parsing of FFmpeg's `-progress` key/value stream.

/// Accumulated state from `-progress pipe:1` output.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProgressState {
    pub out_time_secs: f64,
    pub complete: bool,
}

impl ProgressState {
    /// Feed one `key=value` pair. Returns true when the pair closes a
    /// progress block (`progress=continue|end`).
    pub fn update(&mut self, key: &str, value: &str) -> bool {
        match key {
            // FFmpeg reports microseconds under both names.
            "out_time_ms" | "out_time_us" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = (us / 1_000_000.0).max(0.0);
                }
                false
            }
            "progress" => {
                self.complete = value == "end";
                true
            }
            _ => false,
        }
    }

    /// Feed one raw output line.
    pub fn update_line(&mut self, line: &str) -> bool {
        match line.trim().split_once('=') {
            Some((key, value)) => self.update(key.trim(), value.trim()),
            None => false,
        }
    }

    /// Completion fraction against the expected output duration.
    ///
    /// Unknown durations report 0 until the stream ends.
    pub fn fraction(&self, expected_duration_secs: Option<f64>) -> f64 {
        if self.complete {
            return 1.0;
        }
        match expected_duration_secs {
            Some(total) if total > 0.0 => (self.out_time_secs / total).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }
}

/// Expected output duration for a set of input durations.
///
/// With `shortest` the output stops at the shortest input; otherwise it
/// follows the first input.
pub fn expected_duration(durations: &[Option<f64>], shortest: bool) -> Option<f64> {
    if shortest {
        let known: Vec<f64> = durations.iter().flatten().copied().collect();
        if known.len() != durations.len() || known.is_empty() {
            return durations.first().copied().flatten();
        }
        known.into_iter().reduce(f64::min)
    } else {
        durations.first().copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_block_parsing() {
        let mut state = ProgressState::default();
        let output = "frame=10\nout_time_us=2500000\nprogress=continue\n";
        let closed: Vec<bool> = output.lines().map(|l| state.update_line(l)).collect();
        assert_eq!(closed, vec![false, false, true]);
        assert!((state.out_time_secs - 2.5).abs() < 1e-9);
        assert!((state.fraction(Some(10.0)) - 0.25).abs() < 1e-9);
        assert!(!state.complete);
    }

    #[test]
    fn test_end_reports_full_progress() {
        let mut state = ProgressState::default();
        state.update_line("out_time_ms=1000000");
        state.update_line("progress=end");
        assert_eq!(state.fraction(Some(60.0)), 1.0);
        assert_eq!(state.fraction(None), 1.0);
    }

    #[test]
    fn test_fraction_is_clamped() {
        let state = ProgressState {
            out_time_secs: 12.0,
            complete: false,
        };
        assert_eq!(state.fraction(Some(10.0)), 1.0);
        assert_eq!(state.fraction(None), 0.0);
        assert_eq!(state.fraction(Some(0.0)), 0.0);
    }

    #[test]
    fn test_negative_out_time_is_ignored() {
        let mut state = ProgressState::default();
        state.update_line("out_time_us=-5000");
        state.update_line("out_time_us=N/A");
        assert_eq!(state.out_time_secs, 0.0);
    }

    #[test]
    fn test_expected_duration_policies() {
        let durations = [Some(30.0), Some(12.5)];
        assert_eq!(expected_duration(&durations, false), Some(30.0));
        assert_eq!(expected_duration(&durations, true), Some(12.5));
        assert_eq!(expected_duration(&[Some(30.0), None], true), Some(30.0));
        assert_eq!(expected_duration(&[], true), None);
    }
}
