// Overall progress for one download run.
// - Maps per-stream percentages onto a single 0..=100 bar, split 50/50
//   between the video and audio phases when both are downloaded.
// - `ProgressTracker` drops any value that would move the bar backwards.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    Combined,
    AudioOnly,
}

impl DownloadMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Combined => "Video + Audio",
            Self::AudioOnly => "Audio only",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Combined => Self::AudioOnly,
            Self::AudioOnly => Self::Combined,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    None,
    Video,
    Audio,
}

pub fn overall_percent(phase: Phase, percent: u8, mode: DownloadMode) -> u8 {
    let percent = percent.min(100);
    match (mode, phase) {
        (DownloadMode::Combined, Phase::Video) => percent / 2,
        (DownloadMode::Combined, Phase::Audio) => 50 + percent / 2,
        (DownloadMode::AudioOnly, _) | (_, Phase::None) => percent,
    }
}

/// Per-stream percent from the collaborator's "bytes remaining" callback.
/// `None` when the stream size is unknown.
pub fn percent_from_remaining(total_bytes: u64, bytes_remaining: u64) -> Option<u8> {
    if total_bytes == 0 {
        return None;
    }

    let downloaded = total_bytes.saturating_sub(bytes_remaining);
    let percent = downloaded.saturating_mul(100) / total_bytes;
    Some(percent.min(100) as u8)
}

#[derive(Debug, Clone)]
pub struct ProgressTracker {
    mode: DownloadMode,
    phase: Phase,
    last_reported: Option<u8>,
}

impl ProgressTracker {
    pub fn new(mode: DownloadMode) -> Self {
        Self {
            mode,
            phase: Phase::None,
            last_reported: None,
        }
    }

    pub fn last_reported(&self) -> u8 {
        self.last_reported.unwrap_or(0)
    }

    pub fn enter_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    /// Returns the overall value to publish, or `None` when it would not
    /// advance the bar.
    pub fn observe(&mut self, stream_percent: u8) -> Option<u8> {
        let overall = overall_percent(self.phase, stream_percent, self.mode);
        self.advance_to(overall)
    }

    pub fn observe_remaining(&mut self, total_bytes: u64, bytes_remaining: u64) -> Option<u8> {
        percent_from_remaining(total_bytes, bytes_remaining)
            .and_then(|percent| self.observe(percent))
    }

    pub fn complete(&mut self) -> Option<u8> {
        self.advance_to(100)
    }

    fn advance_to(&mut self, overall: u8) -> Option<u8> {
        match self.last_reported {
            Some(last) if overall <= last => None,
            _ => {
                self.last_reported = Some(overall);
                Some(overall)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_video_phase_stays_in_lower_half_and_never_decreases() {
        let mut previous = 0;
        for percent in 0..=100 {
            let overall = overall_percent(Phase::Video, percent, DownloadMode::Combined);
            assert!(overall <= 50, "p={percent} -> {overall}");
            assert!(overall >= previous, "p={percent} went backwards");
            previous = overall;
        }
        assert_eq!(overall_percent(Phase::Video, 99, DownloadMode::Combined), 49);
    }

    #[test]
    fn combined_audio_phase_stays_in_upper_half() {
        for percent in 0..=100 {
            let overall = overall_percent(Phase::Audio, percent, DownloadMode::Combined);
            assert!((50..=100).contains(&overall), "p={percent} -> {overall}");
        }
        assert_eq!(overall_percent(Phase::Audio, 0, DownloadMode::Combined), 50);
        assert_eq!(overall_percent(Phase::Audio, 37, DownloadMode::Combined), 68);
        assert_eq!(overall_percent(Phase::Audio, 100, DownloadMode::Combined), 100);
    }

    #[test]
    fn audio_only_and_unphased_values_pass_through() {
        for percent in 0..=100 {
            for phase in [Phase::None, Phase::Video, Phase::Audio] {
                assert_eq!(overall_percent(phase, percent, DownloadMode::AudioOnly), percent);
            }
            assert_eq!(overall_percent(Phase::None, percent, DownloadMode::Combined), percent);
        }
    }

    #[test]
    fn out_of_range_input_is_clamped() {
        assert_eq!(overall_percent(Phase::Audio, 250, DownloadMode::Combined), 100);
        assert_eq!(overall_percent(Phase::None, 101, DownloadMode::AudioOnly), 100);
    }

    #[test]
    fn percent_from_remaining_handles_unknown_and_overshoot() {
        assert_eq!(percent_from_remaining(0, 0), None);
        assert_eq!(percent_from_remaining(1000, 1000), Some(0));
        assert_eq!(percent_from_remaining(1000, 333), Some(66));
        assert_eq!(percent_from_remaining(1000, 0), Some(100));
        assert_eq!(percent_from_remaining(1000, 5000), Some(0));
    }

    #[test]
    fn tracked_combined_run_is_monotonic_and_finishes_at_full() {
        // Callbacks can arrive with jitter (the same chunk twice, a stale
        // value after a newer one). The published sequence must still climb.
        let video_remaining = [1000, 900, 950, 500, 500, 120, 0, 0];
        let audio_remaining = [400, 400, 350, 399, 100, 0];

        let mut tracker = ProgressTracker::new(DownloadMode::Combined);
        let mut published = Vec::new();

        tracker.enter_phase(Phase::Video);
        for remaining in video_remaining {
            published.extend(tracker.observe_remaining(1000, remaining));
        }
        assert_eq!(tracker.last_reported(), 50);

        tracker.enter_phase(Phase::Audio);
        for remaining in audio_remaining {
            published.extend(tracker.observe_remaining(400, remaining));
        }

        assert!(published.windows(2).all(|pair| pair[0] < pair[1]), "{published:?}");
        assert_eq!(published.first(), Some(&0));
        assert_eq!(published.last(), Some(&100));
        assert_eq!(tracker.complete(), None);
    }

    #[test]
    fn tracked_audio_only_run_reaches_full_on_complete() {
        let mut tracker = ProgressTracker::new(DownloadMode::AudioOnly);
        tracker.enter_phase(Phase::Audio);
        assert_eq!(tracker.observe(10), Some(10));
        assert_eq!(tracker.observe(10), None);
        assert_eq!(tracker.observe(5), None);
        assert_eq!(tracker.observe(90), Some(90));
        assert_eq!(tracker.complete(), Some(100));
        assert_eq!(tracker.last_reported(), 100);
    }
}
