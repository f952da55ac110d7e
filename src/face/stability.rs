use super::MemberId;
use std::collections::VecDeque;

/// Rolling window of recent match decisions.
///
/// The reported member only changes once some candidate (a member, or
/// "nobody") holds at least `min_votes` of the last `window` readings.
#[derive(Debug, Clone)]
pub struct StabilityBuffer {
    readings: VecDeque<Option<MemberId>>,
    window: usize,
    min_votes: usize,
    reported: Option<MemberId>,
}

impl Default for StabilityBuffer {
    fn default() -> Self {
        Self::new(3, 2)
    }
}

impl StabilityBuffer {
    pub fn new(window: usize, min_votes: usize) -> Self {
        let window = window.max(1);
        Self {
            readings: VecDeque::with_capacity(window),
            window,
            min_votes: min_votes.clamp(1, window),
            reported: None,
        }
    }

    /// Record one reading and return the member reported after it.
    pub fn observe(&mut self, reading: Option<MemberId>) -> Option<MemberId> {
        self.readings.push_back(reading);
        while self.readings.len() > self.window {
            self.readings.pop_front();
        }
        if let Some(winner) = self.majority() {
            self.reported = winner;
        }
        self.reported
    }

    pub fn reported(&self) -> Option<MemberId> {
        self.reported
    }

    pub fn reset(&mut self) {
        self.readings.clear();
        self.reported = None;
    }

    fn votes(&self, candidate: Option<MemberId>) -> usize {
        self.readings.iter().filter(|r| **r == candidate).count()
    }

    fn majority(&self) -> Option<Option<MemberId>> {
        let mut best: Option<(Option<MemberId>, usize)> = None;
        for &candidate in &self.readings {
            let votes = self.votes(candidate);
            if votes < self.min_votes {
                continue;
            }
            match best {
                Some((_, v)) if v >= votes => {}
                _ => best = Some((candidate, votes)),
            }
        }
        best.map(|(candidate, _)| candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_reading_alone_is_not_enough() {
        let mut buf = StabilityBuffer::default();
        assert_eq!(buf.observe(Some(7)), None);
        assert_eq!(buf.observe(Some(7)), Some(7));
    }

    #[test]
    fn single_anomalous_reading_does_not_flip() {
        let mut buf = StabilityBuffer::default();
        buf.observe(Some(1));
        buf.observe(Some(1));
        buf.observe(Some(1));
        assert_eq!(buf.observe(Some(2)), Some(1));
        assert_eq!(buf.observe(None), Some(1));
    }

    #[test]
    fn two_of_three_switches_identity() {
        let mut buf = StabilityBuffer::default();
        buf.observe(Some(1));
        buf.observe(Some(1));
        buf.observe(Some(2));
        assert_eq!(buf.observe(Some(2)), Some(2));
    }

    #[test]
    fn split_window_keeps_previous_identity() {
        let mut buf = StabilityBuffer::default();
        buf.observe(Some(1));
        buf.observe(Some(1));
        buf.observe(Some(2));
        buf.observe(None);
        // window is now [2, None, 3] with no majority
        assert_eq!(buf.observe(Some(3)), Some(1));
    }

    #[test]
    fn repeated_empty_readings_clear_identity() {
        let mut buf = StabilityBuffer::default();
        buf.observe(Some(4));
        buf.observe(Some(4));
        buf.observe(None);
        assert_eq!(buf.observe(None), None);
    }

    #[test]
    fn reset_forgets_everything() {
        let mut buf = StabilityBuffer::default();
        buf.observe(Some(4));
        buf.observe(Some(4));
        buf.reset();
        assert_eq!(buf.reported(), None);
        assert_eq!(buf.observe(Some(4)), None);
    }
}
