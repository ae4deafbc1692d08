//! Kill-feedback correlation.
//!
//! The weapon layer records the last local hit (target, timestamp,
//! headshot flag). When a remote actor's alive flag drops within the
//! confirmation window, the record is consumed and a kill confirmation
//! fires exactly once. There is intentionally a single slot: a newer
//! hit replaces the old record, and a consumed record can never match a
//! later death.

use std::time::{Duration, Instant};

use tacops_protocol::ParticipantId;

/// How long after a hit a death still counts as our kill.
pub const KILL_CONFIRM_WINDOW: Duration = Duration::from_secs(4);

#[derive(Debug, Clone)]
struct HitRecord {
    target_id: ParticipantId,
    at: Instant,
    headshot: bool,
}

/// Single-slot last-hit tracker.
#[derive(Debug, Default)]
pub struct LastHitTracker {
    last_hit: Option<HitRecord>,
}

impl LastHitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a local hit, replacing any previous record.
    pub fn record_hit(&mut self, target_id: ParticipantId, headshot: bool, now: Instant) {
        self.last_hit = Some(HitRecord {
            target_id,
            at: now,
            headshot,
        });
    }

    /// Match a death against the pending hit. On a match the record is
    /// consumed and the headshot flag is returned.
    pub fn confirm_kill(&mut self, dead_id: &ParticipantId, now: Instant) -> Option<bool> {
        let record = self.last_hit.as_ref()?;
        if &record.target_id != dead_id {
            return None;
        }
        if now.duration_since(record.at) >= KILL_CONFIRM_WINDOW {
            // Too old; drop it so it cannot match anything later either.
            self.last_hit = None;
            return None;
        }
        let headshot = record.headshot;
        self.last_hit = None;
        Some(headshot)
    }

    pub fn clear(&mut self) {
        self.last_hit = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ParticipantId {
        s.to_string()
    }

    #[test]
    fn test_kill_within_window_confirms_once() {
        let mut tracker = LastHitTracker::new();
        let now = Instant::now();
        tracker.record_hit(id("a"), true, now);

        assert_eq!(tracker.confirm_kill(&id("a"), now + Duration::from_secs(1)), Some(true));
        // Consumed: the same death cannot confirm twice.
        assert_eq!(tracker.confirm_kill(&id("a"), now + Duration::from_secs(1)), None);
    }

    #[test]
    fn test_expired_hit_does_not_confirm() {
        let mut tracker = LastHitTracker::new();
        let now = Instant::now();
        tracker.record_hit(id("a"), false, now);

        assert_eq!(tracker.confirm_kill(&id("a"), now + KILL_CONFIRM_WINDOW), None);
    }

    #[test]
    fn test_death_of_a_different_target_is_ignored() {
        let mut tracker = LastHitTracker::new();
        let now = Instant::now();
        tracker.record_hit(id("a"), false, now);

        assert_eq!(tracker.confirm_kill(&id("b"), now), None);
        // Record stays armed for the actual target.
        assert_eq!(tracker.confirm_kill(&id("a"), now), Some(false));
    }

    #[test]
    fn test_newer_hit_replaces_the_slot() {
        let mut tracker = LastHitTracker::new();
        let now = Instant::now();
        tracker.record_hit(id("a"), false, now);
        tracker.record_hit(id("b"), true, now);

        // Only the most recent target can confirm.
        assert_eq!(tracker.confirm_kill(&id("a"), now), None);
        assert_eq!(tracker.confirm_kill(&id("b"), now), Some(true));
    }
}
