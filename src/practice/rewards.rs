use std::{
    collections::VecDeque,
    time::{
        Duration,
        Instant,
    },
};

use tracing::trace;

/// Fire-and-forget sink for point rewards.
pub trait RewardEmitter {
    fn show(&mut self, amount: i64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reward {
    pub id: u64,
    pub amount: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveReward {
    pub reward: Reward,
    pub shown_at: Instant,
}

/// Reward notifications waiting for, or currently holding, one of a bounded number of
/// display slots.
#[derive(Debug)]
pub struct RewardQueue {
    pending: VecDeque<Reward>,
    active: Vec<ActiveReward>,
    max_visible: usize,
    display_for: Duration,
    next_id: u64,
}

impl RewardQueue {
    pub fn new(max_visible: usize, display_for: Duration) -> Self {
        Self {
            pending: VecDeque::new(),
            active: Vec::new(),
            max_visible: max_visible.max(1),
            display_for,
            next_id: 0,
        }
    }

    /// Queues a reward. Zero-point rewards have nothing to show and are skipped.
    pub fn enqueue(&mut self, amount: i64) -> Option<u64> {
        if amount == 0 {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.pending.push_back(Reward { id, amount });
        trace!(id, amount, pending = self.pending.len(), "reward queued");
        Some(id)
    }

    /// Moves the oldest pending reward into a display slot if one is free.
    pub fn dequeue(&mut self, now: Instant) -> Option<Reward> {
        if self.active.len() >= self.max_visible {
            return None;
        }
        let reward = self.pending.pop_front()?;
        self.active.push(ActiveReward { reward, shown_at: now });
        Some(reward)
    }

    /// Drops rewards whose display time is over and fills the freed slots.
    pub fn update(&mut self, now: Instant) {
        let display_for = self.display_for;
        self.active.retain(|active| now.saturating_duration_since(active.shown_at) < display_for);
        while self.dequeue(now).is_some() {}
    }

    pub fn active(&self) -> &[ActiveReward] {
        &self.active
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty()
    }

    pub fn display_for(&self) -> Duration {
        self.display_for
    }

    /// Fraction of the display time elapsed for `active`, clamped to `0.0..=1.0`.
    pub fn age_fraction(&self, active: &ActiveReward, now: Instant) -> f32 {
        if self.display_for.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(active.shown_at).as_secs_f32();
        (elapsed / self.display_for.as_secs_f32()).clamp(0.0, 1.0)
    }
}

impl RewardEmitter for RewardQueue {
    fn show(&mut self, amount: i64) {
        self.enqueue(amount);
    }
}

impl Default for RewardQueue {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1800))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_bounded_concurrent_display() {
        let start = Instant::now();
        let mut queue = RewardQueue::new(2, 1000 * MS);
        for amount in [5, 10, 15] {
            queue.show(amount);
        }

        queue.update(start);
        let shown: Vec<i64> = queue.active().iter().map(|a| a.reward.amount).collect();
        assert_eq!(shown, vec![5, 10]);
        assert_eq!(queue.pending_len(), 1);
        assert_eq!(queue.dequeue(start), None);
    }

    #[test]
    fn test_expired_rewards_free_slots_in_order() {
        let start = Instant::now();
        let mut queue = RewardQueue::new(1, 1000 * MS);
        queue.enqueue(5);
        queue.enqueue(7);

        queue.update(start);
        assert_eq!(queue.active()[0].reward.amount, 5);

        queue.update(start + 999 * MS);
        assert_eq!(queue.active()[0].reward.amount, 5);

        queue.update(start + 1000 * MS);
        assert_eq!(queue.active()[0].reward.amount, 7);

        queue.update(start + 2500 * MS);
        assert!(queue.is_idle());
    }

    #[test]
    fn test_zero_points_not_shown() {
        let mut queue = RewardQueue::default();
        assert_eq!(queue.enqueue(0), None);
        assert_eq!(queue.enqueue(-3), Some(0));
        assert_eq!(queue.pending_len(), 1);
    }

    #[test]
    fn test_age_fraction() {
        let start = Instant::now();
        let mut queue = RewardQueue::new(1, 1000 * MS);
        queue.enqueue(1);
        let reward = queue.dequeue(start).unwrap();
        assert_eq!(reward.amount, 1);

        let active = queue.active()[0];
        assert_eq!(queue.age_fraction(&active, start + 500 * MS), 0.5);
        assert_eq!(queue.age_fraction(&active, start + 5000 * MS), 1.0);
    }
}
