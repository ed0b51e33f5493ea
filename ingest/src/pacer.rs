use std::time::Duration;

use rand::Rng;

/// Closed range of durations to pick a random delay from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub min: Duration,
    pub max: Duration,
}

impl Interval {
    pub const ZERO: Self = Self {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    /// Out of range values saturate, negative ones become zero.
    pub fn from_secs(min: f64, max: f64) -> Self {
        Self {
            min: secs(min),
            max: secs(max),
        }
    }

    pub fn sample<R>(&self, rng: &mut R) -> Duration
    where
        R: Rng + ?Sized,
    {
        if self.max <= self.min {
            return self.min;
        }

        let picked = rng.gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        secs(picked).clamp(self.min, self.max)
    }
}

fn secs(value: f64) -> Duration {
    if value <= 0.0 || value.is_nan() {
        return Duration::ZERO;
    }

    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

/// Spaces out requests so runs stay below the upstream rate limits.
#[derive(Debug, Clone)]
pub struct Pacer {
    between_matches: Interval,
    before_player: Interval,
}

impl Pacer {
    pub fn new(between_matches: Interval, before_player: Interval) -> Self {
        Self {
            between_matches,
            before_player,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Interval::ZERO, Interval::ZERO)
    }

    pub async fn between_matches(&self) {
        Self::pause(&self.between_matches).await;
    }

    pub async fn before_player(&self) {
        Self::pause(&self.before_player).await;
    }

    async fn pause(interval: &Interval) {
        let delay = interval.sample(&mut rand::thread_rng());
        if delay.is_zero() {
            return;
        }

        tracing::trace!(?delay, "Pacing request");
        tokio::time::sleep(delay).await;
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(Interval::from_secs(3.0, 7.0), Interval::from_secs(1.0, 3.0))
    }
}
