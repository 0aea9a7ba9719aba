//! Randomized pauses used to pace scrolling and page requests.

use crate::error::{Result, TocError};
use rand::Rng;
use std::time::Duration;

/// A closed range of pause lengths; each pause is drawn uniformly from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jitter {
    pub min: Duration,
    pub max: Duration,
}

impl Jitter {
    /// Range between two lengths given in milliseconds.
    pub const fn from_millis(min: u64, max: u64) -> Self {
        Self {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    /// Range between two lengths given in (fractional) seconds.
    ///
    /// Rejects negative, non-finite and unrepresentable lengths as well as
    /// `min > max`.
    pub fn try_from_secs_f64(min: f64, max: f64) -> Result<Self> {
        let to_duration = |secs: f64| {
            Duration::try_from_secs_f64(secs)
                .map_err(|e| TocError::Config(format!("Invalid pause length {}s: {}", secs, e)))
        };
        let jitter = Self {
            min: to_duration(min)?,
            max: to_duration(max)?,
        };
        if !jitter.is_valid() {
            return Err(TocError::Config(format!(
                "Pause range {}s-{}s has min above max",
                min, max
            )));
        }
        Ok(jitter)
    }

    /// No pause at all.
    pub const fn none() -> Self {
        Self {
            min: Duration::ZERO,
            max: Duration::ZERO,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// Draw one pause length.
    pub fn sample(&self) -> Duration {
        if self.min >= self.max {
            return self.min;
        }
        let secs = rand::thread_rng().gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max)
            .clamp(self.min, self.max)
    }

    /// Sleep for a freshly drawn pause and report how long it was.
    pub async fn pause(&self) -> Duration {
        let d = self.sample();
        if !d.is_zero() {
            tokio::time::sleep(d).await;
        }
        d
    }
}
