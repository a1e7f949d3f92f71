//! Humanized pacing: length-proportional typing delays and randomized
//! sleeps between message parts and recipients. The randomized
//! inter-recipient delay is the primary defense against provider-side
//! abuse heuristics.

use std::time::Duration;

use rand::Rng;

use crate::types::DelaySpeed;

/// Simulated typing time the provider should spend on a text message.
#[must_use]
pub fn typing_delay_ms(text: &str, speed: DelaySpeed) -> u64 {
    text.chars().count() as u64 * speed.ms_per_char()
}

/// Short randomized pause between the parts of one recipient's message.
#[must_use]
pub fn part_delay() -> Duration {
    Duration::from_millis(rand::rng().random_range(1_000..=2_000))
}

/// Uniform inter-recipient delay drawn from `[from_secs, to_secs]`.
#[must_use]
pub fn recipient_delay(from_secs: u32, to_secs: u32) -> Duration {
    let from_ms = u64::from(from_secs.min(to_secs)) * 1_000;
    let to_ms = u64::from(from_secs.max(to_secs)) * 1_000;
    Duration::from_millis(rand::rng().random_range(from_ms..=to_ms))
}
