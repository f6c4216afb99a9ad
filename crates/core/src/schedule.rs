//! Daily public story schedule (21:15 UTC) and its prompt.

use chrono::{Duration, NaiveTime};

use crate::types::Timestamp;

/// Hour of day (UTC) the daily story is created.
pub const DAILY_STORY_HOUR: u32 = 21;

/// Minute past [`DAILY_STORY_HOUR`] the daily story is created.
pub const DAILY_STORY_MINUTE: u32 = 15;

/// How many recent daily stories are fed back to avoid repeats.
pub const DAILY_STORY_HISTORY: i64 = 5;

/// Compute the first daily run strictly after `now`.
pub fn next_daily_run(now: Timestamp) -> Timestamp {
    let fire_at = NaiveTime::from_hms_opt(DAILY_STORY_HOUR, DAILY_STORY_MINUTE, 0)
        .unwrap_or(NaiveTime::MIN);
    let today = now.date_naive().and_time(fire_at).and_utc();
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Time left until the next daily run, never negative.
pub fn until_next_daily_run(now: Timestamp) -> std::time::Duration {
    (next_daily_run(now) - now)
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

/// Build the prompt for a daily story from the texts of recent ones.
pub fn daily_story_prompt(recent_texts: &[String]) -> String {
    let history = recent_texts.join("\n");
    format!(
        "write a unique bedtime story. Here are the last {DAILY_STORY_HISTORY} stories you \
         created, the new story should not use the same characters, themes, or storylines: \
         {history}"
    )
}
