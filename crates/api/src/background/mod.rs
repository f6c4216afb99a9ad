//! Background tasks and scheduled jobs.
//!
//! Long-running tasks accept a [`CancellationToken`](tokio_util::sync::CancellationToken)
//! for graceful shutdown.

pub mod daily_story;
pub mod resume;
