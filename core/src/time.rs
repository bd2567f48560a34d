// ## 📂 File: `src/time.rs`

//! Time policy for packet timestamps and key validity.
//!
//! Three sources, highest precedence first:
//! 1. a caller-supplied generator (`Clock::with_generator`);
//! 2. a server time anchor (`Clock::update_time`), advanced by the monotonic
//!    clock since it was recorded, so local wall-clock skew does not matter;
//! 3. the system clock.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, TimeZone, Utc};
use tracing::debug;

/// Produces "now" for one encryption or decryption.
pub type TimeGenerator = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone, Copy, Debug)]
struct ServerAnchor {
    server_time: DateTime<Utc>,
    recorded_at: Instant,
}

#[derive(Clone, Default)]
pub struct Clock {
    generator: Option<TimeGenerator>,
    anchor: Option<ServerAnchor>,
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Clock")
            .field("generator", &self.generator.is_some())
            .field("anchor", &self.anchor)
            .finish()
    }
}

impl Clock {
    pub fn system() -> Self {
        Self::default()
    }

    /// Clock driven entirely by `generator`.
    pub fn with_generator<F>(generator: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            generator: Some(Arc::new(generator)),
            anchor: None,
        }
    }

    /// Record a trusted server time (unix seconds).
    ///
    /// An anchor older than the current estimate is ignored, so "now" never
    /// moves backwards.
    pub fn update_time(&mut self, unix_secs: i64) {
        let Some(server_time) = Utc.timestamp_opt(unix_secs, 0).single() else {
            debug!(unix_secs, "server time out of range, ignored");
            return;
        };
        if let Some(anchor) = self.anchor {
            if server_time <= advance(anchor) {
                return;
            }
        }
        debug!(%server_time, "server time anchor updated");
        self.anchor = Some(ServerAnchor {
            server_time,
            recorded_at: Instant::now(),
        });
    }

    pub fn now(&self) -> DateTime<Utc> {
        if let Some(generator) = &self.generator {
            return generator();
        }
        match self.anchor {
            Some(anchor) => advance(anchor),
            None => Utc::now(),
        }
    }
}

fn advance(anchor: ServerAnchor) -> DateTime<Utc> {
    let elapsed = Duration::from_std(anchor.recorded_at.elapsed()).unwrap_or_else(|_| Duration::zero());
    anchor.server_time + elapsed
}
