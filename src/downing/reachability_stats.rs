use std::fmt::{Display, Formatter};

use tokio::time::Instant;

/// Tracks churn in reachability since the last time everything was stable. If the unreachable
///  set keeps changing for too long, the cluster is considered unstable.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ReachabilityChangedStats {
    pub first_change_timestamp: Instant,
    pub latest_change_timestamp: Instant,
    pub change_count: u64,
}
impl ReachabilityChangedStats {
    pub fn new(now: Instant) -> ReachabilityChangedStats {
        ReachabilityChangedStats {
            first_change_timestamp: now,
            latest_change_timestamp: now,
            change_count: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.change_count == 0
    }

    pub fn with_change(&self, now: Instant) -> ReachabilityChangedStats {
        if self.is_empty() {
            ReachabilityChangedStats {
                first_change_timestamp: now,
                latest_change_timestamp: now,
                change_count: 1,
            }
        }
        else {
            ReachabilityChangedStats {
                latest_change_timestamp: now,
                change_count: self.change_count + 1,
                ..*self
            }
        }
    }
}
impl Display for ReachabilityChangedStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "reachability unchanged")
        }
        else {
            let now = Instant::now();
            write!(f, "reachability changed {} times since {:?} ago, latest change was {:?} ago",
                   self.change_count,
                   now.saturating_duration_since(self.first_change_timestamp),
                   now.saturating_duration_since(self.latest_change_timestamp),
            )
        }
    }
}
