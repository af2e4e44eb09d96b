use std::collections::BTreeSet;
use std::fmt::Debug;

use async_trait::async_trait;
#[cfg(test)] use mockall::automock;
use tokio::time::Instant;

use crate::cluster::node_addr::NodeAddr;

/// A distributed mutual exclusion token, e.g. backed by a coordination service. It is used by
///  [crate::downing::downing_strategy::LeaseMajority] to ensure that at most one side of a
///  partition goes ahead with downing the other side.
///
/// `acquire` and `release` do I/O and may take a while; the resolver never waits for them but
///  gets their results as messages. An `Err` is treated as 'not holding' / 'not released'.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Lease: Debug + Send + Sync {
    fn lease_name(&self) -> String;

    /// returns true iff this node holds the lease afterwards
    async fn acquire(&self) -> anyhow::Result<bool>;

    /// returns true iff the lease was released
    async fn release(&self) -> anyhow::Result<bool>;

    /// checks if this node currently holds the lease, without doing any I/O
    fn check_lease(&self) -> bool;
}


/// When to release a lease that was acquired for a downing decision. Holding on to the lease
///  until the downed members are actually removed keeps the other side from acquiring it and
///  acting on stale information.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ReleaseLeaseCondition {
    NoLease,
    /// release once all these (downed) members are removed
    WhenMembersRemoved(BTreeSet<NodeAddr>),
    /// release once the deadline is passed
    WhenTimeElapsed(Instant),
}
