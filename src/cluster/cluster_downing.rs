use async_trait::async_trait;
#[cfg(test)] use mockall::automock;

use crate::cluster::node_addr::NodeAddr;

/// The cluster's side of a downing decision: marking a node as 'Down' and spreading that by
///  gossip. Downing is idempotent - downing a node that is already 'Down' or removed has no
///  effect.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterDowning: Send + Sync {
    async fn down(&self, node: NodeAddr);
}
