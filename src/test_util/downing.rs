use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cluster::cluster_downing::ClusterDowning;
use crate::cluster::node_addr::NodeAddr;
use crate::test_util::node::test_node_addr_from_number;

/// records all `down` calls in the order in which they were made
#[derive(Debug, Default, Clone)]
pub struct TrackingClusterDowning {
    tracker: Arc<RwLock<Vec<NodeAddr>>>,
}
impl TrackingClusterDowning {
    pub fn new() -> Self {
        Default::default()
    }

    /// returns downed nodes, clearing the internal buffer
    pub async fn downed_nodes(&self) -> Vec<NodeAddr> {
        let mut lock = self.tracker.write().await;
        std::mem::take(&mut *lock)
    }

    /// asserts the exact sequence of `down` calls since the last check, clearing the buffer
    pub async fn assert_downed(&self, expected: &[u16]) {
        let expected = expected.iter()
            .map(|&n| test_node_addr_from_number(n))
            .collect::<Vec<_>>();
        assert_eq!(self.downed_nodes().await, expected);
    }

    pub async fn assert_nothing_downed(&self) {
        assert!(self.tracker.read().await.is_empty());
    }
}

#[async_trait]
impl ClusterDowning for TrackingClusterDowning {
    async fn down(&self, node: NodeAddr) {
        self.tracker.write().await.push(node);
    }
}
