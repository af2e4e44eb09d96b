use rustc_hash::FxHashSet;

use crate::cluster::member::Member;
use crate::cluster::node_addr::NodeAddr;
use crate::cluster::reachability::Reachability;

/// Notifications from the cluster's membership / gossip subsystem, in the order in which the
///  local node learns about them.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClusterEvent {
    SeenChanged(SeenChangedData),
    MemberJoined(Member),
    MemberWeaklyUp(Member),
    MemberUp(Member),
    MemberLeft(Member),
    MemberExited(Member),
    MemberRemoved(Member),
    /// a member was marked 'Down' - for downing purposes this is the same as it being
    ///  unreachable
    MemberDowned(Member),
    UnreachableMember(Member),
    ReachableMember(Member),
    ReachabilityChanged(Reachability),
    LeaderChanged(LeaderChangedData),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SeenChangedData {
    /// the nodes that have seen the current version of the gossip state
    pub seen_by: FxHashSet<NodeAddr>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LeaderChangedData {
    pub new_leader: Option<NodeAddr>,
}
