use std::cmp::Ordering;
use std::collections::BTreeSet;

use crate::cluster::node_addr::NodeAddr;

/// A member's lifecycle state as disseminated by the cluster's gossip.
///
/// see https://doc.akka.io/docs/akka/current/typed/cluster-membership.html
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum MemberStatus {
    /// A node has registered its wish to join the cluster, but the leader has not yet
    ///  transitioned it to 'Up'.
    Joining,
    /// A joining node that was promoted while there is no convergence (e.g. because some node is
    ///  unreachable). It may be 'Up' on the other side of a partition already.
    WeaklyUp,
    /// The regular state of a running member. Reachability is orthogonal to status, so an 'Up'
    ///  member can be unreachable.
    Up,
    /// The member started leaving gracefully. It may already be 'Exiting' on the other side of a
    ///  partition.
    Leaving,
    /// The leader confirmed that a leaving member is done; it is no longer counted as a member.
    Exiting,
    /// Assigned algorithmically to unreachable members - typically by a downing decision.
    Down,
    /// Tombstone state.
    Removed,
}
impl MemberStatus {
    /// Joining and WeaklyUp members may be 'Up' on the other side of a partition
    pub fn is_possibly_up(&self) -> bool {
        matches!(self, MemberStatus::Joining | MemberStatus::WeaklyUp)
    }

    /// Down and Exiting members are written off: They don't count as members and are never
    ///  downed (again)
    pub fn is_down_or_exiting(&self) -> bool {
        matches!(self, MemberStatus::Down | MemberStatus::Exiting)
    }
}


/// A member of the cluster as seen in the latest membership notification. This is an immutable
///  value: A status change arrives as a new [Member] that replaces the old one.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Member {
    pub addr: NodeAddr,
    pub roles: BTreeSet<String>,
    pub status: MemberStatus,
    /// Assigned by the leader when a member is promoted to 'Up'. It increases monotonically, so
    ///  a lower number means an older member. Members that were never 'Up' carry
    ///  [Member::NOT_UP].
    pub up_number: u32,
}
impl Member {
    pub const NOT_UP: u32 = u32::MAX;

    pub fn new(addr: NodeAddr, roles: BTreeSet<String>, status: MemberStatus, up_number: u32) -> Member {
        Member {
            addr,
            roles,
            status,
            up_number,
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}


/// The order in which a strategy looks at members, e.g. to find 'the lowest address' or 'the
///  oldest member' as a tie breaker. Each strategy fixes its ordering when it is created.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MemberOrdering {
    /// by [NodeAddr] (socket address, then incarnation)
    Address,
    /// by up number, oldest first; members with equal up numbers are ordered by address
    Age,
}
impl MemberOrdering {
    pub fn compare(&self, a: &Member, b: &Member) -> Ordering {
        match self {
            MemberOrdering::Address => a.addr.cmp(&b.addr),
            MemberOrdering::Age => a.up_number.cmp(&b.up_number)
                .then_with(|| a.addr.cmp(&b.addr)),
        }
    }
}
