use std::fmt::{Debug, Display, Formatter};
use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

/// A node's identity in the cluster: its network address plus an incarnation number.
///
/// A node that is downed or removed can never come back under the same identity, so a restarted
///  process on the same network address uses a different `unique` part (typically the seconds
///  since epoch at startup). Two [NodeAddr]s are equal only if both parts are equal.
///
/// The derived ordering compares the socket address first and the incarnation second. This is
///  the 'address order' that strategies use for tie breaks, and it must be the same on all nodes.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct NodeAddr {
    pub socket_addr: SocketAddr,
    pub unique: u32,
}

impl NodeAddr {
    pub fn new(socket_addr: SocketAddr, unique: u32) -> NodeAddr {
        NodeAddr {
            socket_addr,
            unique,
        }
    }
}

impl Debug for NodeAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}@{}]", self.socket_addr, self.unique)
    }
}

impl Display for NodeAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.socket_addr, self.unique)
    }
}

impl From<SocketAddr> for NodeAddr {
    fn from(addr: SocketAddr) -> Self {
        // clock before the epoch: 0
        let unique = SystemTime::now().duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);

        NodeAddr {
            socket_addr: addr,
            unique,
        }
    }
}
