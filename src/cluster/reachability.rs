use rustc_hash::FxHashSet;

use crate::cluster::node_addr::NodeAddr;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ReachabilityStatus {
    Reachable,
    Unreachable,
    /// the observer saw the subject's process terminate
    Terminated,
}

/// One observer's opinion about one subject
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ReachabilityRecord {
    pub observer: NodeAddr,
    pub subject: NodeAddr,
    pub status: ReachabilityStatus,
}
impl ReachabilityRecord {
    pub fn new(observer: NodeAddr, subject: NodeAddr, status: ReachabilityStatus) -> ReachabilityRecord {
        ReachabilityRecord {
            observer,
            subject,
            status,
        }
    }

    pub fn is_unreachable_or_terminated(&self) -> bool {
        matches!(self.status, ReachabilityStatus::Unreachable | ReachabilityStatus::Terminated)
    }
}


/// The cluster-wide reachability graph as merged by gossip: a set of records, each saying
///  'observer thinks subject is (un)reachable'.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Reachability {
    records: FxHashSet<ReachabilityRecord>,
}
impl Reachability {
    pub fn new(records: Vec<ReachabilityRecord>) -> Reachability {
        Reachability {
            records: records.into_iter().collect(),
        }
    }

    pub fn records(&self) -> &FxHashSet<ReachabilityRecord> {
        &self.records
    }

    pub fn filter_records(&self, predicate: impl Fn(&ReachabilityRecord) -> bool) -> Reachability {
        Reachability {
            records: self.records.iter()
                .filter(|r| predicate(r))
                .cloned()
                .collect(),
        }
    }

    pub fn all_observers(&self) -> FxHashSet<NodeAddr> {
        self.records.iter()
            .map(|r| r.observer)
            .collect()
    }

    /// all subjects that at least one observer considers unreachable or terminated
    pub fn all_unreachable_or_terminated(&self) -> FxHashSet<NodeAddr> {
        self.records.iter()
            .filter(|r| r.is_unreachable_or_terminated())
            .map(|r| r.subject)
            .collect()
    }

    pub fn has_same_records(&self, other: &Reachability) -> bool {
        self.records == other.records
    }
}
