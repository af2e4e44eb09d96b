use std::collections::BTreeSet;

use anyhow::anyhow;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::cluster::member::{Member, MemberOrdering, MemberStatus};
use crate::cluster::node_addr::NodeAddr;
use crate::cluster::reachability::Reachability;
use crate::downing::decision::Decision;
use crate::downing::downing_strategy::DowningStrategy;

/// The split brain resolver's local picture of the cluster: all known members, the members
///  that are currently unreachable, the full reachability graph (unreachable / terminated
///  records only), and the nodes that have seen the latest gossip.
///
/// This is the input for [DowningStrategy::decide]. It is owned by a single resolver and only
///  changed in response to cluster events, one event at a time.
///
/// ## Edge cases in membership changes
///
/// During a partition, membership transitions can be visible on one side but not yet on the
///  other. Queries therefore take two flags:
///  * `including_possibly_up`: count 'Joining' and 'WeaklyUp' members, since they may already be
///     'Up' on the other side
///  * `excluding_possibly_exiting`: don't count 'Leaving' members, since they may already be
///     'Exiting' on the other side
///
/// 'Down' and 'Exiting' members are never counted.
#[derive(Debug, Clone)]
pub struct MembershipView {
    ordering: MemberOrdering,
    /// sorted by `ordering`, at most one entry per [NodeAddr]
    all_members: Vec<Member>,
    unreachable: FxHashSet<NodeAddr>,
    reachability: Reachability,
    seen_by: FxHashSet<NodeAddr>,
}
impl MembershipView {
    pub fn new(ordering: MemberOrdering) -> MembershipView {
        MembershipView {
            ordering,
            all_members: Vec::new(),
            unreachable: FxHashSet::default(),
            reachability: Reachability::default(),
            seen_by: FxHashSet::default(),
        }
    }

    pub fn ordering(&self) -> MemberOrdering {
        self.ordering
    }

    /// all members irrespective of their status, in this view's ordering
    pub fn all_members(&self) -> &[Member] {
        &self.all_members
    }

    pub fn get_member(&self, addr: &NodeAddr) -> Option<&Member> {
        self.all_members.iter()
            .find(|m| &m.addr == addr)
    }

    pub fn unreachable(&self) -> &FxHashSet<NodeAddr> {
        &self.unreachable
    }

    pub fn is_unreachable(&self, addr: &NodeAddr) -> bool {
        self.unreachable.contains(addr)
    }

    pub fn reachability(&self) -> &Reachability {
        &self.reachability
    }

    pub fn seen_by(&self) -> &FxHashSet<NodeAddr> {
        &self.seen_by
    }

    /// adds a member, replacing an existing member with the same address
    pub fn add(&mut self, member: Member) {
        self.remove_from_all_members(&member.addr);

        let ordering = self.ordering;
        let pos = self.all_members
            .binary_search_by(|m| ordering.compare(m, &member))
            .unwrap_or_else(|pos| pos);
        self.all_members.insert(pos, member);
    }

    pub fn add_unreachable(&mut self, member: Member) {
        self.unreachable.insert(member.addr);
        self.add(member);
    }

    pub fn add_reachable(&mut self, member: Member) {
        self.unreachable.remove(&member.addr);
        self.add(member);
    }

    pub fn remove(&mut self, member: &Member) {
        self.remove_from_all_members(&member.addr);
        self.unreachable.remove(&member.addr);
    }

    fn remove_from_all_members(&mut self, addr: &NodeAddr) {
        self.all_members.retain(|m| &m.addr != addr);
    }

    /// Replaces the reachability graph, keeping only records with unreachable or terminated
    ///  status: Reachable records carry no information for downing decisions.
    ///
    /// returns true iff the retained records changed
    pub fn set_reachability(&mut self, reachability: &Reachability) -> bool {
        let new_reachability = reachability.filter_records(|r| r.is_unreachable_or_terminated());
        let changed = !new_reachability.has_same_records(&self.reachability);
        self.reachability = new_reachability;
        changed
    }

    pub fn set_seen_by(&mut self, seen_by: FxHashSet<NodeAddr>) {
        self.seen_by = seen_by;
    }

    pub fn members(&self, including_possibly_up: bool, excluding_possibly_exiting: bool) -> Vec<&Member> {
        self.members_with_role(None, including_possibly_up, excluding_possibly_exiting)
    }

    pub fn members_with_role(&self, role: Option<&str>, including_possibly_up: bool, excluding_possibly_exiting: bool) -> Vec<&Member> {
        self.all_members.iter()
            .filter(|m| is_counted(m, including_possibly_up, excluding_possibly_exiting))
            .filter(|m| role.map_or(true, |r| m.has_role(r)))
            .collect()
    }

    pub fn reachable_members(&self, including_possibly_up: bool, excluding_possibly_exiting: bool) -> Vec<&Member> {
        self.reachable_members_with_role(None, including_possibly_up, excluding_possibly_exiting)
    }

    pub fn reachable_members_with_role(&self, role: Option<&str>, including_possibly_up: bool, excluding_possibly_exiting: bool) -> Vec<&Member> {
        let mut members = self.members_with_role(role, including_possibly_up, excluding_possibly_exiting);
        members.retain(|m| !self.unreachable.contains(&m.addr));
        members
    }

    pub fn unreachable_members(&self, including_possibly_up: bool, excluding_possibly_exiting: bool) -> Vec<&Member> {
        self.unreachable_members_with_role(None, including_possibly_up, excluding_possibly_exiting)
    }

    pub fn unreachable_members_with_role(&self, role: Option<&str>, including_possibly_up: bool, excluding_possibly_exiting: bool) -> Vec<&Member> {
        if self.unreachable.is_empty() {
            return Vec::new();
        }

        let mut members = self.members_with_role(role, including_possibly_up, excluding_possibly_exiting);
        members.retain(|m| self.unreachable.contains(&m.addr));
        members
    }

    /// members in 'Joining' or 'WeaklyUp'
    pub fn joining(&self) -> Vec<&Member> {
        self.all_members.iter()
            .filter(|m| m.status.is_possibly_up())
            .collect()
    }

    /// Nodes that are marked unreachable by some nodes while they are still connected to others,
    ///  i.e. that are not separated by a clean network partition.
    pub fn indirectly_connected(&self) -> FxHashSet<NodeAddr> {
        let mut result = self.indirectly_connected_from_intersection_of_observers_and_subjects();
        result.extend(self.indirectly_connected_from_seen_current_gossip());
        result
    }

    /// Cycles in the reachability graph: a node that is both an observer and a subject of
    ///  unreachable records still gets its observations disseminated, so it is connected to
    ///  someone.
    fn indirectly_connected_from_intersection_of_observers_and_subjects(&self) -> FxHashSet<NodeAddr> {
        let unreachable_subjects = self.reachability.all_unreachable_or_terminated();
        self.reachability.all_observers()
            .into_iter()
            .filter(|o| unreachable_subjects.contains(o))
            .collect()
    }

    /// A node that is marked unreachable but has seen the current gossip is still connected to
    ///  someone, and so is its observer.
    fn indirectly_connected_from_seen_current_gossip(&self) -> FxHashSet<NodeAddr> {
        self.reachability.records().iter()
            .filter(|r| self.seen_by.contains(&r.subject))
            .flat_map(|r| [r.observer, r.subject])
            .collect()
    }

    pub fn has_indirectly_connected(&self) -> bool {
        !self.indirectly_connected().is_empty()
    }

    pub fn unreachable_but_not_indirectly_connected(&self) -> FxHashSet<NodeAddr> {
        let indirectly_connected = self.indirectly_connected();
        self.unreachable.iter()
            .filter(|n| !indirectly_connected.contains(n))
            .cloned()
            .collect()
    }

    /// true if no 'Up' or 'Leaving' member is unreachable: all unreachable members are already
    ///  'Down' or 'Exiting' (or gone), or still 'Joining' / 'WeaklyUp' and so not counted
    pub fn is_all_unreachable_down_or_exiting(&self) -> bool {
        self.unreachable_members(false, false).is_empty()
    }

    /// The nodes a given decision implies downing. 'Down' and 'Exiting' members are never
    ///  included.
    ///
    /// The strategy is needed for indirectly connected decisions because there may be a clean
    ///  partition in addition to the indirectly connected nodes, which is then decided on by the
    ///  strategy. This fails if that decision turns out to be indirectly connected again.
    pub fn nodes_to_down(&self, decision: Decision, strategy: &dyn DowningStrategy) -> anyhow::Result<BTreeSet<NodeAddr>> {
        use Decision::*;

        let downable = self.members(true, false)
            .into_iter()
            .chain(self.joining())
            .filter(|m| !m.status.is_down_or_exiting())
            .map(|m| m.addr)
            .collect::<BTreeSet<_>>();

        let result = match decision {
            DownUnreachable | AcquireLeaseAndDownUnreachable(_) => downable.into_iter()
                .filter(|n| self.unreachable.contains(n))
                .collect(),
            DownReachable => downable.into_iter()
                .filter(|n| !self.unreachable.contains(n))
                .collect(),
            DownAll => downable,
            DownIndirectlyConnected | AcquireLeaseAndDownIndirectlyConnected(_) => {
                // Down the indirectly connected nodes and keep the others. If there is a clean
                //  partition in addition to the indirectly connected nodes, keep only the
                //  surviving side of that partition.
                let mut to_down = self.indirectly_connected();
                to_down.extend(self.additional_nodes_to_down_when_indirectly_connected(strategy)?);
                downable.into_iter()
                    .filter(|n| to_down.contains(n))
                    .collect()
            }
            ReverseDownIndirectlyConnected => {
                let indirectly_connected = self.indirectly_connected();
                downable.into_iter()
                    .filter(|n| indirectly_connected.contains(n) || !self.unreachable.contains(n))
                    .collect()
            }
        };
        Ok(result)
    }

    /// Decides on the unreachable nodes that remain after the records between indirectly
    ///  connected nodes are ignored. This is done on a copy of the view, the view itself is
    ///  not modified.
    fn additional_nodes_to_down_when_indirectly_connected(&self, strategy: &dyn DowningStrategy) -> anyhow::Result<BTreeSet<NodeAddr>> {
        if self.unreachable_but_not_indirectly_connected().is_empty() {
            return Ok(BTreeSet::new());
        }

        let intersection_of_observers_and_subjects = self.indirectly_connected_from_intersection_of_observers_and_subjects();
        let have_seen_current_gossip = self.indirectly_connected_from_seen_current_gossip();

        let mut snapshot = self.clone();
        snapshot.reachability = self.reachability.filter_records(|r| {
            let between_cycle_nodes = intersection_of_observers_and_subjects.contains(&r.observer)
                && intersection_of_observers_and_subjects.contains(&r.subject);
            let between_seen_nodes = have_seen_current_gossip.contains(&r.observer)
                && have_seen_current_gossip.contains(&r.subject);
            !(between_cycle_nodes || between_seen_nodes)
        });
        snapshot.unreachable = snapshot.reachability.all_unreachable_or_terminated();

        let additional_decision = strategy.decide(&snapshot);
        debug!("decision {:?} for unreachable nodes {:?} in addition to indirectly connected nodes", additional_decision, snapshot.unreachable);

        if additional_decision.is_indirectly_connected() {
            return Err(anyhow!(
                "double indirectly connected decision {:?}: original reachability {:?}, filtered reachability {:?}, still indirectly connected {:?}, seen by {:?}",
                additional_decision,
                self.reachability,
                snapshot.reachability,
                snapshot.indirectly_connected(),
                self.seen_by,
            ));
        }

        snapshot.nodes_to_down(additional_decision, strategy)
    }
}

fn is_counted(member: &Member, including_possibly_up: bool, excluding_possibly_exiting: bool) -> bool {
    use MemberStatus::*;

    match member.status {
        Joining | WeaklyUp => including_possibly_up,
        Leaving => !excluding_possibly_exiting,
        Up => true,
        Down | Exiting => false,
        Removed => false,
    }
}
