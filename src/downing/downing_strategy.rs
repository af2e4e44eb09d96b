use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
#[cfg(test)] use mockall::automock;
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::cluster::member::{Member, MemberOrdering};
use crate::downing::decision::Decision;
use crate::downing::decision::Decision::*;
use crate::downing::lease::Lease;
use crate::downing::membership_view::MembershipView;
use crate::downing::resolver_config::{ActiveStrategy, SplitBrainResolverConfig};

/// A [DowningStrategy] decides which nodes should continue to run and which nodes should be
///  terminated (i.e. promoted to 'down'). It is called when the set of unreachable nodes has
///  been *stable* for a configured period.
///
/// ## Network Partitions
///
/// The reason for making this a configurable strategy is *network partitions*: Even if some nodes
///  become unreachable from this node, they can still be running and doing work - with this node
///  being unreachable as far as they are concerned. In such a situation, both partitions of the
///  network need to agree on (at most) one of the partitions that can continue, and terminate the
///  rest.
///
/// And they need to agree without communicating - they are unreachable to each other after all.
///  That is the purpose and the main constraint for [DowningStrategy] implementations: To make
///  consistent decisions based only on their local [MembershipView].
///
/// Note that the most common 'unreachable' scenario by far is a single node being killed without
///  going through its regular shutdown and deregistration sequence. All [DowningStrategy]
///  implementations must handle this case well, typically by downing the single killed node.
///
/// Every strategy fixes the [MemberOrdering] it uses for tie breaks, and the view it is called
///  with must use that ordering.
#[cfg_attr(test, automock)]
pub trait DowningStrategy: Debug + Send + Sync {
    fn decide(&self, view: &MembershipView) -> Decision;

    fn ordering(&self) -> MemberOrdering;

    /// the lease required by this strategy's decisions, if any
    fn lease(&self) -> Option<Arc<dyn Lease>>;
}

/// builds the strategy selected by the configuration, looking up the lease implementation
///  by its id if the strategy requires one
pub fn create_strategy(config: &SplitBrainResolverConfig, leases: &FxHashMap<String, Arc<dyn Lease>>) -> anyhow::Result<Box<dyn DowningStrategy>> {
    let strategy: Box<dyn DowningStrategy> = match config.active_strategy {
        ActiveStrategy::StaticQuorum => {
            let settings = &config.static_quorum;
            let quorum_size = settings.quorum_size
                .ok_or_else(|| anyhow!("static-quorum requires a quorum-size"))?;
            Box::new(StaticQuorum::new(quorum_size, settings.role.clone())?)
        }
        ActiveStrategy::KeepMajority => Box::new(KeepMajority::new(config.keep_majority.role.clone())),
        ActiveStrategy::KeepOldest => {
            let settings = &config.keep_oldest;
            Box::new(KeepOldest::new(settings.down_if_alone, settings.role.clone()))
        }
        ActiveStrategy::DownAll => Box::new(DownAllNodes {}),
        ActiveStrategy::LeaseMajority => {
            let settings = &config.lease_majority;
            let lease_implementation = settings.lease_implementation.as_deref()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| anyhow!("lease-majority requires a lease-implementation"))?;
            let lease = leases.get(lease_implementation)
                .ok_or_else(|| anyhow!("no lease registered for lease-implementation {:?}", lease_implementation))?;
            Box::new(LeaseMajority::new(settings.role.clone(), lease.clone(), settings.acquire_lease_delay_for_minority))
        }
    };
    Ok(strategy)
}


/// [StaticQuorum] keeps the side that has at least `quorum_size` members (with the configured
///  role, if any), and downs sides that are smaller than that.
///
/// `quorum_size` must be more than half the total number of members for this to be consistent,
///  so the cluster must never grow beyond `2 * quorum_size - 1` members. If it does, all nodes
///  are downed since there could be two sides with a quorum.
#[derive(Debug)]
pub struct StaticQuorum {
    quorum_size: usize,
    role: Option<String>,
}
impl StaticQuorum {
    pub fn new(quorum_size: usize, role: Option<String>) -> anyhow::Result<StaticQuorum> {
        if quorum_size < 1 {
            return Err(anyhow!("quorum-size must be at least 1, was {}", quorum_size));
        }
        Ok(StaticQuorum {
            quorum_size,
            role,
        })
    }

    fn is_too_many_members(&self, view: &MembershipView) -> bool {
        view.members_with_role(self.role.as_deref(), false, false).len() > 2 * self.quorum_size - 1
    }
}
impl DowningStrategy for StaticQuorum {
    fn decide(&self, view: &MembershipView) -> Decision {
        if self.is_too_many_members(view) {
            warn!("{} members with role {:?} exceed the maximum of {} for quorum size {} - downing all nodes",
                view.members_with_role(self.role.as_deref(), false, false).len(),
                self.role,
                2 * self.quorum_size - 1,
                self.quorum_size,
            );
            return DownAll;
        }
        if view.has_indirectly_connected() {
            return DownIndirectlyConnected;
        }

        let num_reachable = view.reachable_members_with_role(self.role.as_deref(), false, false).len();
        debug!("{} of the required quorum of {} nodes with role {:?} are reachable", num_reachable, self.quorum_size, self.role);

        if num_reachable >= self.quorum_size {
            DownUnreachable
        }
        else {
            DownReachable
        }
    }

    fn ordering(&self) -> MemberOrdering {
        MemberOrdering::Address
    }

    fn lease(&self) -> Option<Arc<dyn Lease>> {
        None
    }
}


/// [KeepMajority] keeps the side with more members (with the configured role, if any). If both
///  sides have the same size, the side with the lowest address survives.
#[derive(Debug)]
pub struct KeepMajority {
    role: Option<String>,
}
impl KeepMajority {
    pub fn new(role: Option<String>) -> KeepMajority {
        KeepMajority { role }
    }

    fn majority_decision(this_side: usize, other_side: usize, lowest: &Member, view: &MembershipView) -> Decision {
        if this_side == other_side {
            // equal size: keep the side with the lowest address
            if view.is_unreachable(&lowest.addr) {
                DownReachable
            }
            else {
                DownUnreachable
            }
        }
        else if this_side > other_side {
            DownUnreachable
        }
        else {
            DownReachable
        }
    }

    /// A more conservative count: Leaving members on this side may already be Exiting on the
    ///  other side, while Joining / WeaklyUp members on the other side may already be Up there.
    fn majority_decision_including_membership_changes(&self, view: &MembershipView) -> Decision {
        let role = self.role.as_deref();

        let members = view.members_with_role(role, true, true);
        match members.first() {
            None => DownAll,
            Some(lowest) => {
                let this_side = view.reachable_members_with_role(role, false, true).len();
                let other_side = view.unreachable_members_with_role(role, true, true).len();
                Self::majority_decision(this_side, other_side, lowest, view)
            }
        }
    }
}
impl DowningStrategy for KeepMajority {
    fn decide(&self, view: &MembershipView) -> Decision {
        if view.has_indirectly_connected() {
            return DownIndirectlyConnected;
        }

        let role = self.role.as_deref();
        let members = view.members_with_role(role, false, false);
        let lowest = match members.first() {
            None => {
                debug!("no members with role {:?} - downing all nodes", self.role);
                return DownAll;
            }
            Some(m) => m,
        };

        let num_reachable = view.reachable_members_with_role(role, false, false).len();
        let num_unreachable = view.unreachable_members_with_role(role, false, false).len();
        debug!("{} reachable and {} unreachable nodes with role {:?}", num_reachable, num_unreachable, self.role);

        match Self::majority_decision(num_reachable, num_unreachable, lowest, view) {
            DownUnreachable => match self.majority_decision_including_membership_changes(view) {
                DownUnreachable => DownUnreachable,
                other => {
                    debug!("membership changes in progress make the majority ambiguous ({:?}) - downing all nodes", other);
                    DownAll
                }
            },
            decision => decision,
        }
    }

    fn ordering(&self) -> MemberOrdering {
        MemberOrdering::Address
    }

    fn lease(&self) -> Option<Arc<dyn Lease>> {
        None
    }
}


/// [KeepOldest] keeps the side that contains the oldest member (with the configured role, if
///  any).
///
/// With `down_if_alone`, the oldest member is downed if it is the only member on its side while
///  the other side has at least two members. This avoids keeping a cluster of one node alive if
///  the oldest node is cut off from the rest.
#[derive(Debug)]
pub struct KeepOldest {
    down_if_alone: bool,
    role: Option<String>,
}
impl KeepOldest {
    pub fn new(down_if_alone: bool, role: Option<String>) -> KeepOldest {
        KeepOldest {
            down_if_alone,
            role,
        }
    }

    fn oldest_decision(&self, oldest_is_on_this_side: bool, this_side: usize, other_side: usize) -> Decision {
        if oldest_is_on_this_side {
            if self.down_if_alone && this_side == 1 && other_side >= 2 {
                DownReachable
            }
            else {
                DownUnreachable
            }
        }
        else if self.down_if_alone && other_side == 1 && this_side >= 2 {
            DownUnreachable
        }
        else {
            DownReachable
        }
    }

    /// Leaving members may already be Exiting on the other side. Joining / WeaklyUp members are
    ///  never the oldest, so they don't change the decision.
    fn oldest_decision_including_membership_changes(&self, view: &MembershipView) -> Decision {
        let role = self.role.as_deref();

        let members = view.members_with_role(role, false, true);
        match members.first() {
            None => DownAll,
            Some(oldest) => {
                let oldest_is_reachable = !view.is_unreachable(&oldest.addr);
                let this_side = view.reachable_members_with_role(role, false, true).len();
                let other_side = view.unreachable_members_with_role(role, false, true).len();
                self.oldest_decision(oldest_is_reachable, this_side, other_side)
            }
        }
    }
}
impl DowningStrategy for KeepOldest {
    fn decide(&self, view: &MembershipView) -> Decision {
        if view.has_indirectly_connected() {
            return DownIndirectlyConnected;
        }

        let role = self.role.as_deref();
        let members = view.members_with_role(role, false, false);
        let oldest = match members.first() {
            None => {
                debug!("no members with role {:?} - downing all nodes", self.role);
                return DownAll;
            }
            Some(m) => m,
        };

        let oldest_is_reachable = !view.is_unreachable(&oldest.addr);
        let num_reachable = view.reachable_members_with_role(role, false, false).len();
        let num_unreachable = view.unreachable_members_with_role(role, false, false).len();
        debug!("oldest node {:?} is {}, {} reachable and {} unreachable nodes with role {:?}",
            oldest.addr,
            if oldest_is_reachable { "reachable" } else { "unreachable" },
            num_reachable,
            num_unreachable,
            self.role,
        );

        match self.oldest_decision(oldest_is_reachable, num_reachable, num_unreachable) {
            DownUnreachable => match self.oldest_decision_including_membership_changes(view) {
                DownUnreachable => DownUnreachable,
                other => {
                    debug!("membership changes in progress make the oldest node ambiguous ({:?}) - downing all nodes", other);
                    DownAll
                }
            },
            decision => decision,
        }
    }

    fn ordering(&self) -> MemberOrdering {
        MemberOrdering::Age
    }

    fn lease(&self) -> Option<Arc<dyn Lease>> {
        None
    }
}


/// [DownAllNodes] downs the entire cluster if there are unreachable nodes that stay unreachable
///  for the stable-after period. Useful if nodes are very unlikely to crash on their own, so
///  unreachability is a network problem that can't be resolved safely.
#[derive(Debug)]
pub struct DownAllNodes {}
impl DowningStrategy for DownAllNodes {
    fn decide(&self, _view: &MembershipView) -> Decision {
        DownAll
    }

    fn ordering(&self) -> MemberOrdering {
        MemberOrdering::Address
    }

    fn lease(&self) -> Option<Arc<dyn Lease>> {
        None
    }
}


/// [LeaseMajority] lets the side that acquires a [Lease] down the other side; the side that
///  fails to acquire it downs itself.
///
/// To give the majority side a better chance at the lease, the minority side waits for
///  `acquire_delay_for_minority` before trying to acquire it. This does not require
///  synchronized clocks.
#[derive(Debug)]
pub struct LeaseMajority {
    role: Option<String>,
    lease: Arc<dyn Lease>,
    acquire_delay_for_minority: Duration,
}
impl LeaseMajority {
    pub fn new(role: Option<String>, lease: Arc<dyn Lease>, acquire_delay_for_minority: Duration) -> LeaseMajority {
        LeaseMajority {
            role,
            lease,
            acquire_delay_for_minority,
        }
    }

    fn is_in_minority(&self, view: &MembershipView) -> bool {
        let role = self.role.as_deref();
        let members = view.members_with_role(role, false, false);
        let lowest = match members.first() {
            None => return false,
            Some(m) => m,
        };

        let num_unreachable = view.unreachable_members_with_role(role, false, false).len();
        let num_members = members.len();

        if num_unreachable * 2 == num_members {
            // equal size: the side with the lowest address is the 'majority'
            view.is_unreachable(&lowest.addr)
        }
        else {
            num_unreachable * 2 > num_members
        }
    }

    fn acquire_lease_delay(&self, view: &MembershipView) -> Duration {
        if self.is_in_minority(view) {
            self.acquire_delay_for_minority
        }
        else {
            Duration::ZERO
        }
    }
}
impl DowningStrategy for LeaseMajority {
    fn decide(&self, view: &MembershipView) -> Decision {
        if view.has_indirectly_connected() {
            AcquireLeaseAndDownIndirectlyConnected(Duration::ZERO)
        }
        else {
            AcquireLeaseAndDownUnreachable(self.acquire_lease_delay(view))
        }
    }

    fn ordering(&self) -> MemberOrdering {
        MemberOrdering::Address
    }

    fn lease(&self) -> Option<Arc<dyn Lease>> {
        Some(self.lease.clone())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::member::MemberStatus;
    use crate::cluster::member::MemberStatus::*;
    use crate::cluster::reachability::{Reachability, ReachabilityRecord, ReachabilityStatus};
    use crate::downing::lease::MockLease;
    use crate::downing::resolver_config::SplitBrainResolverConfig;
    use crate::test_util::node::{test_member, test_member_with_roles, test_node_addr_from_number};
    use rstest::rstest;

    /// `(node number, status, up number, unreachable)` - node numbers double as addresses
    fn view_of(ordering: MemberOrdering, members: &[(u16, MemberStatus, u32, bool)]) -> MembershipView {
        let mut view = MembershipView::new(ordering);
        for &(n, status, up_number, unreachable) in members {
            if unreachable {
                view.add_unreachable(test_member(n, status, up_number));
            }
            else {
                view.add(test_member(n, status, up_number));
            }
        }
        view
    }

    /// 'Up' members with up numbers equal to their node numbers
    fn up_view(ordering: MemberOrdering, reachable: &[u16], unreachable: &[u16]) -> MembershipView {
        let members = reachable.iter().map(|&n| (n, Up, n as u32, false))
            .chain(unreachable.iter().map(|&n| (n, Up, n as u32, true)))
            .collect::<Vec<_>>();
        view_of(ordering, &members)
    }

    fn with_cycle(mut view: MembershipView, a: u16, b: u16) -> MembershipView {
        let a = test_node_addr_from_number(a);
        let b = test_node_addr_from_number(b);
        view.set_reachability(&Reachability::new(vec![
            ReachabilityRecord::new(a, b, ReachabilityStatus::Unreachable),
            ReachabilityRecord::new(b, a, ReachabilityStatus::Unreachable),
        ]));
        view
    }

    #[rstest]
    #[case::all_reachable(3, vec![1,2,3], vec![], DownUnreachable)]
    #[case::quorum(3, vec![1,2,3], vec![4,5], DownUnreachable)]
    #[case::no_quorum(3, vec![1,2], vec![3,4,5], DownReachable)]
    #[case::exact_quorum(2, vec![1,2], vec![3], DownUnreachable)]
    #[case::below_quorum_alone(2, vec![1], vec![2], DownReachable)]
    #[case::too_many_members(2, vec![1,2,3], vec![4], DownAll)]
    #[case::max_members(2, vec![1,2], vec![3], DownUnreachable)]
    #[case::quorum_one(1, vec![1], vec![], DownUnreachable)]
    fn test_static_quorum(#[case] quorum_size: usize, #[case] reachable: Vec<u16>, #[case] unreachable: Vec<u16>, #[case] expected: Decision) {
        let strategy = StaticQuorum::new(quorum_size, None).unwrap();
        let view = up_view(strategy.ordering(), &reachable, &unreachable);
        assert_eq!(strategy.decide(&view), expected);
    }

    #[test]
    fn test_static_quorum_invalid_size() {
        assert!(StaticQuorum::new(0, None).is_err());
    }

    #[test]
    fn test_static_quorum_indirectly_connected() {
        let strategy = StaticQuorum::new(3, None).unwrap();
        let view = with_cycle(up_view(strategy.ordering(), &[1,2,3], &[4,5]), 4, 5);
        assert_eq!(strategy.decide(&view), DownIndirectlyConnected);
    }

    #[test]
    fn test_static_quorum_role() {
        let strategy = StaticQuorum::new(2, Some("a".to_string())).unwrap();
        let mut view = MembershipView::new(strategy.ordering());
        view.add(test_member_with_roles(1, &["a"], Up, 1));
        view.add(test_member_with_roles(2, &["a"], Up, 2));
        view.add(test_member_with_roles(3, &[], Up, 3));
        view.add_unreachable(test_member_with_roles(4, &[], Up, 4));
        view.add_unreachable(test_member_with_roles(5, &["a"], Up, 5));
        view.add_unreachable(test_member_with_roles(6, &[], Up, 6));

        // only the members with role 'a' count for the quorum
        assert_eq!(strategy.decide(&view), DownUnreachable);
    }

    #[rstest]
    #[case::majority(vec![1,2,3], vec![4,5], DownUnreachable)]
    #[case::minority(vec![4,5], vec![1,2,3], DownReachable)]
    #[case::single_crashed_node(vec![1,2,3,4], vec![5], DownUnreachable)]
    #[case::equal_lowest_reachable(vec![1,2], vec![3,4], DownUnreachable)]
    #[case::equal_lowest_unreachable(vec![3,4], vec![1,2], DownReachable)]
    #[case::equal_two_nodes_lowest_reachable(vec![1], vec![2], DownUnreachable)]
    #[case::equal_two_nodes_lowest_unreachable(vec![2], vec![1], DownReachable)]
    #[case::all_reachable(vec![1,2,3], vec![], DownUnreachable)]
    fn test_keep_majority(#[case] reachable: Vec<u16>, #[case] unreachable: Vec<u16>, #[case] expected: Decision) {
        let strategy = KeepMajority::new(None);
        let view = up_view(strategy.ordering(), &reachable, &unreachable);
        assert_eq!(strategy.decide(&view), expected);
    }

    #[rstest]
    // a Leaving member on this side may be Exiting on the other side already
    #[case::leaving_makes_it_ambiguous(vec![(1, Up, 1, false), (2, Leaving, 2, false), (3, Leaving, 3, false), (4, Up, 4, true), (5, Up, 5, true)], DownAll)]
    // a Joining member on the other side may be Up there already
    #[case::joining_on_other_side_makes_it_ambiguous(vec![(1, Up, 1, false), (2, Up, 2, false), (3, Up, 3, true), (4, Joining, Member::NOT_UP, true), (5, WeaklyUp, Member::NOT_UP, true)], DownAll)]
    #[case::joining_on_this_side_does_not_count(vec![(1, Up, 1, false), (2, Joining, Member::NOT_UP, false), (3, Up, 3, true)], DownUnreachable)]
    #[case::clear_majority_despite_leaving(vec![(1, Up, 1, false), (2, Up, 2, false), (3, Leaving, 3, false), (4, Up, 4, false), (5, Up, 5, true)], DownUnreachable)]
    #[case::down_and_exiting_do_not_count(vec![(1, Up, 1, false), (2, Up, 2, true), (3, Down, 3, false), (4, Exiting, 4, false)], DownUnreachable)]
    fn test_keep_majority_membership_changes(#[case] members: Vec<(u16, MemberStatus, u32, bool)>, #[case] expected: Decision) {
        let strategy = KeepMajority::new(None);
        let view = view_of(strategy.ordering(), &members);
        assert_eq!(strategy.decide(&view), expected);
    }

    #[test]
    fn test_keep_majority_indirectly_connected() {
        let strategy = KeepMajority::new(None);
        let view = with_cycle(up_view(strategy.ordering(), &[1,2,3], &[4,5]), 4, 5);
        assert_eq!(strategy.decide(&view), DownIndirectlyConnected);
    }

    #[rstest]
    #[case::no_members_with_role(vec![(1, &[][..], false), (2, &[][..], true)], DownAll)]
    #[case::role_majority(vec![(1, &["a"][..], false), (2, &["a"][..], false), (3, &[][..], true), (4, &[][..], true), (5, &["a"][..], true)], DownUnreachable)]
    #[case::role_minority(vec![(1, &["a"][..], false), (2, &[][..], false), (3, &[][..], false), (4, &["a"][..], true), (5, &["a"][..], true)], DownReachable)]
    fn test_keep_majority_role(#[case] members: Vec<(u16, &[&str], bool)>, #[case] expected: Decision) {
        let strategy = KeepMajority::new(Some("a".to_string()));
        let mut view = MembershipView::new(strategy.ordering());
        for (n, roles, unreachable) in members {
            let m = test_member_with_roles(n, roles, Up, n as u32);
            if unreachable { view.add_unreachable(m) } else { view.add(m) }
        }
        assert_eq!(strategy.decide(&view), expected);
    }

    #[rstest]
    #[case::oldest_reachable(false, vec![(1, 1, false), (2, 2, false), (3, 3, true)], DownUnreachable)]
    #[case::oldest_unreachable(false, vec![(1, 1, true), (2, 2, false), (3, 3, false)], DownReachable)]
    #[case::oldest_is_not_lowest_address(false, vec![(1, 5, false), (2, 6, false), (3, 1, true)], DownReachable)]
    #[case::oldest_alone_kept(false, vec![(1, 1, false), (2, 2, true), (3, 3, true)], DownUnreachable)]
    #[case::oldest_alone_downed(true, vec![(1, 1, false), (2, 2, true), (3, 3, true)], DownReachable)]
    #[case::oldest_alone_on_other_side(true, vec![(1, 1, true), (2, 2, false), (3, 3, false)], DownUnreachable)]
    #[case::oldest_alone_on_other_side_no_down_if_alone(false, vec![(1, 1, true), (2, 2, false), (3, 3, false)], DownReachable)]
    #[case::two_nodes_oldest_kept(true, vec![(1, 1, false), (2, 2, true)], DownUnreachable)]
    #[case::two_nodes_oldest_unreachable(true, vec![(1, 1, true), (2, 2, false)], DownReachable)]
    fn test_keep_oldest(#[case] down_if_alone: bool, #[case] members: Vec<(u16, u32, bool)>, #[case] expected: Decision) {
        let strategy = KeepOldest::new(down_if_alone, None);
        let members = members.into_iter()
            .map(|(n, up_number, unreachable)| (n, Up, up_number, unreachable))
            .collect::<Vec<_>>();
        let view = view_of(strategy.ordering(), &members);
        assert_eq!(strategy.decide(&view), expected);
    }

    #[test]
    fn test_keep_oldest_leaving_oldest_is_ambiguous() {
        // the oldest node is Leaving, so it may be Exiting on the other side already
        let strategy = KeepOldest::new(false, None);
        let view = view_of(strategy.ordering(), &[(1, Leaving, 1, false), (2, Up, 2, true), (3, Up, 3, false)]);
        assert_eq!(strategy.decide(&view), DownAll);
    }

    #[test]
    fn test_keep_oldest_indirectly_connected() {
        let strategy = KeepOldest::new(false, None);
        let view = with_cycle(up_view(strategy.ordering(), &[1,2,3], &[4,5]), 4, 5);
        assert_eq!(strategy.decide(&view), DownIndirectlyConnected);
    }

    #[test]
    fn test_keep_oldest_no_members() {
        let strategy = KeepOldest::new(false, Some("x".to_string()));
        let view = up_view(strategy.ordering(), &[1], &[2]);
        assert_eq!(strategy.decide(&view), DownAll);
    }

    #[rstest]
    #[case::empty(vec![], vec![])]
    #[case::partition(vec![1,2], vec![3,4,5])]
    fn test_down_all_nodes(#[case] reachable: Vec<u16>, #[case] unreachable: Vec<u16>) {
        let strategy = DownAllNodes {};
        let view = up_view(strategy.ordering(), &reachable, &unreachable);
        assert_eq!(strategy.decide(&view), DownAll);
    }

    #[rstest]
    #[case::majority(vec![1,2,3], vec![4,5], Duration::ZERO)]
    #[case::minority(vec![4,5], vec![1,2,3], Duration::from_secs(2))]
    #[case::equal_lowest_reachable(vec![1,2], vec![3,4], Duration::ZERO)]
    #[case::equal_lowest_unreachable(vec![3,4], vec![1,2], Duration::from_secs(2))]
    fn test_lease_majority(#[case] reachable: Vec<u16>, #[case] unreachable: Vec<u16>, #[case] expected_delay: Duration) {
        let strategy = LeaseMajority::new(None, Arc::new(MockLease::new()), Duration::from_secs(2));
        let view = up_view(strategy.ordering(), &reachable, &unreachable);
        assert_eq!(strategy.decide(&view), AcquireLeaseAndDownUnreachable(expected_delay));
        assert!(strategy.lease().is_some());
    }

    #[test]
    fn test_lease_majority_indirectly_connected() {
        let strategy = LeaseMajority::new(None, Arc::new(MockLease::new()), Duration::from_secs(2));
        let view = with_cycle(up_view(strategy.ordering(), &[4,5], &[1,2,3]), 1, 2);
        assert_eq!(strategy.decide(&view), AcquireLeaseAndDownIndirectlyConnected(Duration::ZERO));
    }

    #[rstest]
    #[case::static_quorum(ActiveStrategy::StaticQuorum, MemberOrdering::Address)]
    #[case::keep_majority(ActiveStrategy::KeepMajority, MemberOrdering::Address)]
    #[case::keep_oldest(ActiveStrategy::KeepOldest, MemberOrdering::Age)]
    #[case::down_all(ActiveStrategy::DownAll, MemberOrdering::Address)]
    #[case::lease_majority(ActiveStrategy::LeaseMajority, MemberOrdering::Address)]
    fn test_create_strategy(#[case] active_strategy: ActiveStrategy, #[case] expected_ordering: MemberOrdering) {
        let mut config = SplitBrainResolverConfig::new();
        config.active_strategy = active_strategy;
        config.static_quorum.quorum_size = Some(3);
        config.lease_majority.lease_implementation = Some("test-lease".to_string());

        let mut leases: FxHashMap<String, Arc<dyn Lease>> = FxHashMap::default();
        leases.insert("test-lease".to_string(), Arc::new(MockLease::new()));

        let strategy = create_strategy(&config, &leases).unwrap();
        assert_eq!(strategy.ordering(), expected_ordering);
        assert_eq!(strategy.lease().is_some(), active_strategy == ActiveStrategy::LeaseMajority);
    }

    #[rstest]
    #[case::missing_quorum_size(ActiveStrategy::StaticQuorum, None, Some("test-lease"))]
    #[case::zero_quorum_size(ActiveStrategy::StaticQuorum, Some(0), Some("test-lease"))]
    #[case::missing_lease_implementation(ActiveStrategy::LeaseMajority, Some(3), None)]
    #[case::empty_lease_implementation(ActiveStrategy::LeaseMajority, Some(3), Some(""))]
    #[case::unknown_lease_implementation(ActiveStrategy::LeaseMajority, Some(3), Some("other-lease"))]
    fn test_create_strategy_invalid(#[case] active_strategy: ActiveStrategy, #[case] quorum_size: Option<usize>, #[case] lease_implementation: Option<&str>) {
        let mut config = SplitBrainResolverConfig::new();
        config.active_strategy = active_strategy;
        config.static_quorum.quorum_size = quorum_size;
        config.lease_majority.lease_implementation = lease_implementation.map(|s| s.to_string());

        let mut leases: FxHashMap<String, Arc<dyn Lease>> = FxHashMap::default();
        leases.insert("test-lease".to_string(), Arc::new(MockLease::new()));

        assert!(create_strategy(&config, &leases).is_err());
    }
}
