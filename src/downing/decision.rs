use std::time::Duration;

/// The outcome of a [crate::downing::downing_strategy::DowningStrategy]: which group of nodes
///  should be downed.
///
/// As far as a strategy is concerned, there are two groups of nodes: "reachable" (i.e. 'us', the
///  nodes reachable from here) and "unreachable" (i.e. 'them'). In a clean network partition,
///  every side sees itself as reachable and the others as unreachable, so the strategies must
///  ensure that at most one side decides [Decision::DownUnreachable]. It is perfectly valid for
///  all sides to decide [Decision::DownReachable] - that shuts down the whole cluster, which is
///  preferable to two clusters running independently.
///
/// Nodes that are 'indirectly connected' (i.e. not cleanly separated) are handled separately:
///  they get downed while the 'normal' nodes are kept.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Decision {
    DownReachable,
    DownUnreachable,
    DownAll,
    DownIndirectlyConnected,
    /// the indirectly connected nodes and all reachable nodes - this is what remains of
    ///  [Decision::DownIndirectlyConnected] if the lease is held by someone else
    ReverseDownIndirectlyConnected,
    /// acquire the lease, waiting for the given delay first, then down the unreachable nodes
    AcquireLeaseAndDownUnreachable(Duration),
    /// acquire the lease, waiting for the given delay first, then down the indirectly
    ///  connected nodes
    AcquireLeaseAndDownIndirectlyConnected(Duration),
}
impl Decision {
    pub fn is_indirectly_connected(&self) -> bool {
        use Decision::*;

        match self {
            DownIndirectlyConnected | ReverseDownIndirectlyConnected | AcquireLeaseAndDownIndirectlyConnected(_) => true,
            DownReachable | DownUnreachable | DownAll | AcquireLeaseAndDownUnreachable(_) => false,
        }
    }

    /// returns the delay before acquiring the lease if this decision requires the lease,
    ///  `None` otherwise
    pub fn acquire_lease_delay(&self) -> Option<Duration> {
        use Decision::*;

        match self {
            AcquireLeaseAndDownUnreachable(delay) | AcquireLeaseAndDownIndirectlyConnected(delay) => Some(*delay),
            DownReachable | DownUnreachable | DownAll | DownIndirectlyConnected | ReverseDownIndirectlyConnected => None,
        }
    }

    /// The decision to take if this decision can not be taken, i.e. if the lease for it was
    ///  not acquired: If we can't down them, we down ourselves.
    pub fn reverse(&self) -> Decision {
        use Decision::*;

        match self {
            DownUnreachable => DownReachable,
            AcquireLeaseAndDownUnreachable(_) => DownReachable,
            DownReachable => DownUnreachable,
            DownAll => DownAll,
            DownIndirectlyConnected => ReverseDownIndirectlyConnected,
            AcquireLeaseAndDownIndirectlyConnected(_) => ReverseDownIndirectlyConnected,
            ReverseDownIndirectlyConnected => DownIndirectlyConnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use Decision::*;

    #[rstest]
    #[case::down_unreachable(DownUnreachable, DownReachable)]
    #[case::acquire_down_unreachable(AcquireLeaseAndDownUnreachable(Duration::from_secs(2)), DownReachable)]
    #[case::down_reachable(DownReachable, DownUnreachable)]
    #[case::down_all(DownAll, DownAll)]
    #[case::down_indirectly_connected(DownIndirectlyConnected, ReverseDownIndirectlyConnected)]
    #[case::acquire_down_indirectly_connected(AcquireLeaseAndDownIndirectlyConnected(Duration::ZERO), ReverseDownIndirectlyConnected)]
    #[case::reverse_down_indirectly_connected(ReverseDownIndirectlyConnected, DownIndirectlyConnected)]
    fn test_reverse(#[case] decision: Decision, #[case] expected: Decision) {
        assert_eq!(decision.reverse(), expected);
    }

    #[rstest]
    #[case::down_reachable(DownReachable, false, None)]
    #[case::down_unreachable(DownUnreachable, false, None)]
    #[case::down_all(DownAll, false, None)]
    #[case::down_indirectly_connected(DownIndirectlyConnected, true, None)]
    #[case::reverse_down_indirectly_connected(ReverseDownIndirectlyConnected, true, None)]
    #[case::acquire_down_unreachable(AcquireLeaseAndDownUnreachable(Duration::from_secs(3)), false, Some(Duration::from_secs(3)))]
    #[case::acquire_down_indirectly_connected(AcquireLeaseAndDownIndirectlyConnected(Duration::ZERO), true, Some(Duration::ZERO))]
    fn test_classification(#[case] decision: Decision, #[case] indirectly_connected: bool, #[case] lease_delay: Option<Duration>) {
        assert_eq!(decision.is_indirectly_connected(), indirectly_connected);
        assert_eq!(decision.acquire_lease_delay(), lease_delay);
    }

    #[test]
    fn test_payload_equality() {
        assert_eq!(AcquireLeaseAndDownUnreachable(Duration::from_secs(1)), AcquireLeaseAndDownUnreachable(Duration::from_secs(1)));
        assert_ne!(AcquireLeaseAndDownUnreachable(Duration::from_secs(1)), AcquireLeaseAndDownUnreachable(Duration::ZERO));
    }
}
