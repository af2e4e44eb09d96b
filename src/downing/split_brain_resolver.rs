use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, trace, warn};

use crate::cluster::cluster_downing::ClusterDowning;
use crate::cluster::cluster_events::{ClusterEvent, LeaderChangedData};
use crate::cluster::member::Member;
use crate::cluster::node_addr::NodeAddr;
use crate::cluster::reachability::Reachability;
use crate::downing::decision::Decision;
use crate::downing::downing_strategy::DowningStrategy;
use crate::downing::lease::ReleaseLeaseCondition;
use crate::downing::membership_view::MembershipView;
use crate::downing::reachability_stats::ReachabilityChangedStats;
use crate::downing::resolver_config::SplitBrainResolverConfig;


/// Everything the resolver reacts to. Lease results and the delayed lease acquisition are
///  posted to the resolver's own mailbox by spawned tasks, so the resolver never blocks on
///  lease I/O.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ResolverMessage {
    Cluster(ClusterEvent),
    Tick,
    AcquireLease,
    AcquireLeaseResult(bool),
    ReleaseLeaseResult(bool),
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum ResolverState {
    Normal,
    WaitingForLease(Decision),
}

/// The [SplitBrainResolver] keeps a [MembershipView] up to date from cluster events, and when
///  the set of unreachable nodes has been stable for `stable_after`, it asks the
///  [DowningStrategy] for a [Decision] and downs the nodes that decision implies.
///
/// Only the leader takes downing decisions, and only after it was added to the cluster itself.
///  Other nodes keep their view current so they can take over, and they participate in downing
///  all nodes if reachability keeps changing for too long.
///
/// Decisions that require a lease are taken in two steps: the resolver waits for the lease
///  and queues all cluster events until it has the lease acquisition's result, replaying them
///  afterwards. This serializes decisions without losing or reordering events.
pub struct SplitBrainResolver<C: ClusterDowning> {
    myself: NodeAddr,
    config: Arc<SplitBrainResolverConfig>,
    strategy: Box<dyn DowningStrategy>,
    view: MembershipView,
    cluster: Arc<C>,

    is_leader: bool,
    self_member_added: bool,
    stable_deadline: Instant,
    reachability_changed_stats: ReachabilityChangedStats,
    release_lease_condition: ReleaseLeaseCondition,

    state: ResolverState,
    stash: VecDeque<ResolverMessage>,
    mailbox: mpsc::Sender<ResolverMessage>,
    acquire_lease_timer: Option<JoinHandle<()>>,
    is_terminated: bool,
}

impl <C: ClusterDowning> SplitBrainResolver<C> {
    pub fn new(config: Arc<SplitBrainResolverConfig>, myself: NodeAddr, strategy: Box<dyn DowningStrategy>, cluster: Arc<C>, mailbox: mpsc::Sender<ResolverMessage>) -> SplitBrainResolver<C> {
        let now = Instant::now();
        let view = MembershipView::new(strategy.ordering());

        info!("starting split brain resolver on {:?} with strategy {:?}, stable-after {:?}, down-all-when-unstable {:?}",
            myself, strategy, config.stable_after, config.down_all_when_unstable_after());

        SplitBrainResolver {
            myself,
            stable_deadline: now + config.stable_after,
            config,
            strategy,
            view,
            cluster,
            is_leader: false,
            self_member_added: false,
            reachability_changed_stats: ReachabilityChangedStats::new(now),
            release_lease_condition: ReleaseLeaseCondition::NoLease,
            state: ResolverState::Normal,
            stash: VecDeque::new(),
            mailbox,
            acquire_lease_timer: None,
            is_terminated: false,
        }
    }

    /// true after this node itself was removed from the cluster - the resolver ignores all
    ///  further messages
    pub fn is_terminated(&self) -> bool {
        self.is_terminated
    }

    /// only the leader takes downing decisions, and only if it was added to the cluster
    pub fn is_responsible(&self) -> bool {
        self.is_leader && self.self_member_added
    }

    pub fn view(&self) -> &MembershipView {
        &self.view
    }

    pub fn release_lease_condition(&self) -> &ReleaseLeaseCondition {
        &self.release_lease_condition
    }

    /// stops pending timers. In-flight lease requests are not canceled, their results are
    ///  discarded.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.acquire_lease_timer.take() {
            handle.abort();
        }
    }

    pub async fn on_message(&mut self, message: ResolverMessage) {
        if self.is_terminated {
            trace!("split brain resolver is terminated - ignoring {:?}", message);
            return;
        }

        match self.state {
            ResolverState::Normal => self.on_message_normal(message).await,
            ResolverState::WaitingForLease(decision) => self.on_message_waiting_for_lease(decision, message).await,
        }

        // replay messages that were queued while waiting for the lease
        while self.state == ResolverState::Normal && !self.is_terminated {
            match self.stash.pop_front() {
                Some(message) => self.on_message_normal(message).await,
                None => break,
            }
        }
    }

    async fn on_message_normal(&mut self, message: ResolverMessage) {
        match message {
            ResolverMessage::Cluster(event) => self.on_cluster_event(event),
            ResolverMessage::Tick => self.on_tick().await,
            ResolverMessage::ReleaseLeaseResult(released) => self.on_release_lease_result(released),
            ResolverMessage::AcquireLease | ResolverMessage::AcquireLeaseResult(_) => {
                debug!("ignoring stale lease message {:?}", message);
            }
        }
    }

    async fn on_message_waiting_for_lease(&mut self, decision: Decision, message: ResolverMessage) {
        match message {
            ResolverMessage::AcquireLease => {
                self.acquire_lease_timer = None;
                self.acquire_lease();
            }
            ResolverMessage::AcquireLeaseResult(holding_lease) => {
                self.state = ResolverState::Normal;
                self.on_acquire_lease_result(decision, holding_lease).await;
            }
            ResolverMessage::Tick => {
                trace!("waiting for lease for decision {:?} - ignoring tick", decision);
            }
            ResolverMessage::Cluster(_) | ResolverMessage::ReleaseLeaseResult(_) => {
                trace!("waiting for lease for decision {:?} - stashing {:?}", decision, message);
                self.stash.push_back(message);
            }
        }
    }

    fn on_cluster_event(&mut self, event: ClusterEvent) {
        match event {
            ClusterEvent::SeenChanged(data) => self.view.set_seen_by(data.seen_by),
            ClusterEvent::MemberJoined(m) => self.add_joining(m),
            ClusterEvent::MemberWeaklyUp(m) => self.add_weakly_up(m),
            ClusterEvent::MemberUp(m) => self.add_up(m),
            ClusterEvent::MemberLeft(m) => self.leaving(m),
            ClusterEvent::MemberExited(m) => self.exited(m),
            ClusterEvent::MemberRemoved(m) => self.removed(m),
            ClusterEvent::MemberDowned(m) => self.unreachable_member(m),
            ClusterEvent::UnreachableMember(m) => self.unreachable_member(m),
            ClusterEvent::ReachableMember(m) => self.reachable_member(m),
            ClusterEvent::ReachabilityChanged(r) => self.reachability_changed(r),
            ClusterEvent::LeaderChanged(data) => self.leader_changed(data),
        }
    }

    fn add_joining(&mut self, m: Member) {
        debug!("add joining {:?}", m);
        self.mutate_view(true, |view| view.add(m));
    }

    fn add_weakly_up(&mut self, m: Member) {
        debug!("add weakly up {:?}", m);
        self.add_and_check_self(m);
    }

    fn add_up(&mut self, m: Member) {
        debug!("add up {:?}", m);
        self.add_and_check_self(m);
    }

    fn add_and_check_self(&mut self, m: Member) {
        let is_self = m.addr == self.myself;
        self.mutate_view(true, |view| view.add(m));
        if is_self && !self.self_member_added {
            let was_responsible = self.is_responsible();
            self.self_member_added = true;
            self.log_responsibility_change(was_responsible);
        }
    }

    fn leaving(&mut self, m: Member) {
        debug!("leaving {:?}", m);
        self.mutate_view(false, |view| view.add(m));
    }

    fn exited(&mut self, m: Member) {
        debug!("exited {:?}", m);
        self.mutate_view(false, |view| view.add(m));
        self.reset_reachability_changed_stats_if_all_unreachable_downed();
    }

    fn removed(&mut self, m: Member) {
        if m.addr == self.myself {
            info!("this node {:?} was removed from the cluster - stopping split brain resolver", self.myself);
            self.is_terminated = true;
            self.shutdown();
            return;
        }

        debug!("removed {:?}", m);
        let addr = m.addr;
        self.mutate_view(false, |view| view.remove(&m));
        self.reset_reachability_changed_stats_if_all_unreachable_downed();
        self.update_release_lease_condition(addr);
    }

    fn unreachable_member(&mut self, m: Member) {
        if m.addr == self.myself {
            return;
        }

        debug!("unreachable {:?}", m);
        self.mutate_view(true, |view| view.add_unreachable(m));
        self.on_reachability_change();
    }

    fn reachable_member(&mut self, m: Member) {
        if m.addr == self.myself {
            return;
        }

        debug!("reachable {:?}", m);
        self.mutate_view(true, |view| view.add_reachable(m));
        self.on_reachability_change();
    }

    fn reachability_changed(&mut self, reachability: Reachability) {
        // the stable deadline is driven by unreachable / reachable members
        if self.view.set_reachability(&reachability) {
            debug!("reachability changed: {:?}", self.view.reachability());
            self.on_reachability_change();
        }
    }

    fn on_reachability_change(&mut self) {
        self.reachability_changed_stats = self.reachability_changed_stats.with_change(Instant::now());
        if !self.reset_reachability_changed_stats_if_all_unreachable_downed() {
            debug!("reachability changed: {}", self.reachability_changed_stats);
        }
    }

    /// returns true if the stats were reset
    fn reset_reachability_changed_stats_if_all_unreachable_downed(&mut self) -> bool {
        if self.reachability_changed_stats.is_empty() || !self.view.is_all_unreachable_down_or_exiting() {
            return false;
        }
        debug!("all unreachable members healed, downed or removed - resetting reachability changed stats");
        self.reset_reachability_changed_stats();
        true
    }

    fn leader_changed(&mut self, data: LeaderChangedData) {
        let was_responsible = self.is_responsible();
        self.is_leader = data.new_leader == Some(self.myself);
        self.log_responsibility_change(was_responsible);
    }

    fn log_responsibility_change(&self, was_responsible: bool) {
        match (was_responsible, self.is_responsible()) {
            (false, true) => info!("this node is now the leader responsible for downing decisions among the reachable nodes (there may be more leaders)"),
            (true, false) => info!("this node is not the leader any more and not responsible for downing decisions"),
            _ => {}
        }
    }

    /// applies a modification to the view, resetting the stable deadline if requested
    fn mutate_view(&mut self, reset_stable: bool, f: impl FnOnce(&mut MembershipView)) {
        let unreachable_before = self.view.unreachable().len();
        f(&mut self.view);
        let unreachable_after = self.view.unreachable().len();

        if reset_stable {
            if self.is_responsible() {
                if unreachable_before == 0 && unreachable_after > 0 {
                    info!("found {} unreachable members, waiting for stable-after {:?} before taking a downing decision", unreachable_after, self.config.stable_after);
                }
                else if unreachable_before > 0 && unreachable_after == 0 {
                    info!("all unreachable members healed during stable-after period, no downing decision necessary for now");
                }
                else if unreachable_after > 0 {
                    info!("unreachable members changed during stable-after period, resetting timer: {} unreachable members, no downing decision before {:?} from now", unreachable_after, self.config.stable_after);
                }
            }
            self.reset_stable_deadline();
        }
    }

    fn reset_stable_deadline(&mut self) {
        self.stable_deadline = Instant::now() + self.config.stable_after;
    }

    fn reset_reachability_changed_stats(&mut self) {
        self.reachability_changed_stats = ReachabilityChangedStats::new(Instant::now());
    }

    fn update_release_lease_condition(&mut self, removed: NodeAddr) {
        if let ReleaseLeaseCondition::WhenMembersRemoved(nodes) = &mut self.release_lease_condition {
            nodes.remove(&removed);
            if nodes.is_empty() {
                // retried on subsequent ticks if releasing fails
                self.release_lease_condition = ReleaseLeaseCondition::WhenTimeElapsed(Instant::now() + self.config.release_lease_after());
            }
        }
    }

    async fn on_tick(&mut self) {
        let now = Instant::now();

        self.check_instability(now).await;

        if self.is_responsible() && !self.view.unreachable().is_empty() && self.stable_deadline <= now {
            let decision = self.strategy.decide(&self.view);
            match decision.acquire_lease_delay() {
                None => {
                    self.act_on_decision(decision).await;
                }
                Some(delay) => self.on_lease_decision(decision, delay).await,
            }
        }

        if let ReleaseLeaseCondition::WhenTimeElapsed(deadline) = self.release_lease_condition {
            if deadline <= now {
                self.release_lease();
            }
        }
    }

    async fn check_instability(&mut self, now: Instant) {
        let stats = self.reachability_changed_stats;
        if stats.is_empty() {
            return;
        }

        match self.config.down_all_when_unstable_after() {
            Some(down_all_when_unstable) => {
                if now.duration_since(stats.first_change_timestamp) > self.config.stable_after + down_all_when_unstable {
                    warn!("detected instability and will down all nodes: {}", stats);
                    self.act_on_decision(Decision::DownAll).await;
                    // nodes_to_down may have been empty if everybody is down already
                    self.reset_reachability_changed_stats();
                }
            }
            None => {
                let quiet_period = self.config.stable_after * 2;
                if now.duration_since(stats.latest_change_timestamp) > quiet_period {
                    debug!("no reachability changes within {:?}, resetting stats", quiet_period);
                    self.reset_reachability_changed_stats();
                }
            }
        }
    }

    async fn on_lease_decision(&mut self, decision: Decision, delay: Duration) {
        let Some(lease) = self.strategy.lease() else {
            warn!("decision {:?} requires a lease, but strategy {:?} has none - not downing anything", decision, self.strategy);
            return;
        };

        if lease.check_lease() {
            info!("holding lease {} already, acting on decision {:?}", lease.lease_name(), decision);
            self.act_on_lease_decision(decision).await;
            return;
        }

        if delay.is_zero() {
            self.acquire_lease();
        }
        else {
            debug!("acquiring lease {} for decision {:?} in {:?}", lease.lease_name(), decision, delay);
            let mailbox = self.mailbox.clone();
            self.acquire_lease_timer = Some(tokio::spawn(async move {
                time::sleep(delay).await;
                let _ = mailbox.send(ResolverMessage::AcquireLease).await;
            }));
        }
        self.state = ResolverState::WaitingForLease(decision);
    }

    fn acquire_lease(&self) {
        let Some(lease) = self.strategy.lease() else {
            return;
        };

        debug!("trying to acquire lease {}", lease.lease_name());
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let holding_lease = match lease.acquire().await {
                Ok(holding_lease) => holding_lease,
                Err(e) => {
                    error!("failed to acquire lease {}: {}", lease.lease_name(), e);
                    false
                }
            };
            let _ = mailbox.send(ResolverMessage::AcquireLeaseResult(holding_lease)).await;
        });
    }

    async fn on_acquire_lease_result(&mut self, decision: Decision, holding_lease: bool) {
        if holding_lease {
            info!("acquired lease for decision {:?}", decision);
            self.act_on_lease_decision(decision).await;
        }
        else {
            let reverse_decision = decision.reverse();
            info!("did not acquire lease for decision {:?}, downing with reverse decision {:?} instead", decision, reverse_decision);
            self.act_on_decision(reverse_decision).await;
            self.release_lease_condition = ReleaseLeaseCondition::NoLease;
        }
    }

    /// acts on a decision for which this node holds the lease, and keeps the lease until the
    ///  downed nodes are removed
    async fn act_on_lease_decision(&mut self, decision: Decision) {
        let downed = self.act_on_decision(decision).await;

        self.release_lease_condition = match std::mem::replace(&mut self.release_lease_condition, ReleaseLeaseCondition::NoLease) {
            ReleaseLeaseCondition::WhenMembersRemoved(mut nodes) => {
                nodes.extend(downed);
                ReleaseLeaseCondition::WhenMembersRemoved(nodes)
            }
            _ if downed.is_empty() => ReleaseLeaseCondition::WhenTimeElapsed(Instant::now() + self.config.release_lease_after()),
            _ => ReleaseLeaseCondition::WhenMembersRemoved(downed),
        };
    }

    fn release_lease(&self) {
        if self.release_lease_condition == ReleaseLeaseCondition::NoLease {
            return;
        }
        let Some(lease) = self.strategy.lease() else {
            return;
        };

        debug!("releasing lease {}", lease.lease_name());
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            let released = match lease.release().await {
                Ok(released) => released,
                Err(e) => {
                    error!("failed to release lease {}: {}", lease.lease_name(), e);
                    false
                }
            };
            let _ = mailbox.send(ResolverMessage::ReleaseLeaseResult(released)).await;
        });
    }

    fn on_release_lease_result(&mut self, released: bool) {
        if !released {
            info!("lease was not released - retrying on the next tick");
            return;
        }

        if let ReleaseLeaseCondition::WhenTimeElapsed(deadline) = self.release_lease_condition {
            // a new lease decision may have been taken in the meantime
            if deadline <= Instant::now() {
                info!("released lease");
                self.release_lease_condition = ReleaseLeaseCondition::NoLease;
            }
        }
    }

    /// downs the nodes implied by a decision, downing this node last if it is affected
    async fn act_on_decision(&mut self, decision: Decision) -> BTreeSet<NodeAddr> {
        let nodes_to_down = match self.view.nodes_to_down(decision, self.strategy.as_ref()) {
            Ok(nodes) => nodes,
            Err(e) => {
                warn!("{} - downing all nodes instead of {:?}", e, decision);
                self.view.nodes_to_down(Decision::DownAll, self.strategy.as_ref())
                    .unwrap_or_default()
            }
        };

        self.observe_decision(decision, &nodes_to_down);

        if !nodes_to_down.is_empty() {
            for &node in nodes_to_down.iter().filter(|&&n| n != self.myself) {
                self.cluster.down(node).await;
            }
            if nodes_to_down.contains(&self.myself) {
                self.cluster.down(self.myself).await;
            }

            self.reset_reachability_changed_stats();
            self.reset_stable_deadline();
        }

        nodes_to_down
    }

    fn observe_decision(&self, decision: Decision, nodes_to_down: &BTreeSet<NodeAddr>) {
        let downing_myself = nodes_to_down.contains(&self.myself);
        let indirectly_connected = if decision.is_indirectly_connected() {
            self.view.indirectly_connected().into_iter().collect::<BTreeSet<_>>()
        }
        else {
            BTreeSet::new()
        };

        info!("took downing decision {:?} and is downing {:?}{}, {} unreachable of {} members, indirectly connected {:?}, reachability {:?}",
            decision,
            nodes_to_down,
            if downing_myself { " including myself" } else { "" },
            self.view.unreachable().len(),
            self.view.all_members().len(),
            indirectly_connected,
            self.view.reachability().records());

        if downing_myself {
            warn!("downing myself {:?} as part of decision {:?}", self.myself, decision);
        }
    }
}
