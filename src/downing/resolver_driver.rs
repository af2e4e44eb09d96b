use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio::{select, time};
use tracing::info;

use crate::cluster::cluster_downing::ClusterDowning;
use crate::cluster::cluster_events::ClusterEvent;
use crate::cluster::node_addr::NodeAddr;
use crate::downing::downing_strategy::DowningStrategy;
use crate::downing::resolver_config::SplitBrainResolverConfig;
use crate::downing::split_brain_resolver::{ResolverMessage, SplitBrainResolver};

/// Runs a [SplitBrainResolver] for this node until this node is removed from the cluster, or
///  until the cluster event channel is closed.
pub async fn run_split_brain_resolver<C: ClusterDowning>(
    config: Arc<SplitBrainResolverConfig>,
    myself: NodeAddr,
    strategy: Box<dyn DowningStrategy>,
    cluster: Arc<C>,
    mut cluster_events: mpsc::Receiver<ClusterEvent>,
) -> anyhow::Result<()> {
    config.validate()?;

    let (send, mut recv) = mpsc::channel(1024);
    let mut resolver = SplitBrainResolver::new(config.clone(), myself, strategy, cluster, send);

    let mut ticks = time::interval(config.tick_interval());
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        select! {
            evt = cluster_events.recv() => {
                match evt {
                    Some(evt) => resolver.on_message(ResolverMessage::Cluster(evt)).await,
                    None => {
                        info!("cluster event channel was closed - stopping split brain resolver");
                        break;
                    }
                }
            }
            msg = recv.recv() => {
                // the resolver holds a sender, so the channel is never closed here
                if let Some(msg) = msg {
                    resolver.on_message(msg).await;
                }
            }
            _ = ticks.tick() => {
                resolver.on_message(ResolverMessage::Tick).await;
            }
        }

        if resolver.is_terminated() {
            break;
        }
    }

    resolver.shutdown();
    Ok(())
}
