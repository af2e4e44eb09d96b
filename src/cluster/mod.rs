pub mod cluster_downing;
pub mod cluster_events;
pub mod member;
pub mod node_addr;
pub mod reachability;
