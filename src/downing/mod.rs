pub mod decision;
pub mod downing_strategy;
pub mod lease;
pub mod membership_view;
pub mod reachability_stats;
pub mod resolver_config;
pub mod resolver_driver;
pub mod split_brain_resolver;
