use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::Deserialize;

use crate::util::duration::parse_duration;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ActiveStrategy {
    StaticQuorum,
    KeepMajority,
    KeepOldest,
    DownAll,
    LeaseMajority,
}
impl FromStr for ActiveStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "static-quorum" => Ok(ActiveStrategy::StaticQuorum),
            "keep-majority" => Ok(ActiveStrategy::KeepMajority),
            "keep-oldest" => Ok(ActiveStrategy::KeepOldest),
            "down-all" => Ok(ActiveStrategy::DownAll),
            "lease-majority" => Ok(ActiveStrategy::LeaseMajority),
            other => Err(anyhow!("unknown downing strategy {:?}: expected one of static-quorum, keep-majority, keep-oldest, down-all, lease-majority", other)),
        }
    }
}

/// Downing all nodes if reachability keeps changing for too long
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DownAllWhenUnstable {
    /// derived from `stable_after`
    On,
    Off,
    After(Duration),
}

#[derive(Debug, Clone, Default)]
pub struct StaticQuorumSettings {
    /// no default: the quorum size must be chosen for the actual cluster size
    pub quorum_size: Option<usize>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct KeepMajoritySettings {
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KeepOldestSettings {
    pub down_if_alone: bool,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct LeaseMajoritySettings {
    /// id of the lease to use, see [crate::downing::downing_strategy::create_strategy]
    pub lease_implementation: Option<String>,
    pub acquire_lease_delay_for_minority: Duration,
    pub role: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SplitBrainResolverConfig {
    pub active_strategy: ActiveStrategy,

    /// the unreachable set must remain unchanged for this period before a downing decision is
    ///  taken
    pub stable_after: Duration,
    pub down_all_when_unstable: DownAllWhenUnstable,

    pub static_quorum: StaticQuorumSettings,
    pub keep_majority: KeepMajoritySettings,
    pub keep_oldest: KeepOldestSettings,
    pub lease_majority: LeaseMajoritySettings,
}

impl Default for SplitBrainResolverConfig {
    fn default() -> Self {
        SplitBrainResolverConfig::new()
    }
}

impl SplitBrainResolverConfig {
    pub fn new() -> SplitBrainResolverConfig {
        SplitBrainResolverConfig {
            active_strategy: ActiveStrategy::KeepMajority,
            stable_after: Duration::from_secs(20),
            down_all_when_unstable: DownAllWhenUnstable::On,
            static_quorum: StaticQuorumSettings::default(),
            keep_majority: KeepMajoritySettings::default(),
            keep_oldest: KeepOldestSettings {
                down_if_alone: true,
                role: None,
            },
            lease_majority: LeaseMajoritySettings {
                lease_implementation: None,
                acquire_lease_delay_for_minority: Duration::from_secs(2),
                role: None,
            },
        }
    }

    /// Reads the configuration from a TOML document, e.g.
    ///
    /// ```toml
    /// active-strategy = "static-quorum"
    /// stable-after = "20s"
    /// down-all-when-unstable = "on"
    ///
    /// [static-quorum]
    /// quorum-size = 3
    /// role = "backend"
    /// ```
    ///
    /// Missing keys keep their defaults. The result is validated.
    pub fn from_toml_str(s: &str) -> anyhow::Result<SplitBrainResolverConfig> {
        let raw: RawConfig = toml::from_str(s)
            .context("invalid split brain resolver configuration")?;

        let mut config = SplitBrainResolverConfig::new();

        if let Some(s) = raw.active_strategy {
            config.active_strategy = s.parse()?;
        }
        if let Some(s) = raw.stable_after {
            config.stable_after = parse_duration(&s).context("invalid stable-after")?;
        }
        if let Some(v) = raw.down_all_when_unstable {
            config.down_all_when_unstable = v.try_into()?;
        }
        if let Some(raw) = raw.static_quorum {
            if let Some(quorum_size) = raw.quorum_size {
                if quorum_size < 1 {
                    return Err(anyhow!("static-quorum.quorum-size must be at least 1, was {}", quorum_size));
                }
                config.static_quorum.quorum_size = Some(quorum_size as usize);
            }
            config.static_quorum.role = non_empty(raw.role);
        }
        if let Some(raw) = raw.keep_majority {
            config.keep_majority.role = non_empty(raw.role);
        }
        if let Some(raw) = raw.keep_oldest {
            if let Some(down_if_alone) = raw.down_if_alone {
                config.keep_oldest.down_if_alone = down_if_alone;
            }
            config.keep_oldest.role = non_empty(raw.role);
        }
        if let Some(raw) = raw.lease_majority {
            config.lease_majority.lease_implementation = non_empty(raw.lease_implementation);
            if let Some(s) = raw.acquire_lease_delay_for_minority {
                config.lease_majority.acquire_lease_delay_for_minority = parse_duration(&s)
                    .context("invalid lease-majority.acquire-lease-delay-for-minority")?;
            }
            config.lease_majority.role = non_empty(raw.role);
        }

        config.validate()?;
        Ok(config)
    }

    /// checks the constraints that must hold before a resolver is started
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.stable_after.is_zero() {
            return Err(anyhow!("stable-after must be > 0"));
        }
        if let DownAllWhenUnstable::After(d) = self.down_all_when_unstable {
            if d.is_zero() {
                return Err(anyhow!("down-all-when-unstable must be > 0 or 'off'"));
            }
        }

        match self.active_strategy {
            ActiveStrategy::StaticQuorum => match self.static_quorum.quorum_size {
                Some(n) if n >= 1 => {}
                Some(n) => return Err(anyhow!("static-quorum.quorum-size must be at least 1, was {}", n)),
                None => return Err(anyhow!("static-quorum requires static-quorum.quorum-size")),
            },
            ActiveStrategy::LeaseMajority => {
                if self.lease_majority.lease_implementation.as_deref().map_or(true, str::is_empty) {
                    return Err(anyhow!("lease-majority requires lease-majority.lease-implementation"));
                }
            }
            ActiveStrategy::KeepMajority | ActiveStrategy::KeepOldest | ActiveStrategy::DownAll => {}
        }
        Ok(())
    }

    /// the period of continuous reachability changes after which all nodes are downed, `None`
    ///  if this is disabled
    pub fn down_all_when_unstable_after(&self) -> Option<Duration> {
        match self.down_all_when_unstable {
            DownAllWhenUnstable::On => Some(Duration::from_secs(4).max(self.stable_after.mul_f64(0.75))),
            DownAllWhenUnstable::Off => None,
            DownAllWhenUnstable::After(d) => Some(d),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        (self.stable_after / 2).clamp(Duration::from_millis(1), Duration::from_secs(1))
    }

    /// how long to keep a lease if a decision taken with it did not down any nodes
    pub fn release_lease_after(&self) -> Duration {
        self.stable_after * 2
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|s| !s.is_empty())
}


#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawConfig {
    active_strategy: Option<String>,
    stable_after: Option<String>,
    down_all_when_unstable: Option<RawOnOff>,
    static_quorum: Option<RawStaticQuorum>,
    keep_majority: Option<RawKeepMajority>,
    keep_oldest: Option<RawKeepOldest>,
    lease_majority: Option<RawLeaseMajority>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOnOff {
    Flag(bool),
    Text(String),
}
impl TryFrom<RawOnOff> for DownAllWhenUnstable {
    type Error = anyhow::Error;

    fn try_from(value: RawOnOff) -> Result<Self, Self::Error> {
        match value {
            RawOnOff::Flag(true) => Ok(DownAllWhenUnstable::On),
            RawOnOff::Flag(false) => Ok(DownAllWhenUnstable::Off),
            RawOnOff::Text(s) => match s.trim() {
                "on" => Ok(DownAllWhenUnstable::On),
                "off" => Ok(DownAllWhenUnstable::Off),
                other => Ok(DownAllWhenUnstable::After(
                    parse_duration(other).context("invalid down-all-when-unstable")?
                )),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawStaticQuorum {
    quorum_size: Option<i64>,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawKeepMajority {
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawKeepOldest {
    down_if_alone: Option<bool>,
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawLeaseMajority {
    lease_implementation: Option<String>,
    acquire_lease_delay_for_minority: Option<String>,
    role: Option<String>,
}
