use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Grace period used by [`ActivationPolicy::default`]
pub const DEFAULT_STOP_DELAY: Duration = Duration::from_millis(1_000);

/// When a container's producers run, relative to whether anyone observes its state.
///
/// Serialized with a `mode` tag so it can be loaded from configuration:
/// `{"mode": "eager"}`, `{"mode": "lazy"}` or
/// `{"mode": "while_subscribed", "stop_delay_ms": 1000}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ActivationPolicy {
    /// Start at construction and run until the producers drain or the container is disposed
    Eager,
    /// Start on the first subscriber, then run to completion regardless of unsubscription
    Lazy,
    /// Run while there is at least one subscriber, stopping `stop_delay` after the last one leaves
    WhileSubscribed {
        #[serde(rename = "stop_delay_ms", with = "millis", default = "default_stop_delay")]
        stop_delay: Duration,
    },
}

impl ActivationPolicy {
    pub fn while_subscribed(stop_delay: Duration) -> Self { Self::WhileSubscribed { stop_delay } }

    /// The stop grace period, for policies that stop at all
    pub fn stop_delay(&self) -> Option<Duration> {
        match self {
            Self::WhileSubscribed { stop_delay } => Some(*stop_delay),
            Self::Eager | Self::Lazy => None,
        }
    }
}

impl Default for ActivationPolicy {
    fn default() -> Self { Self::while_subscribed(DEFAULT_STOP_DELAY) }
}

fn default_stop_delay() -> Duration { DEFAULT_STOP_DELAY }

/// Serializable construction options for a container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// Used to tell containers apart in logs
    pub name: Option<String>,
    pub policy: ActivationPolicy,
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
