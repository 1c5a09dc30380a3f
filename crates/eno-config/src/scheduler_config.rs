// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Typed tunables for the scheduling core.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Logical key under which [`SchedulerConfig`] is persisted via a [`ConfigStore`].
pub const CONFIG_KEY: &str = "scheduler_config";

/// The four knobs the scheduling core is parameterized by at construction.
///
/// Durations are stored as whole seconds/milliseconds on the wire (not
/// `std::time::Duration` directly, which has no stable `serde` impl) and
/// converted with [`SchedulerConfig::cooldown_period`] and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Cluster-wide cap on in-flight syntheses.
    pub concurrency_limit: u32,
    /// Cooldown period, in seconds, added to the latest deferred `initialized`
    /// timestamp to compute the next permissible deferred dispatch.
    pub cooldown_period_secs: u64,
    /// Grace period, in milliseconds, the cache-consistency gate waits before
    /// opening unconditionally. Defaults to roughly one second.
    pub cache_grace_period_ms: u64,
    /// Threshold, in seconds, past which a composition that has not been
    /// reconciled is reported stuck by the watchdog.
    pub watchdog_threshold_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            cooldown_period_secs: 1,
            cache_grace_period_ms: 1_000,
            watchdog_threshold_secs: 300,
        }
    }
}

impl SchedulerConfig {
    /// The configured cooldown period as a [`Duration`].
    #[must_use]
    pub fn cooldown_period(&self) -> Duration {
        Duration::from_secs(self.cooldown_period_secs)
    }

    /// The configured cache-consistency grace period as a [`Duration`].
    #[must_use]
    pub fn cache_grace_period(&self) -> Duration {
        Duration::from_millis(self.cache_grace_period_ms)
    }

    /// The configured watchdog threshold as a [`Duration`].
    #[must_use]
    pub fn watchdog_threshold(&self) -> Duration {
        Duration::from_secs(self.watchdog_threshold_secs)
    }

    /// Load a [`SchedulerConfig`] from `store`, falling back to [`Default::default`]
    /// when no override has been persisted yet.
    pub fn load_or_default<S: ConfigStore>(store: &S) -> Result<Self, ConfigError> {
        let service = ConfigService::new(store);
        Ok(service.load(CONFIG_KEY)?.unwrap_or_default())
    }

    /// Persist this configuration through `store`.
    pub fn save<S: ConfigStore>(&self, store: &S) -> Result<(), ConfigError> {
        let service = ConfigService::new(store);
        service.save(CONFIG_KEY, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapStore(RefCell<HashMap<String, Vec<u8>>>);

    impl ConfigStore for MapStore {
        fn load_raw(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
            self.0
                .borrow()
                .get(key)
                .cloned()
                .ok_or(ConfigError::NotFound)
        }

        fn save_raw(&self, key: &str, data: &[u8]) -> Result<(), ConfigError> {
            self.0.borrow_mut().insert(key.to_string(), data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn defaults_when_unset() {
        let store = MapStore::default();
        let cfg = SchedulerConfig::load_or_default(&store).expect("load");
        assert_eq!(cfg, SchedulerConfig::default());
    }

    #[test]
    fn round_trips_through_store() {
        let store = MapStore::default();
        let cfg = SchedulerConfig {
            concurrency_limit: 17,
            ..SchedulerConfig::default()
        };
        cfg.save(&store).expect("save");
        let loaded = SchedulerConfig::load_or_default(&store).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn duration_accessors_convert_units() {
        let cfg = SchedulerConfig {
            cooldown_period_secs: 3,
            cache_grace_period_ms: 250,
            watchdog_threshold_secs: 600,
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.cooldown_period(), Duration::from_secs(3));
        assert_eq!(cfg.cache_grace_period(), Duration::from_millis(250));
        assert_eq!(cfg.watchdog_threshold(), Duration::from_secs(600));
    }
}
