//! Switch registry backed by the daemon configuration.

use std::sync::{Arc, Mutex};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::debug;

use ctilink_config::Config;
use ctilink_esl::{RegistryProvider, StoreError, SwitchId, SwitchTarget};

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Registry exposing the single configured switch.
///
/// The switch only counts as active when a password is configured. Heartbeats
/// update an in-memory last-seen timestamp shared between clones.
#[derive(Debug, Clone)]
pub struct ConfiguredRegistry {
    target: Option<SwitchTarget>,
    last_seen: Arc<Mutex<Option<OffsetDateTime>>>,
}

impl ConfiguredRegistry {
    /// Builds the registry from the resolved configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let target = config.switch_password().map(|password| SwitchTarget {
            id: SwitchId::new(config.switch_id()),
            host: config.switch_endpoint().host().to_owned(),
            port: config.switch_endpoint().port(),
            password: password.to_owned(),
        });
        Self {
            target,
            last_seen: Arc::default(),
        }
    }

    /// When the switch last sent a heartbeat.
    #[must_use]
    pub fn last_seen(&self) -> Option<OffsetDateTime> {
        self.last_seen.lock().ok().and_then(|seen| *seen)
    }
}

impl RegistryProvider for ConfiguredRegistry {
    fn active_target(&self) -> Result<Option<SwitchTarget>, StoreError> {
        Ok(self.target.clone())
    }

    fn update_last_seen(&mut self, id: &SwitchId) -> Result<(), StoreError> {
        if self.target.as_ref().is_none_or(|target| &target.id != id) {
            return Err(StoreError::new(format!("unknown switch '{id}'")));
        }
        let now = OffsetDateTime::now_utc();
        let mut seen = self
            .last_seen
            .lock()
            .map_err(|_| StoreError::new("registry lock poisoned"))?;
        *seen = Some(now);
        debug!(
            target: REGISTRY_TARGET,
            switch = %id,
            at = now.format(&Rfc3339).unwrap_or_default(),
            "switch seen"
        );
        Ok(())
    }
}
