use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use calcwatch_common::{OperationDurations, Settings, DEFAULT_INACTIVITY_TIMEOUT_SECS};
use calcwatch_store::KvStore;

const PREFIX: &str = "settings/";
const ADD_KEY: &str = "settings/add-duration";
const SUBTRACT_KEY: &str = "settings/subtract-duration";
const MULTIPLY_KEY: &str = "settings/multiply-duration";
const DIVIDE_KEY: &str = "settings/divide-duration";
const INACTIVITY_KEY: &str = "settings/inactive-server-time";

/// Reads and writes the five configured durations.
///
/// Stored values are accepted as JSON integers or as strings holding an
/// integer. Nothing else is validated: a duration that does not parse reads
/// as `None`, and only the inactivity timeout falls back to a default.
#[derive(Clone)]
pub struct SettingsStore {
    store: Arc<dyn KvStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Settings> {
        let mut settings = Settings {
            durations: OperationDurations::default(),
            inactivity_timeout_secs: DEFAULT_INACTIVITY_TIMEOUT_SECS,
        };

        for (key, bytes) in self.store.list_prefix(PREFIX).await? {
            let value = parse_integer(&bytes);
            match key.as_str() {
                ADD_KEY => settings.durations.add = value,
                SUBTRACT_KEY => settings.durations.subtract = value,
                MULTIPLY_KEY => settings.durations.multiply = value,
                DIVIDE_KEY => settings.durations.divide = value,
                INACTIVITY_KEY => {
                    if let Some(secs) = value.and_then(|v| u64::try_from(v).ok()).filter(|v| *v > 0)
                    {
                        settings.inactivity_timeout_secs = secs;
                    }
                }
                other => tracing::debug!(key = other, "ignoring unknown settings key"),
            }
        }

        Ok(settings)
    }

    pub async fn save(&self, settings: &Settings) -> Result<()> {
        let d = settings.durations;
        for (key, value) in [
            (ADD_KEY, d.add),
            (SUBTRACT_KEY, d.subtract),
            (MULTIPLY_KEY, d.multiply),
            (DIVIDE_KEY, d.divide),
        ] {
            match value {
                Some(v) => self.store.put(key, serde_json::to_vec(&v)?).await?,
                None => {
                    self.store.delete(key).await?;
                }
            }
        }
        self.store
            .put(
                INACTIVITY_KEY,
                serde_json::to_vec(&settings.inactivity_timeout_secs)?,
            )
            .await?;
        Ok(())
    }

    /// The inactivity timeout in effect, writing the default back when the
    /// stored value is missing or unusable.
    pub async fn resolve_inactivity_timeout(&self) -> Result<u64> {
        let stored = self
            .store
            .get(INACTIVITY_KEY)
            .await?
            .and_then(|bytes| parse_integer(&bytes))
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0);

        match stored {
            Some(secs) => Ok(secs),
            None => {
                self.store
                    .put(
                        INACTIVITY_KEY,
                        serde_json::to_vec(&DEFAULT_INACTIVITY_TIMEOUT_SECS)?,
                    )
                    .await?;
                Ok(DEFAULT_INACTIVITY_TIMEOUT_SECS)
            }
        }
    }
}

fn parse_integer(bytes: &[u8]) -> Option<i64> {
    match serde_json::from_slice::<Value>(bytes).ok()? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
