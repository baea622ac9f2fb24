use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_AUTO_ADVANCE_INTERVAL_MS: u64 = 10_000;

/// What drives automatic quote rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvanceSource {
    /// A recurring page timer.
    #[default]
    Timer,
    /// `animationiteration` events on the quote text slot.
    Animation,
}

/// Options shared by the components. Every key is optional in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub auto_advance_interval_ms: u64,
    pub pause_on_hover: bool,
    pub pause_when_offscreen: bool,
    pub focus_trap_enabled: bool,
    pub advance_source: AdvanceSource,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auto_advance_interval_ms: DEFAULT_AUTO_ADVANCE_INTERVAL_MS,
            pause_on_hover: false,
            pause_when_offscreen: false,
            focus_trap_enabled: true,
            advance_source: AdvanceSource::Timer,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|err| Error::ConfigParse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auto_advance_interval_ms == 0 {
            return Err(Error::InvalidConfig(
                "autoAdvanceIntervalMs must be greater than 0".into(),
            ));
        }
        if self.auto_advance_interval_ms > i64::MAX as u64 {
            return Err(Error::InvalidConfig(format!(
                "autoAdvanceIntervalMs is too large: {}",
                self.auto_advance_interval_ms
            )));
        }
        Ok(())
    }

    pub(crate) fn interval_ms(&self) -> i64 {
        i64::try_from(self.auto_advance_interval_ms).unwrap_or(i64::MAX)
    }
}
