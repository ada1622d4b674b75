//! Configuration management with validation and defaults
//!
//! Loaded from TOML; every section falls back to its `Default`.

use crate::errors::ConfigError;
use crate::games::GameKind;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StakehouseConfig {
    pub sessions: SessionsConfig,
    pub economy: EconomyConfig,
    pub energy: EnergyConfig,
    pub logging: LoggingConfig,
}

/// Time-to-live of every kind of session, in milliseconds
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    pub picker_ttl_ms: u64,
    pub energy_prompt_ttl_ms: u64,
    pub energy_menu_ttl_ms: u64,
    pub boosters_ttl_ms: u64,
    pub highlow_ttl_ms: u64,
    pub dice_roll_ttl_ms: u64,
    pub slot_machine_ttl_ms: u64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            picker_ttl_ms: 10_000,
            energy_prompt_ttl_ms: 60_000,
            energy_menu_ttl_ms: 10_000,
            boosters_ttl_ms: 60_000,
            highlow_ttl_ms: 60_000,
            dice_roll_ttl_ms: 10_000,
            slot_machine_ttl_ms: 10_000,
        }
    }
}

/// Starting balances and bet limits for new players
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    pub starting_wallet: u64,
    pub starting_bet: u64,
    pub min_bet: u64,
    pub max_bet: u64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_wallet: 10_000,
            starting_bet: 1_000,
            min_bet: 500,
            max_bet: 500_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyConfig {
    pub max_charge: u32,
    pub starting_charge: u32,
    /// Recharge window per upgrade tier; must not increase with tier
    pub regen_minutes_by_tier: Vec<u64>,
    pub stars_per_charge: u64,
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            max_charge: 10,
            starting_charge: 1,
            regen_minutes_by_tier: vec![60, 45, 30, 15],
            stars_per_charge: 10,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "stakehouse=info".to_string(),
        }
    }
}

impl StakehouseConfig {
    /// Short timeouts and verbose logging for tests
    pub fn testing() -> Self {
        Self {
            sessions: SessionsConfig {
                picker_ttl_ms: 1_000,
                energy_prompt_ttl_ms: 1_000,
                energy_menu_ttl_ms: 1_000,
                boosters_ttl_ms: 1_000,
                highlow_ttl_ms: 1_000,
                dice_roll_ttl_ms: 1_000,
                slot_machine_ttl_ms: 1_000,
            },
            logging: LoggingConfig {
                filter: "stakehouse=debug".to_string(),
            },
            ..Default::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ttls = [
            ("picker_ttl_ms", self.sessions.picker_ttl_ms),
            ("energy_prompt_ttl_ms", self.sessions.energy_prompt_ttl_ms),
            ("energy_menu_ttl_ms", self.sessions.energy_menu_ttl_ms),
            ("boosters_ttl_ms", self.sessions.boosters_ttl_ms),
            ("highlow_ttl_ms", self.sessions.highlow_ttl_ms),
            ("dice_roll_ttl_ms", self.sessions.dice_roll_ttl_ms),
            ("slot_machine_ttl_ms", self.sessions.slot_machine_ttl_ms),
        ];
        if let Some((name, _)) = ttls.iter().find(|(_, ttl)| *ttl == 0) {
            return Err(ConfigError::InvalidValue(format!("{} must be > 0", name)));
        }

        let economy = &self.economy;
        if economy.min_bet == 0 {
            return Err(ConfigError::InvalidValue("min_bet must be > 0".to_string()));
        }
        if economy.min_bet > economy.max_bet {
            return Err(ConfigError::LogicalInconsistency(format!(
                "min_bet {} exceeds max_bet {}",
                economy.min_bet, economy.max_bet
            )));
        }
        if economy.starting_bet < economy.min_bet || economy.starting_bet > economy.max_bet {
            return Err(ConfigError::LogicalInconsistency(
                "starting_bet must lie within [min_bet, max_bet]".to_string(),
            ));
        }

        let energy = &self.energy;
        if energy.regen_minutes_by_tier.is_empty() {
            return Err(ConfigError::InvalidValue(
                "regen_minutes_by_tier must not be empty".to_string(),
            ));
        }
        if energy.regen_minutes_by_tier.contains(&0) {
            return Err(ConfigError::InvalidValue(
                "regen_minutes_by_tier entries must be > 0".to_string(),
            ));
        }
        if energy
            .regen_minutes_by_tier
            .windows(2)
            .any(|pair| pair[1] > pair[0])
        {
            return Err(ConfigError::LogicalInconsistency(
                "regen_minutes_by_tier must not increase with tier".to_string(),
            ));
        }
        if energy.starting_charge > energy.max_charge {
            return Err(ConfigError::LogicalInconsistency(format!(
                "starting_charge {} exceeds max_charge {}",
                energy.starting_charge, energy.max_charge
            )));
        }
        if energy.stars_per_charge == 0 {
            return Err(ConfigError::InvalidValue(
                "stars_per_charge must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn picker_ttl(&self) -> Duration {
        Duration::from_millis(self.sessions.picker_ttl_ms)
    }

    pub fn energy_prompt_ttl(&self) -> Duration {
        Duration::from_millis(self.sessions.energy_prompt_ttl_ms)
    }

    pub fn energy_menu_ttl(&self) -> Duration {
        Duration::from_millis(self.sessions.energy_menu_ttl_ms)
    }

    pub fn boosters_ttl(&self) -> Duration {
        Duration::from_millis(self.sessions.boosters_ttl_ms)
    }

    pub fn game_ttl(&self, game: GameKind) -> Duration {
        Duration::from_millis(match game {
            GameKind::Highlow => self.sessions.highlow_ttl_ms,
            GameKind::DiceRoll => self.sessions.dice_roll_ttl_ms,
            GameKind::SlotMachine => self.sessions.slot_machine_ttl_ms,
        })
    }
}
