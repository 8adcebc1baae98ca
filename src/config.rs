use crate::domain::{Address, Decimal};
use crate::engine::guard::{DEFAULT_FUNDING_WARNING_RATIO, DEFAULT_PRICE_IMPACT_WARNING_PCT};
use crate::engine::solver::{
    SolverSettings, DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_STEP, DEFAULT_TOLERANCE,
};
use rust_decimal_macros::dec;
use std::collections::HashMap;
use thiserror::Error;

const DEFAULT_SLIPPAGE: Decimal = Decimal::new(dec!(0.005));
const DEFAULT_TWAP_PERIOD_SECS: u32 = 420;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Vault owned by the strategy contract.
    pub vault_id: u64,
    /// ETH/USDC pool used for the ETH TWAP.
    pub eth_usdc_pool: Address,
    pub weth: Address,
    pub usdc: Address,
    pub slippage_tolerance: Decimal,
    pub twap_period_secs: u32,
    pub price_impact_warning_pct: Decimal,
    pub funding_warning_ratio: Decimal,
    pub solver_tolerance: Decimal,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl EngineConfig {
    /// Config for `vault_id` with every optional setting at its default.
    pub fn with_defaults(vault_id: u64, eth_usdc_pool: Address, weth: Address, usdc: Address) -> Self {
        Self {
            vault_id,
            eth_usdc_pool,
            weth,
            usdc,
            slippage_tolerance: DEFAULT_SLIPPAGE,
            twap_period_secs: DEFAULT_TWAP_PERIOD_SECS,
            price_impact_warning_pct: DEFAULT_PRICE_IMPACT_WARNING_PCT,
            funding_warning_ratio: DEFAULT_FUNDING_WARNING_RATIO,
            solver_tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let vault_id = required(&env_map, "CRAB_VAULT_ID")?
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("CRAB_VAULT_ID".to_string(), "must be a valid u64".to_string())
            })?;

        let eth_usdc_pool = Address::new(required(&env_map, "CRAB_ETH_USDC_POOL")?);
        let weth = Address::new(required(&env_map, "CRAB_WETH_ADDRESS")?);
        let usdc = Address::new(required(&env_map, "CRAB_USDC_ADDRESS")?);

        let mut config = Self::with_defaults(vault_id, eth_usdc_pool, weth, usdc);

        if let Some(slippage) = optional_decimal(&env_map, "CRAB_SLIPPAGE_TOLERANCE")? {
            if slippage.is_negative() || slippage >= Decimal::one() {
                return Err(ConfigError::InvalidValue(
                    "CRAB_SLIPPAGE_TOLERANCE".to_string(),
                    format!("must be in [0, 1), got {}", slippage),
                ));
            }
            config.slippage_tolerance = slippage;
        }

        if let Some(period) = env_map.get("CRAB_TWAP_PERIOD_SECS") {
            config.twap_period_secs = period.parse::<u32>().map_err(|_| {
                ConfigError::InvalidValue(
                    "CRAB_TWAP_PERIOD_SECS".to_string(),
                    "must be a valid u32".to_string(),
                )
            })?;
        }

        if let Some(pct) = optional_decimal(&env_map, "CRAB_PRICE_IMPACT_WARNING_PCT")? {
            config.price_impact_warning_pct = pct;
        }

        if let Some(ratio) = optional_decimal(&env_map, "CRAB_FUNDING_WARNING_RATIO")? {
            config.funding_warning_ratio = ratio;
        }

        if let Some(tolerance) = optional_decimal(&env_map, "CRAB_SOLVER_TOLERANCE")? {
            if !tolerance.is_positive() {
                return Err(ConfigError::InvalidValue(
                    "CRAB_SOLVER_TOLERANCE".to_string(),
                    "must be positive".to_string(),
                ));
            }
            config.solver_tolerance = tolerance;
        }

        Ok(config)
    }

    pub fn solver_settings(&self) -> SolverSettings {
        SolverSettings {
            tolerance: self.solver_tolerance,
            min_step: DEFAULT_MIN_STEP,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn optional_decimal(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<Option<Decimal>, ConfigError> {
    env_map
        .get(key)
        .map(|raw| {
            Decimal::from_str_canonical(raw.trim()).map_err(|_| {
                ConfigError::InvalidValue(key.to_string(), "must be a decimal number".to_string())
            })
        })
        .transpose()
}
