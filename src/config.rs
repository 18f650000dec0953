//! Application configuration
//!
//! Loaded from environment variables (optionally via a `.env` file), the
//! way `main.rs` calls `AppConfig::load()` after `dotenvy::dotenv()`.
//! There is no CLI flag surface — spec.md §6 is explicit that none is
//! part of the core.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Address the HTTP/WebSocket server binds to.
    pub bind_addr: String,

    /// Platform fee rate applied to every settlement (spec.md §4.5 default 1%).
    pub platform_fee_rate: Decimal,

    /// Fallback reference price for a market-maker quoting a book with no
    /// resting ask yet (spec.md §4.7).
    pub reference_book_default_price: Decimal,

    /// Offset below the reference price for the market-maker's bid.
    pub market_maker_bid_offset: Decimal,

    /// Offset above the reference price for the market-maker's ask.
    pub market_maker_ask_offset: Decimal,

    /// Tracing `EnvFilter` directive, e.g. `freight_exchange=debug,tower_http=debug`.
    pub log_filter: String,

    /// Identifier credited with platform fees.
    pub platform_trader_id: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            platform_fee_rate: Decimal::new(1, 2), // 0.01
            reference_book_default_price: Decimal::new(100_00, 2),
            market_maker_bid_offset: Decimal::new(1_00, 2),
            market_maker_ask_offset: Decimal::new(1_00, 2),
            log_filter: "freight_exchange=debug,tower_http=debug".to_string(),
            platform_trader_id: "Platform".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration, overlaying environment variables prefixed
    /// `FREIGHT_` over the defaults above (teacher: `config::Config`
    /// layered over struct defaults, values re-typed by `serde`).
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::Environment::with_prefix("FREIGHT").separator("__"));

        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert!(cfg.platform_fee_rate > Decimal::ZERO);
        assert!(cfg.platform_fee_rate < Decimal::ONE);
    }
}
