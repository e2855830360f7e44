//! Environment-driven configuration
//!
//! Loaded once at startup. Only the escrow chain is required to have an RPC
//! endpoint; any further configured chains are validated at boot and usable
//! for balance or nonce queries.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::escrow::EscrowLocation;

pub const SEPOLIA_CHAIN_ID: u64 = 11155111;
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84532;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("no RPC endpoint configured for escrow chain {0}")]
    EscrowChainUnreachable(u64),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub privy_app_id: String,
    pub privy_app_secret: String,
    pub privy_verification_key: String,
    pub mnemonic: String,
    /// chainId → RPC endpoint
    pub rpc_urls: HashMap<u64, String>,
    pub escrow: EscrowLocation,
    pub poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let port = parse_or("APP_PORT", DEFAULT_PORT)?;
        let poll_interval_ms = parse_or("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;

        let mut rpc_urls = HashMap::new();
        if let Some(url) = optional("SEPOLIA_RPC_URL") {
            rpc_urls.insert(SEPOLIA_CHAIN_ID, url);
        }
        if let Some(url) = optional("BASE_SEPOLIA_RPC_URL") {
            rpc_urls.insert(BASE_SEPOLIA_CHAIN_ID, url);
        }

        let escrow = EscrowLocation {
            address: required("ESCROW_CONTRACT_ADDRESS")?.parse().map_err(|_| {
                ConfigError::Invalid {
                    key: "ESCROW_CONTRACT_ADDRESS",
                    message: "expected a 20-byte hex address".into(),
                }
            })?,
            chain_id: required("ESCROW_CHAIN_ID")?
                .parse()
                .map_err(|e| ConfigError::Invalid {
                    key: "ESCROW_CHAIN_ID",
                    message: format!("{e}"),
                })?,
        };

        if !rpc_urls.contains_key(&escrow.chain_id) {
            return Err(ConfigError::EscrowChainUnreachable(escrow.chain_id));
        }

        Ok(Config {
            port,
            privy_app_id: required("PRIVY_APP_ID")?,
            privy_app_secret: required("PRIVY_APP_SECRET")?,
            privy_verification_key: required("PRIVY_VERIFICATION_KEY")?,
            mnemonic: required("MNEMONIC")?,
            rpc_urls,
            escrow,
            poll_interval: Duration::from_millis(poll_interval_ms),
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            message: format!("{e}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Env vars are process-global, so the whole surface is exercised in one
    /// sequential test.
    #[test]
    fn from_env_reads_the_full_surface() {
        let vars = [
            ("APP_PORT", "4000"),
            ("PRIVY_APP_ID", "app-id"),
            ("PRIVY_APP_SECRET", "app-secret"),
            ("PRIVY_VERIFICATION_KEY", "-----BEGIN PUBLIC KEY-----"),
            ("MNEMONIC", "test test test test test test test test test test test junk"),
            ("SEPOLIA_RPC_URL", "https://rpc.sepolia.example"),
            ("ESCROW_CONTRACT_ADDRESS", "0x00000000000000000000000000000000000000ee"),
            ("ESCROW_CHAIN_ID", "11155111"),
            ("POLL_INTERVAL_MS", "500"),
        ];
        for (key, value) in vars {
            std::env::set_var(key, value);
        }

        let config = Config::from_env().expect("complete environment parses");
        assert_eq!(config.port, 4000);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.escrow.chain_id, SEPOLIA_CHAIN_ID);
        assert_eq!(
            config.rpc_urls.get(&SEPOLIA_CHAIN_ID).map(String::as_str),
            Some("https://rpc.sepolia.example")
        );

        // The escrow chain must have an endpoint
        std::env::set_var("ESCROW_CHAIN_ID", "84532");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::EscrowChainUnreachable(84532))
        ));
        std::env::set_var("ESCROW_CHAIN_ID", "11155111");

        // Required keys are reported by name
        std::env::remove_var("MNEMONIC");
        assert!(matches!(
            Config::from_env(),
            Err(ConfigError::Missing("MNEMONIC"))
        ));
    }
}
