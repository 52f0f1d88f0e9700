use std::env;
use std::net::SocketAddr;

use crate::error::Error;

/// Server settings, read from `OHMAGE_*` environment variables.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub mongodb_uri: String,
    pub database: String,
    pub bind_address: SocketAddr,
    pub seed: bool,
    pub log: String,
}

impl Config {
    pub fn from_env() -> Result<Config, Error> {
        Config::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let load = |key: &'static str, default: &str| {
            var(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        let bind_address = load("OHMAGE_BIND_ADDRESS", "127.0.0.1:8080");
        let bind_address: SocketAddr = bind_address
            .parse()
            .map_err(|_| Error::InvalidConfiguration {
                key: "OHMAGE_BIND_ADDRESS",
                value: bind_address,
            })?;

        let seed = match load("OHMAGE_SEED", "false").as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                return Err(Error::InvalidConfiguration {
                    key: "OHMAGE_SEED",
                    value: other.to_owned(),
                })
            }
        };

        Ok(Config {
            mongodb_uri: load("OHMAGE_MONGODB_URI", "mongodb://localhost:27017"),
            database: load("OHMAGE_DATABASE", "ohmage"),
            bind_address,
            seed,
            log: load("OHMAGE_LOG", "info"),
        })
    }
}
