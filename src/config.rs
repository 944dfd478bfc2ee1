// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Environment-driven connection parameters. Grounded on the original
//! tool's `__main__` block, which reads the same three variables with the
//! same defaults so operators migrating from it see no surprises.

use std::env;

const DEFAULT_HOST: &str = "192.168.1.9";
const DEFAULT_PORT: u16 = 10001;
const DEFAULT_UDL_PASSWORD: &str = "1234";

/// Connection parameters for [`crate::lifecycle::run`].
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub udl_password: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            udl_password: DEFAULT_UDL_PASSWORD.to_string(),
        }
    }
}

impl Config {
    /// Reads `TEXHOST`, `TEXPORT` and `UDLPASSWORD`, falling back to the
    /// documented defaults for any that are unset or unparseable.
    pub fn from_env() -> Config {
        let mut config = Config::default();
        if let Ok(host) = env::var("TEXHOST") {
            config.host = host;
        }
        if let Ok(port) = env::var("TEXPORT") {
            match port.parse() {
                Ok(p) => config.port = p,
                Err(_) => log::warn!("TEXPORT={:?} is not a valid port, using default", port),
            }
        }
        if let Ok(password) = env::var("UDLPASSWORD") {
            config.udl_password = password;
        }
        config
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.host, "192.168.1.9");
        assert_eq!(config.port, 10001);
        assert_eq!(config.udl_password, "1234");
        assert_eq!(config.address(), "192.168.1.9:10001");
    }
}
