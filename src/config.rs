use std::env;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;

/// Process settings read from the environment (after `.env` is loaded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    pub host: String,
    pub port: u16,
    /// Fill the chain with demo traffic on startup.
    pub seed_demo_data: bool,
}

impl NodeConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = lookup("PORT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let seed_demo_data = lookup("SEED_DEMO_DATA")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Self {
            host,
            port,
            seed_demo_data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> NodeConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NodeConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 3000);
        assert!(!cfg.seed_demo_data);
    }

    #[test]
    fn reads_overrides() {
        let cfg = config_from(&[("HOST", "0.0.0.0"), ("PORT", "3517"), ("SEED_DEMO_DATA", "True")]);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 3517);
        assert!(cfg.seed_demo_data);
    }

    #[test]
    fn bad_port_falls_back_to_default() {
        let cfg = config_from(&[("PORT", "not-a-port")]);
        assert_eq!(cfg.port, 3000);
    }
}
