use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::optimizer::OptimizationOptions;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub optimizer: OptimizerConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(env_string)
    }

    /// Creates a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            api: ApiConfig::from_lookup(&lookup),
            optimizer: OptimizerConfig::from_lookup(&lookup),
            storage: StorageConfig::from_lookup(&lookup),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;
    const HOST_VAR: &'static str = "PALLET_OPTIMIZER_API_HOST";
    const PORT_VAR: &'static str = "PALLET_OPTIMIZER_API_PORT";

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let host_value = lookup(Self::HOST_VAR).unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                tracing::warn!(
                    "Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match lookup(Self::PORT_VAR) {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    tracing::warn!(
                        "{} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    tracing::warn!(
                        "Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Default packing options, overridable per request.
#[derive(Clone, Debug, Default)]
pub struct OptimizerConfig {
    options: OptimizationOptions,
}

impl OptimizerConfig {
    const WIDTH_SIMILARITY_VAR: &'static str = "PALLET_OPTIMIZER_WIDTH_SIMILARITY_THRESHOLD";
    const MAX_OVERHANG_VAR: &'static str = "PALLET_OPTIMIZER_MAX_OVERHANG_MM";
    const SIDE_BY_SIDE_GAP_VAR: &'static str = "PALLET_OPTIMIZER_SIDE_BY_SIDE_MAX_GAP_MM";
    const SIDE_BY_SIDE_HEIGHT_VAR: &'static str = "PALLET_OPTIMIZER_SIDE_BY_SIDE_HEIGHT_THRESHOLD";
    const ALLOW_SIDE_BY_SIDE_VAR: &'static str = "PALLET_OPTIMIZER_ALLOW_SIDE_BY_SIDE";
    const MAXIMIZE_UTILIZATION_VAR: &'static str = "PALLET_OPTIMIZER_MAXIMIZE_UTILIZATION";
    const PREFER_STANDARD_VAR: &'static str = "PALLET_OPTIMIZER_PREFER_STANDARD_PALLETS";
    const MINIMIZE_OVERHANG_VAR: &'static str = "PALLET_OPTIMIZER_MINIMIZE_OVERHANG";
    const SORT_BY_HEIGHT_VAR: &'static str = "PALLET_OPTIMIZER_SORT_BY_HEIGHT_WHEN_WIDTH_SIMILAR";

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        let width_similarity_threshold = load_f64_with_warning(
            lookup,
            Self::WIDTH_SIMILARITY_VAR,
            OptimizationOptions::DEFAULT_WIDTH_SIMILARITY_THRESHOLD,
            |value| (0.0..=1.0).contains(&value),
            "must be between 0 and 1",
            "Adjusted width similarity changes the loading order",
        );

        let max_overhang_mm = load_f64_with_warning(
            lookup,
            Self::MAX_OVERHANG_VAR,
            OptimizationOptions::DEFAULT_MAX_OVERHANG_MM,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted overhang may let windows protrude further than usual",
        );

        let side_by_side_max_gap = load_f64_with_warning(
            lookup,
            Self::SIDE_BY_SIDE_GAP_VAR,
            OptimizationOptions::DEFAULT_SIDE_BY_SIDE_MAX_GAP,
            |value| value >= 0.0,
            "must not be negative",
            "Adjusted gap changes which windows can be paired",
        );

        let side_by_side_height_threshold = load_f64_with_warning(
            lookup,
            Self::SIDE_BY_SIDE_HEIGHT_VAR,
            OptimizationOptions::DEFAULT_SIDE_BY_SIDE_HEIGHT_THRESHOLD,
            |value| (0.0..=1.0).contains(&value),
            "must be between 0 and 1",
            "Adjusted height tolerance may pair windows of clearly different height",
        );

        let flag = |var: &str, default: bool| {
            lookup(var)
                .and_then(|raw| parse_bool(&raw, var))
                .unwrap_or(default)
        };

        let options = OptimizationOptions::builder()
            .width_similarity_threshold(width_similarity_threshold)
            .max_overhang_mm(max_overhang_mm)
            .side_by_side_max_gap(side_by_side_max_gap)
            .side_by_side_height_threshold(side_by_side_height_threshold)
            .allow_side_by_side(flag(
                Self::ALLOW_SIDE_BY_SIDE_VAR,
                OptimizationOptions::DEFAULT_ALLOW_SIDE_BY_SIDE,
            ))
            .maximize_utilization(flag(
                Self::MAXIMIZE_UTILIZATION_VAR,
                OptimizationOptions::DEFAULT_MAXIMIZE_UTILIZATION,
            ))
            .prefer_standard_pallets(flag(
                Self::PREFER_STANDARD_VAR,
                OptimizationOptions::DEFAULT_PREFER_STANDARD_PALLETS,
            ))
            .minimize_overhang(flag(
                Self::MINIMIZE_OVERHANG_VAR,
                OptimizationOptions::DEFAULT_MINIMIZE_OVERHANG,
            ))
            .sort_by_height_when_width_similar(flag(
                Self::SORT_BY_HEIGHT_VAR,
                OptimizationOptions::DEFAULT_SORT_BY_HEIGHT_WHEN_WIDTH_SIMILAR,
            ))
            .build();

        Self { options }
    }

    /// Returns the configured default options.
    pub fn options(&self) -> OptimizationOptions {
        self.options
    }
}

/// Where catalog and load plans are kept.
#[derive(Clone, Debug, Default)]
pub struct StorageConfig {
    data_file: Option<PathBuf>,
}

impl StorageConfig {
    const DATA_FILE_VAR: &'static str = "PALLET_OPTIMIZER_DATA_FILE";

    fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Self {
        Self {
            data_file: lookup(Self::DATA_FILE_VAR).map(PathBuf::from),
        }
    }

    /// JSON document to persist to; `None` keeps everything in memory.
    pub fn data_file(&self) -> Option<&Path> {
        self.data_file.as_deref()
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            tracing::warn!("Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            tracing::warn!(
                "Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name,
                other
            );
            None
        }
    }
}

fn load_f64_with_warning(
    lookup: &impl Fn(&str) -> Option<String>,
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match lookup(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) if value.is_finite() && validator(value) => {
                let tolerance = (default.abs().max(1.0)) * 1e-9;
                if (value - default).abs() > tolerance {
                    tracing::warn!("{} ({} = {}).", warning, var_name, value);
                }
                value
            }
            Ok(_) => {
                tracing::warn!(
                    "{} contains invalid value '{}': {}. Using {}.",
                    var_name,
                    raw,
                    invalid_hint,
                    default
                );
                default
            }
            Err(err) => {
                tracing::warn!(
                    "Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name,
                    raw,
                    err,
                    default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_parse_bool_true_values() {
        for raw in ["1", "true", "yes", "y", "on", "TRUE", "Yes", "ON", " true ", "  1  "] {
            assert_eq!(parse_bool(raw, "TEST_VAR"), Some(true), "raw: {:?}", raw);
        }
    }

    #[test]
    fn test_parse_bool_false_values() {
        for raw in ["0", "false", "no", "n", "off", "FALSE", "No", "OFF", " false ", "  0  "] {
            assert_eq!(parse_bool(raw, "TEST_VAR"), Some(false), "raw: {:?}", raw);
        }
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("invalid", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("maybe", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn defaults_without_variables() {
        let config = config_from(&[]);
        assert_eq!(config.api.port(), 8080);
        assert!(config.api.binds_to_all_interfaces());
        assert!(config.api.uses_default_host());
        assert_eq!(config.optimizer.options(), OptimizationOptions::default());
        assert!(config.storage.data_file().is_none());
    }

    #[test]
    fn reads_api_and_storage_variables() {
        let config = config_from(&[
            ("PALLET_OPTIMIZER_API_HOST", "127.0.0.1"),
            ("PALLET_OPTIMIZER_API_PORT", "9090"),
            ("PALLET_OPTIMIZER_DATA_FILE", "/var/lib/pallets.json"),
        ]);
        assert_eq!(config.api.socket_addr().to_string(), "127.0.0.1:9090");
        assert!(!config.api.binds_to_all_interfaces());
        assert_eq!(
            config.storage.data_file(),
            Some(Path::new("/var/lib/pallets.json"))
        );
    }

    #[test]
    fn invalid_api_values_fall_back() {
        let config = config_from(&[
            ("PALLET_OPTIMIZER_API_HOST", "not-an-ip"),
            ("PALLET_OPTIMIZER_API_PORT", "0"),
        ]);
        assert_eq!(config.api.display_host(), "0.0.0.0");
        assert_eq!(config.api.port(), 8080);
    }

    #[test]
    fn reads_optimizer_options() {
        let config = config_from(&[
            ("PALLET_OPTIMIZER_MAX_OVERHANG_MM", "500"),
            ("PALLET_OPTIMIZER_ALLOW_SIDE_BY_SIDE", "off"),
            ("PALLET_OPTIMIZER_MAXIMIZE_UTILIZATION", "no"),
            ("PALLET_OPTIMIZER_WIDTH_SIMILARITY_THRESHOLD", "0.2"),
        ]);
        let options = config.optimizer.options();
        assert_eq!(options.max_overhang_mm, 500.0);
        assert!(!options.allow_side_by_side);
        assert!(!options.maximize_utilization);
        assert_eq!(options.width_similarity_threshold, 0.2);
        assert!(options.prefer_standard_pallets);
    }

    #[test]
    fn invalid_optimizer_values_fall_back() {
        let config = config_from(&[
            ("PALLET_OPTIMIZER_MAX_OVERHANG_MM", "-5"),
            ("PALLET_OPTIMIZER_SIDE_BY_SIDE_HEIGHT_THRESHOLD", "1.5"),
            ("PALLET_OPTIMIZER_SIDE_BY_SIDE_MAX_GAP_MM", "NaN"),
            ("PALLET_OPTIMIZER_MINIMIZE_OVERHANG", "maybe"),
        ]);
        let options = config.optimizer.options();
        assert_eq!(options.max_overhang_mm, 700.0);
        assert_eq!(options.side_by_side_height_threshold, 0.15);
        assert_eq!(options.side_by_side_max_gap, 100.0);
        assert!(options.minimize_overhang);
    }
}
