#![cfg(test)]

use super::config::*;

fn valid_config() -> Config {
    let mut config = Config::default();
    config.account.email = "someone@example.com".to_string();
    config.account.password = "secret".to_string();
    config
}

#[test]
fn test_default_config() {
    let config = Config::default();
    assert_eq!(config.api.base_url, "https://api.electrickiwi.co.nz");
    assert_eq!(config.api.timeout_seconds, 10);
    assert_eq!(config.session.auth_ttl_minutes, DEFAULT_SESSION_TTL_MINUTES);
    assert_eq!(config.session.customer_ttl_minutes, 25);
    assert_eq!(config.account.customer_index, 0);
    assert_eq!(config.hop.average_days, 7);
}

#[test]
fn test_config_validation() {
    // Defaults carry no credentials
    assert!(Config::default().validate().is_err());

    let mut config = valid_config();
    assert!(config.validate().is_ok());

    config.api.timeout_seconds = 0;
    assert!(config.validate().is_err());

    config = valid_config();
    config.session.auth_ttl_minutes = 0;
    assert!(config.validate().is_err());

    config = valid_config();
    config.hop.average_days = 0;
    assert!(config.validate().is_err());

    config = valid_config();
    config.timezone = "Mars/Olympus_Mons".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_serialization() {
    let config = valid_config();
    let yaml = serde_yaml::to_string(&config).unwrap();
    let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(config.account.email, deserialized.account.email);
    assert_eq!(config.api.client_id, deserialized.api.client_id);
}

#[test]
fn test_partial_yaml_uses_defaults() {
    let yaml = "account:\n  email: a@b.nz\n  password: pw\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.account.email, "a@b.nz");
    assert_eq!(config.api.api_version, "1_1");
    assert_eq!(config.timezone, "Pacific/Auckland");
    assert!(config.validate().is_ok());
}
