use super::*;

/// Fixed client-side lifetime for both credential types
pub const DEFAULT_SESSION_TTL_MINUTES: u32 = 25;

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            email: String::new(),
            password: String::new(),
            customer_index: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.electrickiwi.co.nz".to_string(),
            timeout_seconds: 10,
            client_id: "ek-app".to_string(),
            api_version: "1_1".to_string(),
            user_agent: "Mozilla/5.0 (Linux; Android 8.1.0; MI 5 Build/OPM7.181205.001; wv) \
                         AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 \
                         Chrome/69.0.3497.109 Mobile Safari/537.36"
                .to_string(),
            requested_with: "nz.co.electrickiwi.mobile.app".to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auth_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            customer_ttl_minutes: DEFAULT_SESSION_TTL_MINUTES,
            store_path: "/data/ekiwi_sessions.json".to_string(),
        }
    }
}

impl Default for HopConfig {
    fn default() -> Self {
        Self { average_days: 7 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/ekiwi.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            account: AccountConfig::default(),
            api: ApiConfig::default(),
            session: SessionConfig::default(),
            hop: HopConfig::default(),
            logging: LoggingConfig::default(),
            timezone: "Pacific/Auckland".to_string(),
        }
    }
}
