//! Environment-sourced connection configuration
//!
//! The descriptor is rebuilt from `MSSQL_*` variables on every connection
//! attempt, so configuration changes take effect on the next reconnect
//! without restarting the server.

use tiberius::{AuthMethod, Config, EncryptionLevel};

use crate::error::DbError;

pub const DEFAULT_PORT: u16 = 1433;
pub const DEFAULT_DRIVER: &str = "ODBC Driver 17 for SQL Server";
pub const DEFAULT_TOOL_NAME: &str = "execute_sql";

/// Connection descriptor assembled from the environment
#[derive(Debug, Clone)]
pub struct MssqlConfig {
    pub server: String,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub port: u16,
    /// ODBC driver identifier; only used in the logged connection summary
    pub driver: String,
    pub windows_auth: bool,
    pub encrypt: bool,
    pub trust_server_certificate: bool,
}

impl MssqlConfig {
    /// Read the descriptor from the current environment
    pub fn from_env() -> Self {
        Self {
            server: env_or("MSSQL_SERVER", "localhost"),
            database: std::env::var("MSSQL_DATABASE").ok(),
            user: std::env::var("MSSQL_USER").ok(),
            password: std::env::var("MSSQL_PASSWORD").ok(),
            port: std::env::var("MSSQL_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            driver: env_or("MSSQL_DRIVER", DEFAULT_DRIVER),
            windows_auth: env_flag("MSSQL_WINDOWS_AUTH"),
            encrypt: env_flag("MSSQL_ENCRYPT"),
            trust_server_certificate: env_flag("MSSQL_TRUST_SERVER_CERTIFICATE"),
        }
    }

    /// Build the tiberius client configuration
    ///
    /// Fails fast on missing credentials, before any network I/O.
    pub fn to_client_config(&self) -> Result<Config, DbError> {
        let mut config = Config::new();
        config.host(&self.server);
        config.port(self.port);
        if let Some(db) = &self.database {
            if !db.is_empty() {
                config.database(db);
            }
        }
        config.authentication(self.auth_method()?);
        config.encryption(if self.encrypt {
            EncryptionLevel::Required
        } else {
            EncryptionLevel::NotSupported
        });
        if self.trust_server_certificate {
            config.trust_cert();
        }
        Ok(config)
    }

    fn auth_method(&self) -> Result<AuthMethod, DbError> {
        if self.windows_auth {
            #[cfg(windows)]
            {
                return Ok(AuthMethod::windows(
                    self.user.clone().unwrap_or_default(),
                    self.password.clone().unwrap_or_default(),
                ));
            }
            #[cfg(not(windows))]
            {
                return Err(DbError::Configuration(
                    "MSSQL_WINDOWS_AUTH=true requires a Windows host".to_string(),
                ));
            }
        }
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Ok(AuthMethod::sql_server(user, password)),
            _ => Err(DbError::Configuration(
                "MSSQL_USER and MSSQL_PASSWORD are required for SQL Authentication".to_string(),
            )),
        }
    }

    /// ODBC-style connection summary with the password masked, safe to log
    pub fn redacted_summary(&self) -> String {
        let mut parts = vec![
            format!("DRIVER={{{}}}", self.driver),
            format!("SERVER={},{}", self.server, self.port),
        ];
        if let Some(db) = &self.database {
            parts.push(format!("DATABASE={}", db));
        }
        if self.windows_auth {
            parts.push("Trusted_Connection=yes".to_string());
        } else if let Some(user) = &self.user {
            parts.push(format!("UID={}", user));
            parts.push("PWD=***".to_string());
        }
        if self.encrypt {
            parts.push("Encrypt=yes".to_string());
            if self.trust_server_certificate {
                parts.push("TrustServerCertificate=yes".to_string());
            }
        }
        parts.join(";")
    }
}

/// Name of the SQL execution tool, overridable via `MSSQL_COMMAND`
pub fn tool_name() -> String {
    env_or("MSSQL_COMMAND", DEFAULT_TOOL_NAME)
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_config() -> MssqlConfig {
        MssqlConfig {
            server: "localhost".to_string(),
            database: Some("master".to_string()),
            user: Some("sa".to_string()),
            password: Some("hunter2".to_string()),
            port: DEFAULT_PORT,
            driver: DEFAULT_DRIVER.to_string(),
            windows_auth: false,
            encrypt: false,
            trust_server_certificate: false,
        }
    }

    #[test]
    fn test_summary_masks_password() {
        let summary = bare_config().redacted_summary();
        assert!(summary.contains("PWD=***"));
        assert!(!summary.contains("hunter2"));
        assert!(summary.contains("SERVER=localhost,1433"));
        assert!(summary.contains("UID=sa"));
    }

    #[test]
    fn test_summary_trusted_auth_omits_credentials() {
        let mut config = bare_config();
        config.windows_auth = true;
        let summary = config.redacted_summary();
        assert!(summary.contains("Trusted_Connection=yes"));
        assert!(!summary.contains("UID="));
        assert!(!summary.contains("PWD="));
    }

    #[test]
    fn test_summary_includes_encryption_flags() {
        let mut config = bare_config();
        config.encrypt = true;
        config.trust_server_certificate = true;
        let summary = config.redacted_summary();
        assert!(summary.contains("Encrypt=yes"));
        assert!(summary.contains("TrustServerCertificate=yes"));
    }

    #[test]
    fn test_missing_credentials_is_configuration_error() {
        let mut config = bare_config();
        config.password = None;
        let err = config.to_client_config().unwrap_err();
        assert!(matches!(err, DbError::Configuration(_)));
        assert!(err.to_string().contains("MSSQL_USER and MSSQL_PASSWORD"));
    }

    #[test]
    fn test_sql_auth_config_builds() {
        assert!(bare_config().to_client_config().is_ok());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_windows_auth_rejected_off_windows() {
        let mut config = bare_config();
        config.windows_auth = true;
        config.user = None;
        config.password = None;
        let err = config.to_client_config().unwrap_err();
        assert!(matches!(err, DbError::Configuration(_)));
    }

    // Environment-dependent behavior is exercised in one test to avoid
    // races between parallel tests mutating the same process environment.
    #[test]
    fn test_from_env_defaults_and_port_fallback() {
        std::env::remove_var("MSSQL_SERVER");
        std::env::remove_var("MSSQL_DRIVER");
        std::env::set_var("MSSQL_PORT", "not-a-port");
        std::env::set_var("MSSQL_ENCRYPT", "TRUE");

        let config = MssqlConfig::from_env();
        assert_eq!(config.server, "localhost");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.driver, DEFAULT_DRIVER);
        assert!(config.encrypt);

        std::env::remove_var("MSSQL_PORT");
        std::env::remove_var("MSSQL_ENCRYPT");
    }

    #[test]
    fn test_tool_name_default() {
        std::env::remove_var("MSSQL_COMMAND");
        assert_eq!(tool_name(), DEFAULT_TOOL_NAME);
    }
}
