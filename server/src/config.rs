use config::{ConfigError, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use strum::{Display, IntoStaticStr};

/// Server configuration. Values are read from `config.toml` (or `config.toml.dist`
/// during development) and can be overridden by `TALLER__*` environment variables,
/// e.g. `TALLER__TOKEN__SECRET`.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub port: u16,
    pub password_secret: String,
    pub token: TokenConfig,
    pub cors_origins: Vec<String>,
    pub upload_dir: PathBuf,
    pub max_upload_size: usize,
    pub frontend_dist: Option<PathBuf>,
    request_timeout_seconds: u64,
    regex: RegexConfig,
}

impl Config {
    pub fn regex(&self, regex_type: RegexType) -> &Regex {
        match regex_type {
            RegexType::Email => &self.regex.email,
            RegexType::Phone => &self.regex.phone,
            RegexType::Rfc => &self.regex.rfc,
            RegexType::PostalCode => &self.regex.postal_code,
            RegexType::TechnicianCode => &self.regex.technician_code,
            RegexType::Username => &self.regex.username,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Directory where work order photos are written.
    pub fn order_photo_dir(&self) -> PathBuf {
        self.upload_dir.join("ordenes")
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenConfig {
    pub secret: String,
    pub expire_minutes: i64,
}

#[derive(Clone, Copy, Debug, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RegexType {
    Email,
    Phone,
    Rfc,
    PostalCode,
    TechnicianCode,
    Username,
}

/// Loads the server configuration from disk, applying environment overrides.
pub fn load() -> Result<Config, ConfigError> {
    let path = get_config_path()?;
    config::Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml))
        .add_source(Environment::with_prefix("TALLER").separator("__").try_parsing(true))
        .build()?
        .try_deserialize()
}

/// Configuration used by tests. Always reads the distributed defaults.
#[cfg(test)]
pub fn test_config() -> Config {
    config::Config::builder()
        .add_source(File::from_str(include_str!("../config.toml.dist"), FileFormat::Toml))
        .build()
        .and_then(config::Config::try_deserialize)
        .unwrap_or_else(|err| panic!("{err}"))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RegexConfig {
    #[serde(with = "serde_regex")]
    email: Regex,
    #[serde(with = "serde_regex")]
    phone: Regex,
    #[serde(with = "serde_regex")]
    rfc: Regex,
    #[serde(with = "serde_regex")]
    postal_code: Regex,
    #[serde(with = "serde_regex")]
    technician_code: Regex,
    #[serde(with = "serde_regex")]
    username: Regex,
}

fn get_config_path() -> Result<PathBuf, ConfigError> {
    // Use config.toml.dist if in development environment, config.toml if in production
    if let Ok(var) = std::env::var("CARGO_MANIFEST_DIR") {
        return Ok(PathBuf::from(var).join("config.toml.dist"));
    }

    let exe_path = std::env::current_exe().map_err(|err| ConfigError::Foreign(Box::new(err)))?;
    let parent_path = exe_path
        .parent()
        .ok_or_else(|| ConfigError::Message(String::from("Executable path has no parent directory")))?;
    Ok(parent_path.join("config.toml"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dist_regexes() {
        let config = test_config();
        let email = config.regex(RegexType::Email);
        assert!(email.is_match("taller@example.com"));
        assert!(!email.is_match("taller.example.com"));
        assert!(!email.is_match("taller@example"));

        let phone = config.regex(RegexType::Phone);
        assert!(phone.is_match("5512345678"));
        assert!(phone.is_match("+525512345678"));
        assert!(phone.is_match("551234567890123"));
        assert!(!phone.is_match("55 1234 5678"));
        assert!(!phone.is_match("55123"));
        assert!(!phone.is_match("5512345678901234"));
        assert!(!phone.is_match("+5512345678901234"));
        for no_digits in ["----------", "((((()))))", "+ + + + + +", "+++++++++++"] {
            assert!(!phone.is_match(no_digits), "{no_digits}");
        }

        let rfc = config.regex(RegexType::Rfc);
        assert!(rfc.is_match("XAXX010101000"));
        assert!(rfc.is_match("GOMJ850101"));
        assert!(!rfc.is_match("XAXX0101010001"));
        assert!(!rfc.is_match("XAXX-010101"));

        let code = config.regex(RegexType::TechnicianCode);
        assert!(code.is_match("0427"));
        assert!(!code.is_match("427"));
        assert!(!code.is_match("04a7"));

        assert!(config.regex(RegexType::PostalCode).is_match("06600"));
        assert!(!config.regex(RegexType::PostalCode).is_match("066000"));
        assert!(config.regex(RegexType::Username).is_match("recepcion_1"));
        assert!(!config.regex(RegexType::Username).is_match("ab"));
    }
}
