use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{CONFIG_PATH_ENV, find_config_file, read_config, read_config_file};

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
    chat: Chat,
    payments: Payments,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
    #[serde(default = "default_token_ttl")]
    token_ttl_minutes: i64,
    #[serde(default)]
    allowed_origins: Vec<String>,
}

/// OpenAI-compatible chat completion endpoint used by the learning assistant.
#[derive(Debug, Deserialize)]
pub struct Chat {
    api_url: String,
    #[serde(default)]
    api_key: String,
    model: String,
    #[serde(default = "default_system_prompt")]
    system_prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct Payments {
    api_url: String,
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    callback_url: String,
    /// Shared secret the gateway echoes in `X-Callback-Secret`. Callbacks are refused when empty.
    #[serde(default)]
    callback_secret: String,
}

fn default_token_ttl() -> i64 {
    60 * 24
}

fn default_system_prompt() -> String {
    String::from(
        "You are the CampoCode Forge learning assistant. Help students understand \
         programming concepts and debug their exercises. Explain, do not just hand out solutions.",
    )
}

impl Config {
    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.app.jwt.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "app.jwt",
                reason: String::from("secret must not be empty"),
            });
        }
        if self.app.token_ttl_minutes <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "app.token_ttl_minutes",
                reason: format!("must be positive, got {}", self.app.token_ttl_minutes),
            });
        }
        Ok(())
    }

    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let read_cfg = |use_local| -> ConfigResult<Self> {
                    let contents = read_config(use_local)?;
                    Self::from_toml(&contents)
                };

                match read_cfg(use_local) {
                    Ok(c) => c,
                    Err(e) => {
                        if !matches!(e, error::ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Config not found or invalid.");
                        std::process::exit(1);
                    }
                }
            })
            .await
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[inline]
    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    #[inline]
    pub fn payments(&self) -> &Payments {
        &self.payments
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }

    #[inline]
    pub fn token_ttl_minutes(&self) -> i64 {
        self.token_ttl_minutes
    }

    #[inline]
    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }
}

impl Chat {
    #[inline]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    #[inline]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

impl Payments {
    #[inline]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    #[inline]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[inline]
    pub fn callback_url(&self) -> &str {
        &self.callback_url
    }

    #[inline]
    pub fn callback_secret(&self) -> &str {
        &self.callback_secret
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const MINIMAL: &str = r#"
        [host]
        bindto = "0.0.0.0:8080"

        [app]
        jwt = "secret"
        database_uri = "postgres://localhost/forge"

        [chat]
        api_url = "http://localhost:9000/v1/chat/completions"
        model = "gpt-4o-mini"

        [payments]
        api_url = "http://localhost:9001"
    "#;

    #[tokio::test]
    async fn config_test() {
        let config = Config::get_or_init(true).await;
        assert_eq!(config.host().bindto(), "127.0.0.1:5000"); // defaults
    }

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.host().bindto(), "0.0.0.0:8080");
        assert!(!config.app().docs());
        assert_eq!(config.app().token_ttl_minutes(), 60 * 24);
        assert!(config.app().allowed_origins().is_empty());
        assert!(config.chat().system_prompt().contains("CampoCode Forge"));
        assert_eq!(config.payments().callback_url(), "");
    }

    #[test]
    fn rejects_empty_jwt_secret() {
        let contents = MINIMAL.replace(r#"jwt = "secret""#, r#"jwt = "  ""#);
        let err = Config::from_toml(&contents).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "app.jwt", .. }));
    }

    #[test]
    fn rejects_missing_section() {
        let contents = MINIMAL.replace("[payments]", "[unused]");
        assert!(matches!(
            Config::from_toml(&contents),
            Err(ConfigError::TomlDeError(_))
        ));
    }
}
