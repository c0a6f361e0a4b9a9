use crate::enrollment::{LookupPolicy, NotificationFailurePolicy};
use crate::startup::load_aws_config;
use config::FileFormat;
use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;
use telemetry::TelemetrySettings;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub directory: DirectorySettings,
    pub notifications: NotificationClientSettings,
    #[serde(default)]
    pub enrollment: EnrollmentSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DirectoryBackend {
    InMemory,
    DynamoDb,
}

#[derive(Deserialize, Clone)]
pub struct DirectorySettings {
    pub backend: DirectoryBackend,
    pub table_name: String,
    pub use_local: bool,
}

#[derive(Deserialize, Clone)]
pub struct NotificationClientSettings {
    pub base_url: String,
    pub sender: String,
    pub authorization_token: Secret<String>,
    pub timeout_milliseconds: u64,
}

impl NotificationClientSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

#[derive(Deserialize, Clone, Default)]
pub struct EnrollmentSettings {
    #[serde(default)]
    pub lookup: LookupPolicy,
    #[serde(default)]
    pub notification_failure: NotificationFailurePolicy,
}

pub async fn get_configuration() -> Result<Settings, config::ConfigError> {
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;

    let base_path =
        std::env::current_dir().map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;
    let configuration_directory = base_path.join("configuration");

    let mut builder = config::Config::builder().add_source(config::File::from(
        configuration_directory.join("base.yaml"),
    ));

    builder = match (&environment, std::env::var("CONFIG_PARAMETER_NAME")) {
        // Deployed environments keep their overrides in SSM rather than on disk.
        (Environment::Production, Ok(parameter_name)) => {
            let document = read_ssm_parameter(&parameter_name).await?;
            builder.add_source(config::File::from_str(&document, FileFormat::Yaml))
        }
        _ => builder.add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        )),
    };

    // Add in settings from environment variables (with a prefix of APP and '__' as separator)
    // E.g. `APP_DIRECTORY__TABLE_NAME=users` would set `Settings.directory.table_name`
    let settings = builder
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

async fn read_ssm_parameter(parameter_name: &str) -> Result<String, config::ConfigError> {
    let aws_config = load_aws_config().await;
    let ssm_client = aws_sdk_ssm::Client::new(&aws_config);

    let parameter = ssm_client
        .get_parameter()
        .name(parameter_name)
        .with_decryption(true)
        .send()
        .await
        .map_err(|e| config::ConfigError::Foreign(Box::new(e)))?;

    parameter
        .parameter
        .and_then(|p| p.value)
        .ok_or_else(|| config::ConfigError::NotFound(parameter_name.to_string()))
}

#[derive(Debug, PartialEq, Eq)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a support environment. Use either local or production",
                other
            )),
        }
    }
}
