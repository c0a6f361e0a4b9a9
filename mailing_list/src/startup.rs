use crate::adapters::{DynamoDbUserDirectory, HttpNotificationClient, InMemoryUserDirectory};
use crate::collaborators::DefaultCollaborators;
use crate::configuration::{
    DirectoryBackend, DirectorySettings, NotificationClientSettings, Settings,
};
use crate::domain::{Notifier, UserDirectory};
use crate::enrollment::ListEnrollment;
use anyhow::Context;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::sync::Arc;

/// Wire a [`ListEnrollment`] whose defaults are built from `configuration` on first use.
pub fn build_enrollment(configuration: &Settings) -> ListEnrollment {
    let directory_settings = configuration.directory.clone();
    let notification_settings = configuration.notifications.clone();

    let defaults = DefaultCollaborators::new(
        move || {
            let settings = directory_settings.clone();
            async move { build_user_directory(&settings).await }
        },
        move || {
            let settings = notification_settings.clone();
            async move { build_notifier(&settings) }
        },
    );

    ListEnrollment::new(defaults)
        .with_lookup_policy(configuration.enrollment.lookup)
        .with_notification_failure_policy(configuration.enrollment.notification_failure)
}

#[tracing::instrument(name = "Building user directory", skip(settings), fields(backend = ?settings.backend))]
pub async fn build_user_directory(
    settings: &DirectorySettings,
) -> Result<Arc<dyn UserDirectory>, anyhow::Error> {
    match settings.backend {
        DirectoryBackend::InMemory => Ok(Arc::new(InMemoryUserDirectory::new())),
        DirectoryBackend::DynamoDb => {
            let aws_config = load_aws_config().await;
            let conf_builder = aws_sdk_dynamodb::config::Builder::from(&aws_config);

            let conf = match settings.use_local {
                true => conf_builder.endpoint_url("http://localhost:8000").build(),
                false => conf_builder.build(),
            };

            Ok(Arc::new(DynamoDbUserDirectory::new(
                aws_sdk_dynamodb::Client::from_conf(conf),
                settings.table_name.clone(),
            )))
        }
    }
}

pub fn build_notifier(
    settings: &NotificationClientSettings,
) -> Result<Arc<dyn Notifier>, anyhow::Error> {
    let client = HttpNotificationClient::new(
        settings.base_url.clone(),
        settings.sender.clone(),
        settings.authorization_token.clone(),
        settings.timeout(),
    )
    .context("Failed to build the notification HTTP client.")?;

    Ok(Arc::new(client))
}

pub async fn load_aws_config() -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(make_region_provider())
        .load()
        .await
}

pub fn make_region_provider() -> RegionProviderChain {
    RegionProviderChain::default_provider().or_else(Region::new("us-east-1"))
}
