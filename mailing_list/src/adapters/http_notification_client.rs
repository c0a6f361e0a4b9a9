use crate::domain::{ListId, Notifier, User};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

/// Sends enrollment notifications through an HTTP notification service.
#[derive(Clone)]
pub struct HttpNotificationClient {
    http_client: Client,
    base_url: String,
    sender: String,
    authorization_token: Secret<String>,
}

impl HttpNotificationClient {
    pub fn new(
        base_url: String,
        sender: String,
        authorization_token: Secret<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            sender,
            authorization_token,
        })
    }
}

#[async_trait]
impl Notifier for HttpNotificationClient {
    #[tracing::instrument(
        name = "Sending mailing list notification",
        skip(self, user),
        fields(username = %user.username)
    )]
    async fn notify(&self, user: &User, list_id: &ListId) -> Result<(), anyhow::Error> {
        let url = format!("{}/notifications", self.base_url);
        let subject = format!("You have joined {}", list_id);
        let text_body = format!(
            "Hi {},\nYou are now subscribed to the {} mailing list.",
            user.username, list_id
        );
        let request_body = SendNotificationRequest {
            from: &self.sender,
            username: user.username.as_ref(),
            list_id: list_id.as_ref(),
            subject: &subject,
            text_body: &text_body,
        };

        self.http_client
            .post(&url)
            .header(
                "X-Notification-Token",
                self.authorization_token.expose_secret(),
            )
            .json(&request_body)
            .send()
            .await
            .context("Failed to reach the notification service.")?
            .error_for_status()
            .context("The notification service rejected the notification.")?;

        Ok(())
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendNotificationRequest<'a> {
    from: &'a str,
    username: &'a str,
    list_id: &'a str,
    subject: &'a str,
    text_body: &'a str,
}
