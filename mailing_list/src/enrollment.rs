use crate::collaborators::DefaultCollaborators;
use crate::domain::{DirectoryError, ListId, Notifier, User, UserDirectory, Username};
use crate::utils::error_chain_fmt;
use anyhow::Context;
use serde::Deserialize;
use std::sync::Arc;

#[derive(thiserror::Error)]
pub enum EnrollmentError {
    #[error("{0}")]
    ValidationError(String),
    #[error("{0}")]
    NotFoundError(String),
    #[error("Failed to persist the user record.")]
    PersistenceError(#[source] DirectoryError),
    #[error("Failed to notify the user about the mailing list.")]
    NotificationError(#[source] anyhow::Error),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for EnrollmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// How the user is resolved before being enrolled.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LookupPolicy {
    /// Self-service signup: unknown usernames get a new user record.
    #[default]
    FindOrCreate,
    /// Only existing accounts can be enrolled; unknown usernames fail with `NotFoundError`.
    RequireExisting,
}

/// What a failed notification does to the enrollment.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFailurePolicy {
    #[default]
    Abort,
    LogAndContinue,
}

/// Arguments of a single enrollment.
///
/// Collaborators left as `None` fall back to the defaults held by [`ListEnrollment`].
pub struct EnrollmentRequest {
    pub username: String,
    pub list_id: String,
    pub directory: Option<Arc<dyn UserDirectory>>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl EnrollmentRequest {
    pub fn new(username: impl Into<String>, list_id: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            list_id: list_id.into(),
            directory: None,
            notifier: None,
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

pub struct ListEnrollment {
    defaults: DefaultCollaborators,
    lookup: LookupPolicy,
    notification_failure: NotificationFailurePolicy,
}

impl ListEnrollment {
    pub fn new(defaults: DefaultCollaborators) -> Self {
        Self {
            defaults,
            lookup: LookupPolicy::default(),
            notification_failure: NotificationFailurePolicy::default(),
        }
    }

    pub fn with_lookup_policy(mut self, lookup: LookupPolicy) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_notification_failure_policy(
        mut self,
        notification_failure: NotificationFailurePolicy,
    ) -> Self {
        self.notification_failure = notification_failure;
        self
    }

    pub fn defaults(&self) -> &DefaultCollaborators {
        &self.defaults
    }

    /// Look the user up, notify them, then persist their membership of `list_id`.
    ///
    /// The three steps run strictly in that order. A failing step stops the
    /// enrollment, unless it is the notification and the policy is
    /// [`NotificationFailurePolicy::LogAndContinue`].
    #[tracing::instrument(
        name = "Enrolling user in mailing list",
        skip(self, request),
        fields(
            username = %request.username,
            list_id = %request.list_id,
            lookup = ?self.lookup,
        )
    )]
    pub async fn enroll(&self, request: EnrollmentRequest) -> Result<User, EnrollmentError> {
        let EnrollmentRequest {
            username,
            list_id,
            directory,
            notifier,
        } = request;

        let username = Username::parse(username).map_err(EnrollmentError::ValidationError)?;
        let list_id = ListId::parse(list_id).map_err(EnrollmentError::ValidationError)?;

        let directory = match directory {
            Some(directory) => directory,
            None => self
                .defaults
                .directory()
                .await
                .context("Failed to build the default user directory.")?,
        };

        let user = self.resolve_user(directory.as_ref(), &username).await?;

        // The default notifier is only built once there is a user to notify.
        let notifier = match notifier {
            Some(notifier) => notifier,
            None => self
                .defaults
                .notifier()
                .await
                .context("Failed to build the default notifier.")?,
        };

        if let Err(e) = notifier.notify(&user, &list_id).await {
            match self.notification_failure {
                NotificationFailurePolicy::Abort => {
                    return Err(EnrollmentError::NotificationError(e));
                }
                NotificationFailurePolicy::LogAndContinue => {
                    tracing::error!(
                        error.cause_chain = ?e,
                        error.message = %e,
                        "Notification failed, enrolling the user anyway."
                    );
                }
            }
        }

        let user = directory
            .update_list_membership(&user, &list_id)
            .await
            .map_err(EnrollmentError::PersistenceError)?;

        tracing::info!("User enrolled in mailing list.");

        Ok(user)
    }

    async fn resolve_user(
        &self,
        directory: &dyn UserDirectory,
        username: &Username,
    ) -> Result<User, EnrollmentError> {
        match self.lookup {
            LookupPolicy::FindOrCreate => directory
                .find_or_create(username)
                .await
                .map_err(EnrollmentError::PersistenceError),
            LookupPolicy::RequireExisting => directory
                .find_by_username(username)
                .await
                .map_err(EnrollmentError::PersistenceError)?
                .ok_or_else(|| {
                    EnrollmentError::NotFoundError(format!("No user named {} exists.", username))
                }),
        }
    }
}
