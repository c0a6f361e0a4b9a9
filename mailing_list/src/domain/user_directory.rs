use crate::domain::list_id::ListId;
use crate::domain::user::User;
use crate::domain::username::Username;
use crate::utils::error_chain_fmt;
use async_trait::async_trait;

#[derive(thiserror::Error)]
pub enum DirectoryError {
    #[error("{0}")]
    UniquenessViolation(String),
    #[error("{0}")]
    RecordNotFound(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for DirectoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// Storage of user records, keyed by username.
///
/// Implementations own username uniqueness and whatever locking concurrent
/// enrollments of the same username need.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Return the user named `username`, creating it without a list membership if absent.
    async fn find_or_create(&self, username: &Username) -> Result<User, DirectoryError>;

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, DirectoryError>;

    /// Persist `list_id` as the membership of `user` and return the stored record.
    async fn update_list_membership(
        &self,
        user: &User,
        list_id: &ListId,
    ) -> Result<User, DirectoryError>;
}
