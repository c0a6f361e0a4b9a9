use crate::domain::{DirectoryError, ListId, User, UserDirectory, Username};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Process-local user directory. Clones share the same records.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserDirectory {
    users: Arc<RwLock<HashMap<Username, User>>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a brand new record, rejecting usernames that are already taken.
    pub async fn insert(&self, user: User) -> Result<(), DirectoryError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.username) {
            return Err(DirectoryError::UniquenessViolation(format!(
                "A user named {} already exists.",
                user.username
            )));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    #[tracing::instrument(name = "Finding or creating user in memory", skip(self))]
    async fn find_or_create(&self, username: &Username) -> Result<User, DirectoryError> {
        let mut users = self.users.write().await;
        let user = users
            .entry(username.clone())
            .or_insert_with(|| User::new(username.clone()));
        Ok(user.clone())
    }

    #[tracing::instrument(name = "Finding user in memory", skip(self))]
    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, DirectoryError> {
        Ok(self.users.read().await.get(username).cloned())
    }

    #[tracing::instrument(
        name = "Updating list membership in memory",
        skip(self, user),
        fields(username = %user.username)
    )]
    async fn update_list_membership(
        &self,
        user: &User,
        list_id: &ListId,
    ) -> Result<User, DirectoryError> {
        let mut users = self.users.write().await;
        match users.get_mut(&user.username) {
            Some(stored) => {
                stored.list_membership = Some(list_id.clone());
                Ok(stored.clone())
            }
            None => Err(DirectoryError::RecordNotFound(format!(
                "No user named {} exists.",
                user.username
            ))),
        }
    }
}
