use crate::domain::list_id::ListId;
use crate::domain::user::User;
use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user: &User, list_id: &ListId) -> Result<(), anyhow::Error>;
}
