pub mod dynamodb_user_directory;
pub mod http_notification_client;
mod in_memory_user_directory;

pub use crate::adapters::dynamodb_user_directory::DynamoDbUserDirectory;
pub use crate::adapters::http_notification_client::HttpNotificationClient;
pub use crate::adapters::in_memory_user_directory::InMemoryUserDirectory;
