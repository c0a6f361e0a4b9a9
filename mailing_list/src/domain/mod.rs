mod list_id;
mod notifier;
mod user;
mod user_directory;
mod username;

pub use crate::domain::list_id::ListId;
pub use crate::domain::notifier::Notifier;
pub use crate::domain::user::User;
pub use crate::domain::user_directory::{DirectoryError, UserDirectory};
pub use crate::domain::username::Username;
