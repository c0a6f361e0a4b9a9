use crate::domain::list_id::ListId;
use crate::domain::username::Username;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub username: Username,
    pub list_membership: Option<ListId>,
}

impl User {
    /// A freshly created user that belongs to no mailing list yet.
    pub fn new(username: Username) -> Self {
        Self {
            username,
            list_membership: None,
        }
    }

    pub fn with_list_membership(mut self, list_id: ListId) -> Self {
        self.list_membership = Some(list_id);
        self
    }

    pub fn is_member_of(&self, list_id: &ListId) -> bool {
        self.list_membership.as_ref() == Some(list_id)
    }
}
