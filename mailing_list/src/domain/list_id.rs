use serde::Serialize;

const MAX_LENGTH: usize = 64;

/// Identifier of a mailing list, e.g. `blog_list`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ListId(String);

impl ListId {
    pub fn parse(s: String) -> Result<ListId, String> {
        let is_empty = s.is_empty();

        let is_too_long = s.len() > MAX_LENGTH;

        let has_invalid_characters = s
            .chars()
            .any(|c| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'));

        if is_empty || is_too_long || has_invalid_characters {
            Err(format!("{} is not a valid mailing list identifier", s))
        } else {
            Ok(Self(s))
        }
    }

    pub fn inner(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for ListId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ListId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
