use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    pub first: String,
    pub last: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub country: String,
}

/// One directory entry. The email address is the record's key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub email: String,
    pub name: PersonName,
    pub phone: String,
    pub location: Location,
    pub avatar: String,
}

impl UserRecord {
    pub fn key(&self) -> &str {
        &self.email
    }

    /// "first last", the text the search filter matches against.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name.first, self.name.last)
    }
}
