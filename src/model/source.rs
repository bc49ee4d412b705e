use serde::{Deserialize, Serialize};

use crate::model::user::{Location, PersonName, UserRecord};

// Wire model of the user source. Every field defaults so a malformed record
// is passed through rather than failing the whole page.
#[derive(Debug, Serialize, Deserialize)]
pub struct SourcePage {
    pub results: Vec<SourceUser>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceUser {
    pub name: SourceName,
    pub email: String,
    pub phone: String,
    pub location: SourceLocation,
    pub picture: SourcePicture,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceName {
    pub first: String,
    pub last: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceLocation {
    pub city: String,
    pub country: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcePicture {
    pub large: String,
}

impl From<SourceUser> for UserRecord {
    fn from(u: SourceUser) -> Self {
        UserRecord {
            email: u.email,
            name: PersonName {
                first: u.name.first,
                last: u.name.last,
            },
            phone: u.phone,
            location: Location {
                city: u.location.city,
                country: u.location.country,
            },
            avatar: u.picture.large,
        }
    }
}

impl SourcePage {
    pub fn into_records(self) -> Vec<UserRecord> {
        self.results.into_iter().map(UserRecord::from).collect()
    }
}
