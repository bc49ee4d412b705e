use serde::Serialize;

use crate::directory::FetchState;
use crate::model::user::UserRecord;

// What the presentation layer renders from. Built by `Directory::snapshot`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryView {
    pub users: Vec<UserRecord>,
    pub total: usize,
    pub query: String,
    pub fetch: FetchState,
    pub is_loading: bool,
    pub is_fetching_next_page: bool,
    pub has_next_page: bool,
    pub error: Option<String>,
}

impl DirectoryView {
    /// True when the filtered list is empty and nothing is on its way.
    pub fn is_empty_result(&self) -> bool {
        self.users.is_empty() && !self.is_loading && !self.is_fetching_next_page
    }
}
