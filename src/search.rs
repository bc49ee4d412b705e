use crate::model::user::UserRecord;

/// Records whose "first last" name contains `query`, ignoring case, in their
/// original order. An empty query keeps everything.
pub fn search<'a, I>(records: I, query: &str) -> Vec<&'a UserRecord>
where
    I: IntoIterator<Item = &'a UserRecord>,
{
    let needle = query.to_lowercase();
    records
        .into_iter()
        .filter(|user| matches(user, &needle))
        .collect()
}

fn matches(user: &UserRecord, needle: &str) -> bool {
    needle.is_empty() || user.display_name().to_lowercase().contains(needle)
}

/// Remembers the last filter result for a given cache revision and query.
#[derive(Debug, Default)]
pub struct SearchMemo {
    key: Option<(u64, String)>,
    hits: Vec<UserRecord>,
}

impl SearchMemo {
    pub fn filter<'a, I>(&mut self, revision: u64, records: I, query: &str) -> &[UserRecord]
    where
        I: IntoIterator<Item = &'a UserRecord>,
    {
        let fresh = match &self.key {
            Some((r, q)) => *r == revision && q == query,
            None => false,
        };
        if !fresh {
            self.hits = search(records, query).into_iter().cloned().collect();
            self.key = Some((revision, query.to_owned()));
        }
        &self.hits
    }

    pub fn clear(&mut self) {
        self.key = None;
        self.hits.clear();
    }
}
