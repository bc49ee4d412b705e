use std::num::NonZeroUsize;
use std::time::Duration;

use reqwest::Url;

use crate::cache::DuplicatePolicy;

pub const DEFAULT_ENDPOINT: &str = "https://randomuser.me/api/";
pub const DEFAULT_BATCH_SIZE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => panic!("batch size must not be zero"),
};
pub const DEFAULT_DELETE_DELAY: Duration = Duration::from_millis(500);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    /// Records requested per page; also the yardstick for the short-batch
    /// check. Zero would ask for empty pages that never look exhausted.
    pub batch_size: NonZeroUsize,
    /// Simulated confirmation latency of a delete.
    pub delete_delay: Duration,
    pub duplicates: DuplicatePolicy,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        DirectoryConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            delete_delay: DEFAULT_DELETE_DELAY,
            duplicates: DuplicatePolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub endpoint: Url,
    pub timeout: Duration,
    /// Passed through as `seed=` so the random source returns stable pages.
    pub seed: Option<String>,
}

impl SourceConfig {
    pub fn new(endpoint: Url) -> Self {
        SourceConfig {
            endpoint,
            timeout: DEFAULT_TIMEOUT,
            seed: None,
        }
    }
}
