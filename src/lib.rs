mod cache;
mod config;
mod directory;
mod exhaustion;
mod gateway;
mod model;
pub mod prompt;
mod search;
mod sentinel;

pub use cache::{Appended, Batch, CacheError, DuplicatePolicy, PageCache};
pub use config::{DirectoryConfig, SourceConfig, DEFAULT_BATCH_SIZE, DEFAULT_DELETE_DELAY, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use directory::{DeleteOutcome, Directory, FetchState, LoadOutcome, PendingDelete, SkipReason};
pub use exhaustion::{PageExhaustion, ShortBatch};
pub use gateway::{FetchGateway, HttpGateway, NetworkError, PageRequest};
pub use model::source::SourcePage;
pub use model::user::{Location, PersonName, UserRecord};
pub use model::view::DirectoryView;
pub use search::{search, SearchMemo};
pub use sentinel::Sentinel;
