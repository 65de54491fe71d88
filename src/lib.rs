pub mod catalog;
pub mod config;
pub mod error;
pub mod history;
pub mod interlinear;
pub mod passage;
pub mod resolver;
pub mod router;
pub mod search;
pub mod store;
pub mod url;
#[cfg(feature = "web")]
pub mod web;

pub use catalog::{VersionCatalog, VersionCategory, VersionInfo};
pub use config::{ConfigError, StepConfig};
pub use error::{PassageError, SearchError};
pub use history::{Bookmark, BookmarkHistory, BookmarkOutcome};
pub use interlinear::{INTERLINEAR_OPTIONS, InterlinearMode, InterlinearOption};
pub use passage::{DisplayOption, ExtraVersions, PassageState, PassageUpdate};
pub use resolver::{DisplayModeAvailability, PassageResolver};
pub use router::{SearchOutcome, SearchTicket, StepRouter};
pub use search::{SearchClient, SearchRequest, SearchResponse, SearchType, ViewKind};
pub use store::{MemoryPassageStore, PassageStore};
pub use url::{
    QueryFields, SearchUrlState, append_param, build_search_url, normalize_bookmark_key,
    parse_query_into_state,
};
