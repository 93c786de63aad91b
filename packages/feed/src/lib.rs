//! # pilet-feed
//!
//! The pull side of pilet discovery.
//!
//! - [`PiletDescriptor`]: pilet identity, code reference and schema version
//! - [`PiletRequester`]: one round trip producing the pilets to load
//! - [`FeedRequester`]: GETs a feed service; accepts a single descriptor,
//!   an array, or an `{ "items": [...] }` envelope
//! - [`reconcile`]: merges a feed result with an override list, overrides
//!   winning by name
//!
//! ```ignore
//! use pilet_feed::{FeedConfig, FeedRequester, PiletRequester};
//!
//! let requester = FeedRequester::new(&FeedConfig::new("https://feed.example.com/api/v1/pilet"))?;
//! let pilets = requester.request_pilets().await?;
//! ```

pub mod error;
pub mod executor;
pub mod types;

mod config;
mod descriptor;
mod merge;
mod requester;

pub use config::FeedConfig;
pub use descriptor::{parse_feed, PiletDescriptor, PiletSource};
pub use error::{FeedError, Result};
pub use executor::{HttpExecutor, ReqwestExecutor};
pub use merge::reconcile;
pub use requester::{fetch_descriptors, FeedRequester, NoPilets, PiletRequester, StaticRequester};
pub use types::{HttpRequest, HttpResponse};

#[cfg(any(test, feature = "test-utils"))]
pub use executor::mock::MockExecutor;
