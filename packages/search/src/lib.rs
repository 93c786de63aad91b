//! # pilet-search
//!
//! A host plugin letting pilets contribute search providers.
//!
//! Pilets receive a [`PiletSearchApi`] through their capability object and
//! register handlers on it. The [`SearchEngine`] fans each query out to the
//! registered providers, isolates provider failures, and publishes the
//! merged results to the `search` state domain.

mod api;
mod engine;
mod error;
mod handler;
mod plugin;

pub use api::PiletSearchApi;
pub use engine::{ProviderFilter, SearchEngine, SearchOutcome};
pub use error::{Result, SearchError};
pub use handler::{
    search_handler, Callback, SearchHandler, SearchProviderRegistration, SearchQuery,
    SearchSettings,
};
pub use plugin::{InitialSearchProvider, SearchConfig, SearchPlugin};
