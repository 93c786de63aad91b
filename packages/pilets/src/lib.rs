//! # pilets
//!
//! A runtime that discovers, loads, and hot-swaps independently deployed
//! modules ("pilets") into a running host, sharing one state tree and a
//! registry of pilet-contributed capabilities.
//!
//! ```ignore
//! use pilets::{Instance, InstanceConfig};
//! use pilets::search::{SearchConfig, SearchPlugin};
//!
//! let instance = Instance::builder()
//!     .config(InstanceConfig::from_file("pilets.json")?)
//!     .modules(my_modules)
//!     .plugin(SearchPlugin::new(SearchConfig::default()))
//!     .build()?;
//!
//! instance.start().await;
//! ```
//!
//! The building blocks are re-exported as modules:
//!
//! - [`state`]: global state container and action dispatcher
//! - [`registry`]: keyed provider registry
//! - [`feed`]: pilet descriptors and feed requesters
//! - [`loader`]: module loading and pilet lifecycle
//! - [`search`]: search provider plugin
//! - [`debug`]: emulator feed and live reload

mod config;
mod error;
mod instance;

pub use config::InstanceConfig;
pub use error::{Error, Result};
pub use instance::{Instance, InstanceBuilder};

pub use pilet_debug as debug;
pub use pilet_feed as feed;
pub use pilet_loader as loader;
pub use pilet_registry as registry;
pub use pilet_search as search;
pub use pilet_state as state;
