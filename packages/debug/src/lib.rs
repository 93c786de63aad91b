//! # pilet-debug
//!
//! Support for debug sessions, where pilets are served by a local pilet API
//! and swapped in place while the host keeps running.
//!
//! - [`SessionContext`]: the session's `dbg:*` settings
//! - [`resolve_pilet_api`] / [`socket_url`]: where the pilet API and its
//!   live-reload socket live
//! - [`EmulatorRequester`]: merges debug pilets over the regular feed
//! - [`LiveReloadChannel`]: applies change notifications to a
//!   [`ReloadTarget`], usually a [`LoaderTarget`]

mod channel;
mod config;
mod connector;
mod emulator;
mod endpoint;
mod error;
mod session;
mod target;

pub use channel::{ChannelState, LiveReloadChannel, ReloadEvent, ReloadTarget};
pub use config::DebugConfig;
pub use connector::{ReloadConnector, TungsteniteConnector};
pub use emulator::EmulatorRequester;
pub use endpoint::{resolve_pilet_api, socket_url};
pub use error::{ReloadError, Result};
pub use session::{SessionContext, HARD_REFRESH, LOAD_PILETS, PILET_API};
pub use target::LoaderTarget;
