//! # pilet-loader
//!
//! Turns pilet descriptors into running pilets.
//!
//! - [`ModuleLoader`]: obtains an evaluated [`PiletModule`] for a descriptor,
//!   either from modules compiled into the host ([`StaticModuleLoader`]) or
//!   by fetching code and handing it to an [`Evaluator`]
//!   ([`FetchModuleLoader`])
//! - [`PiletApi`]: the capability object passed to a pilet's setup, bound to
//!   the session's actions and state plus the typed extensions contributed
//!   by [`HostPlugin`]s
//! - [`PiletLoader`]: loads, swaps and unloads pilets, running each
//!   pilet's [`Disposer`] before its record goes away
//!
//! ```ignore
//! let modules = StaticModuleLoader::new().with_module("hello", FnModule::new(|api: &PiletApi| {
//!     api.call_action("setTitle", json!("Hello"))?;
//!     Ok(None)
//! }));
//!
//! let loader = PiletLoader::new(HostContext::empty(), Arc::new(modules));
//! loader.load(PiletDescriptor::new("hello", "1.0.0")).await?;
//! ```

mod api;
mod error;
mod loader;
mod module;
mod plugin;
mod source;

pub use api::{Extensions, HostContext, PiletApi};
pub use error::{BoxError, LoaderError, Result};
pub use loader::{PiletLoader, MODULES_DOMAIN};
pub use module::{Disposer, FnModule, PiletModule};
pub use plugin::HostPlugin;
pub use source::{Evaluator, FetchModuleLoader, ModuleLoader, StaticModuleLoader};
