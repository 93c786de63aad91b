//! # pilet-registry
//!
//! Generic keyed registration used by feature plugins to let pilets
//! contribute and retract capabilities (search providers, feed connectors,
//! extensions) at runtime.
//!
//! ```rust
//! use pilet_registry::{build_name, LocalName, ProviderRegistry};
//!
//! let registry = ProviderRegistry::new();
//! let key = build_name("my-pilet", &LocalName::from("finder"));
//! registry.register(key.clone(), "handler");
//!
//! assert_eq!(registry.get(&key).as_deref(), Some(&"handler"));
//! registry.unregister(&key);
//! registry.unregister(&key); // idempotent
//! assert!(registry.is_empty());
//! ```

mod name;
mod registry;

pub use name::{build_name, namespace_of, LocalName, NameAllocator};
pub use registry::ProviderRegistry;
