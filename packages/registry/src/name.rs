//! Namespaced registration keys.
//!
//! Pilets are authored independently, so the local name a pilet picks for a
//! provider is only unique within that pilet. Keys in a registry are always
//! `<pilet>:<local>`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

const SEPARATOR: char = ':';

/// The pilet-local part of a registration key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LocalName {
    /// A name chosen by the pilet.
    Named(String),
    /// A name generated by a [`NameAllocator`].
    Auto(u64),
}

impl fmt::Display for LocalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalName::Named(name) => f.write_str(name),
            LocalName::Auto(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for LocalName {
    fn from(name: &str) -> Self {
        LocalName::Named(name.to_string())
    }
}

impl From<String> for LocalName {
    fn from(name: String) -> Self {
        LocalName::Named(name)
    }
}

impl From<u64> for LocalName {
    fn from(n: u64) -> Self {
        LocalName::Auto(n)
    }
}

/// Build the registry key for a pilet-local name.
pub fn build_name(pilet: &str, local: &LocalName) -> String {
    format!("{}{}{}", pilet, SEPARATOR, local)
}

/// The pilet a key belongs to.
///
/// Keys without a separator belong to no pilet (host-provided entries).
pub fn namespace_of(key: &str) -> Option<&str> {
    key.split_once(SEPARATOR).map(|(pilet, _)| pilet)
}

/// Hands out strictly increasing local names for one pilet.
#[derive(Debug, Default)]
pub struct NameAllocator {
    next: AtomicU64,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_name(&self) -> LocalName {
        LocalName::Auto(self.next.fetch_add(1, Ordering::SeqCst))
    }
}
