//! Host plugins: capability families (search, extensions, ...) the host
//! offers to every pilet.

use pilet_feed::PiletDescriptor;

use crate::api::{Extensions, HostContext};
use crate::error::Result;

/// A capability family installed once per session.
///
/// At bootstrap the plugin defines its actions and initial state. For every
/// pilet it contributes a typed extension to that pilet's [`PiletApi`], and
/// when a pilet is unloaded it sweeps whatever the pilet left behind.
///
/// [`PiletApi`]: crate::PiletApi
pub trait HostPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn install(&self, _context: &HostContext) -> Result<()> {
        Ok(())
    }

    fn extend(&self, _pilet: &PiletDescriptor, _context: &HostContext, _extensions: &mut Extensions) {
    }

    /// Called after the pilet's disposer and teardown have run.
    fn on_unload(&self, _pilet: &str, _context: &HostContext) {}
}
