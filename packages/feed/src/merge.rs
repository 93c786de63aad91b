//! Reconciling pilet lists from several sources.

use std::collections::HashSet;

use crate::descriptor::PiletDescriptor;

/// Combine a feed result with an override list.
///
/// Override entries take precedence and come first, in their own order.
/// Feed entries whose name appears in the override list are dropped, so
/// the same logical pilet is never loaded from two sources.
pub fn reconcile(
    feed: Vec<PiletDescriptor>,
    overrides: Vec<PiletDescriptor>,
) -> Vec<PiletDescriptor> {
    let overridden: HashSet<String> = overrides.iter().map(|p| p.name.clone()).collect();

    let mut merged = overrides;
    merged.extend(feed.into_iter().filter(|p| {
        let keep = !overridden.contains(&p.name);
        if !keep {
            tracing::debug!(pilet = %p.name, "feed entry replaced by override");
        }
        keep
    }));
    merged
}
