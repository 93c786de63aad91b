//! What a pilet looks like once its code has been obtained.

use std::fmt;

use crate::api::PiletApi;
use crate::error::BoxError;

/// Reverses the effects of a setup call or a single registration.
///
/// A disposer runs at most once: [`Disposer::dispose`] consumes it.
pub struct Disposer(Box<dyn FnOnce() -> Result<(), BoxError> + Send>);

impl Disposer {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self(Box::new(move || {
            f();
            Ok(())
        }))
    }

    /// A disposer whose cleanup can fail.
    pub fn fallible<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), BoxError> + Send + 'static,
    {
        Self(Box::new(f))
    }

    pub fn noop() -> Self {
        Self::new(|| {})
    }

    /// Combine disposers into one that runs them in reverse order.
    ///
    /// Every disposer runs even if an earlier one fails; the first error is
    /// returned.
    pub fn all(disposers: impl IntoIterator<Item = Disposer>) -> Self {
        let disposers: Vec<Disposer> = disposers.into_iter().collect();
        Self::fallible(move || {
            let mut first_error = None;
            for disposer in disposers.into_iter().rev() {
                if let Err(e) = disposer.dispose() {
                    first_error.get_or_insert(e);
                }
            }
            first_error.map_or(Ok(()), Err)
        })
    }

    pub fn dispose(self) -> Result<(), BoxError> {
        (self.0)()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Disposer(..)")
    }
}

/// An evaluated pilet.
pub trait PiletModule: Send + Sync {
    /// Wire the pilet into the host.
    ///
    /// The returned disposer, if any, is invoked when the pilet is unloaded.
    fn setup(&self, api: &PiletApi) -> Result<Option<Disposer>, BoxError>;

    /// Called after the disposer on unload.
    fn teardown(&self, _api: &PiletApi) {}
}

/// A module built from a setup closure.
pub struct FnModule<F> {
    setup: F,
}

impl<F> FnModule<F>
where
    F: Fn(&PiletApi) -> Result<Option<Disposer>, BoxError> + Send + Sync,
{
    pub fn new(setup: F) -> Self {
        Self { setup }
    }
}

impl<F> PiletModule for FnModule<F>
where
    F: Fn(&PiletApi) -> Result<Option<Disposer>, BoxError> + Send + Sync,
{
    fn setup(&self, api: &PiletApi) -> Result<Option<Disposer>, BoxError> {
        (self.setup)(api)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn disposer_runs_once() {
        let hits = Arc::new(Mutex::new(0));
        let h = hits.clone();
        let disposer = Disposer::new(move || *h.lock().unwrap() += 1);
        disposer.dispose().unwrap();
        assert_eq!(*hits.lock().unwrap(), 1);
    }

    #[test]
    fn combined_disposers_run_in_reverse_and_keep_going() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let make = |n: u8| {
            let order = order.clone();
            Disposer::new(move || order.lock().unwrap().push(n))
        };
        let failing = Disposer::fallible(|| Err("broken".into()));

        let result = Disposer::all(vec![make(1), failing, make(3)]).dispose();

        assert_eq!(result.unwrap_err().to_string(), "broken");
        assert_eq!(*order.lock().unwrap(), vec![3, 1]);
    }

    #[test]
    fn noop_disposer() {
        assert!(Disposer::noop().dispose().is_ok());
    }
}
