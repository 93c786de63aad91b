use std::sync::Arc;

use async_trait::async_trait;
use pilet_feed::PiletDescriptor;
use pilet_loader::PiletLoader;
use tokio::sync::mpsc;

use crate::channel::ReloadTarget;

/// Applies live-reload messages to a [`PiletLoader`].
///
/// A full reload cannot be carried out from inside the channel, so each
/// request is sent to the returned receiver for the session to act on.
pub struct LoaderTarget {
    loader: Arc<PiletLoader>,
    reload: mpsc::UnboundedSender<()>,
}

impl LoaderTarget {
    pub fn new(loader: Arc<PiletLoader>) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (reload, requests) = mpsc::unbounded_channel();
        (Self { loader, reload }, requests)
    }
}

#[async_trait]
impl ReloadTarget for LoaderTarget {
    async fn remove_pilet(&self, name: &str) {
        self.loader.unload(name).await;
    }

    async fn add_pilet(&self, descriptor: PiletDescriptor) {
        let name = descriptor.name.clone();
        if let Err(e) = self.loader.load(descriptor).await {
            tracing::error!(pilet = %name, error = %e, "failed to reload pilet");
        }
    }

    async fn full_reload(&self) {
        tracing::info!("full reload requested");
        if self.reload.send(()).is_err() {
            tracing::warn!("full reload requested but nobody is listening");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pilet_loader::{Disposer, FnModule, HostContext, PiletApi, StaticModuleLoader};
    use std::sync::Mutex;

    #[tokio::test]
    async fn swap_goes_through_the_loader() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let module = {
            let events = events.clone();
            FnModule::new(move |api: &PiletApi| {
                let tag = format!("{}@{}", api.name(), api.meta().version);
                events.lock().unwrap().push(format!("setup {tag}"));
                let events = events.clone();
                Ok(Some(Disposer::new(move || {
                    events.lock().unwrap().push(format!("dispose {tag}"));
                })))
            })
        };
        let loader = Arc::new(PiletLoader::new(
            HostContext::empty(),
            Arc::new(StaticModuleLoader::new().with_module("a", module)),
        ));
        loader.load(PiletDescriptor::new("a", "1")).await.unwrap();

        let (target, _requests) = LoaderTarget::new(loader.clone());
        target.remove_pilet("a").await;
        target.add_pilet(PiletDescriptor::new("a", "2")).await;

        assert_eq!(
            *events.lock().unwrap(),
            vec!["setup a@1", "dispose a@1", "setup a@2"]
        );
        assert_eq!(loader.loaded().await[0].version, "2");
    }

    #[tokio::test]
    async fn full_reload_requests_are_queued() {
        let loader = Arc::new(PiletLoader::new(
            HostContext::empty(),
            Arc::new(StaticModuleLoader::new()),
        ));
        let (target, mut requests) = LoaderTarget::new(loader);

        target.full_reload().await;
        target.full_reload().await;
        assert_eq!(requests.try_recv(), Ok(()));
        assert_eq!(requests.try_recv(), Ok(()));
        assert!(requests.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_add_is_logged_not_raised() {
        let loader = Arc::new(PiletLoader::new(
            HostContext::empty(),
            Arc::new(StaticModuleLoader::new()),
        ));
        let (target, _requests) = LoaderTarget::new(loader.clone());
        target.add_pilet(PiletDescriptor::new("unknown", "1")).await;
        assert!(loader.loaded().await.is_empty());
    }
}
