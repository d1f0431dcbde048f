use futures_util::future::join_all;
use serde::Deserialize;
use tokio::sync::broadcast::Receiver;

use crate::{Signal, internal, listener::Listener, traits::Protocol};

#[derive(Debug, Default, Deserialize)]
pub struct Controller<Proto: Protocol> {
    #[serde(default, alias = "listener")]
    listeners: Vec<Listener<Proto>>,
}

impl<Proto: Protocol> Controller<Proto> {
    #[must_use]
    pub const fn new(listeners: Vec<Listener<Proto>>) -> Self {
        Self { listeners }
    }

    #[must_use]
    pub fn listeners(&self) -> &[Listener<Proto>] {
        &self.listeners
    }

    /// Map over the args of all listeners, allowing modification before initialization
    ///
    /// This is how runtime resources that cannot be deserialized, such as the
    /// shared mail store or the credential verifier, reach each session.
    pub fn map_args<F>(&mut self, f: F)
    where
        F: Fn(Proto::Args) -> Proto::Args,
    {
        for listener in &mut self.listeners {
            listener.map_args(&f);
        }
    }

    ///
    /// Initialise this controller
    ///
    /// # Errors
    /// Any errors initialising this controller
    ///
    pub fn init(&mut self) -> anyhow::Result<()> {
        internal!("Initialising Controller for {}", Proto::ty());

        if self.listeners.is_empty() {
            internal!(level = WARN, "No {} listeners configured", Proto::ty());
        }

        self.listeners
            .iter_mut()
            .try_for_each(Listener::init)
            .map_err(anyhow::Error::from)
    }

    ///
    /// # Errors
    /// If any of the listeners have a failure
    ///
    #[tracing::instrument(level = "trace", skip_all)]
    pub async fn control(self, shutdown: Receiver<Signal>) -> anyhow::Result<()> {
        join_all(
            self.listeners
                .iter()
                .map(|l| l.serve(shutdown.resubscribe())),
        )
        .await
        .into_iter()
        .try_for_each(|a| a)
    }
}
