pub mod config;
pub mod dispatch;
pub mod event;
pub mod observers;
pub mod registry;
pub mod snapshot;
pub mod subscriber;
pub mod types;

use std::sync::Arc;

use log::info;

use crate::error::ObservableError;
use config::Config;
use dispatch::Dispatcher;
use registry::Registry;

/// Builds a shared registry and a dispatcher on the current tokio runtime
pub fn init(config: &Config) -> Result<(Arc<Registry>, Dispatcher), ObservableError> {
    config.validate()?;

    let registry = Arc::new(Registry::new(config.registry));
    let dispatcher = Dispatcher::new(Arc::clone(&registry), &config.dispatch)?;

    info!("Observable registry initialised");
    Ok((registry, dispatcher))
}
