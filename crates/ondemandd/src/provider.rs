//! Controller construction from configuration.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use ondemand_controller::{HttpController, InstanceController, MemoryController};
use ondemand_core::{InstanceState, OndemandConfig, ProviderKind};

/// Build the instance controller selected by `[provider].kind`.
pub fn build_controller(config: &OndemandConfig) -> anyhow::Result<Arc<dyn InstanceController>> {
    match config.provider.kind {
        ProviderKind::Http => {
            let endpoint = config
                .provider
                .endpoint
                .as_deref()
                .context("http provider requires an endpoint")?;
            let timeout = config.provider_timeout()?;
            let controller = HttpController::new(endpoint, timeout)?
                .with_region(config.provider.region.clone())
                .with_token(config.provider.token.clone());
            info!(%endpoint, timeout = ?timeout, "http provider configured");
            Ok(Arc::new(controller))
        }
        ProviderKind::Memory => {
            warn!("using simulated in-memory provider; no real instance will be touched");
            Ok(Arc::new(
                MemoryController::new(config.instance_ref(), InstanceState::Stopped)
                    .with_auto_settle(true),
            ))
        }
    }
}
