//! Tool catalog: discovery with a write-once cache.

use std::sync::Arc;

use ragpilot_core::error::ToolError;
use ragpilot_core::provider::ToolDefinition;
use ragpilot_core::tool::{ToolDescriptor, ToolProvider};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Discovers tools from a [`ToolProvider`] and caches the first successful
/// answer for the lifetime of the catalog.
///
/// Shared between runs behind an `Arc`. A failed discovery is not cached,
/// so the next run tries again.
pub struct ToolCatalog {
    provider: Arc<dyn ToolProvider>,
    cache: OnceCell<Vec<ToolDescriptor>>,
}

impl ToolCatalog {
    pub fn new(provider: Arc<dyn ToolProvider>) -> Self {
        Self {
            provider,
            cache: OnceCell::new(),
        }
    }

    /// The provider tools are discovered from and invoked on.
    pub fn provider(&self) -> Arc<dyn ToolProvider> {
        Arc::clone(&self.provider)
    }

    /// Tool descriptors in provider format.
    ///
    /// Any provider failure is reported as [`ToolError::CatalogUnavailable`].
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, ToolError> {
        let tools = self
            .cache
            .get_or_try_init(|| async {
                let tools = self.provider.list_tools().await.map_err(|e| match e {
                    ToolError::CatalogUnavailable(_) => e,
                    other => ToolError::CatalogUnavailable(other.to_string()),
                })?;
                debug!(
                    provider = self.provider.name(),
                    count = tools.len(),
                    "Discovered tools"
                );
                Ok::<_, ToolError>(tools)
            })
            .await
            .inspect_err(|e| warn!(provider = self.provider.name(), error = %e, "Tool discovery failed"))?;

        Ok(tools.clone())
    }

    /// Tool definitions in the shape the model backend expects.
    pub async fn definitions(&self) -> Result<Vec<ToolDefinition>, ToolError> {
        Ok(self
            .list_tools()
            .await?
            .iter()
            .map(ToolDefinition::from)
            .collect())
    }
}
