//! Provider lookup by runtime id.

use super::{
    AnthropicAdapter, ChatCompletionsAdapter, GeminiAdapter, ProviderAdapter, ProviderDescriptor,
};
use crate::error::{AcquisitionError, AcquisitionErrorKind};
use crate::seat::Seats;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Dispatch table from provider id to adapter.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    adapters: HashMap<&'static str, Arc<dyn ProviderAdapter>>,
    order: Vec<&'static str>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with every built-in adapter.
    #[instrument]
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ChatCompletionsAdapter::openai()));
        registry.register(Arc::new(AnthropicAdapter::new()));
        registry.register(Arc::new(GeminiAdapter::new()));
        registry.register(Arc::new(ChatCompletionsAdapter::openrouter()));
        registry.register(Arc::new(ChatCompletionsAdapter::deepseek()));
        info!(count = registry.order.len(), "Provider registry ready");
        registry
    }

    /// Adds `adapter`, replacing any adapter with the same id.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        let id = adapter.descriptor().id;
        if self.adapters.insert(id, adapter).is_none() {
            self.order.push(id);
        } else {
            debug!(id, "Replaced provider adapter");
        }
    }

    /// Adapter for `id`.
    #[instrument(skip(self))]
    pub fn get(&self, id: &str) -> Result<Arc<dyn ProviderAdapter>, AcquisitionError> {
        self.adapters.get(id).cloned().ok_or_else(|| {
            warn!(id, "Unknown provider requested");
            AcquisitionError::new(AcquisitionErrorKind::UnknownProvider(id.to_string()))
        })
    }

    /// Descriptors in registration order.
    pub fn list(&self) -> Vec<&ProviderDescriptor> {
        self.order
            .iter()
            .filter_map(|id| self.adapters.get(id))
            .map(|adapter| adapter.descriptor())
            .collect()
    }

    /// Fills missing AI-seat credentials from each provider's environment
    /// variable.
    #[instrument(skip(self, seats))]
    pub fn fill_credentials_from_env(&self, seats: &mut Seats) {
        for seat in [crate::Seat::White, crate::Seat::Black] {
            let config = seats.get_mut(seat);
            if !config.is_ai() {
                continue;
            }
            match self.adapters.get(config.provider().as_str()) {
                Some(adapter) => config.fill_credential_from_env(adapter.descriptor().api_key_env),
                None => warn!(%seat, provider = %config.provider(), "Seat uses unknown provider"),
            }
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.order)
            .finish()
    }
}
