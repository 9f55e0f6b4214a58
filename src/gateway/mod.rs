//! Source service gateway: the per-interface-type client contract used to
//! fetch original payloads and resubmit failed operations.

pub mod mock;

use crate::error::Result;
use crate::models::{InterfaceException, InterfaceType};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Result of fetching the original payload for a failed transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadResponse {
    pub retrieved: bool,
    pub payload: Option<Value>,
    pub source_service: Option<String>,
    pub error_message: Option<String>,
}

impl PayloadResponse {
    pub fn retrieved(payload: Value, source_service: impl Into<String>) -> Self {
        Self {
            retrieved: true,
            payload: Some(payload),
            source_service: Some(source_service.into()),
            error_message: None,
        }
    }

    pub fn not_retrieved(
        source_service: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            retrieved: false,
            payload: None,
            source_service: Some(source_service.into()),
            error_message: Some(error_message.into()),
        }
    }
}

/// Result of resubmitting a payload to the source system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub status_code: u16,
    pub body: Option<Value>,
}

impl SubmitResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn body_text(&self) -> String {
        self.body
            .as_ref()
            .map(|b| b.to_string())
            .unwrap_or_else(|| "No response body".to_string())
    }
}

/// Client for one source system, capable of fetching the original payload
/// of a failed transaction and resubmitting it.
#[async_trait]
pub trait SourceServiceClient: Send + Sync {
    /// Fetch the current upstream record for the exception's external id.
    async fn get_original_payload(&self, exception: &InterfaceException)
        -> Result<PayloadResponse>;

    /// Resubmit the payload to the source system.
    async fn submit_retry(
        &self,
        exception: &InterfaceException,
        payload: &Value,
    ) -> Result<SubmitResponse>;

    /// Name of the source service this client talks to, for diagnostics.
    fn source_service(&self) -> &str;
}

/// Registry of source service clients keyed by interface type.
#[derive(Default)]
pub struct SourceServiceClientRegistry {
    clients: DashMap<InterfaceType, Arc<dyn SourceServiceClient>>,
}

impl SourceServiceClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &self,
        interface_type: InterfaceType,
        client: Arc<dyn SourceServiceClient>,
    ) {
        tracing::info!(
            interface_type = %interface_type,
            source_service = client.source_service(),
            "Registered source service client"
        );
        self.clients.insert(interface_type, client);
    }

    pub fn get(&self, interface_type: InterfaceType) -> Option<Arc<dyn SourceServiceClient>> {
        self.clients.get(&interface_type).map(|c| c.clone())
    }

    pub fn has_client(&self, interface_type: InterfaceType) -> bool {
        self.clients.contains_key(&interface_type)
    }
}

pub use mock::MockSourceServiceClient;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submit_response_success_classification() {
        assert!(SubmitResponse {
            status_code: 200,
            body: None
        }
        .is_success());
        assert!(SubmitResponse {
            status_code: 299,
            body: None
        }
        .is_success());
        assert!(!SubmitResponse {
            status_code: 300,
            body: None
        }
        .is_success());
        assert!(!SubmitResponse {
            status_code: 503,
            body: None
        }
        .is_success());
    }

    #[test]
    fn test_registry_lookup() {
        let registry = SourceServiceClientRegistry::new();
        assert!(!registry.has_client(InterfaceType::Order));

        registry.register(
            InterfaceType::Order,
            Arc::new(MockSourceServiceClient::new("partner-order-service")),
        );
        assert!(registry.has_client(InterfaceType::Order));
        assert!(registry.get(InterfaceType::Collection).is_none());
    }
}
