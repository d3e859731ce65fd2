//! Adapters for the hosted model flows: split-method suggestions and
//! receipt scanning. Both are single request/response calls with no retry.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::config::AssistantConfig;
use crate::form::FormError;

pub const SPLIT_FLOW: &str = "suggestSplitMethod";
pub const RECEIPT_FLOW: &str = "scanReceipt";

#[derive(Debug, Error, PartialEq)]
pub enum AssistantError {
    #[error("the assistant is not configured")]
    NotConfigured,
    #[error("{0}")]
    Request(String),
    #[error("{0}")]
    Flow(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitSuggestionRequest {
    pub description: String,
    pub num_people: u32,
}

impl SplitSuggestionRequest {
    pub fn validate(&self) -> Result<(), FormError> {
        if self.description.trim().is_empty() || self.num_people < 2 {
            return Err(FormError::InvalidSuggestionInput);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SplitSuggestion {
    pub method: String,
    pub reasoning: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptScanRequest {
    pub receipt_data_uri: String,
}

impl ReceiptScanRequest {
    /// Accepts `data:<type>/<subtype>;base64,<payload>` only.
    pub fn validate(&self) -> Result<(), FormError> {
        let rest = self
            .receipt_data_uri
            .strip_prefix("data:")
            .ok_or(FormError::InvalidReceipt)?;
        let (mime, payload) = rest.split_once(";base64,").ok_or(FormError::InvalidReceipt)?;
        let well_formed_mime = mime
            .split_once('/')
            .is_some_and(|(kind, subtype)| !kind.is_empty() && !subtype.is_empty());
        let well_formed_payload = !payload.is_empty()
            && payload
                .bytes()
                .all(|byte| byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'/' | b'='));
        if well_formed_mime && well_formed_payload {
            Ok(())
        } else {
            Err(FormError::InvalidReceipt)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ReceiptScan {
    pub description: String,
    pub amount: f64,
    pub category: String,
}

/// A flow answers with either its output or `{ "error": ... }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FlowResponse<T> {
    Failed { error: String },
    Done(T),
}

#[async_trait(?Send)]
pub trait Assistant {
    async fn suggest_split(&self, request: &SplitSuggestionRequest) -> Result<SplitSuggestion, AssistantError>;

    async fn scan_receipt(&self, request: &ReceiptScanRequest) -> Result<ReceiptScan, AssistantError>;
}

/// Calls `<base_url>/<flow>` with a JSON body.
pub struct HttpAssistant {
    client: awc::Client,
    config: AssistantConfig,
}

impl HttpAssistant {
    pub fn new(config: AssistantConfig) -> Self {
        Self {
            client: awc::Client::default(),
            config,
        }
    }

    async fn run_flow<I: Serialize, O: DeserializeOwned>(&self, flow: &str, input: &I) -> Result<O, AssistantError> {
        let base_url = self.config.url.as_deref().ok_or(AssistantError::NotConfigured)?;
        let url = format!("{}/{}", base_url.trim_end_matches('/'), flow);

        let mut request = self.client.post(&url);
        if let Some(api_key) = &self.config.api_key {
            request = request.insert_header((
                actix_web::http::header::AUTHORIZATION,
                format!("Bearer {api_key}"),
            ));
        }

        tracing::debug!(flow, "calling assistant flow");
        let mut response = request
            .send_json(input)
            .await
            .map_err(|err| AssistantError::Request(err.to_string()))?;
        let status = response.status();
        let body: FlowResponse<O> = response
            .json()
            .await
            .map_err(|err| AssistantError::Request(format!("unreadable response ({status}): {err}")))?;

        match body {
            FlowResponse::Done(output) if status.is_success() => Ok(output),
            FlowResponse::Done(_) => Err(AssistantError::Flow(format!("the service answered {status}"))),
            FlowResponse::Failed { error } => Err(AssistantError::Flow(error)),
        }
    }
}

#[async_trait(?Send)]
impl Assistant for HttpAssistant {
    async fn suggest_split(&self, request: &SplitSuggestionRequest) -> Result<SplitSuggestion, AssistantError> {
        self.run_flow(SPLIT_FLOW, request).await
    }

    async fn scan_receipt(&self, request: &ReceiptScanRequest) -> Result<ReceiptScan, AssistantError> {
        self.run_flow(RECEIPT_FLOW, request).await
    }
}
