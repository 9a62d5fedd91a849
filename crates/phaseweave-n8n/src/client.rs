use crate::ApiError;
use phaseweave_core::{WorkflowDocument, sanitize_for_write, validate_document};
use std::time::Duration;
use tracing::{debug, info};

const API_KEY_HEADER: &str = "X-N8N-API-KEY";

#[derive(Debug, Clone)]
pub struct N8nConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl Default for N8nConfig {
    fn default() -> Self {
        Self::new(
            std::env::var("N8N_BASE_URL").unwrap_or_else(|_| "http://localhost:5678".to_string()),
            std::env::var("N8N_API_KEY").unwrap_or_default(),
        )
    }
}

impl N8nConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout: Duration::from_secs(15),
        }
    }
}

/// The fetch/write seam between the session layer and the n8n server.
///
/// `create` takes no identifier; `replace` is a whole-document PUT (the
/// server's update contract is full replacement, not a patch).
pub trait WorkflowStore {
    async fn fetch(&self, id: &str) -> Result<WorkflowDocument, ApiError>;
    async fn create(&self, doc: WorkflowDocument) -> Result<WorkflowDocument, ApiError>;
    async fn replace(&self, id: &str, doc: WorkflowDocument) -> Result<WorkflowDocument, ApiError>;
    /// Browser URL of the workflow in the n8n editor.
    fn editor_url(&self, id: &str) -> String;
}

/// Client for the n8n REST API.
pub struct N8nClient {
    config: N8nConfig,
    http: reqwest::Client,
}

impl N8nClient {
    pub fn new(config: N8nConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &N8nConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.config.base_url, path)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header(API_KEY_HEADER, &self.config.api_key)
            .timeout(self.config.timeout)
    }

    /// Cheap connectivity probe against the workflows endpoint (the most
    /// stable one across n8n versions).
    pub async fn ping(&self) -> Result<(), ApiError> {
        let url = self.api_url("workflows");
        let response = self
            .request(self.http.get(&url))
            .send()
            .await
            .map_err(ApiError::from_transport)?;

        let status = response.status();
        if status.is_success() {
            debug!(%url, "n8n connection ok");
            Ok(())
        } else {
            Err(ApiError::from_status(status, body_detail(response).await))
        }
    }

    pub async fn get_workflow(&self, id: &str) -> Result<WorkflowDocument, ApiError> {
        let url = self.api_url(&format!("workflows/{id}"));
        debug!(%url, "fetching workflow");
        let response = self
            .request(self.http.get(&url))
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        decode_workflow(response).await
    }

    /// Create a new workflow. Validates and sanitizes before sending;
    /// returns the server-confirmed document carrying its assigned id.
    pub async fn create_workflow(
        &self,
        doc: WorkflowDocument,
    ) -> Result<WorkflowDocument, ApiError> {
        validate_document(&doc)?;
        let doc = sanitize_for_write(doc);

        let url = self.api_url("workflows");
        info!(name = %doc.name, nodes = doc.nodes.len(), "creating workflow");
        let response = self
            .request(self.http.post(&url).json(&doc))
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        decode_workflow(response).await
    }

    /// Replace an existing workflow wholesale (the API uses PUT, not
    /// PATCH, so the complete document must be sent).
    pub async fn update_workflow(
        &self,
        id: &str,
        doc: WorkflowDocument,
    ) -> Result<WorkflowDocument, ApiError> {
        validate_document(&doc)?;
        let doc = sanitize_for_write(doc);

        let url = self.api_url(&format!("workflows/{id}"));
        info!(%id, name = %doc.name, nodes = doc.nodes.len(), "updating workflow");
        let response = self
            .request(self.http.put(&url).json(&doc))
            .send()
            .await
            .map_err(ApiError::from_transport)?;
        decode_workflow(response).await
    }

    /// Editor URL for a workflow (the UI lives above the API prefix).
    pub fn workflow_url(&self, id: &str) -> String {
        let editor_base = self
            .config
            .base_url
            .replace("/api/v1", "")
            .replace("/rest", "");
        format!("{}/workflow/{id}", editor_base.trim_end_matches('/'))
    }
}

impl WorkflowStore for N8nClient {
    async fn fetch(&self, id: &str) -> Result<WorkflowDocument, ApiError> {
        self.get_workflow(id).await
    }

    async fn create(&self, doc: WorkflowDocument) -> Result<WorkflowDocument, ApiError> {
        self.create_workflow(doc).await
    }

    async fn replace(&self, id: &str, doc: WorkflowDocument) -> Result<WorkflowDocument, ApiError> {
        self.update_workflow(id, doc).await
    }

    fn editor_url(&self, id: &str) -> String {
        self.workflow_url(id)
    }
}

async fn decode_workflow(response: reqwest::Response) -> Result<WorkflowDocument, ApiError> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<WorkflowDocument>()
            .await
            .map_err(|e| ApiError::Unexpected(format!("failed to decode workflow response: {e}")))
    } else {
        Err(ApiError::from_status(status, body_detail(response).await))
    }
}

/// First 200 chars of the error body, for the structured detail field.
async fn body_detail(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    truncate_chars(&text, 200)
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}
