use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rfq_form_spec::{
    AnswerMap, Blueprint, CollaboratorError, SubmissionAdapter, SubmissionError, SubmissionId,
    SubmissionPayload,
};
use tracing::{info, warn};

/// The external listing creation API.
#[async_trait]
pub trait SubmissionClient: Send + Sync {
    async fn create_listing(
        &self,
        payload: &SubmissionPayload,
    ) -> Result<SubmissionId, CollaboratorError>;
}

/// Calls a [`SubmissionClient`] under a timeout and maps its result.
#[derive(Clone)]
pub struct Submitter {
    client: Arc<dyn SubmissionClient>,
    adapter: SubmissionAdapter,
    timeout: Duration,
}

impl std::fmt::Debug for Submitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Submitter")
            .field("adapter", &self.adapter)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Submitter {
    pub fn new(
        client: Arc<dyn SubmissionClient>,
        adapter: SubmissionAdapter,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            adapter,
            timeout,
        }
    }

    pub fn adapter(&self) -> &SubmissionAdapter {
        &self.adapter
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Validates, flattens and sends the answers.
    pub async fn submit(
        &self,
        blueprint: &Blueprint,
        answers: &AnswerMap,
    ) -> Result<SubmissionId, SubmissionError> {
        let payload = self.adapter.prepare(blueprint, answers)?;
        self.send(&payload).await
    }

    /// Sends an already prepared payload.
    pub async fn send(&self, payload: &SubmissionPayload) -> Result<SubmissionId, SubmissionError> {
        let outcome = match tokio::time::timeout(self.timeout, self.client.create_listing(payload))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(CollaboratorError::Timeout {
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }),
        };
        let mapped = SubmissionAdapter::map_result(outcome);
        match &mapped {
            Ok(id) => info!(form = %payload.form_id, listing = %id, "listing created"),
            Err(err) => warn!(form = %payload.form_id, error = %err, "submission failed"),
        }
        mapped
    }
}

#[cfg(feature = "http")]
pub use http::HttpSubmissionClient;

#[cfg(feature = "http")]
mod http {
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use rfq_form_spec::{CollaboratorError, SubmissionId, SubmissionPayload};
    use serde::Deserialize;
    use url::Url;

    #[derive(Debug, Deserialize)]
    struct CreatedListing {
        id: String,
    }

    /// Posts payloads to `{base}/listings`.
    #[derive(Debug, Clone)]
    pub struct HttpSubmissionClient {
        client: reqwest::Client,
        endpoint: Url,
    }

    impl HttpSubmissionClient {
        pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
            Self::with_client(reqwest::Client::new(), base_url)
        }

        pub fn with_client(
            client: reqwest::Client,
            base_url: &str,
        ) -> Result<Self, url::ParseError> {
            let mut base = Url::parse(base_url)?;
            if !base.path().ends_with('/') {
                let path = format!("{}/", base.path());
                base.set_path(&path);
            }
            Ok(Self {
                client,
                endpoint: base.join("listings")?,
            })
        }

        pub fn endpoint(&self) -> &Url {
            &self.endpoint
        }
    }

    #[async_trait]
    impl super::SubmissionClient for HttpSubmissionClient {
        async fn create_listing(
            &self,
            payload: &SubmissionPayload,
        ) -> Result<SubmissionId, CollaboratorError> {
            let response = self
                .client
                .post(self.endpoint.clone())
                .json(payload)
                .send()
                .await
                .map_err(transport_error)?;

            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(rejected(status, message));
            }
            let created: CreatedListing = response
                .json()
                .await
                .map_err(|err| CollaboratorError::Other(format!("unexpected response: {err}")))?;
            Ok(SubmissionId(created.id))
        }
    }

    fn transport_error(err: reqwest::Error) -> CollaboratorError {
        if err.is_timeout() {
            CollaboratorError::Timeout { after_ms: 0 }
        } else if err.is_connect() || err.is_request() {
            CollaboratorError::Unavailable(err.to_string())
        } else {
            CollaboratorError::Other(err.to_string())
        }
    }

    fn rejected(status: StatusCode, message: String) -> CollaboratorError {
        CollaboratorError::Rejected {
            status: status.as_u16(),
            message: if message.trim().is_empty() {
                status.canonical_reason().unwrap_or("no body").to_string()
            } else {
                message
            },
        }
    }
}
