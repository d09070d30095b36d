// Nightshift — HTTP client for the image-generation service queue

use super::*;
use crate::config::ServiceConfig;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    prompt_id: Option<String>,
}

/// HttpQueue speaks the service's `/prompt` and `/queue` endpoints.
pub struct HttpQueue {
    base_url: String,
    client: Client,
    health_timeout: Duration,
    submit_timeout: Duration,
    status_timeout: Duration,
}

impl HttpQueue {
    pub fn new(service: &ServiceConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: service.url.trim_end_matches('/').to_string(),
            client,
            health_timeout: Duration::from_secs(service.health_timeout_secs),
            submit_timeout: Duration::from_secs(service.submit_timeout_secs),
            status_timeout: Duration::from_secs(service.status_timeout_secs),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Send a request and return the body of a 2xx response.
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<String, QueueError> {
        let transport = |source| QueueError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            tracing::debug!(endpoint, status = %status, "Service returned error status");
            return Err(QueueError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl JobQueue for HttpQueue {
    async fn health_check(&self) -> Result<(), QueueError> {
        let request = self
            .client
            .get(self.url("/queue"))
            .timeout(self.health_timeout);
        self.send("/queue", request).await?;
        tracing::debug!(url = %self.base_url, "Service health check passed");
        Ok(())
    }

    async fn submit(&self, workflow: &Workflow) -> Result<String, QueueError> {
        let request = self
            .client
            .post(self.url("/prompt"))
            .timeout(self.submit_timeout)
            .json(&SubmitRequest { prompt: workflow });
        let body = self.send("/prompt", request).await?;

        let parsed: SubmitResponse =
            serde_json::from_str(&body).map_err(|source| QueueError::Decode {
                endpoint: "/prompt".to_string(),
                source,
            })?;

        match parsed.prompt_id {
            Some(id) => {
                tracing::debug!(prompt_id = %id, "Job submitted");
                Ok(id)
            }
            None => Err(QueueError::MissingPromptId(body)),
        }
    }

    async fn snapshot(&self) -> Result<QueueSnapshot, QueueError> {
        let request = self
            .client
            .get(self.url("/queue"))
            .timeout(self.status_timeout);
        let body = self.send("/queue", request).await?;

        serde_json::from_str(&body).map_err(|source| QueueError::Decode {
            endpoint: "/queue".to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn queue_for(server: &MockServer) -> HttpQueue {
        let service = ServiceConfig {
            url: format!("{}/", server.uri()),
            ..ServiceConfig::default()
        };
        HttpQueue::new(&service).unwrap()
    }

    #[tokio::test]
    async fn test_health_check_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/queue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let queue = queue_for(&server);
        assert_eq!(queue.base_url(), server.uri());
        queue.health_check().await.unwrap();
    }

    #[tokio::test]
    async fn test_health_check_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/queue"))
            .respond_with(ResponseTemplate::new(503).set_body_string("warming up"))
            .mount(&server)
            .await;

        let err = queue_for(&server).health_check().await.unwrap_err();
        match err {
            QueueError::Status { status, body, .. } => {
                assert_eq!(status, 503);
                assert_eq!(body, "warming up");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_submit_returns_prompt_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/prompt"))
            .and(body_partial_json(json!({"prompt": {"1": {"class_type": "KSampler"}}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"prompt_id": "job-1", "number": 0, "node_errors": {}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let wf: Workflow =
            serde_json::from_value(json!({"1": {"class_type": "KSampler", "inputs": {"seed": 5}}}))
                .unwrap();
        let id = queue_for(&server).submit(&wf).await.unwrap();
        assert_eq!(id, "job-1");
    }

    #[tokio::test]
    async fn test_submit_without_prompt_id_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "bad"})))
            .mount(&server)
            .await;

        let err = queue_for(&server)
            .submit(&Workflow::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::MissingPromptId(_)));
    }

    #[tokio::test]
    async fn test_submit_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/prompt"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid prompt"})))
            .mount(&server)
            .await;

        let err = queue_for(&server)
            .submit(&Workflow::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Status { status: 400, .. }));
    }

    #[tokio::test]
    async fn test_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/queue"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "queue_running": [[3, "job-3", {}, {}, []]],
                "queue_pending": []
            })))
            .mount(&server)
            .await;

        let snap = queue_for(&server).snapshot().await.unwrap();
        assert!(snap.is_running("job-3"));
        assert!(!snap.is_pending("job-3"));
    }

    #[tokio::test]
    async fn test_snapshot_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/queue"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = queue_for(&server).snapshot().await.unwrap_err();
        assert!(matches!(err, QueueError::Decode { .. }));
    }
}
