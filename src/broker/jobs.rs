use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};

use super::error::BrokerError;
use super::events::EventStream;
use super::types::{ChannelGrant, ClaimedJob, CreatedJob, EventData, JobError, JobState};

/// Cliente REST para o ciclo de vida de jobs no broker (`/api/jobs`).
///
/// Cobre os dois lados do protocolo: criação/acompanhamento (submitter) e
/// claim/atualização de status (worker).
pub struct JobClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl JobClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self::with_client(super::build_http_client(), base_url, api_key)
    }

    /// Create a client reusing an existing connection pool.
    pub(crate) fn with_client(
        client: Client,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            api_key,
        }
    }

    pub async fn create_job(
        &self,
        job_type: &str,
        metadata: Option<EventData>,
    ) -> Result<CreatedJob, BrokerError> {
        let url = format!("{}/api/jobs", self.base_url);
        // O broker espera `metadata` sempre presente, ainda que vazio.
        let body = serde_json::json!({
            "type": job_type,
            "metadata": metadata.unwrap_or_default(),
        });
        let response = self
            .request(Method::POST, &url)
            .timeout(super::REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;
        let response = super::ensure_success(response).await?;
        response
            .json::<CreatedJob>()
            .await
            .map_err(BrokerError::from_body)
    }

    pub async fn get_job(&self, job_id: &str) -> Result<EventData, BrokerError> {
        let url = format!("{}/api/jobs/{}", self.base_url, job_id);
        let response = self
            .request(Method::GET, &url)
            .timeout(super::REQUEST_TIMEOUT)
            .send()
            .await?;
        let response = super::ensure_success(response).await?;
        response
            .json::<EventData>()
            .await
            .map_err(BrokerError::from_body)
    }

    pub async fn cancel_job(&self, job_id: &str) -> Result<(), BrokerError> {
        let url = format!("{}/api/jobs/{}/cancel", self.base_url, job_id);
        let response = self
            .request(Method::POST, &url)
            .timeout(super::REQUEST_TIMEOUT)
            .send()
            .await?;
        super::ensure_success(response).await?;
        Ok(())
    }

    /// Reivindica o próximo job da fila, esperando até `max_wait_seconds`.
    ///
    /// `Ok(None)` significa fila vazia (HTTP 204), não um erro. Tipos em
    /// branco são filtrados; com a lista vazia o filtro inteiro fica fora
    /// do corpo e qualquer tipo é aceito.
    pub async fn claim_job(
        &self,
        types: &[String],
        max_wait_seconds: u64,
    ) -> Result<Option<ClaimedJob>, BrokerError> {
        let url = format!("{}/api/jobs/claim", self.base_url);
        let types: Vec<&str> = types
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        let mut body = EventData::new();
        if !types.is_empty() {
            body.insert("types".to_string(), serde_json::json!(types));
        }
        body.insert(
            "max_wait_seconds".to_string(),
            serde_json::json!(max_wait_seconds),
        );

        // O long-poll do servidor segura a resposta por até max_wait_seconds.
        let response = self
            .request(Method::POST, &url)
            .timeout(Duration::from_secs(max_wait_seconds + 30))
            .json(&body)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let response = super::ensure_success(response).await?;
        let claim = response
            .json::<ClaimedJob>()
            .await
            .map_err(BrokerError::from_body)?;
        Ok(Some(claim))
    }

    /// Reporta uma transição de estado. O corpo carrega exatamente os campos
    /// fornecidos; uma recusa do broker (ex.: job já terminal) vira erro.
    pub async fn update_status(
        &self,
        job_id: &str,
        state: &JobState,
        progress: Option<&EventData>,
        error: Option<&JobError>,
    ) -> Result<(), BrokerError> {
        let url = format!("{}/api/jobs/{}/status", self.base_url, job_id);
        let mut body = EventData::new();
        body.insert(
            "state".to_string(),
            serde_json::Value::String(state.as_str().to_string()),
        );
        if let Some(progress) = progress {
            body.insert(
                "progress".to_string(),
                serde_json::Value::Object(progress.clone()),
            );
        }
        if let Some(error) = error {
            body.insert(
                "error".to_string(),
                serde_json::json!({ "code": error.code, "message": error.message }),
            );
        }
        let response = self
            .request(Method::POST, &url)
            .timeout(super::REQUEST_TIMEOUT)
            .json(&body)
            .send()
            .await?;
        super::ensure_success(response).await?;
        Ok(())
    }

    pub async fn request_payload_channel(
        &self,
        job_id: &str,
        key: Option<&str>,
    ) -> Result<ChannelGrant, BrokerError> {
        let url = format!("{}/api/jobs/{}/payload", self.base_url, job_id);
        self.request_channel(url, key).await
    }

    pub async fn request_result_channel(
        &self,
        job_id: &str,
        key: Option<&str>,
    ) -> Result<ChannelGrant, BrokerError> {
        let url = format!("{}/api/jobs/{}/result", self.base_url, job_id);
        self.request_channel(url, key).await
    }

    // Sem chave o corpo vai vazio e o servidor aplica a chave padrão do
    // endpoint ("payload"/"result").
    async fn request_channel(
        &self,
        url: String,
        key: Option<&str>,
    ) -> Result<ChannelGrant, BrokerError> {
        let mut req = self
            .request(Method::POST, &url)
            .timeout(super::REQUEST_TIMEOUT);
        if let Some(key) = key {
            req = req.json(&serde_json::json!({ "key": key }));
        }
        let response = req.send().await?;
        let response = super::ensure_success(response).await?;
        response
            .json::<ChannelGrant>()
            .await
            .map_err(BrokerError::from_body)
    }

    /// Abre o stream de eventos ao vivo do job. A requisição não tem timeout:
    /// o corpo fica aberto enquanto o broker publicar eventos.
    pub async fn stream_events(&self, job_id: &str) -> Result<EventStream, BrokerError> {
        let url = format!("{}/api/jobs/{}/events", self.base_url, job_id);
        let response = self
            .request(Method::GET, &url)
            .header("accept", "text/event-stream")
            .send()
            .await?;
        let response = super::ensure_success(response).await?;
        Ok(EventStream::new(response))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }
}
