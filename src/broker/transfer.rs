use reqwest::{Client, Method, RequestBuilder};

use super::error::BrokerError;
use super::types::TransferChannel;

/// Move blobs de payload e resultado pelos canais `/api/transfer` do broker.
///
/// Canais são ponto-a-ponto e de uso único: cada um suporta um único par
/// upload/download e expira sozinho no servidor. Uploads e downloads são
/// requisições únicas, sem chunking nem retry.
pub struct TransferClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TransferClient {
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

    /// Cria um canal de transferência avulso.
    pub async fn create_channel(&self) -> Result<TransferChannel, BrokerError> {
        let url = format!("{}/api/transfer", self.base_url);
        let response = self.request(Method::POST, &url).send().await?;
        let response = super::ensure_success(response).await?;
        response
            .json::<TransferChannel>()
            .await
            .map_err(BrokerError::from_body)
    }

    /// Baixa o conteúdo de um canal e retorna os bytes crus.
    ///
    /// A requisição só completa quando o lado escritor do canal conecta,
    /// ou quando o canal expira no servidor.
    pub async fn download(&self, target: &str) -> Result<Vec<u8>, BrokerError> {
        let url = self.resolve_url(target);
        let response = self.request(Method::GET, &url).send().await?;
        let response = super::ensure_success(response).await?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Sobe `data` para um canal em uma única requisição.
    pub async fn upload(
        &self,
        target: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<(), BrokerError> {
        let url = self.resolve_url(target);
        let mut req = self.request(Method::POST, &url).body(data);
        if let Some(ct) = content_type {
            req = req.header("content-type", ct);
        }
        let response = req.send().await?;
        super::ensure_success(response).await?;
        Ok(())
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self
            .client
            .request(method, url)
            .timeout(super::REQUEST_TIMEOUT);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        req
    }

    /// Resolve um alvo de transferência para a URL completa: URLs http(s)
    /// absolutas passam direto, um identificador puro vira
    /// `{base}/api/transfer/{id}`, e qualquer outro caminho é colado na base.
    fn resolve_url(&self, target: &str) -> String {
        let lower = target.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return target.to_string();
        }
        if !target.contains('/') {
            return format!("{}/api/transfer/{}", self.base_url, target);
        }
        format!("{}{}", self.base_url, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_at(base: &str) -> TransferClient {
        TransferClient::new(base.to_string(), None)
    }

    #[test]
    fn resolve_url_passes_absolute_urls_through() {
        let client = client_at("http://broker.local");
        assert_eq!(
            client.resolve_url("http://other.host/api/transfer/abc"),
            "http://other.host/api/transfer/abc"
        );
        assert_eq!(
            client.resolve_url("HTTPS://Other.Host/x"),
            "HTTPS://Other.Host/x"
        );
    }

    #[test]
    fn resolve_url_expands_bare_channel_ids() {
        let client = client_at("http://broker.local");
        assert_eq!(
            client.resolve_url("ch-42"),
            "http://broker.local/api/transfer/ch-42"
        );
    }

    #[test]
    fn resolve_url_joins_relative_paths_to_base() {
        let client = client_at("http://broker.local");
        assert_eq!(
            client.resolve_url("/api/transfer/ch-42"),
            "http://broker.local/api/transfer/ch-42"
        );
    }

    #[test]
    fn resolve_url_keeps_base_path_and_query_strings() {
        // A base mounted under a path prefix must survive both resolution arms.
        let client = client_at("http://h/x");
        assert_eq!(client.resolve_url("abc"), "http://h/x/api/transfer/abc");
        assert_eq!(
            client.resolve_url("/api/transfer/abc?sig=1"),
            "http://h/x/api/transfer/abc?sig=1"
        );
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = client_at("http://broker.local/");
        assert_eq!(
            client.resolve_url("/api/transfer/ch-1"),
            "http://broker.local/api/transfer/ch-1"
        );
    }

    #[tokio::test]
    async fn create_channel_parses_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/transfer"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "channel_id": "ch-77",
                "expires_at": "2025-06-01T12:00:00Z"
            })))
            .mount(&server)
            .await;

        let channel = client_at(&server.uri()).create_channel().await.unwrap();
        assert_eq!(channel.channel_id, "ch-77");
    }

    #[tokio::test]
    async fn upload_sends_body_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/transfer/ch-1"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        client_at(&server.uri())
            .upload("ch-1", b"hello channel".to_vec(), Some("text/plain"))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body, b"hello channel");
        assert_eq!(
            requests[0].headers.get("content-type").unwrap(),
            "text/plain"
        );
    }

    #[tokio::test]
    async fn download_returns_raw_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/transfer/ch-9"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(vec![0u8, 159, 146, 150], "application/octet-stream"),
            )
            .mount(&server)
            .await;

        let bytes = client_at(&server.uri()).download("ch-9").await.unwrap();
        assert_eq!(bytes, vec![0u8, 159, 146, 150]);
    }

    #[tokio::test]
    async fn bearer_key_is_attached_when_configured() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/transfer/ch-2"))
            .and(bearer_token("sk-secret"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"ok".to_vec(), "text/plain"))
            .mount(&server)
            .await;

        let client = TransferClient::new(server.uri(), Some("sk-secret".into()));
        let bytes = client.download("ch-2").await.unwrap();
        assert_eq!(bytes, b"ok");
    }

    #[tokio::test]
    async fn expired_channel_surfaces_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/transfer/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("channel not found"))
            .mount(&server)
            .await;

        let err = client_at(&server.uri()).download("gone").await.unwrap_err();
        match err {
            BrokerError::Status { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "channel not found");
            }
            other => panic!("expected Status error, got: {other:?}"),
        }
    }
}
