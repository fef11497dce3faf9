//! Tipos de dados do protocolo do broker de jobs.
//!
//! Todas as structs derivam `Serialize` e `Deserialize` para conversão JSON
//! conforme o formato dos endpoints `/api/jobs` e `/api/transfer` do broker.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Objeto JSON opaco usado em metadados, snapshots de job e eventos do stream.
pub type EventData = serde_json::Map<String, serde_json::Value>;

/// Estados do ciclo de vida de um job, como reportados pelo broker.
///
/// Estados que este cliente não conhece são preservados verbatim em
/// [`Other`](JobState::Other) e tratados como não-terminais, para que o
/// broker possa introduzir estados novos sem quebrar clientes antigos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Criado e aguardando um worker.
    Queued,
    /// Reivindicado por um worker.
    Claimed,
    /// Aguardando o submitter subir o payload.
    AwaitingPayload,
    /// Em processamento pelo worker.
    Running,
    /// Aguardando o worker subir o resultado.
    AwaitingResult,
    /// Concluído com sucesso. Terminal.
    Completed,
    /// Falhou. Terminal.
    Failed,
    /// Cancelado pelo submitter. Terminal.
    Canceled,
    /// Estado reportado pelo broker que este cliente não conhece.
    #[serde(untagged)]
    Other(String),
}

impl JobState {
    /// Interpreta uma string de estado vinda do broker.
    pub fn parse(value: &str) -> Self {
        match value {
            "queued" => JobState::Queued,
            "claimed" => JobState::Claimed,
            "awaiting_payload" => JobState::AwaitingPayload,
            "running" => JobState::Running,
            "awaiting_result" => JobState::AwaitingResult,
            "completed" => JobState::Completed,
            "failed" => JobState::Failed,
            "canceled" => JobState::Canceled,
            other => JobState::Other(other.to_string()),
        }
    }

    /// A string do estado no formato do protocolo.
    pub fn as_str(&self) -> &str {
        match self {
            JobState::Queued => "queued",
            JobState::Claimed => "claimed",
            JobState::AwaitingPayload => "awaiting_payload",
            JobState::Running => "running",
            JobState::AwaitingResult => "awaiting_result",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Canceled => "canceled",
            JobState::Other(s) => s,
        }
    }

    /// `true` exatamente para `completed`, `failed` e `canceled`.
    /// Estados desconhecidos nunca são terminais.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Canceled
        )
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detalhe de falha anexado a uma atualização de status `failed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobError {
    /// Código estável da falha (ex.: "handler_error").
    pub code: String,
    /// Mensagem legível descrevendo a falha.
    pub message: String,
}

/// Resposta de `POST /api/jobs` — o job recém-criado e seu estado inicial.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedJob {
    /// Identificador do job, gerado pelo broker.
    pub job_id: String,
    /// Estado inicial reportado (normalmente `queued`).
    pub status: JobState,
}

/// Resposta de `POST /api/jobs/claim` quando havia trabalho na fila.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimedJob {
    /// Identificador do job reivindicado.
    pub job_id: String,
    /// Tipo do job. Serializado como "type" no JSON.
    #[serde(rename = "type")]
    pub job_type: String,
    /// Metadados opacos fornecidos pelo submitter na criação.
    #[serde(default)]
    pub metadata: EventData,
}

/// Resposta de `POST /api/transfer` — um canal avulso recém-criado.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferChannel {
    /// Identificador do canal, usável como alvo de upload e download.
    pub channel_id: String,
    /// Instante em que o canal expira (imposto pelo servidor).
    pub expires_at: DateTime<Utc>,
}

/// Resposta dos endpoints de canal de payload/resultado de um job.
///
/// Quando presentes, `reader_url`/`writer_url` têm precedência sobre
/// `channel_id` na resolução do alvo de transferência.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelGrant {
    /// Chave que correlaciona o canal ao evento correspondente no stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Identificador do canal de transferência.
    pub channel_id: String,
    /// Caminho pronto para download, quando fornecido pelo broker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_url: Option<String>,
    /// Caminho pronto para upload, quando fornecido pelo broker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writer_url: Option<String>,
    /// Instante em que o canal expira.
    pub expires_at: DateTime<Utc>,
}

/// Um evento decodificado do stream de eventos de um job.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    /// Tipo do evento ("status", "payload", "result"); "message" quando
    /// o stream não nomeia o tipo.
    pub event_type: String,
    /// Corpo do evento como objeto JSON.
    pub data: EventData,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_state_roundtrips_known_strings() {
        let known = [
            ("queued", JobState::Queued),
            ("claimed", JobState::Claimed),
            ("awaiting_payload", JobState::AwaitingPayload),
            ("running", JobState::Running),
            ("awaiting_result", JobState::AwaitingResult),
            ("completed", JobState::Completed),
            ("failed", JobState::Failed),
            ("canceled", JobState::Canceled),
        ];
        for (wire, state) in known {
            let json = format!("\"{wire}\"");
            let parsed: JobState = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, state);
            assert_eq!(serde_json::to_string(&state).unwrap(), json);
            assert_eq!(state.as_str(), wire);
            assert_eq!(JobState::parse(wire), state);
        }
    }

    #[test]
    fn job_state_preserves_unknown_strings() {
        let parsed: JobState = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(parsed, JobState::Other("paused".into()));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\"paused\"");
        assert_eq!(parsed.to_string(), "paused");
    }

    #[test]
    fn only_completed_failed_canceled_are_terminal() {
        assert!(JobState::Completed.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Canceled.is_terminal());
        assert!(!JobState::Queued.is_terminal());
        assert!(!JobState::Claimed.is_terminal());
        assert!(!JobState::AwaitingPayload.is_terminal());
        assert!(!JobState::Running.is_terminal());
        assert!(!JobState::AwaitingResult.is_terminal());
        assert!(!JobState::Other("archived".into()).is_terminal());
    }

    #[test]
    fn claimed_job_type_field_renames_correctly() {
        let json = r#"{"job_id": "j1", "type": "render", "metadata": {"frames": 10}}"#;
        let claim: ClaimedJob = serde_json::from_str(json).unwrap();
        assert_eq!(claim.job_id, "j1");
        assert_eq!(claim.job_type, "render");
        assert_eq!(claim.metadata["frames"], 10);

        let out = serde_json::to_string(&claim).unwrap();
        assert!(out.contains(r#""type""#));
        assert!(!out.contains("job_type"));
    }

    #[test]
    fn claimed_job_missing_metadata_defaults_to_empty() {
        let json = r#"{"job_id": "j2", "type": "echo"}"#;
        let claim: ClaimedJob = serde_json::from_str(json).unwrap();
        assert!(claim.metadata.is_empty());
    }

    #[test]
    fn channel_grant_deserialize_from_broker_format() {
        let json = r#"{
            "key": "payload",
            "channel_id": "ch-123",
            "reader_url": "/api/transfer/ch-123",
            "expires_at": "2025-06-01T12:00:00Z"
        }"#;
        let grant: ChannelGrant = serde_json::from_str(json).unwrap();
        assert_eq!(grant.key.as_deref(), Some("payload"));
        assert_eq!(grant.channel_id, "ch-123");
        assert_eq!(grant.reader_url.as_deref(), Some("/api/transfer/ch-123"));
        assert_eq!(grant.writer_url, None);
        assert_eq!(grant.expires_at.to_rfc3339(), "2025-06-01T12:00:00+00:00");
    }

    #[test]
    fn created_job_reports_queued() {
        let json = r#"{"job_id": "j3", "status": "queued"}"#;
        let created: CreatedJob = serde_json::from_str(json).unwrap();
        assert_eq!(created.job_id, "j3");
        assert_eq!(created.status, JobState::Queued);
        assert!(!created.status.is_terminal());
    }
}
