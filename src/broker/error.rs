//! Tipos de erro para o cliente do broker de jobs.
//!
//! Define [`BrokerError`] com variantes para respostas HTTP não-2xx, falhas
//! de rede, respostas malformadas e timeout de sessão. Usa `thiserror` para
//! derivar `Display` e `Error` automaticamente a partir dos atributos
//! `#[error(...)]`.

use thiserror::Error;

/// Erros que podem ocorrer ao interagir com o broker de jobs.
///
/// As variantes cobrem as camadas de falha do protocolo:
/// - [`Status`](BrokerError::Status) — o servidor retornou HTTP fora da faixa 2xx
/// - [`Network`](BrokerError::Network) — falha na camada de rede
/// - [`Protocol`](BrokerError::Protocol) — resposta válida mas sem campos obrigatórios
/// - [`Timeout`](BrokerError::Timeout) — prazo da sessão esgotado
/// - [`Hook`](BrokerError::Hook) — um hook fornecido pelo chamador falhou
#[derive(Debug, Error)]
pub enum BrokerError {
    /// O servidor respondeu com um status de erro (ex.: 404 job inexistente,
    /// 409 estado inválido). Contém o código HTTP e o corpo da resposta.
    #[error("broker returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, corpo interrompido).
    /// Encapsula o erro original do `reqwest` via `#[from]`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Resposta sintaticamente entregue mas inválida no nível do protocolo
    /// (ex.: evento de payload sem `channel_id` nem `url`, JSON inesperado).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// O prazo total da sessão expirou antes de um status terminal.
    #[error("session timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Um hook fornecido pelo chamador (provedor de payload, consumidor de
    /// resultado) reportou falha.
    #[error("session hook failed: {0}")]
    Hook(String),
}

impl BrokerError {
    // Body decode failures are protocol-level; everything else stays transport.
    pub(crate) fn from_body(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BrokerError::Protocol(err.to_string())
        } else {
            BrokerError::Network(err)
        }
    }
}
