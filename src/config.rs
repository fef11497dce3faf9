//! Configuração do jobline carregada a partir de `jobline.toml`.
//!
//! A struct [`JoblineConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! As variáveis de ambiente `JOBLINE_BASE_URL` e `JOBLINE_API_KEY` têm
//! precedência sobre o arquivo.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Configuração de nível superior carregada de `jobline.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct JoblineConfig {
    /// URL base do broker.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Chave de API enviada como bearer token. Vazia desativa autenticação.
    #[serde(default)]
    pub api_key: String,

    /// Tipos de job que o worker aceita. Vazio aceita qualquer tipo.
    #[serde(default)]
    pub job_types: Vec<String>,

    /// Janela de espera de cada claim (long-poll), em segundos.
    #[serde(default = "default_claim_wait_seconds")]
    pub claim_wait_seconds: u64,

    /// Prazo total de uma sessão de submissão, em segundos.
    #[serde(default = "default_session_timeout_seconds")]
    pub session_timeout_seconds: u64,
}

// Valor padrão para a URL do broker: instância local.
fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

// Valor padrão para a janela de claim: 30s.
fn default_claim_wait_seconds() -> u64 {
    30
}

// Valor padrão para o prazo de sessão: 600s.
fn default_session_timeout_seconds() -> u64 {
    600
}

impl Default for JoblineConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            job_types: Vec::new(),
            claim_wait_seconds: default_claim_wait_seconds(),
            session_timeout_seconds: default_session_timeout_seconds(),
        }
    }
}

impl JoblineConfig {
    /// Carrega a configuração de `jobline.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self> {
        let path = Path::new("jobline.toml");
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<JoblineConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variáveis de ambiente têm precedência sobre o arquivo de configuração.
        if let Ok(url) = std::env::var("JOBLINE_BASE_URL")
            && !url.is_empty()
        {
            config.base_url = url;
        }
        if let Ok(key) = std::env::var("JOBLINE_API_KEY")
            && !key.is_empty()
        {
            config.api_key = key;
        }

        Ok(config)
    }

    /// Chave de API como `Option`, pronta para os construtores dos clientes.
    pub fn bearer_key(&self) -> Option<String> {
        if self.api_key.is_empty() {
            None
        } else {
            Some(self.api_key.clone())
        }
    }
}
