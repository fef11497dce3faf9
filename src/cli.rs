//! Interface de linha de comando do jobline baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (submit, work, status,
//! cancel, transfer) e flags globais (--base-url, --api-key, --verbose).

use clap::{Parser, Subcommand};

/// jobline — cliente de ciclo de vida de jobs para o broker.
#[derive(Debug, Parser)]
#[command(name = "jobline", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// URL base do broker (sobrepõe arquivo de config e ambiente).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Chave de API enviada como bearer token em cada requisição.
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cria um job e acompanha a sessão até o estado terminal.
    Submit {
        /// Tipo do job a criar (ex.: "asr.transcribe").
        job_type: String,

        /// Arquivo servido como payload quando o worker pedir.
        #[arg(long)]
        payload: Option<String>,

        /// Metadados do job como objeto JSON inline.
        #[arg(long)]
        metadata: Option<String>,

        /// Arquivo onde gravar o resultado (padrão: stdout).
        #[arg(long)]
        output: Option<String>,

        /// Prazo total da sessão em segundos.
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Reivindica e processa jobs da fila em ciclo contínuo.
    Work {
        /// Tipos aceitos, separados por vírgula. Vazio aceita qualquer tipo.
        #[arg(long, value_delimiter = ',')]
        types: Vec<String>,

        /// Janela de espera de cada claim, em segundos.
        #[arg(long)]
        wait: Option<u64>,

        /// Executa um único ciclo de claim e encerra.
        #[arg(long, default_value_t = false)]
        once: bool,
    },

    /// Mostra o snapshot atual de um job.
    Status {
        /// Identificador do job.
        job_id: String,
    },

    /// Cancela um job antes de completar.
    Cancel {
        /// Identificador do job.
        job_id: String,
    },

    /// Teste de canal de transferência: upload e download no mesmo canal.
    Transfer {
        /// Texto enviado pelo canal.
        #[arg(long, default_value = "ping")]
        data: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_submit_subcommand() {
        let cli = Cli::parse_from([
            "jobline",
            "submit",
            "asr.transcribe",
            "--payload",
            "audio.wav",
            "--timeout",
            "90",
        ]);
        match cli.command {
            Command::Submit {
                job_type,
                payload,
                metadata,
                output,
                timeout,
            } => {
                assert_eq!(job_type, "asr.transcribe");
                assert_eq!(payload.unwrap(), "audio.wav");
                assert!(metadata.is_none());
                assert!(output.is_none());
                assert_eq!(timeout, Some(90));
            }
            _ => panic!("expected Submit command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "jobline",
            "--base-url",
            "https://broker.example.com",
            "--api-key",
            "sk-123",
            "--verbose",
            "status",
            "job-1",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.base_url.as_deref(), Some("https://broker.example.com"));
        assert_eq!(cli.api_key.as_deref(), Some("sk-123"));
    }

    #[test]
    fn cli_parses_work_types_list() {
        let cli = Cli::parse_from(["jobline", "work", "--types", "render,transcribe", "--once"]);
        match cli.command {
            Command::Work { types, wait, once } => {
                assert_eq!(types, vec!["render", "transcribe"]);
                assert!(wait.is_none());
                assert!(once);
            }
            _ => panic!("expected Work command"),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
