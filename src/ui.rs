//! Interface de terminal do jobline — spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`JobProgress`] acompanha visualmente
//! o ciclo de vida de um job no terminal.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::broker::{EventData, JobError, JobState};

/// Indicador visual de progresso para o ciclo de vida de um job no terminal.
///
/// Exibe um spinner animado enquanto o job avança pelos estados e mensagens
/// coloridas para o desfecho: verde (completed), vermelho (failed) e
/// amarelo (canceled).
pub struct JobProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para desfecho de sucesso.
    green: Style,
    // Estilo vermelho para desfecho de falha.
    red: Style,
    // Estilo amarelo para cancelamento e notas.
    yellow: Style,
}

impl JobProgress {
    /// Inicia o spinner com uma descrição e retorna a instância de progresso.
    pub fn start(description: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(description.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    /// Atualiza a mensagem do spinner para refletir o estado atual do job.
    pub fn update_state(&self, state: &JobState) {
        self.pb.set_message(state.to_string());
    }

    /// Imprime uma nota acima do spinner sem interromper a animação.
    pub fn note(&self, text: &str) {
        self.pb
            .println(format!("  {} {text}", self.yellow.apply_to("·")));
    }

    /// Finaliza o spinner e exibe o desfecho do job.
    ///
    /// Completed é mostrado em verde com checkmark; failed em vermelho com X;
    /// canceled em amarelo.
    pub fn complete(&self, state: &JobState, error: Option<&JobError>) {
        self.pb.finish_and_clear();
        match state {
            JobState::Completed => {
                println!("  {} Job completed", self.green.apply_to("✓"));
            }
            JobState::Failed => match error {
                Some(err) => println!(
                    "  {} Job failed: {} ({})",
                    self.red.apply_to("✗"),
                    err.message,
                    err.code
                ),
                None => println!("  {} Job failed", self.red.apply_to("✗")),
            },
            JobState::Canceled => {
                println!("  {} Job canceled", self.yellow.apply_to("⊘"));
            }
            other => {
                println!("  {} Job left in state: {other}", self.yellow.apply_to("•"));
            }
        }
    }

    /// Descarta o spinner sem imprimir desfecho.
    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }

    /// Imprime o snapshot de um job formatado em JSON com estilo colorido.
    pub fn print_snapshot(&self, snapshot: &EventData) {
        let state = snapshot
            .get("status")
            .and_then(|v| v.as_str())
            .map(JobState::parse);
        let status_style = match state {
            Some(JobState::Completed) => &self.green,
            Some(JobState::Failed) => &self.red,
            _ => &self.yellow,
        };
        self.pb.finish_and_clear();
        println!("{}", status_style.apply_to("─── Job Snapshot ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(snapshot).unwrap_or_default()
        );
    }
}
