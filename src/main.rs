mod broker;
mod cli;
mod config;
mod session;
mod ui;
mod worker;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use broker::{BrokerError, ChannelGrant, ClaimedJob, EventData, JobError, JobState, TransferClient};
use cli::{Cli, Command};
use config::JoblineConfig;
use session::{JobSubmitter, Payload, SessionHandler};
use ui::JobProgress;
use worker::{JobHandler, JobWorker, RunOutcome};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = JoblineConfig::load()?;
    let base_url = cli
        .base_url
        .clone()
        .unwrap_or_else(|| config.base_url.clone());
    let api_key = cli.api_key.clone().or_else(|| config.bearer_key());

    match cli.command {
        Command::Submit {
            job_type,
            payload,
            metadata,
            output,
            timeout,
        } => {
            let args = SubmitArgs {
                job_type,
                payload_path: payload,
                metadata_json: metadata,
                output_path: output,
                timeout_seconds: timeout.unwrap_or(config.session_timeout_seconds),
                verbose: cli.verbose,
            };
            run_submit(base_url, api_key, args).await
        }
        Command::Work { types, wait, once } => {
            let types = if types.is_empty() {
                config.job_types.clone()
            } else {
                types
            };
            let wait = wait.unwrap_or(config.claim_wait_seconds);
            run_work(base_url, api_key, types, wait, once, cli.verbose).await
        }
        Command::Status { job_id } => run_status(base_url, api_key, job_id).await,
        Command::Cancel { job_id } => run_cancel(base_url, api_key, job_id).await,
        Command::Transfer { data } => run_transfer(base_url, api_key, data).await,
    }
}

/// Everything the submit command needs beyond the broker endpoint.
struct SubmitArgs {
    job_type: String,
    payload_path: Option<String>,
    metadata_json: Option<String>,
    output_path: Option<String>,
    timeout_seconds: u64,
    verbose: bool,
}

async fn run_submit(base_url: String, api_key: Option<String>, args: SubmitArgs) -> Result<()> {
    let metadata = args
        .metadata_json
        .map(|raw| serde_json::from_str::<EventData>(&raw))
        .transpose()
        .context("--metadata must be a JSON object")?;

    let submitter = JobSubmitter::new(base_url, api_key);
    let handler = FileSessionHandler {
        payload_path: args.payload_path,
        output_path: args.output_path,
        progress: JobProgress::start(&format!("submitting {}", args.job_type)),
        verbose: args.verbose,
        last_state: JobState::Queued,
        last_error: None,
        result_summary: None,
    };

    let mut session = submitter
        .create_session(&args.job_type, metadata, handler)
        .await?;
    session
        .handler
        .progress
        .note(&format!("job {} created", session.job_id));

    let limit = Some(Duration::from_secs(args.timeout_seconds));
    let outcome = submitter.run_session(&mut session, limit).await;
    let job_id = session.job_id.clone();
    let mut handler = session.handler;

    if let Err(err) = outcome {
        handler.progress.clear();
        return Err(err.into());
    }

    // O stream pode encerrar limpo antes do status terminal; nesse caso o
    // snapshot do broker dá a palavra final.
    if !handler.last_state.is_terminal() {
        let snapshot = submitter.job(&job_id).await?;
        if let Some(value) = snapshot.get("status").and_then(|v| v.as_str()) {
            handler.last_state = JobState::parse(value);
        }
    }

    handler
        .progress
        .complete(&handler.last_state, handler.last_error.as_ref());
    if let Some(summary) = handler.result_summary {
        println!("  {summary}");
    }
    Ok(())
}

async fn run_work(
    base_url: String,
    api_key: Option<String>,
    types: Vec<String>,
    wait_seconds: u64,
    once: bool,
    verbose: bool,
) -> Result<()> {
    let worker = JobWorker::new(base_url, api_key);
    let label = if types.is_empty() {
        "any type".to_string()
    } else {
        types.join(", ")
    };

    loop {
        let progress = JobProgress::start(&format!("waiting for work ({label})"));
        let mut handler = EchoJobHandler { progress, verbose };
        match worker.run_once(&mut handler, &types, wait_seconds).await {
            Ok(RunOutcome::Handled) => {}
            Ok(RunOutcome::NoWork) => {
                handler.progress.clear();
                if verbose {
                    println!("  no work available");
                }
            }
            Err(err) => {
                handler.progress.clear();
                return Err(err.into());
            }
        }
        if once {
            break;
        }
    }
    Ok(())
}

async fn run_status(base_url: String, api_key: Option<String>, job_id: String) -> Result<()> {
    let submitter = JobSubmitter::new(base_url, api_key);
    let progress = JobProgress::start(&format!("fetching {job_id}"));
    match submitter.job(&job_id).await {
        Ok(snapshot) => {
            progress.print_snapshot(&snapshot);
            Ok(())
        }
        Err(err) => {
            progress.clear();
            Err(err.into())
        }
    }
}

async fn run_cancel(base_url: String, api_key: Option<String>, job_id: String) -> Result<()> {
    let submitter = JobSubmitter::new(base_url, api_key);
    submitter.cancel(&job_id).await?;
    println!("canceled {job_id}");
    Ok(())
}

async fn run_transfer(base_url: String, api_key: Option<String>, data: String) -> Result<()> {
    let transfer = TransferClient::new(base_url, api_key);
    let channel = transfer.create_channel().await?;
    println!(
        "channel {} expires at {}",
        channel.channel_id, channel.expires_at
    );

    // Canais são rendezvous: escritor e leitor precisam estar conectados ao
    // mesmo tempo, então o upload e o download correm em paralelo.
    let upload = transfer.upload(&channel.channel_id, data.into_bytes(), Some("text/plain"));
    let download = transfer.download(&channel.channel_id);
    let ((), echoed) = tokio::try_join!(upload, download)?;
    println!("echoed: {}", String::from_utf8_lossy(&echoed));
    Ok(())
}

/// Session hooks for the submit command: payload served from a file, result
/// written to a file or summarized on stdout, spinner updated along the way.
struct FileSessionHandler {
    payload_path: Option<String>,
    output_path: Option<String>,
    progress: JobProgress,
    verbose: bool,
    last_state: JobState,
    last_error: Option<JobError>,
    result_summary: Option<String>,
}

impl SessionHandler for FileSessionHandler {
    async fn on_status(&mut self, status: &EventData) -> Result<(), BrokerError> {
        if self.verbose
            && let Ok(raw) = serde_json::to_string(status)
        {
            self.progress.note(&raw);
        }
        if let Some(value) = status.get("status").and_then(|v| v.as_str()) {
            self.last_state = JobState::parse(value);
            self.progress.update_state(&self.last_state);
        }
        self.last_error = status
            .get("error")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        Ok(())
    }

    async fn provide_payload(
        &mut self,
        key: &str,
        _event: &EventData,
    ) -> Result<Option<Payload>, BrokerError> {
        let Some(path) = self.payload_path.clone() else {
            self.progress
                .note(&format!("no payload file for request '{key}', skipping"));
            return Ok(None);
        };
        let data = tokio::fs::read(&path)
            .await
            .map_err(|err| BrokerError::Hook(format!("reading payload file {path}: {err}")))?;
        self.progress
            .note(&format!("uploading payload ({} bytes)", data.len()));
        Ok(Some(Payload {
            data,
            content_type: Some("application/octet-stream".to_string()),
        }))
    }

    async fn consume_result(
        &mut self,
        key: &str,
        data: Vec<u8>,
        _event: &EventData,
    ) -> Result<(), BrokerError> {
        self.result_summary = Some(match &self.output_path {
            Some(path) => {
                tokio::fs::write(path, &data)
                    .await
                    .map_err(|err| BrokerError::Hook(format!("writing result file {path}: {err}")))?;
                format!("result '{key}' written to {path} ({} bytes)", data.len())
            }
            None => match String::from_utf8(data) {
                Ok(text) => format!("result '{key}': {text}"),
                Err(raw) => format!("result '{key}': {} binary bytes", raw.as_bytes().len()),
            },
        });
        Ok(())
    }
}

/// Worker handler for the work command: echoes the payload back as the
/// result so a queue can be exercised end to end.
struct EchoJobHandler {
    progress: JobProgress,
    verbose: bool,
}

impl JobHandler for EchoJobHandler {
    async fn run(&mut self, claim: &ClaimedJob, payload: Vec<u8>) -> Result<Vec<u8>, String> {
        self.progress.note(&format!(
            "processing {} [{}] ({} bytes)",
            claim.job_id,
            claim.job_type,
            payload.len()
        ));
        Ok(payload)
    }

    async fn on_state(
        &mut self,
        state: &JobState,
        _grant: Option<&ChannelGrant>,
        error: Option<&JobError>,
    ) {
        self.progress.update_state(state);
        if self.verbose {
            self.progress.note(&format!("state: {state}"));
        }
        if state.is_terminal() {
            self.progress.complete(state, error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler_with(
        payload_path: Option<String>,
        output_path: Option<String>,
    ) -> FileSessionHandler {
        FileSessionHandler {
            payload_path,
            output_path,
            progress: JobProgress::start("test"),
            verbose: false,
            last_state: JobState::Queued,
            last_error: None,
            result_summary: None,
        }
    }

    #[tokio::test]
    async fn provide_payload_reads_the_configured_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        std::fs::write(&path, b"hello world").unwrap();

        let mut handler = handler_with(Some(path.to_string_lossy().into_owned()), None);
        let payload = handler
            .provide_payload("payload", &EventData::new())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(payload.data, b"hello world");
        assert_eq!(
            payload.content_type.as_deref(),
            Some("application/octet-stream")
        );
    }

    #[tokio::test]
    async fn provide_payload_declines_without_a_file() {
        let mut handler = handler_with(None, None);
        let payload = handler
            .provide_payload("payload", &EventData::new())
            .await
            .unwrap();
        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn provide_payload_missing_file_is_a_hook_error() {
        let mut handler = handler_with(Some("/nonexistent/payload.bin".to_string()), None);
        let err = handler
            .provide_payload("payload", &EventData::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BrokerError::Hook(_)));
    }

    #[tokio::test]
    async fn consume_result_writes_the_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("result.txt");

        let mut handler = handler_with(None, Some(path.to_string_lossy().into_owned()));
        handler
            .consume_result("result", b"it is done".to_vec(), &EventData::new())
            .await
            .unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"it is done");
        assert!(handler.result_summary.unwrap().contains("result.txt"));
    }

    #[tokio::test]
    async fn consume_result_without_output_keeps_text_summary() {
        let mut handler = handler_with(None, None);
        handler
            .consume_result("result", b"plain text".to_vec(), &EventData::new())
            .await
            .unwrap();
        assert_eq!(
            handler.result_summary.unwrap(),
            "result 'result': plain text"
        );
    }

    #[tokio::test]
    async fn status_events_track_state_and_error() {
        let mut handler = handler_with(None, None);
        let mut status = EventData::new();
        status.insert("status".to_string(), serde_json::json!("failed"));
        status.insert(
            "error".to_string(),
            serde_json::json!({"code": "boom", "message": "exploded"}),
        );
        handler.on_status(&status).await.unwrap();
        assert_eq!(handler.last_state, JobState::Failed);
        assert_eq!(handler.last_error.unwrap().code, "boom");
    }
}
