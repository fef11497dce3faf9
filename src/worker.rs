use crate::broker::{
    BrokerError, ChannelGrant, ClaimedJob, JobClient, JobError, JobState, TransferClient,
    build_http_client,
};

/// Processing hooks for the worker side of a job.
pub trait JobHandler {
    /// Process one claimed job. `Err` is a handler failure: the job is
    /// reported `failed` to the broker, it does not abort the cycle.
    async fn run(&mut self, claim: &ClaimedJob, payload: Vec<u8>) -> Result<Vec<u8>, String>;

    /// Observe the cycle's state transitions as they are reported to the
    /// broker. `grant` accompanies the awaiting states, `error` the failed
    /// one.
    async fn on_state(
        &mut self,
        _state: &JobState,
        _grant: Option<&ChannelGrant>,
        _error: Option<&JobError>,
    ) {
    }
}

/// What a single worker cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A job was claimed and driven to `completed` or `failed`.
    Handled,
    /// The queue was empty for the whole wait window.
    NoWork,
}

/// Claims jobs from the broker and drives each one to a terminal status.
///
/// One call to [`run_once`](Self::run_once) is one full cycle: claim,
/// fetch payload, process, deliver result (or report the failure). There
/// is no internal retry; a claimed job whose cycle errors out stays
/// claimed until the broker expires it.
pub struct JobWorker {
    jobs: JobClient,
    transfer: TransferClient,
}

impl JobWorker {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into();
        let http = build_http_client();
        Self {
            jobs: JobClient::with_client(http.clone(), base_url.clone(), api_key.clone()),
            transfer: TransferClient::with_client(http, base_url, api_key),
        }
    }

    /// Run one claim-to-completion cycle.
    ///
    /// `Ok(NoWork)` means the claim long-poll came back empty; nothing was
    /// touched. Once a job is claimed the cycle always consumes it: a
    /// handler failure is pushed to the broker as a `failed` status and
    /// still counts as `Handled`.
    pub async fn run_once<H: JobHandler>(
        &self,
        handler: &mut H,
        types: &[String],
        max_wait_seconds: u64,
    ) -> Result<RunOutcome, BrokerError> {
        let claim = match self.jobs.claim_job(types, max_wait_seconds).await? {
            Some(claim) => claim,
            None => return Ok(RunOutcome::NoWork),
        };
        let job_id = claim.job_id.clone();

        self.jobs
            .update_status(&job_id, &JobState::Claimed, None, None)
            .await?;
        handler.on_state(&JobState::Claimed, None, None).await;

        let grant = self.jobs.request_payload_channel(&job_id, None).await?;
        handler
            .on_state(&JobState::AwaitingPayload, Some(&grant), None)
            .await;
        let target = grant.reader_url.as_deref().unwrap_or(&grant.channel_id);
        let payload = self.transfer.download(target).await?;

        self.jobs
            .update_status(&job_id, &JobState::Running, None, None)
            .await?;
        handler.on_state(&JobState::Running, None, None).await;

        match handler.run(&claim, payload).await {
            Err(message) => {
                let error = JobError {
                    code: "handler_error".to_string(),
                    message,
                };
                self.jobs
                    .update_status(&job_id, &JobState::Failed, None, Some(&error))
                    .await?;
                handler
                    .on_state(&JobState::Failed, None, Some(&error))
                    .await;
                Ok(RunOutcome::Handled)
            }
            Ok(result) => {
                let grant = self.jobs.request_result_channel(&job_id, None).await?;
                handler
                    .on_state(&JobState::AwaitingResult, Some(&grant), None)
                    .await;
                let target = grant.writer_url.as_deref().unwrap_or(&grant.channel_id);
                self.transfer
                    .upload(target, result, Some("application/octet-stream"))
                    .await?;

                self.jobs
                    .update_status(&job_id, &JobState::Completed, None, None)
                    .await?;
                handler.on_state(&JobState::Completed, None, None).await;
                Ok(RunOutcome::Handled)
            }
        }
    }
}
