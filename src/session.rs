use std::time::Duration;

use crate::broker::{
    BrokerError, EventData, JobClient, JobState, TransferClient, build_http_client,
};

/// Caller hooks driving the submitter side of a job session.
///
/// Every method has a default: a handler only overrides what it cares
/// about. Hooks run inline with the event loop, so a slow hook delays the
/// session and a failed one ends it.
pub trait SessionHandler {
    /// Observe a status event. The map is the broker's job view.
    async fn on_status(&mut self, _status: &EventData) -> Result<(), BrokerError> {
        Ok(())
    }

    /// Serve the payload the worker asked for. `Ok(None)` skips the
    /// request and the session moves on without uploading.
    async fn provide_payload(
        &mut self,
        _key: &str,
        _event: &EventData,
    ) -> Result<Option<Payload>, BrokerError> {
        Ok(None)
    }

    /// Receive a downloaded result blob.
    async fn consume_result(
        &mut self,
        _key: &str,
        _data: Vec<u8>,
        _event: &EventData,
    ) -> Result<(), BrokerError> {
        Ok(())
    }
}

/// One payload blob served in answer to a worker's request.
#[derive(Debug, Clone)]
pub struct Payload {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
}

/// A created job bound to the handler that serves its side of the exchange.
pub struct JobSession<H> {
    /// Identifier of the job this session tracks.
    pub job_id: String,
    /// Hooks invoked as the job's events arrive.
    pub handler: H,
}

/// Drives a job from creation to terminal status on the submitter side.
///
/// The submitter never polls: it follows the job's live event stream and
/// reacts, uploading payloads and downloading results through transfer
/// channels as the worker requests them.
pub struct JobSubmitter {
    jobs: JobClient,
    transfer: TransferClient,
}

impl JobSubmitter {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url = base_url.into();
        // One connection pool for job calls and transfers alike.
        let http = build_http_client();
        Self {
            jobs: JobClient::with_client(http.clone(), base_url.clone(), api_key.clone()),
            transfer: TransferClient::with_client(http, base_url, api_key),
        }
    }

    /// Create a job and bind `handler` to it.
    pub async fn create_session<H: SessionHandler>(
        &self,
        job_type: &str,
        metadata: Option<EventData>,
        handler: H,
    ) -> Result<JobSession<H>, BrokerError> {
        let created = self.jobs.create_job(job_type, metadata).await?;
        Ok(JobSession {
            job_id: created.job_id,
            handler,
        })
    }

    /// Follow the session's event stream until a terminal status arrives.
    ///
    /// Returns as soon as a status event reports `completed`, `failed` or
    /// `canceled`; later events still in flight are not drained. A clean
    /// end of stream also returns `Ok(())` — callers that need certainty
    /// about the final state re-query [`job`](Self::job). When `timeout`
    /// elapses first, the stream is dropped (closing the connection) and
    /// the session fails with [`Timeout`](BrokerError::Timeout).
    pub async fn run_session<H: SessionHandler>(
        &self,
        session: &mut JobSession<H>,
        timeout: Option<Duration>,
    ) -> Result<(), BrokerError> {
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.drive(session)).await {
                Ok(result) => result,
                Err(_) => Err(BrokerError::Timeout {
                    seconds: limit.as_secs(),
                }),
            },
            None => self.drive(session).await,
        }
    }

    async fn drive<H: SessionHandler>(
        &self,
        session: &mut JobSession<H>,
    ) -> Result<(), BrokerError> {
        let mut stream = self.jobs.stream_events(&session.job_id).await?;
        while let Some(event) = stream.next_event().await? {
            match event.event_type.as_str() {
                "status" => {
                    session.handler.on_status(&event.data).await?;
                    if let Some(status) = string_field(&event.data, "status")
                        && JobState::parse(status).is_terminal()
                    {
                        return Ok(());
                    }
                }
                "payload" => self.handle_payload(session, &event.data).await?,
                "result" => self.handle_result(session, &event.data).await?,
                _ => {}
            }
        }
        Ok(())
    }

    async fn handle_payload<H: SessionHandler>(
        &self,
        session: &mut JobSession<H>,
        data: &EventData,
    ) -> Result<(), BrokerError> {
        let key = string_field(data, "key").unwrap_or("payload");
        let payload = match session.handler.provide_payload(key, data).await? {
            Some(payload) => payload,
            None => return Ok(()),
        };
        let target = channel_target(data)?;
        self.transfer
            .upload(target, payload.data, payload.content_type.as_deref())
            .await
    }

    async fn handle_result<H: SessionHandler>(
        &self,
        session: &mut JobSession<H>,
        data: &EventData,
    ) -> Result<(), BrokerError> {
        let key = string_field(data, "key").unwrap_or("result");
        let target = channel_target(data)?;
        let bytes = self.transfer.download(target).await?;
        session.handler.consume_result(key, bytes, data).await
    }

    /// Current snapshot of a job, straight from the broker.
    pub async fn job(&self, job_id: &str) -> Result<EventData, BrokerError> {
        self.jobs.get_job(job_id).await
    }

    pub async fn cancel(&self, job_id: &str) -> Result<(), BrokerError> {
        self.jobs.cancel_job(job_id).await
    }
}

fn string_field<'a>(data: &'a EventData, key: &str) -> Option<&'a str> {
    data.get(key).and_then(|v| v.as_str())
}

// channel_id wins over url; both blank means the broker broke the contract.
fn channel_target(data: &EventData) -> Result<&str, BrokerError> {
    if let Some(id) = string_field(data, "channel_id")
        && !id.trim().is_empty()
    {
        return Ok(id);
    }
    if let Some(url) = string_field(data, "url")
        && !url.trim().is_empty()
    {
        return Ok(url);
    }
    Err(BrokerError::Protocol(
        "transfer event carries neither channel_id nor url".into(),
    ))
}
