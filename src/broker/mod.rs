pub mod error;
pub mod events;
pub mod jobs;
pub mod transfer;
pub mod types;

pub use error::BrokerError;
pub use events::EventStream;
pub use jobs::JobClient;
pub use transfer::TransferClient;
pub use types::{
    ChannelGrant, ClaimedJob, CreatedJob, EventData, JobError, JobState, StreamEvent,
    TransferChannel,
};

use std::time::Duration;

use reqwest::{Client, Response};

// Timeout das chamadas unárias; claim e event stream têm regras próprias.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

// Só connect timeout no client compartilhado: um timeout global derrubaria
// o corpo do event stream e o long-poll de claim.
pub(crate) fn build_http_client() -> Client {
    Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .expect("failed to build HTTP client")
}

pub(crate) async fn ensure_success(response: Response) -> Result<Response, BrokerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(BrokerError::Status {
        status: status.as_u16(),
        message,
    })
}
