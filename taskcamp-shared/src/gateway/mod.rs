/// External service gateways
///
/// The API talks to two outside systems: a file storage service for task
/// attachments and avatars, and a mail service for verification and reset
/// emails. Both sit behind traits so handlers never know which backend is
/// wired in, and tests can substitute recording fakes.
///
/// # Modules
///
/// - `storage`: File upload/delete behind [`storage::StorageGateway`]
/// - `mail`: Outbound email behind [`mail::MailGateway`]

pub mod mail;
pub mod storage;

/// Error type for gateway operations
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The remote service is unreachable or returned a server error
    #[error("Gateway unavailable: {0}")]
    Unavailable(String),

    /// The referenced remote object doesn't exist
    #[error("Remote object not found: {0}")]
    NotFound(String),

    /// The remote service rejected the request (bad payload, too large)
    #[error("Gateway rejected the request: {0}")]
    Rejected(String),
}
