pub mod auth;
pub mod download;
pub mod files;
pub mod health;
pub mod verification;

mod principal;
mod types;
mod utils;

pub use self::health::health;
pub use self::types::{
    DownloadLinkResponse, ErrorResponse, FileResponse, LoginRequest, LoginResponse,
    MessageResponse, SignupRequest,
};

/// Plain-text landing page; not part of the documented API.
pub async fn root() -> &'static str {
    "Secure File Sharing API. See /docs for the endpoints."
}
