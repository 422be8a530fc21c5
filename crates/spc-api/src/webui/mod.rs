// Web UI layer: session management, status scraping, command submission.

mod auth;
mod client;
mod control;
pub mod endpoints;
pub mod markup;
mod status;

pub use client::{Credentials, WebUiClient};
pub use endpoints::{Endpoints, FormField};
