//! Shared HTTP utilities for the remote inference and compression services.

mod client;

pub use client::{AuthConfig, HttpClient, HttpError, HttpResponse};
