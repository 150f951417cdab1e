//! OpenAI-compatible chat completions client.

mod client;
mod request;
mod response;

#[cfg(test)]
mod tests;

pub use client::OpenAiCompatClient;
