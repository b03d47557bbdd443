//! Webhook server.

mod webhook;

pub use webhook::*;
