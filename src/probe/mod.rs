//! HTTP probe server.
//!
//! Answers kubelet-style liveness/readiness probes based on the current
//! lifecycle state and the user's probe hook. Probe traffic is cheap and
//! disposable: `stop` closes the listener and terminates open connections
//! immediately instead of draining them.

mod handlers;
mod server;
#[cfg(test)]
mod tests;

pub use server::ProbeServer;
pub(crate) use server::ProbeState;
