//! Confirmation gate and notification sink collaborators
//!
//! Both are thin seams: the gate decides whether an outbound payload may
//! be sent, the notifier carries short user feedback. Their UI lives
//! elsewhere; here live only the traits, a CLI prompt, and the wrapper
//! that serializes confirmations.

use serde_json::Value;
use std::future::Future;
use tokio::sync::Mutex;

/// Category of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Success,
    Error,
}

/// Feedback sink for short user-visible notices
pub trait Notifier {
    fn notify(&self, kind: NoticeKind, text: &str);
}

/// Notifier that routes notices into the log
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NoticeKind, text: &str) {
        match kind {
            NoticeKind::Info => tracing::info!("{}", text),
            NoticeKind::Success => tracing::info!("✓ {}", text),
            NoticeKind::Error => tracing::warn!("{}", text),
        }
    }
}

/// Human approval gate awaited before any outbound call
///
/// The exact payload about to be sent is passed so the human sees what
/// they are approving. Returning false cancels the action with no
/// network call.
pub trait ConfirmGate {
    fn confirm(&self, payload: &Value) -> impl Future<Output = bool> + Send;
}

/// Gate that approves everything (scripted/batch use)
pub struct AutoApproveGate;

impl ConfirmGate for AutoApproveGate {
    async fn confirm(&self, _payload: &Value) -> bool {
        true
    }
}

/// Interactive stdin prompt for the CLI
pub struct StdinGate;

impl ConfirmGate for StdinGate {
    async fn confirm(&self, payload: &Value) -> bool {
        let preview = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        let answer = tokio::task::spawn_blocking(move || {
            use std::io::{self, BufRead, Write};
            println!("About to send:\n{}", preview);
            print!("Proceed? [y/N] ");
            let _ = io::stdout().flush();
            let mut line = String::new();
            let _ = io::stdin().lock().read_line(&mut line);
            line
        })
        .await
        .unwrap_or_default();
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Wrapper enforcing the single-slot rendezvous rule
///
/// Only one confirmation may be pending system-wide; a second request
/// while one is outstanding waits its turn instead of racing for the
/// same prompt and resolving the wrong answer.
pub struct SerialGate<G> {
    inner: G,
    slot: Mutex<()>,
}

impl<G> SerialGate<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            slot: Mutex::new(()),
        }
    }
}

impl<G: ConfirmGate + Sync> ConfirmGate for SerialGate<G> {
    async fn confirm(&self, payload: &Value) -> bool {
        let _slot = self.slot.lock().await;
        self.inner.confirm(payload).await
    }
}
