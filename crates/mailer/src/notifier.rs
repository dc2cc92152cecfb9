use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use tripdesk_core::config::MailConfig;
use tripdesk_core::notify::{NotificationDispatcher, StatusChangeNotice};

use crate::templates::MailRenderer;
use crate::transport::{EmailMessage, MailTransport, MailerError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 2, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &MailConfig) -> Self {
        Self { max_retries: config.max_retries, ..Self::default() }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Queued [`NotificationDispatcher`]. `dispatch` only enqueues; a worker
/// task renders and delivers with bounded retry, so a slow or failing mail
/// server never holds up the transition that raised the notice.
#[derive(Clone)]
pub struct QueuedNotifier {
    sender: mpsc::UnboundedSender<StatusChangeNotice>,
}

impl QueuedNotifier {
    /// Spawn the delivery worker. Must be called from within a tokio runtime.
    pub fn spawn(
        transport: Arc<dyn MailTransport>,
        policy: RetryPolicy,
    ) -> Result<Self, MailerError> {
        let renderer = MailRenderer::new()?;
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(receiver, transport, renderer, policy));

        Ok(Self { sender })
    }
}

#[async_trait]
impl NotificationDispatcher for QueuedNotifier {
    async fn dispatch(&self, notice: StatusChangeNotice) {
        if self.sender.send(notice).is_err() {
            warn!("notification queue is closed; dropping status notice");
        }
    }
}

async fn run_worker(
    mut receiver: mpsc::UnboundedReceiver<StatusChangeNotice>,
    transport: Arc<dyn MailTransport>,
    renderer: MailRenderer,
    policy: RetryPolicy,
) {
    while let Some(notice) = receiver.recv().await {
        let message = match renderer.render(&notice) {
            Ok(Some(message)) => message,
            Ok(None) => {
                debug!(
                    request_id = notice.request.id.0,
                    status = notice.new_status.code(),
                    "notice has no deliverable channel; skipping"
                );
                continue;
            }
            Err(error) => {
                warn!(
                    request_id = notice.request.id.0,
                    error = %error,
                    "failed to render status notification; dropping"
                );
                continue;
            }
        };

        deliver_with_retry(transport.as_ref(), &message, &policy).await;
    }
}

async fn deliver_with_retry(
    transport: &dyn MailTransport,
    message: &EmailMessage,
    policy: &RetryPolicy,
) {
    for attempt in 0..=policy.max_retries {
        match transport.send(message).await {
            Ok(()) => {
                info!(
                    to = %message.to,
                    subject = %message.subject,
                    "status notification delivered"
                );
                return;
            }
            Err(error) => {
                warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    to = %message.to,
                    error = %error,
                    "mail delivery failed"
                );

                if attempt >= policy.max_retries {
                    warn!(
                        to = %message.to,
                        max_retries = policy.max_retries,
                        "mail delivery retries exhausted; dropping notification"
                    );
                    return;
                }

                let delay = policy.backoff(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
