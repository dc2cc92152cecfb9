//! Outbound mail for travel-request status changes.
//!
//! This crate turns [`StatusChangeNotice`](tripdesk_core::notify::StatusChangeNotice)
//! values into plain-text emails and delivers them off the request path:
//! - **Transports** (`transport`) - SMTP, console (local development), noop
//! - **Templates** (`templates`) - subject and body rendering
//! - **Notifier** (`notifier`) - queued dispatcher with bounded retry
//!
//! # Key Types
//!
//! - `QueuedNotifier` - `NotificationDispatcher` backed by a worker task
//! - `MailTransport` - delivery seam, selected from `MailConfig`
//! - `MailRenderer` - renders notices into `EmailMessage`s

pub mod notifier;
pub mod templates;
pub mod transport;

pub use notifier::{QueuedNotifier, RetryPolicy};
pub use templates::MailRenderer;
pub use transport::{
    transport_from_config, ConsoleMailTransport, EmailMessage, MailTransport, MailerError,
    NoopMailTransport, SmtpMailTransport,
};
