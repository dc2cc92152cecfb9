use tera::{Context, Tera};

use tripdesk_core::domain::status::StatusCode;
use tripdesk_core::domain::travel_request::format_wire_datetime;
use tripdesk_core::notify::StatusChangeNotice;

use crate::transport::{EmailMessage, MailerError};

const STATUS_CHANGE_TEMPLATE: &str = "status_change.txt.tera";

/// Renders status-change notices into plain-text emails.
pub struct MailRenderer {
    tera: Tera,
}

impl MailRenderer {
    pub fn new() -> Result<Self, MailerError> {
        let mut tera = Tera::default();
        tera.add_raw_template(
            STATUS_CHANGE_TEMPLATE,
            include_str!("../../../templates/mail/status_change.txt.tera"),
        )
        .map_err(|e| MailerError::Template(e.to_string()))?;

        Ok(Self { tera })
    }

    /// Render a notice into a deliverable message. A notice without a
    /// recipient address renders to `None`; the transition that produced it
    /// has already succeeded and needs nothing from us.
    pub fn render(&self, notice: &StatusChangeNotice) -> Result<Option<EmailMessage>, MailerError> {
        let Some(to) = notice.recipient_email.clone() else {
            return Ok(None);
        };

        let mut context = Context::new();
        context.insert("recipient_name", &notice.recipient_name);
        context.insert("message", message_for(notice.new_status));
        context.insert("destination", &notice.request.destination);
        context.insert("departure_date", &format_wire_datetime(&notice.request.departure_date));
        context.insert("return_date", &format_wire_datetime(&notice.request.return_date));
        context.insert("request_id", &notice.request.id.0);

        let body = self
            .tera
            .render(STATUS_CHANGE_TEMPLATE, &context)
            .map_err(|e| MailerError::Template(e.to_string()))?;

        Ok(Some(EmailMessage { to, subject: subject_for(notice.new_status).to_string(), body }))
    }
}

fn subject_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::Approved => "Your travel request has been approved!",
        StatusCode::Cancelled => "Your travel request has been cancelled",
        StatusCode::Requested => "Your travel request status has changed",
    }
}

fn message_for(status: StatusCode) -> &'static str {
    match status {
        StatusCode::Approved => "Congratulations! Your trip has been approved.",
        StatusCode::Cancelled => "Unfortunately, your trip has been cancelled.",
        StatusCode::Requested => "Your travel request has been updated.",
    }
}
