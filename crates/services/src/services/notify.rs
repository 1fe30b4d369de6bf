use async_trait::async_trait;
use lettre::{
    message::MultiPart, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use uuid::Uuid;

use super::config::{Config, MailConfig};

/// Everything the dispatcher needs, captured after the save commits so a
/// mail failure can never roll back ticket data.
#[derive(Debug, Clone)]
pub struct NotifyContext {
    pub ticket_id: Uuid,
    pub short_description: String,
    pub urgency_label: String,
    pub item_name: Option<String>,
    pub technician_name: Option<String>,
    pub created: bool,
    pub is_resolved: bool,
    pub notes: Vec<String>,
    pub recipients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: Vec<String>,
    pub subject: String,
    pub text_body: String,
    pub html_body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent { recipients: usize },
    Skipped { reason: String },
    Failed { error: String },
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()>;
}

/// Production transport over lettre's async SMTP client.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    pub fn from_config(config: &MailConfig) -> anyhow::Result<Self> {
        let url = config
            .smtp_url
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("mail is enabled but smtp_url is not set"))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::from_url(url)?.build();
        Ok(Self {
            transport,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        let mut builder = Message::builder()
            .from(self.from_address.parse()?)
            .subject(mail.subject.clone());
        for recipient in &mail.to {
            builder = builder.to(recipient.parse()?);
        }
        let message = builder.multipart(MultiPart::alternative_plain_html(
            mail.text_body.clone(),
            mail.html_body.clone(),
        ))?;
        self.transport.send(message).await?;
        Ok(())
    }
}

/// Test double that records instead of sending.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: std::sync::Mutex<Vec<OutgoingMail>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(mail.clone());
        Ok(())
    }
}

fn is_plausible_email(address: &str) -> bool {
    address.contains('@')
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn permalink(config: &Config, ticket_id: Uuid) -> Option<String> {
    config
        .public_base_url
        .as_deref()
        .map(|base| format!("{}/tickets/{}", base.trim_end_matches('/'), ticket_id))
}

fn render(context: &NotifyContext, config: &Config) -> OutgoingMail {
    let event = if context.created {
        "opened"
    } else if context.is_resolved {
        "resolved"
    } else {
        "updated"
    };
    let subject = format!(
        "{} ticket {}: {}",
        config.mail.subject_prefix, event, context.short_description
    );
    let link = permalink(config, context.ticket_id);

    let mut text = format!(
        "Ticket {} was {}.\n\nSummary: {}\nUrgency: {}\n",
        context.ticket_id, event, context.short_description, context.urgency_label
    );
    if let Some(item) = &context.item_name {
        text.push_str(&format!("Item: {item}\n"));
    }
    if let Some(technician) = &context.technician_name {
        text.push_str(&format!("Technician: {technician}\n"));
    }
    if !context.notes.is_empty() {
        text.push_str("\nNotes:\n");
        for note in &context.notes {
            text.push_str(&format!("  - {note}\n"));
        }
    }
    if let Some(link) = &link {
        text.push_str(&format!("\n{link}\n"));
    }

    let mut html = format!(
        "<p>Ticket <strong>{}</strong> was {}.</p>\
         <p>Summary: {}<br>Urgency: {}",
        context.ticket_id,
        event,
        escape_html(&context.short_description),
        escape_html(&context.urgency_label)
    );
    if let Some(item) = &context.item_name {
        html.push_str(&format!("<br>Item: {}", escape_html(item)));
    }
    if let Some(technician) = &context.technician_name {
        html.push_str(&format!("<br>Technician: {}", escape_html(technician)));
    }
    html.push_str("</p>");
    if !context.notes.is_empty() {
        html.push_str("<ul>");
        for note in &context.notes {
            html.push_str(&format!("<li>{}</li>", escape_html(note)));
        }
        html.push_str("</ul>");
    }
    if let Some(link) = &link {
        html.push_str(&format!("<p><a href=\"{link}\">View the ticket</a></p>"));
    }

    OutgoingMail {
        to: context
            .recipients
            .iter()
            .filter(|r| is_plausible_email(r))
            .cloned()
            .collect(),
        subject,
        text_body: text,
        html_body: html,
    }
}

/// Best-effort dispatch. Never returns an error; the caller has already
/// committed and only wants to know what happened for the response message.
pub async fn notify_ticket_saved(
    mailer: Option<&dyn Mailer>,
    config: &Config,
    context: &NotifyContext,
) -> NotifyOutcome {
    if !config.mail.enabled {
        return NotifyOutcome::Skipped {
            reason: "mail is disabled".to_string(),
        };
    }
    let Some(mailer) = mailer else {
        return NotifyOutcome::Skipped {
            reason: "no mail transport configured".to_string(),
        };
    };

    let mail = render(context, config);
    if mail.to.is_empty() {
        return NotifyOutcome::Skipped {
            reason: "no plausible recipients".to_string(),
        };
    }

    match mailer.send(&mail).await {
        Ok(()) => NotifyOutcome::Sent {
            recipients: mail.to.len(),
        },
        Err(err) => {
            tracing::warn!(
                ticket_id = %context.ticket_id,
                "Failed to send ticket notification: {}",
                err
            );
            NotifyOutcome::Failed {
                error: err.to_string(),
            }
        }
    }
}
