use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::Notifier;
use crate::config::MailSettings;
use crate::digest::DigestMessage;
use crate::notify::sendgrid::SENDER_NAME;

/// Same digest over an SMTP relay.
pub struct SmtpNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl SmtpNotifier {
    /// `Ok(None)` when SMTP is not configured; `Err` when it is but the values are unusable.
    pub fn from_settings(mail: &MailSettings) -> Result<Option<Self>> {
        let (Some(smtp), Some(from_addr)) = (&mail.smtp, &mail.from) else {
            tracing::debug!("SMTP disabled (no SMTP_HOST/USER/PASS or MAIL_FROM)");
            return Ok(None);
        };
        if mail.to.is_empty() {
            tracing::warn!("MAIL_TO is empty, smtp sink disabled");
            return Ok(None);
        }

        let (from, to) = mailboxes(from_addr, &mail.to)?;

        let creds = Credentials::new(smtp.user.clone(), smtp.pass.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp.host)
            .context("invalid SMTP_HOST")?
            .credentials(creds)
            .build();

        Ok(Some(Self { mailer, from, to }))
    }
}

fn mailboxes(from_addr: &str, to: &[String]) -> Result<(Mailbox, Vec<Mailbox>)> {
    let from = Mailbox::new(
        Some(SENDER_NAME.to_string()),
        from_addr
            .parse::<lettre::Address>()
            .context("invalid MAIL_FROM")?,
    );
    let to = to
        .iter()
        .map(|a| a.parse::<Mailbox>().with_context(|| format!("invalid MAIL_TO entry {a}")))
        .collect::<Result<Vec<_>>>()?;
    Ok((from, to))
}

/// Plain-text mail from the digest.
pub fn build_message(from: &Mailbox, to: &[Mailbox], msg: &DigestMessage) -> Result<Message> {
    let mut builder = Message::builder()
        .from(from.clone())
        .subject(msg.subject.clone())
        .header(header::ContentType::TEXT_PLAIN);
    for t in to {
        builder = builder.to(t.clone());
    }
    builder.body(msg.body.clone()).context("build email")
}

#[async_trait::async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, msg: &DigestMessage) -> Result<()> {
        let email = build_message(&self.from, &self.to, msg)?;
        self.mailer.send(email).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmtpSettings;

    fn mail(to: &[&str]) -> MailSettings {
        MailSettings {
            sendgrid_api_key: None,
            from: Some("bot@x.test".into()),
            to: to.iter().map(|s| s.to_string()).collect(),
            smtp: Some(SmtpSettings {
                host: "smtp.x.test".into(),
                user: "u".into(),
                pass: "p".into(),
            }),
        }
    }

    #[test]
    fn unconfigured_is_none() {
        let m = MailSettings::default();
        assert!(SmtpNotifier::from_settings(&m).unwrap().is_none());
    }

    #[test]
    fn bad_recipient_is_error() {
        assert!(SmtpNotifier::from_settings(&mail(&["not an address"])).is_err());
    }

    #[test]
    fn message_has_all_recipients() {
        let (from, to) =
            mailboxes("bot@x.test", &["a@x.test".to_string(), "b@x.test".to_string()]).unwrap();
        let msg = DigestMessage {
            subject: "subj".into(),
            body: "body".into(),
        };
        let email = build_message(&from, &to, &msg).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("a@x.test"));
        assert!(raw.contains("b@x.test"));
        assert!(raw.contains("HR News Bot"));
    }
}
