// src/notify/mod.rs
pub mod email;
pub mod sendgrid;

use anyhow::{bail, Result};
use metrics::counter;

use crate::config::MailSettings;
use crate::digest::DigestMessage;

pub use email::SmtpNotifier;
pub use sendgrid::SendGridNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, msg: &DigestMessage) -> Result<()>;
    fn name(&self) -> &'static str;
}

/// Fans one digest out to every configured sink. Per-sink failures are logged.
pub struct NotifierMux {
    sinks: Vec<Box<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(sinks: Vec<Box<dyn Notifier>>) -> Self {
        Self { sinks }
    }

    pub fn from_settings(mail: &MailSettings) -> Self {
        let mut sinks: Vec<Box<dyn Notifier>> = Vec::new();
        if let Some(sg) = SendGridNotifier::from_settings(mail) {
            sinks.push(Box::new(sg));
        }
        match SmtpNotifier::from_settings(mail) {
            Ok(Some(smtp)) => sinks.push(Box::new(smtp)),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "smtp sink disabled"),
        }
        Self { sinks }
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Returns how many sinks accepted the message.
    pub async fn notify(&self, msg: &DigestMessage) -> usize {
        if self.sinks.is_empty() {
            tracing::warn!("no notification sink configured, skip sending email");
            return 0;
        }
        let mut delivered = 0;
        for sink in &self.sinks {
            match sink.send(msg).await {
                Ok(()) => {
                    delivered += 1;
                    counter!("digest_notifications_total", "sink" => sink.name()).increment(1);
                }
                Err(e) => {
                    tracing::warn!(sink = sink.name(), error = %format!("{e:#}"), "email send failed");
                    counter!("digest_notification_errors_total", "sink" => sink.name())
                        .increment(1);
                }
            }
        }
        delivered
    }
}

/// `Err` unless at least one sink accepted the digest.
#[async_trait::async_trait]
impl Notifier for NotifierMux {
    async fn send(&self, msg: &DigestMessage) -> Result<()> {
        match self.notify(msg).await {
            0 if self.sinks.is_empty() => bail!("no notification sink configured"),
            0 => bail!("all {} notification sinks failed", self.sinks.len()),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<DigestMessage>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Notifier for Recorder {
        async fn send(&self, msg: &DigestMessage) -> Result<()> {
            self.sent.lock().unwrap().push(msg.clone());
            if self.fail {
                bail!("connection reset");
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    fn failing() -> Box<dyn Notifier> {
        Box::new(Recorder {
            fail: true,
            ..Default::default()
        })
    }

    fn msg() -> DigestMessage {
        DigestMessage {
            subject: "s".into(),
            body: "b".into(),
        }
    }

    #[tokio::test]
    async fn empty_mux_skips_and_reports_error() {
        let mux = NotifierMux::from_settings(&MailSettings::default());
        assert!(mux.is_empty());
        assert_eq!(mux.notify(&msg()).await, 0);
        let err = mux.send(&msg()).await.unwrap_err();
        assert!(err.to_string().contains("no notification sink"));
    }

    #[tokio::test]
    async fn failing_sink_does_not_stop_others() {
        let mux = NotifierMux::new(vec![failing(), Box::new(Recorder::default())]);
        assert_eq!(mux.notify(&msg()).await, 1);
        assert!(mux.send(&msg()).await.is_ok());
    }

    #[tokio::test]
    async fn all_sinks_failing_is_an_error() {
        let mux = NotifierMux::new(vec![failing(), failing()]);
        let err = mux.send(&msg()).await.unwrap_err();
        assert!(err.to_string().contains("all 2"));
    }
}
