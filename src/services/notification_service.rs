use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::json;
use tokio::sync::Notify;

use crate::config::MailConfig;
use crate::database::ApplicationStore;
use crate::error::{Error, Result};
use crate::models::notification::{
    DeliveryStatus, JobResolution, NotificationRecord, QueuedNotification,
};

pub use crate::models::notification::{EmailTemplate, NotificationJob};

const RETRY_BASE_SECS: i64 = 30;
const RETRY_MAX_SECS: i64 = 3600;
const IDLE_POLL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

impl EmailTemplate {
    pub fn render(self, params: &[String]) -> Result<RenderedEmail> {
        if params.len() != self.arity() {
            return Err(Error::InvalidArgument(format!(
                "Template {} expects {} parameters, got {}",
                self.key(),
                self.arity(),
                params.len()
            )));
        }

        let name = &params[0];
        let rendered = match self {
            EmailTemplate::Approved => RenderedEmail {
                subject: "Your application has been approved".to_string(),
                html: format!(
                    "<p>Dear {},</p><p>Congratulations! Your application has been approved. \
                     The school will contact you with the next steps for enrolment.</p>",
                    name
                ),
            },
            EmailTemplate::Rejected => RenderedEmail {
                subject: "Update on your application".to_string(),
                html: format!(
                    "<p>Dear {},</p><p>Thank you for your interest. After careful review, \
                     we are unable to offer you admission at this time.</p>",
                    name
                ),
            },
            EmailTemplate::StatusUpdate => RenderedEmail {
                subject: format!("Your application status is now {}", params[1]),
                html: format!(
                    "<p>Dear {},</p><p>The status of your application has been updated to \
                     <strong>{}</strong>.</p>",
                    name, params[1]
                ),
            },
            EmailTemplate::InterviewScheduled => RenderedEmail {
                subject: format!("Interview scheduled for {}", params[1]),
                html: format!(
                    "<p>Dear {},</p><p>Your admission interview has been scheduled.</p>\
                     <ul><li>Date: {}</li><li>Time: {}</li><li>Location: {}</li></ul>",
                    name, params[1], params[2], params[3]
                ),
            },
        };
        Ok(rendered)
    }
}

/// Outbound email collaborator. A failed send is reported, never retried here.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, template: EmailTemplate, params: &[String]) -> Result<()>;
}

/// Posts rendered emails to an HTTP mail relay.
#[derive(Clone)]
pub struct HttpMailer {
    client: Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &str, template: EmailTemplate, params: &[String]) -> Result<()> {
        let email = template.render(params)?;
        let resp = self
            .client
            .post(&self.config.relay_url)
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "from": self.config.from,
                "to": to,
                "subject": email.subject,
                "html": email.html,
                "template": template.key(),
            }))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Mail(format!("relay responded {}: {}", status, body)));
        }
        Ok(())
    }
}

/// Writing half handed to the engine. Jobs are persisted before the worker is woken,
/// so nothing queued is lost when the process stops.
#[derive(Clone)]
pub struct NotificationOutbox {
    store: Arc<dyn ApplicationStore>,
    wake: Arc<Notify>,
}

impl NotificationOutbox {
    /// Never fails the caller; a job that cannot be persisted is logged.
    pub async fn enqueue(&self, job: NotificationJob) {
        let application_id = job.application_id;
        let template = job.template.key();
        match self.store.enqueue_notification(job).await {
            Ok(queued) => {
                tracing::debug!(%application_id, job_id = %queued.id, template, "notification queued");
                self.wake.notify_one();
            }
            Err(e) => {
                tracing::warn!(%application_id, template, error = %e, "failed to queue notification");
            }
        }
    }
}

/// Claims due jobs, delivers each email and records every attempt on the application.
pub struct NotificationWorker {
    store: Arc<dyn ApplicationStore>,
    mailer: Arc<dyn Mailer>,
    wake: Arc<Notify>,
    retry_base: chrono::Duration,
}

pub fn channel(
    mailer: Arc<dyn Mailer>,
    store: Arc<dyn ApplicationStore>,
) -> (NotificationOutbox, NotificationWorker) {
    let wake = Arc::new(Notify::new());
    (
        NotificationOutbox {
            store: store.clone(),
            wake: wake.clone(),
        },
        NotificationWorker {
            store,
            mailer,
            wake,
            retry_base: chrono::Duration::seconds(RETRY_BASE_SECS),
        },
    )
}

/// Exponential backoff after the `attempts`-th failure, capped at an hour.
fn retry_delay(base: chrono::Duration, attempts: i32) -> chrono::Duration {
    let factor = 2_i64.saturating_pow(attempts.saturating_sub(1).max(0) as u32);
    let secs = base.num_seconds().saturating_mul(factor).min(RETRY_MAX_SECS);
    chrono::Duration::seconds(secs)
}

impl NotificationWorker {
    pub fn with_retry_base(mut self, base: chrono::Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Handles at most one due job without waiting. Returns whether a job was handled.
    pub async fn run_once(&self) -> Result<bool> {
        let Some(queued) = self.store.claim_notification().await? else {
            return Ok(false);
        };
        self.deliver(queued).await?;
        Ok(true)
    }

    /// Handles every job that is due right now.
    pub async fn drain(&self) -> Result<usize> {
        let mut handled = 0;
        while self.run_once().await? {
            handled += 1;
        }
        Ok(handled)
    }

    /// Puts jobs interrupted by a previous shutdown back in the queue.
    pub async fn recover(&self) -> Result<u64> {
        let released = self.store.release_stalled_notifications().await?;
        if released > 0 {
            tracing::info!(released, "requeued interrupted notification jobs");
        }
        Ok(released)
    }

    pub async fn run(self) {
        if let Err(e) = self.recover().await {
            tracing::error!(error = ?e, "could not requeue interrupted notification jobs");
        }
        loop {
            match self.run_once().await {
                Ok(true) => {}
                Ok(false) => {
                    tokio::select! {
                        _ = self.wake.notified() => {}
                        _ = tokio::time::sleep(IDLE_POLL) => {}
                    }
                }
                Err(e) => {
                    tracing::error!(error = ?e, "notification worker error");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    }

    async fn deliver(&self, queued: QueuedNotification) -> Result<NotificationRecord> {
        let job = &queued.job;
        let template = job.template.key();
        let applicant = match self.store.find_applicant(job.applicant_id).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(application_id = %job.application_id, error = ?e, "applicant lookup failed");
                None
            }
        };

        let (record, resolution) = match applicant {
            Some(applicant) => {
                let mut params = Vec::with_capacity(job.params.len() + 1);
                params.push(applicant.name.clone());
                params.extend(job.params.iter().cloned());

                let message = job
                    .template
                    .render(&params)
                    .map(|email| email.subject)
                    .unwrap_or_else(|_| format!("{} email", template));

                match self.mailer.send(&applicant.email, job.template, &params).await {
                    Ok(()) => {
                        tracing::info!(application_id = %job.application_id, template, "notification sent");
                        (
                            NotificationRecord::email(message, DeliveryStatus::Sent, Utc::now()),
                            JobResolution::Sent,
                        )
                    }
                    Err(e) => {
                        let attempts = queued.attempts + 1;
                        let resolution = if attempts < queued.max_attempts {
                            JobResolution::RetryAt(
                                Utc::now() + retry_delay(self.retry_base, attempts),
                                e.to_string(),
                            )
                        } else {
                            JobResolution::GiveUp(e.to_string())
                        };
                        tracing::warn!(
                            application_id = %job.application_id,
                            template,
                            attempts,
                            error = %e,
                            "notification failed"
                        );
                        (
                            NotificationRecord::email(message, DeliveryStatus::Failed, Utc::now()),
                            resolution,
                        )
                    }
                }
            }
            None => {
                tracing::warn!(application_id = %job.application_id, template, "no contact for applicant");
                (
                    NotificationRecord::email(
                        format!("{} email not sent: applicant contact unavailable", template),
                        DeliveryStatus::Failed,
                        Utc::now(),
                    ),
                    JobResolution::GiveUp("applicant contact unavailable".into()),
                )
            }
        };

        self.store
            .finish_notification(queued.id, record.clone(), &resolution)
            .await?;
        Ok(record)
    }
}
