//! Final-mile delivery: drains enqueued [`EmailDeliveryJob`]/[`PushDeliveryJob`]
//! values and hands each to the concrete [`EmailSender`]/[`PushSender`]
//! adapter, which is the component that actually talks to an SMTP relay or
//! push provider. This is distinct from (and downstream of) the
//! dispatcher's job-enqueue step: the dispatcher fans a `FeatureDiffEvent`
//! out into jobs and classifies enqueue failures; this module classifies
//! the send itself.

use featurewatch_errors::{FwError, FwErrorKind};
use featurewatch_transport::contracts::{EmailSender, PushSender};
use featurewatch_transport::envelopes::{DeliveryMetadata, EmailDeliveryJob, PushDeliveryJob};
use std::sync::Arc;

/// The collaborators the final-mile delivery loops need.
#[derive(Clone)]
pub struct DeliveryContext {
    pub email_sender: Arc<dyn EmailSender>,
    pub push_sender: Arc<dyn PushSender>,
}

fn email_subject(metadata: &DeliveryMetadata) -> String {
    format!("featurewatch: updates for \"{}\"", metadata.query)
}

fn push_title(metadata: &DeliveryMetadata) -> String {
    format!("featurewatch: {}", metadata.query)
}

fn decode_summary(summary_raw: &str) -> Result<String, FwError> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(summary_raw)
        .map_err(|e| {
            FwError::new(FwErrorKind::InvalidFormat)
                .with_op("delivery.decode_summary")
                .with_message(e.to_string())
        })?;
    String::from_utf8(bytes).map_err(|e| {
        FwError::new(FwErrorKind::InvalidFormat)
            .with_op("delivery.decode_summary")
            .with_message(e.to_string())
    })
}

/// Send one email delivery job's final-mile message and return the
/// sender's classified result.
pub async fn send_email_job(ctx: &DeliveryContext, job: &EmailDeliveryJob) -> Result<(), FwError> {
    let body = decode_summary(&job.summary_raw).map_err(|e| {
        e.with_search_id(job.metadata.search_id.clone())
            .with_event_id(job.metadata.event_id.clone())
    })?;
    let id = format!("{}:{}", job.metadata.event_id, job.subscription_id);
    let subject = email_subject(&job.metadata);

    ctx.email_sender
        .send(&id, &job.recipient_email, &subject, &body)
        .await
        .map_err(|e| {
            e.with_op("delivery.send_email_job")
                .with_search_id(job.metadata.search_id.clone())
                .with_event_id(job.metadata.event_id.clone())
        })
}

/// Send one push delivery job's final-mile message and return the
/// sender's classified result.
pub async fn send_push_job(ctx: &DeliveryContext, job: &PushDeliveryJob) -> Result<(), FwError> {
    let body = decode_summary(&job.summary_raw).map_err(|e| {
        e.with_search_id(job.metadata.search_id.clone())
            .with_event_id(job.metadata.event_id.clone())
    })?;
    let id = format!("{}:{}", job.metadata.event_id, job.subscription_id);
    let title = push_title(&job.metadata);

    ctx.push_sender
        .send(&id, &job.recipient_token, &title, &body)
        .await
        .map_err(|e| {
            e.with_op("delivery.send_push_job")
                .with_search_id(job.metadata.search_id.clone())
                .with_event_id(job.metadata.event_id.clone())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use featurewatch_transport::inmemory::{ScriptedEmailSender, ScriptedPushSender};
    use featurewatch_types::Frequency;

    fn metadata() -> DeliveryMetadata {
        DeliveryMetadata {
            event_id: "evt-1".into(),
            search_id: "s1".into(),
            query: "category:css".into(),
            frequency: Frequency::Immediate,
            generated_at: chrono::Utc::now(),
        }
    }

    fn email_job(recipient: &str) -> EmailDeliveryJob {
        EmailDeliveryJob {
            subscription_id: "sub1".into(),
            recipient_email: recipient.into(),
            summary_raw: "c3VtbWFyeQ==".into(),
            metadata: metadata(),
        }
    }

    fn push_job(recipient: &str) -> PushDeliveryJob {
        PushDeliveryJob {
            subscription_id: "sub1".into(),
            recipient_token: recipient.into(),
            summary_raw: "c3VtbWFyeQ==".into(),
            metadata: metadata(),
        }
    }

    #[tokio::test]
    async fn successful_email_send_reaches_the_sender() {
        let sender = Arc::new(ScriptedEmailSender::new());
        let ctx = DeliveryContext {
            email_sender: sender,
            push_sender: Arc::new(ScriptedPushSender::new()),
        };
        send_email_job(&ctx, &email_job("a@example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn undeliverable_recipient_is_classified_permanent_user() {
        let sender = Arc::new(ScriptedEmailSender::new());
        sender.fail_for("bounced@example.com", FwErrorKind::UndeliverableRecipient);
        let ctx = DeliveryContext {
            email_sender: sender,
            push_sender: Arc::new(ScriptedPushSender::new()),
        };
        let err = send_email_job(&ctx, &email_job("bounced@example.com"))
            .await
            .unwrap_err();
        assert_eq!(err.class(), featurewatch_errors::ErrorClass::PermanentUser);
        assert_eq!(err.search_id(), Some("s1"));
        assert_eq!(err.event_id(), Some("evt-1"));
    }

    #[tokio::test]
    async fn sender_config_error_is_classified_permanent_system() {
        let sender = Arc::new(ScriptedEmailSender::new());
        sender.fail_for("a@example.com", FwErrorKind::SenderConfigError);
        let ctx = DeliveryContext {
            email_sender: sender,
            push_sender: Arc::new(ScriptedPushSender::new()),
        };
        let err = send_email_job(&ctx, &email_job("a@example.com")).await.unwrap_err();
        assert_eq!(err.class(), featurewatch_errors::ErrorClass::PermanentSystem);
    }

    #[tokio::test]
    async fn successful_push_send_reaches_the_sender() {
        let ctx = DeliveryContext {
            email_sender: Arc::new(ScriptedEmailSender::new()),
            push_sender: Arc::new(ScriptedPushSender::new()),
        };
        send_push_job(&ctx, &push_job("device-1")).await.unwrap();
    }

    #[tokio::test]
    async fn push_sender_failure_is_classified() {
        let sender = Arc::new(ScriptedPushSender::new());
        sender.fail_for("dead-token", FwErrorKind::UndeliverableRecipient);
        let ctx = DeliveryContext {
            email_sender: Arc::new(ScriptedEmailSender::new()),
            push_sender: sender,
        };
        let err = send_push_job(&ctx, &push_job("dead-token")).await.unwrap_err();
        assert_eq!(err.class(), featurewatch_errors::ErrorClass::PermanentUser);
    }
}
