//! Event dispatcher: turns one published `FeatureDiffEvent` into a
//! delivery job per subscription channel, and classifies each send's
//! result into ack/nack per the taxonomy in `featurewatch_errors`.

use featurewatch_errors::{ErrorClass, FwError};
use featurewatch_transport::contracts::{
    Channel, EmailPublisher, PushPublisher, SubscriptionLister,
};
use featurewatch_transport::envelopes::{
    DeliveryMetadata, EmailDeliveryJob, FeatureDiffEventData, PushDeliveryJob,
};
use std::sync::Arc;

/// The collaborators the dispatcher needs.
#[derive(Clone)]
pub struct DispatcherContext {
    pub subscription_lister: Arc<dyn SubscriptionLister>,
    pub email_publisher: Arc<dyn EmailPublisher>,
    pub push_publisher: Arc<dyn PushPublisher>,
}

/// The transport-level disposition for one `FeatureDiffEvent` after it has
/// been fanned out to every subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every job was handed off (or there were no subscriptions); ack.
    Ack,
    /// At least one job failed transiently; nack for transport retry.
    ///
    /// Jobs that succeeded or failed permanently before the transient
    /// failure are not retried — per-job idempotency at the publisher is
    /// assumed, matching the producer's idempotency contract.
    Nack,
}

/// Fan `event` out to every active subscription of its saved search.
pub async fn process_event(
    ctx: &DispatcherContext,
    event: &FeatureDiffEventData,
) -> Result<DispatchOutcome, FwError> {
    let subscriptions = ctx
        .subscription_lister
        .list_subscriptions(&event.search_id)
        .await?;

    let metadata = DeliveryMetadata {
        event_id: event.event_id.clone(),
        search_id: event.search_id.clone(),
        query: event.query.clone(),
        frequency: event.frequency,
        generated_at: event.generated_at,
    };

    for subscription in &subscriptions {
        let outcome = match &subscription.channel {
            Channel::Email { recipient_email } => {
                let job = EmailDeliveryJob {
                    subscription_id: subscription.subscription_id.clone(),
                    recipient_email: recipient_email.clone(),
                    summary_raw: event.summary.clone(),
                    metadata: metadata.clone(),
                };
                ctx.email_publisher.publish_email_job(job).await
            }
            Channel::Push { recipient_token } => {
                let job = PushDeliveryJob {
                    subscription_id: subscription.subscription_id.clone(),
                    recipient_token: recipient_token.clone(),
                    summary_raw: event.summary.clone(),
                    metadata: metadata.clone(),
                };
                ctx.push_publisher.publish_push_job(job).await
            }
        };

        if let Err(err) = outcome {
            match err.class() {
                ErrorClass::PermanentUser | ErrorClass::PermanentSystem | ErrorClass::Duplicate => {
                    tracing::warn!(
                        search_id = %event.search_id,
                        subscription_id = %subscription.subscription_id,
                        error = %err,
                        "dropping delivery job; permanent classification"
                    );
                }
                ErrorClass::Transient => {
                    tracing::warn!(
                        search_id = %event.search_id,
                        subscription_id = %subscription.subscription_id,
                        error = %err,
                        "delivery job failed transiently; nacking event"
                    );
                    return Ok(DispatchOutcome::Nack);
                }
                ErrorClass::NoChange => {}
            }
        }
    }

    Ok(DispatchOutcome::Ack)
}

#[cfg(test)]
mod tests {
    use super::*;
    use featurewatch_errors::FwErrorKind;
    use featurewatch_transport::contracts::Subscription;
    use featurewatch_transport::inmemory::{
        InMemorySubscriptionLister, RecordingEmailSink, RecordingPushSink,
    };
    use featurewatch_types::Frequency;

    fn event() -> FeatureDiffEventData {
        FeatureDiffEventData {
            event_id: "evt-1".into(),
            search_id: "s1".into(),
            query: "category:css".into(),
            summary: "c3VtbWFyeQ==".into(),
            state_id: "state-1".into(),
            diff_id: Some("diff-1".into()),
            state_blob_path: "state/state-1.json".into(),
            diff_blob_path: Some("diff/diff-1.json".into()),
            reasons: vec![featurewatch_transport::envelopes::Reason::DataUpdated],
            frequency: Frequency::Immediate,
            generated_at: chrono::Utc::now(),
        }
    }

    fn email_sub(id: &str, email: &str) -> Subscription {
        Subscription {
            subscription_id: id.to_string(),
            channel: Channel::Email {
                recipient_email: email.to_string(),
            },
        }
    }

    #[tokio::test]
    async fn fans_out_email_job_per_subscription() {
        let lister = Arc::new(InMemorySubscriptionLister::new());
        lister.set_subscriptions("s1", vec![email_sub("sub1", "a@example.com")]);
        let email_sink = Arc::new(RecordingEmailSink::new());
        let ctx = DispatcherContext {
            subscription_lister: lister,
            email_publisher: email_sink.clone(),
            push_publisher: Arc::new(RecordingPushSink::new()),
        };

        let outcome = process_event(&ctx, &event()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Ack);
        let jobs = email_sink.jobs();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].recipient_email, "a@example.com");
    }

    #[tokio::test]
    async fn no_subscriptions_is_a_no_op_ack() {
        let lister = Arc::new(InMemorySubscriptionLister::new());
        let ctx = DispatcherContext {
            subscription_lister: lister,
            email_publisher: Arc::new(RecordingEmailSink::new()),
            push_publisher: Arc::new(RecordingPushSink::new()),
        };

        let outcome = process_event(&ctx, &event()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Ack);
    }

    #[tokio::test]
    async fn undeliverable_recipient_is_permanent_and_still_acks() {
        let lister = Arc::new(InMemorySubscriptionLister::new());
        lister.set_subscriptions(
            "s1",
            vec![
                email_sub("sub1", "bad@example.com"),
                email_sub("sub2", "good@example.com"),
            ],
        );

        struct ClassifyingEmailSink {
            recording: Arc<RecordingEmailSink>,
        }
        #[async_trait::async_trait]
        impl EmailPublisher for ClassifyingEmailSink {
            async fn publish_email_job(&self, job: EmailDeliveryJob) -> Result<(), FwError> {
                if job.recipient_email == "bad@example.com" {
                    return Err(FwError::new(FwErrorKind::UndeliverableRecipient)
                        .with_op("email_publisher.publish_email_job"));
                }
                self.recording.publish_email_job(job).await
            }
        }

        let recording = Arc::new(RecordingEmailSink::new());
        let ctx = DispatcherContext {
            subscription_lister: lister,
            email_publisher: Arc::new(ClassifyingEmailSink {
                recording: recording.clone(),
            }),
            push_publisher: Arc::new(RecordingPushSink::new()),
        };

        let outcome = process_event(&ctx, &event()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Ack);
        assert_eq!(recording.jobs().len(), 1);
    }

    #[tokio::test]
    async fn transient_failure_nacks_the_event() {
        let lister = Arc::new(InMemorySubscriptionLister::new());
        lister.set_subscriptions("s1", vec![email_sub("sub1", "a@example.com")]);

        struct FlakyEmailSink;
        #[async_trait::async_trait]
        impl EmailPublisher for FlakyEmailSink {
            async fn publish_email_job(&self, _job: EmailDeliveryJob) -> Result<(), FwError> {
                Err(FwError::new(FwErrorKind::PublishFailed).with_op("email_publisher.publish_email_job"))
            }
        }

        let ctx = DispatcherContext {
            subscription_lister: lister,
            email_publisher: Arc::new(FlakyEmailSink),
            push_publisher: Arc::new(RecordingPushSink::new()),
        };

        let outcome = process_event(&ctx, &event()).await.unwrap();
        assert_eq!(outcome, DispatchOutcome::Nack);
    }
}
