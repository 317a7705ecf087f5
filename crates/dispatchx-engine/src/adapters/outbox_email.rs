//! Email adapter backed by the store's outbox table

use async_trait::async_trait;
use dispatchx_core::clock::Clock;
use dispatchx_core::errors::{ExError, ExErrorKind};
use dispatchx_store::repo::{OutboxEntry, OutboxRepo, OutboxStatus};
use dispatchx_store::ContextStore;
use std::sync::Arc;

use crate::collaborators::{EmailSender, OutboundEmail};

/// Writes each email to `email_outbox` as its delivery.
///
/// Sending is idempotent on the correlation id: a repeat send returns the
/// first message id. Recipients without an `@` are recorded as failed sends.
pub struct OutboxEmailSender {
    store: ContextStore,
    sender_domain: String,
    clock: Arc<dyn Clock>,
}

impl OutboxEmailSender {
    pub fn new(store: ContextStore, sender_address: &str, clock: Arc<dyn Clock>) -> Self {
        let sender_domain = sender_address
            .rsplit_once('@')
            .map(|(_, domain)| domain.to_string())
            .unwrap_or_else(|| "dispatchx.local".to_string());
        Self {
            store,
            sender_domain,
            clock,
        }
    }
}

#[async_trait]
impl EmailSender for OutboxEmailSender {
    async fn send(&self, email: OutboundEmail) -> Result<String, ExError> {
        let deliverable = email.to.contains('@');
        let entry = OutboxEntry {
            message_id: format!("<{}@{}>", uuid::Uuid::now_v7(), self.sender_domain),
            correlation_id: email.correlation_id,
            recipient: email.to,
            subject: email.subject,
            body: email.body,
            status: if deliverable {
                OutboxStatus::Sent
            } else {
                OutboxStatus::Failed
            },
            sent_at: self.clock.now(),
        };

        let store = self.store.clone();
        let recipient = entry.recipient.clone();
        let message_id = tokio::task::spawn_blocking(move || {
            let conn = store.connect()?;
            OutboxRepo::enqueue(&conn, &entry)
        })
        .await
        .map_err(|e| {
            ExError::new(ExErrorKind::Transport)
                .with_op("send_email")
                .with_message(format!("outbox writer panicked: {}", e))
        })?;

        if !deliverable {
            return Err(ExError::new(ExErrorKind::Transport)
                .with_op("send_email")
                .with_entity_id(recipient)
                .with_message("recipient address is not deliverable"));
        }

        message_id.map_err(|e| {
            ExError::new(ExErrorKind::Transport)
                .with_op("send_email")
                .with_message("outbox write failed")
                .with_source(e)
        })
    }
}
