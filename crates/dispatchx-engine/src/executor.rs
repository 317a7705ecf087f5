//! Action Executor
//!
//! Performs the side effect chosen by the router, once, and reports what
//! happened. It never retries: a failed send or booking is returned as an
//! `error` outcome for the caller to act on. A booking that succeeded stays
//! booked even when the follow-up email fails; the booking id travels with
//! the error so the work order can be reconciled by hand.

use chrono::{DateTime, Utc};
use dispatchx_core::errors::{ExError, ExErrorKind};
use dispatchx_core::idempotency::IdempotencyKey;
use dispatchx_core::model::{CalendarSlot, Outcome};
use dispatchx_core::router::{InternalPlan, RouteDecision};
use std::sync::Arc;

use crate::collaborators::{CalendarService, EmailSender, OutboundEmail};
use crate::resolver::ResolvedContext;
use crate::settings::{with_timeout, EngineSettings};

/// What the executor did
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub outcome: Outcome,
    pub message_id: Option<String>,
    pub booking_id: Option<String>,
    pub scheduled_start: Option<DateTime<Utc>>,
    /// Set when `outcome` is `Error`
    pub failure: Option<ExError>,
    /// Internal dispatch without a slot; the caller should check availability again later
    pub retry_suggested: bool,
}

impl ExecutionOutcome {
    fn sent(message_id: String) -> Self {
        Self {
            outcome: Outcome::Sent,
            message_id: Some(message_id),
            booking_id: None,
            scheduled_start: None,
            failure: None,
            retry_suggested: false,
        }
    }

    fn deferred() -> Self {
        Self {
            outcome: Outcome::Pending,
            message_id: None,
            booking_id: None,
            scheduled_start: None,
            failure: None,
            retry_suggested: true,
        }
    }

    fn error(failure: ExError) -> Self {
        Self {
            outcome: Outcome::Error,
            message_id: None,
            booking_id: None,
            scheduled_start: None,
            failure: Some(failure),
            retry_suggested: false,
        }
    }

    /// Reference stored as the record's external reference
    pub fn external_ref(&self) -> Option<String> {
        self.booking_id.clone().or_else(|| self.message_id.clone())
    }
}

pub struct ActionExecutor {
    email: Arc<dyn EmailSender>,
    calendar: Arc<dyn CalendarService>,
    settings: EngineSettings,
}

impl ActionExecutor {
    pub fn new(
        email: Arc<dyn EmailSender>,
        calendar: Arc<dyn CalendarService>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            email,
            calendar,
            settings,
        }
    }

    pub async fn execute(
        &self,
        decision: &RouteDecision,
        context: &ResolvedContext,
        issue_description: &str,
        key: &IdempotencyKey,
    ) -> ExecutionOutcome {
        match decision {
            RouteDecision::ManufacturerDispatch => {
                self.notify_manufacturer(context, issue_description, key).await
            }
            RouteDecision::InternalDispatch(InternalPlan::Scheduled(slot)) => {
                self.book_internal(slot, context, issue_description, key).await
            }
            RouteDecision::InternalDispatch(InternalPlan::Deferred) => ExecutionOutcome::deferred(),
            RouteDecision::Fail(reason) => ExecutionOutcome::error(
                ExError::new(ExErrorKind::RouterBlocked)
                    .with_op("execute")
                    .with_message(format!("refusing to execute failed decision {:?}", reason)),
            ),
        }
    }

    async fn notify_manufacturer(
        &self,
        context: &ResolvedContext,
        issue_description: &str,
        key: &IdempotencyKey,
    ) -> ExecutionOutcome {
        let email = manufacturer_email(context, issue_description, key);
        match self.send(email).await {
            Ok(message_id) => ExecutionOutcome::sent(message_id),
            Err(err) => ExecutionOutcome::error(err),
        }
    }

    async fn book_internal(
        &self,
        slot: &CalendarSlot,
        context: &ResolvedContext,
        issue_description: &str,
        key: &IdempotencyKey,
    ) -> ExecutionOutcome {
        let booking = with_timeout(
            self.settings.timeouts.calendar,
            "book_slot",
            self.calendar.book(slot.clone(), key.as_str().to_string()),
        )
        .await;

        let booking_id = match booking {
            Ok(id) => id,
            Err(err) => return ExecutionOutcome::error(transport(err, "book_slot")),
        };

        let email = work_order_email(
            &self.settings.property_manager_email,
            context,
            issue_description,
            slot,
            &booking_id,
            key,
        );

        match self.send(email).await {
            Ok(message_id) => ExecutionOutcome {
                outcome: Outcome::Booked,
                message_id: Some(message_id),
                booking_id: Some(booking_id),
                scheduled_start: Some(slot.start),
                failure: None,
                retry_suggested: false,
            },
            Err(err) => {
                tracing::warn!(
                    booking_id = %booking_id,
                    err_code = err.code(),
                    "Work order email failed after booking; booking kept"
                );
                let failure = ExError::new(ExErrorKind::Transport)
                    .with_op("send_work_order")
                    .with_entity_id(booking_id.clone())
                    .with_message(format!(
                        "slot booked as {} but work order email failed",
                        booking_id
                    ))
                    .with_source(err);
                ExecutionOutcome {
                    booking_id: Some(booking_id),
                    scheduled_start: Some(slot.start),
                    ..ExecutionOutcome::error(failure)
                }
            }
        }
    }

    async fn send(&self, email: OutboundEmail) -> Result<String, ExError> {
        with_timeout(self.settings.timeouts.email, "send_email", self.email.send(email))
            .await
            .map_err(|e| transport(e, "send_email"))
    }
}

/// Collaborator failures surface as `ERR_TRANSPORT` unless they already timed out
fn transport(err: ExError, op: &str) -> ExError {
    match err.kind() {
        ExErrorKind::Transport | ExErrorKind::Timeout => err,
        _ => ExError::new(ExErrorKind::Transport)
            .with_op(op.to_string())
            .with_message(err.message().to_string())
            .with_source(err),
    }
}

fn manufacturer_email(
    context: &ResolvedContext,
    issue_description: &str,
    key: &IdempotencyKey,
) -> OutboundEmail {
    let asset = &context.asset;
    let tenant = &context.tenant;
    OutboundEmail {
        to: asset.support_contact.clone(),
        subject: format!(
            "Warranty service request: {} (unit {}) [ref {}]",
            asset.describe(),
            tenant.unit,
            short_ref(key)
        ),
        body: format!(
            "Hello {} support,\n\n\
             A covered appliance needs warranty service.\n\n\
             Unit: {}\n\
             Appliance: {}\n\
             Serial number: {}\n\
             Installed: {}\n\
             Reported issue: {}\n\n\
             Please reply to arrange a technician visit.\n\n\
             Correlation id: {}\n",
            asset.manufacturer,
            tenant.unit,
            asset.describe(),
            asset.serial_number.as_deref().unwrap_or("unknown"),
            asset.installed_on,
            issue_description,
            key
        ),
        correlation_id: key.as_str().to_string(),
    }
}

fn work_order_email(
    property_manager: &str,
    context: &ResolvedContext,
    issue_description: &str,
    slot: &CalendarSlot,
    booking_id: &str,
    key: &IdempotencyKey,
) -> OutboundEmail {
    let asset = &context.asset;
    let tenant = &context.tenant;
    OutboundEmail {
        to: property_manager.to_string(),
        subject: format!(
            "Work order: {} in unit {} on {} [ref {}]",
            asset.category,
            tenant.unit,
            slot.start.format("%Y-%m-%d %H:%M UTC"),
            short_ref(key)
        ),
        body: format!(
            "Internal maintenance has been scheduled (warranty expired).\n\n\
             Tenant: {} (unit {}, {})\n\
             Appliance: {}\n\
             Reported issue: {}\n\
             Scheduled: {} to {}\n\
             Booking id: {}\n\n\
             Correlation id: {}\n",
            tenant.name,
            tenant.unit,
            tenant.contact_email,
            asset.describe(),
            issue_description,
            slot.start.to_rfc3339(),
            slot.end.to_rfc3339(),
            booking_id,
            key
        ),
        correlation_id: key.as_str().to_string(),
    }
}

fn short_ref(key: &IdempotencyKey) -> &str {
    let key = key.as_str();
    let key = key.strip_prefix("unresolved:").unwrap_or(key);
    key.get(..12).unwrap_or(key)
}
