//! Payment ledger and access-window types.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::service::ServiceKind;

/// Status of a payment-provider transaction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Checkout initiated, no provider verdict yet.
    Pending,
    /// Provider approved the payment.
    Approved,
    /// Provider rejected the payment.
    Rejected,
    /// Payment cancelled before completion.
    Cancelled,
    /// Provider is still processing.
    InProcess,
}

impl PaymentStatus {
    /// Terminal statuses are never mutated except by corrective admin action.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Approved | PaymentStatus::Rejected | PaymentStatus::Cancelled
        )
    }
}

/// Closed, tagged metadata attached to a payment record.
///
/// The `Unknown` variant preserves legacy or forward-compatible payloads
/// without widening the type to an open dictionary.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaymentMetadata {
    /// Payment for a slot-backed appointment.
    Reservation {
        /// The booking the payment settles.
        booking_id: String,
    },
    /// Payment for a time-boxed subscription.
    Subscription {
        /// Provider-side plan identifier.
        plan: String,
    },
    /// Unrecognized payload carried through untouched.
    Unknown {
        /// The raw provider payload.
        payload: serde_json::Value,
    },
}

/// One payment-provider transaction attempt, keyed by the provider's
/// globally unique external reference.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PaymentRecord {
    /// Idempotency key supplied by the provider.
    pub external_reference: String,
    /// Paying user.
    pub user_id: String,
    /// Service the payment buys access to.
    pub service: ServiceKind,
    /// Amount paid.
    pub amount: f64,
    /// ISO currency code.
    pub currency: String,
    /// Current status.
    pub status: PaymentStatus,
    /// Provider transaction timestamp.
    pub transaction_at: DateTime<Utc>,
    /// End of the purchased access window. Set when approved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Typed metadata.
    pub metadata: PaymentMetadata,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Payload of a provider status notification.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PaymentUpdate {
    /// Paying user.
    pub user_id: String,
    /// Service the payment buys access to.
    pub service: ServiceKind,
    /// Amount paid.
    pub amount: f64,
    /// ISO currency code.
    pub currency: String,
    /// Provider transaction timestamp; defaults to now when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_at: Option<DateTime<Utc>>,
    /// End of the purchased access window.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Typed metadata, if the provider sent any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PaymentMetadata>,
}

/// Derived view: does a user currently have access to a service?
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AccessWindow {
    /// Whether an approved payment's window covers the query instant.
    pub active: bool,
    /// Maximal expiry among approved payments, if any exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccessWindow {
    /// The window of a user with no approved payments.
    pub fn inactive() -> Self {
        Self {
            active: false,
            expires_at: None,
        }
    }
}

/// Why a (user, service) window is notification-eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Expiry falls within the next 24 hours.
    Expiring,
    /// Expiry fell within the past 24 hours.
    Expired,
}

/// One entry of the notification feed consumed by the external dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NotificationCandidate {
    /// User whose window is near expiry.
    pub user_id: String,
    /// The service the window covers.
    pub service: ServiceKind,
    /// When the window expires or expired.
    pub expires_at: DateTime<Utc>,
    /// Expiring or expired.
    pub kind: NotificationKind,
}

/// A provider notification attempted an invalid terminal-to-terminal
/// transition. Recorded and surfaced to operators, never applied.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PaymentAnomaly {
    /// The record's external reference.
    pub external_reference: String,
    /// Status already stored.
    pub existing_status: PaymentStatus,
    /// Status the notification tried to apply.
    pub attempted_status: PaymentStatus,
    /// When the anomaly was observed.
    pub observed_at: DateTime<Utc>,
}

/// What an approved renewal does to an already-active window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RenewalPolicy {
    /// Append the purchased duration to the current expiry.
    #[default]
    Extend,
    /// Overwrite the window with the notification's expiry.
    Replace,
}
