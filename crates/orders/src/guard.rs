//! Transition guards.
//!
//! The transition table lives on [`OrderStatus`]; this module adds the guard
//! predicates keyed by target state and the uniform `Allowed | Blocked`
//! decision the UI consumes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancel::{CancelReason, CancellationReason};
use crate::order::OrderSnapshot;
use crate::status::{OrderStatus, PaymentMethod, PaymentStatus};

/// Why a transition (or side request) may not be sent.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum BlockReason {
    #[error("payment must be collected before a cash-on-delivery order can be delivered")]
    PaymentRequired,

    #[error("a delivery partner must be assigned before the order can go out for delivery")]
    DeliveryPartnerRequired,

    #[error("a cancellation reason is required")]
    CancelReasonRequired,

    #[error("cannot move order from {from} to {to}")]
    OutOfSequence { from: OrderStatus, to: OrderStatus },

    #[error("order is already {status}")]
    Terminal { status: OrderStatus },

    #[error("payment has already been collected")]
    PaymentAlreadyCollected,
}

/// Outcome of evaluating an intent against the current snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum TransitionDecision {
    Allowed,
    Blocked(BlockReason),
}

impl TransitionDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, TransitionDecision::Allowed)
    }

    pub fn into_result(self) -> Result<(), BlockReason> {
        match self {
            TransitionDecision::Allowed => Ok(()),
            TransitionDecision::Blocked(reason) => Err(reason),
        }
    }
}

impl From<Result<(), BlockReason>> for TransitionDecision {
    fn from(result: Result<(), BlockReason>) -> Self {
        match result {
            Ok(()) => TransitionDecision::Allowed,
            Err(reason) => TransitionDecision::Blocked(reason),
        }
    }
}

/// What the operator asked for: a target status plus cancellation input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionIntent {
    pub target: OrderStatus,
    pub cancel_reason: Option<CancelReason>,
    pub custom_reason: Option<String>,
}

impl TransitionIntent {
    pub fn to(target: OrderStatus) -> Self {
        Self {
            target,
            cancel_reason: None,
            custom_reason: None,
        }
    }

    pub fn cancel(reason: CancelReason, custom_reason: Option<impl Into<String>>) -> Self {
        Self {
            target: OrderStatus::Cancelled,
            cancel_reason: Some(reason),
            custom_reason: custom_reason.map(Into::into),
        }
    }

    pub fn cancellation(&self) -> Option<CancellationReason> {
        CancellationReason::new(self.cancel_reason, self.custom_reason.as_deref())
    }
}

/// A pure precondition on the snapshot for one target state.
pub type Guard = fn(&OrderSnapshot, &TransitionIntent) -> Result<(), BlockReason>;

fn cod_payment_collected(order: &OrderSnapshot, _: &TransitionIntent) -> Result<(), BlockReason> {
    if order.payment_method == PaymentMethod::Cod && order.payment_status == PaymentStatus::Pending {
        return Err(BlockReason::PaymentRequired);
    }
    Ok(())
}

fn partner_assigned(order: &OrderSnapshot, _: &TransitionIntent) -> Result<(), BlockReason> {
    if order.delivery_partner.is_none() {
        return Err(BlockReason::DeliveryPartnerRequired);
    }
    Ok(())
}

fn reason_given(_: &OrderSnapshot, intent: &TransitionIntent) -> Result<(), BlockReason> {
    intent
        .cancellation()
        .map(|_| ())
        .ok_or(BlockReason::CancelReasonRequired)
}

/// Guard map keyed by target state.
pub fn guard_for(target: OrderStatus) -> Option<Guard> {
    match target {
        OrderStatus::Delivered => Some(cod_payment_collected),
        OrderStatus::OutForDelivery => Some(partner_assigned),
        OrderStatus::Cancelled => Some(reason_given),
        _ => None,
    }
}

/// Sequencing only: terminal source or out-of-table target.
pub(crate) fn check_sequence(from: OrderStatus, to: OrderStatus) -> Result<(), BlockReason> {
    if from.is_terminal() {
        return Err(BlockReason::Terminal { status: from });
    }
    if !from.can_transition_to(to) {
        return Err(BlockReason::OutOfSequence { from, to });
    }
    Ok(())
}

/// Evaluate an intent: transition table first, then the target's guard.
///
/// A skipped step reports `OutOfSequence` even when the target's guard would
/// also fail, so `preparing → out_for_delivery` without a partner names the
/// sequence, and the partner requirement surfaces from `ready`.
pub fn evaluate(order: &OrderSnapshot, intent: &TransitionIntent) -> TransitionDecision {
    let result = check_sequence(order.status, intent.target).and_then(|()| match guard_for(intent.target) {
        Some(guard) => guard(order, intent),
        None => Ok(()),
    });
    result.into()
}
