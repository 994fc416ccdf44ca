use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use freshcart_core::{Aggregate, AggregateRoot, DomainError, Money, OrderId, PartnerId};
use freshcart_events::Event;

use crate::guard::{BlockReason, TransitionDecision, TransitionIntent, check_sequence, evaluate};
use crate::status::{OrderStatus, PaymentMethod, PaymentStatus};

/// Canonical order state as returned by the order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshot {
    #[serde(rename = "_id", alias = "id")]
    pub id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    #[serde(default, deserialize_with = "partner_ref")]
    pub delivery_partner: Option<PartnerId>,
    #[serde(default)]
    pub total_amount: Money,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PartnerRef {
    Id(String),
    Object {
        #[serde(rename = "_id", alias = "id")]
        id: String,
    },
}

/// Accepts `"dp-1"`, `{ "_id": "dp-1", ... }` or `null`.
fn partner_ref<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<PartnerId>, D::Error> {
    let raw = Option::<PartnerRef>::deserialize(deserializer)?;
    Ok(raw.and_then(|r| {
        let id = match r {
            PartnerRef::Id(id) | PartnerRef::Object { id } => id,
        };
        PartnerId::parse(id).ok()
    }))
}

/// Aggregate root: OrderFulfillment.
///
/// Holds the last snapshot adopted from the order service. It never predicts
/// the outcome of a request; state only changes through [`OrderEvent::Synced`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFulfillment {
    snapshot: OrderSnapshot,
    version: u64,
}

impl OrderFulfillment {
    pub fn new(snapshot: OrderSnapshot) -> Self {
        Self { snapshot, version: 0 }
    }

    pub fn snapshot(&self) -> &OrderSnapshot {
        &self.snapshot
    }

    pub fn status(&self) -> OrderStatus {
        self.snapshot.status
    }

    pub fn is_terminal(&self) -> bool {
        self.snapshot.status.is_terminal()
    }

    pub fn evaluate(&self, intent: &TransitionIntent) -> TransitionDecision {
        evaluate(&self.snapshot, intent)
    }

    /// Wrap a backend-returned snapshot as an event for this order.
    pub fn synced(
        &self,
        snapshot: OrderSnapshot,
        cause: SyncCause,
        occurred_at: DateTime<Utc>,
    ) -> Result<OrderEvent, FulfillmentError> {
        if snapshot.id != self.snapshot.id {
            return Err(DomainError::invariant(format!(
                "order id mismatch: expected {}, got {}",
                self.snapshot.id, snapshot.id
            ))
            .into());
        }
        Ok(OrderEvent::Synced(OrderSynced {
            snapshot,
            cause,
            occurred_at,
        }))
    }

    /// Everything the UI may offer for this order right now.
    ///
    /// Blocked transitions are listed with their reason so the control can be
    /// shown disabled rather than hidden.
    pub fn available_actions(&self) -> Vec<AvailableAction> {
        let order = &self.snapshot;
        if order.status.is_terminal() {
            return Vec::new();
        }

        let mut actions: Vec<AvailableAction> = order
            .status
            .allowed_transitions()
            .into_iter()
            .map(|target| match target {
                OrderStatus::Cancelled => AvailableAction {
                    action: OrderAction::ChangeStatus(target),
                    decision: check_sequence(order.status, target).into(),
                    needs_input: true,
                },
                _ => AvailableAction {
                    action: OrderAction::ChangeStatus(target),
                    decision: evaluate(order, &TransitionIntent::to(target)),
                    needs_input: false,
                },
            })
            .collect();

        if order.payment_method == PaymentMethod::Cod && order.payment_status == PaymentStatus::Pending {
            actions.push(AvailableAction {
                action: OrderAction::CollectPayment,
                decision: TransitionDecision::Allowed,
                needs_input: false,
            });
        }
        if order.delivery_partner.is_none() {
            actions.push(AvailableAction {
                action: OrderAction::AssignDeliveryPartner,
                decision: TransitionDecision::Allowed,
                needs_input: true,
            });
        }
        actions
    }
}

impl AggregateRoot for OrderFulfillment {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.snapshot.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderAction {
    ChangeStatus(OrderStatus),
    CollectPayment,
    AssignDeliveryPartner,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableAction {
    pub action: OrderAction,
    pub decision: TransitionDecision,
    /// The operator must supply a reason or pick a partner first.
    pub needs_input: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    ChangeStatus(TransitionIntent),
    CollectPayment { notes: Option<String> },
    AssignDeliveryPartner { partner_id: PartnerId },
}

/// A request to send to the order service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderRequest {
    UpdateStatus {
        order_id: OrderId,
        status: OrderStatus,
        reason: Option<String>,
    },
    CollectPayment {
        order_id: OrderId,
        notes: Option<String>,
    },
    AssignDeliveryPartner {
        order_id: OrderId,
        partner_id: PartnerId,
    },
}

impl OrderRequest {
    pub fn order_id(&self) -> &OrderId {
        match self {
            OrderRequest::UpdateStatus { order_id, .. }
            | OrderRequest::CollectPayment { order_id, .. }
            | OrderRequest::AssignDeliveryPartner { order_id, .. } => order_id,
        }
    }

    /// What adopting this request's response records.
    pub fn sync_cause(&self) -> SyncCause {
        match self {
            OrderRequest::UpdateStatus { .. } => SyncCause::StatusUpdated,
            OrderRequest::CollectPayment { .. } => SyncCause::PaymentCollected,
            OrderRequest::AssignDeliveryPartner { .. } => SyncCause::PartnerAssigned,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncCause {
    Fetched,
    StatusUpdated,
    PaymentCollected,
    PartnerAssigned,
}

/// Event: OrderSynced (a snapshot confirmed by the order service).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSynced {
    pub snapshot: OrderSnapshot,
    pub cause: SyncCause,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    Synced(OrderSynced),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Synced(e) => match e.cause {
                SyncCause::Fetched => "orders.order.fetched",
                SyncCause::StatusUpdated => "orders.order.status_adopted",
                SyncCause::PaymentCollected => "orders.order.payment_collected",
                SyncCause::PartnerAssigned => "orders.order.partner_assigned",
            },
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::Synced(e) => e.occurred_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FulfillmentError {
    #[error(transparent)]
    Blocked(#[from] BlockReason),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl Aggregate for OrderFulfillment {
    type Command = OrderCommand;
    type Request = OrderRequest;
    type Event = OrderEvent;
    type Error = FulfillmentError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::Synced(e) => {
                self.snapshot = e.snapshot.clone();
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Request>, Self::Error> {
        match command {
            OrderCommand::ChangeStatus(intent) => self.handle_change_status(intent),
            OrderCommand::CollectPayment { notes } => self.handle_collect_payment(notes.as_deref()),
            OrderCommand::AssignDeliveryPartner { partner_id } => self.handle_assign_partner(partner_id),
        }
    }
}

impl OrderFulfillment {
    fn ensure_open(&self) -> Result<(), BlockReason> {
        if self.is_terminal() {
            return Err(BlockReason::Terminal {
                status: self.snapshot.status,
            });
        }
        Ok(())
    }

    fn handle_change_status(&self, intent: &TransitionIntent) -> Result<Vec<OrderRequest>, FulfillmentError> {
        self.evaluate(intent).into_result()?;

        let reason = match intent.target {
            OrderStatus::Cancelled => intent.cancellation().map(|c| c.text().to_string()),
            _ => None,
        };

        Ok(vec![OrderRequest::UpdateStatus {
            order_id: self.snapshot.id.clone(),
            status: intent.target,
            reason,
        }])
    }

    fn handle_collect_payment(&self, notes: Option<&str>) -> Result<Vec<OrderRequest>, FulfillmentError> {
        self.ensure_open()?;
        if self.snapshot.payment_status == PaymentStatus::Paid {
            return Err(BlockReason::PaymentAlreadyCollected.into());
        }

        Ok(vec![OrderRequest::CollectPayment {
            order_id: self.snapshot.id.clone(),
            notes: notes.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
        }])
    }

    fn handle_assign_partner(&self, partner_id: &PartnerId) -> Result<Vec<OrderRequest>, FulfillmentError> {
        self.ensure_open()?;

        Ok(vec![OrderRequest::AssignDeliveryPartner {
            order_id: self.snapshot.id.clone(),
            partner_id: partner_id.clone(),
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelReason;
    use rust_decimal::Decimal;

    fn cod_order(status: OrderStatus) -> OrderSnapshot {
        OrderSnapshot {
            id: "o-1".into(),
            order_number: Some("FC-1001".to_string()),
            status,
            payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending,
            delivery_partner: None,
            total_amount: Decimal::new(45_050, 2),
        }
    }

    /// Plays the order service: accept the request and return the new state.
    fn server_applies(snapshot: &OrderSnapshot, request: &OrderRequest) -> OrderSnapshot {
        let mut next = snapshot.clone();
        match request {
            OrderRequest::UpdateStatus { status, .. } => next.status = *status,
            OrderRequest::CollectPayment { .. } => next.payment_status = PaymentStatus::Paid,
            OrderRequest::AssignDeliveryPartner { partner_id, .. } => {
                next.delivery_partner = Some(partner_id.clone());
                if next.status == OrderStatus::Ready {
                    next.status = OrderStatus::OutForDelivery;
                }
            }
        }
        next
    }

    fn run(order: &mut OrderFulfillment, command: OrderCommand) -> Result<(), FulfillmentError> {
        let requests = order.handle(&command)?;
        for request in requests {
            let returned = server_applies(order.snapshot(), &request);
            let event = order.synced(returned, request.sync_cause(), Utc::now())?;
            order.apply(&event);
        }
        Ok(())
    }

    fn advance(target: OrderStatus) -> OrderCommand {
        OrderCommand::ChangeStatus(TransitionIntent::to(target))
    }

    #[test]
    fn full_cod_lifecycle_with_gates() {
        let mut order = OrderFulfillment::new(cod_order(OrderStatus::Pending));

        run(&mut order, advance(OrderStatus::Confirmed)).unwrap();
        run(&mut order, advance(OrderStatus::Preparing)).unwrap();
        run(&mut order, advance(OrderStatus::Ready)).unwrap();

        assert_eq!(
            run(&mut order, advance(OrderStatus::OutForDelivery)),
            Err(FulfillmentError::Blocked(BlockReason::DeliveryPartnerRequired))
        );

        // The service dispatches a ready order as soon as a partner is assigned.
        run(
            &mut order,
            OrderCommand::AssignDeliveryPartner {
                partner_id: "dp-7".into(),
            },
        )
        .unwrap();
        assert_eq!(order.status(), OrderStatus::OutForDelivery);

        assert_eq!(
            run(&mut order, advance(OrderStatus::Delivered)),
            Err(FulfillmentError::Blocked(BlockReason::PaymentRequired))
        );
        run(&mut order, OrderCommand::CollectPayment { notes: Some("cash".into()) }).unwrap();
        run(&mut order, advance(OrderStatus::Delivered)).unwrap();

        assert_eq!(order.status(), OrderStatus::Delivered);
        assert_eq!(order.version(), 6);
        assert!(order.available_actions().is_empty());
    }

    #[test]
    fn partner_assignment_before_ready_keeps_server_status() {
        let mut order = OrderFulfillment::new(cod_order(OrderStatus::Preparing));
        run(
            &mut order,
            OrderCommand::AssignDeliveryPartner {
                partner_id: "dp-1".into(),
            },
        )
        .unwrap();
        assert_eq!(order.status(), OrderStatus::Preparing);

        run(&mut order, advance(OrderStatus::Ready)).unwrap();
        run(&mut order, advance(OrderStatus::OutForDelivery)).unwrap();
        assert_eq!(order.status(), OrderStatus::OutForDelivery);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let order = OrderFulfillment::new(cod_order(OrderStatus::Pending));
        let before = order.clone();

        let requests = order.handle(&advance(OrderStatus::Confirmed)).unwrap();
        assert_eq!(
            requests,
            vec![OrderRequest::UpdateStatus {
                order_id: "o-1".into(),
                status: OrderStatus::Confirmed,
                reason: None,
            }]
        );
        assert_eq!(order, before);
    }

    #[test]
    fn cancel_sends_reason_text() {
        let order = OrderFulfillment::new(cod_order(OrderStatus::Ready));

        let requests = order
            .handle(&OrderCommand::ChangeStatus(TransitionIntent::cancel(
                CancelReason::Other,
                Some("customer moved"),
            )))
            .unwrap();
        assert!(matches!(
            &requests[0],
            OrderRequest::UpdateStatus { status: OrderStatus::Cancelled, reason: Some(r), .. } if r == "customer moved"
        ));

        let err = order
            .handle(&OrderCommand::ChangeStatus(TransitionIntent::cancel(CancelReason::Other, Some(" "))))
            .unwrap_err();
        assert_eq!(err, FulfillmentError::Blocked(BlockReason::CancelReasonRequired));
    }

    #[test]
    fn cancel_with_other_text_allowed_from_every_open_state() {
        for status in OrderStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
            let order = OrderFulfillment::new(cod_order(status));
            let intent = TransitionIntent::cancel(CancelReason::Other, Some("changed mind"));
            assert!(order.handle(&OrderCommand::ChangeStatus(intent)).is_ok(), "{status}");
        }
    }

    #[test]
    fn payment_collection_rules() {
        let mut paid = cod_order(OrderStatus::Ready);
        paid.payment_status = PaymentStatus::Paid;
        assert_eq!(
            OrderFulfillment::new(paid).handle(&OrderCommand::CollectPayment { notes: None }),
            Err(FulfillmentError::Blocked(BlockReason::PaymentAlreadyCollected))
        );

        let cancelled = OrderFulfillment::new(cod_order(OrderStatus::Cancelled));
        assert!(matches!(
            cancelled.handle(&OrderCommand::CollectPayment { notes: None }),
            Err(FulfillmentError::Blocked(BlockReason::Terminal { .. }))
        ));

        let requests = OrderFulfillment::new(cod_order(OrderStatus::Ready))
            .handle(&OrderCommand::CollectPayment { notes: Some("  ".into()) })
            .unwrap();
        assert_eq!(
            requests,
            vec![OrderRequest::CollectPayment {
                order_id: "o-1".into(),
                notes: None,
            }]
        );
    }

    #[test]
    fn synced_rejects_foreign_snapshot() {
        let order = OrderFulfillment::new(cod_order(OrderStatus::Pending));
        let mut other = cod_order(OrderStatus::Confirmed);
        other.id = "o-2".into();
        assert!(matches!(
            order.synced(other, SyncCause::Fetched, Utc::now()),
            Err(FulfillmentError::Domain(DomainError::InvariantViolation(_)))
        ));
    }

    #[test]
    fn available_actions_show_blocked_with_reason() {
        let mut snapshot = cod_order(OrderStatus::OutForDelivery);
        snapshot.delivery_partner = Some("dp-1".into());
        let actions = OrderFulfillment::new(snapshot).available_actions();

        let deliver = actions
            .iter()
            .find(|a| a.action == OrderAction::ChangeStatus(OrderStatus::Delivered))
            .unwrap();
        assert_eq!(deliver.decision, TransitionDecision::Blocked(BlockReason::PaymentRequired));

        let cancel = actions
            .iter()
            .find(|a| a.action == OrderAction::ChangeStatus(OrderStatus::Cancelled))
            .unwrap();
        assert!(cancel.decision.is_allowed());
        assert!(cancel.needs_input);

        assert!(actions.iter().any(|a| a.action == OrderAction::CollectPayment));
        assert!(!actions.iter().any(|a| a.action == OrderAction::AssignDeliveryPartner));
    }

    #[test]
    fn event_names_follow_cause() {
        let order = OrderFulfillment::new(cod_order(OrderStatus::Pending));
        let event = order
            .synced(cod_order(OrderStatus::Confirmed), SyncCause::StatusUpdated, Utc::now())
            .unwrap();
        assert_eq!(event.event_type(), "orders.order.status_adopted");
    }

    #[test]
    fn snapshot_accepts_nested_partner() {
        let json = r#"{
            "_id": "o-9",
            "orderNumber": "FC-9",
            "status": "ready",
            "paymentMethod": "cod",
            "paymentStatus": "pending",
            "deliveryPartner": { "_id": "dp-3", "name": "Ravi" },
            "totalAmount": "120.50"
        }"#;
        let snapshot: OrderSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.delivery_partner, Some("dp-3".into()));
        assert_eq!(snapshot.total_amount, Decimal::new(12050, 2));

        let bare: OrderSnapshot = serde_json::from_str(
            r#"{"id":"o-1","status":"pending","paymentMethod":"online","paymentStatus":"paid","deliveryPartner":null}"#,
        )
        .unwrap();
        assert_eq!(bare.delivery_partner, None);
        assert_eq!(bare.total_amount, Decimal::ZERO);
    }
}

#[cfg(test)]
mod proptest_tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn status() -> impl Strategy<Value = OrderStatus> {
        prop::sample::select(OrderStatus::ALL.to_vec())
    }

    fn snapshot() -> impl Strategy<Value = OrderSnapshot> {
        (
            status(),
            prop::sample::select(vec![PaymentMethod::Cod, PaymentMethod::Online, PaymentMethod::Wallet]),
            prop::sample::select(vec![
                PaymentStatus::Pending,
                PaymentStatus::Paid,
                PaymentStatus::Failed,
                PaymentStatus::Refunded,
            ]),
            any::<bool>(),
        )
            .prop_map(|(status, payment_method, payment_status, assigned)| OrderSnapshot {
                id: "o-p".into(),
                order_number: None,
                status,
                payment_method,
                payment_status,
                delivery_partner: assigned.then(|| "dp".into()),
                total_amount: Decimal::ONE,
            })
    }

    proptest! {
        #[test]
        fn allowed_implies_table_and_guards(order in snapshot(), target in status()) {
            let decision = evaluate(&order, &TransitionIntent::to(target));
            if decision.is_allowed() {
                prop_assert!(order.status.can_transition_to(target));
                prop_assert!(target != OrderStatus::Cancelled);
                if target == OrderStatus::OutForDelivery {
                    prop_assert!(order.delivery_partner.is_some());
                }
                if target == OrderStatus::Delivered {
                    prop_assert!(!(order.payment_method == PaymentMethod::Cod
                        && order.payment_status == PaymentStatus::Pending));
                }
            }
        }

        #[test]
        fn rejected_command_leaves_state_unchanged(order in snapshot(), target in status()) {
            let aggregate = OrderFulfillment::new(order);
            let before = aggregate.clone();
            let _ = aggregate.handle(&OrderCommand::ChangeStatus(TransitionIntent::to(target)));
            prop_assert_eq!(aggregate, before);
        }

        #[test]
        fn terminal_orders_offer_nothing(order in snapshot()) {
            let aggregate = OrderFulfillment::new(order.clone());
            if order.status.is_terminal() {
                prop_assert!(aggregate.available_actions().is_empty());
            }
        }
    }
}
