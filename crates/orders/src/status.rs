use serde::{Deserialize, Serialize};

/// Order status lifecycle.
///
/// ```text
/// pending → confirmed → preparing → ready → out_for_delivery → delivered
///    └──────────┴───────────┴─────────┴──────────┴──→ cancelled | refunded
/// ```
///
/// `delivered`, `cancelled` and `refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    OutForDelivery,
    Delivered,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// The forward chain, in order.
    pub const FORWARD: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ];

    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded
        )
    }

    /// Position in the forward chain; `None` for the side-states.
    pub fn sequence(&self) -> Option<usize> {
        Self::FORWARD.iter().position(|s| s == self)
    }

    /// The single legal forward step, if any.
    pub fn next(&self) -> Option<OrderStatus> {
        if self.is_terminal() {
            return None;
        }
        self.sequence().and_then(|i| Self::FORWARD.get(i + 1).copied())
    }

    /// Transition table: every status reachable in one step.
    pub fn allowed_transitions(&self) -> Vec<OrderStatus> {
        if self.is_terminal() {
            return Vec::new();
        }
        let mut targets = Vec::with_capacity(3);
        targets.extend(self.next());
        targets.push(OrderStatus::Cancelled);
        targets.push(OrderStatus::Refunded);
        targets
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_transitions().contains(&target)
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Online,
    Wallet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}
