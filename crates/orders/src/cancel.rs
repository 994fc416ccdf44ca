use serde::{Deserialize, Serialize};

use freshcart_core::ValueObject;

/// Enumerated cancellation reasons offered to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    CustomerRequest,
    OutOfStock,
    PaymentFailed,
    DeliveryUnavailable,
    DuplicateOrder,
    /// Free text required.
    Other,
}

impl CancelReason {
    pub fn label(&self) -> &'static str {
        match self {
            CancelReason::CustomerRequest => "Customer requested cancellation",
            CancelReason::OutOfStock => "Items out of stock",
            CancelReason::PaymentFailed => "Payment failed",
            CancelReason::DeliveryUnavailable => "Delivery not available",
            CancelReason::DuplicateOrder => "Duplicate order",
            CancelReason::Other => "Other",
        }
    }
}

/// A complete cancellation reason: the code plus the text sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationReason {
    code: CancelReason,
    text: String,
}

impl ValueObject for CancellationReason {}

impl CancellationReason {
    /// `None` when no reason was picked, or `other` was picked with blank text.
    pub fn new(code: Option<CancelReason>, custom_text: Option<&str>) -> Option<Self> {
        let code = code?;
        let text = match code {
            CancelReason::Other => custom_text.map(str::trim).filter(|t| !t.is_empty())?.to_string(),
            _ => code.label().to_string(),
        };
        Some(Self { code, text })
    }

    pub fn code(&self) -> CancelReason {
        self.code
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerated_reason_uses_label() {
        let r = CancellationReason::new(Some(CancelReason::OutOfStock), None).unwrap();
        assert_eq!(r.text(), "Items out of stock");
    }

    #[test]
    fn other_requires_text() {
        assert!(CancellationReason::new(Some(CancelReason::Other), None).is_none());
        assert!(CancellationReason::new(Some(CancelReason::Other), Some("   ")).is_none());

        let r = CancellationReason::new(Some(CancelReason::Other), Some(" wrong address ")).unwrap();
        assert_eq!(r.code(), CancelReason::Other);
        assert_eq!(r.text(), "wrong address");
    }

    #[test]
    fn missing_reason_is_none() {
        assert!(CancellationReason::new(None, Some("ignored")).is_none());
    }
}
