use chrono::{DateTime, Utc};

/// A domain-agnostic event.
///
/// Events are immutable facts. `event_type` names are stable and dotted
/// (e.g. "orders.order.status_adopted").
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier.
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
