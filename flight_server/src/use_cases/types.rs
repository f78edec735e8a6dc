// Use-case level inputs for the tick loop.

use crate::domain::ControlUpdate;
use crate::use_cases::broadcast::TelemetrySink;
use tokio::sync::oneshot;

/// Everything the network boundary can ask of the tick loop.
pub enum SimEvent {
    /// Partial control message, already parsed; clamped when staged.
    Controls(ControlUpdate),
    Subscribe {
        subscriber_id: u64,
        sink: Box<dyn TelemetrySink>,
    },
    Unsubscribe {
        subscriber_id: u64,
    },
    /// Forced reset; `ack` fires once the reset has been applied.
    Reset { ack: Option<oneshot::Sender<()>> },
}
