use crate::decision::AlarmKind;

/// Receiver for alarm edges raised by the decision engine
///
/// Implementations must not block the frame loop. `raise` returns `true`
/// when the alarm actually started and `false` when it was suppressed,
/// typically because a previous alarm is still sounding.
pub trait AlertSink: Send + Sync {
    fn raise(&self, kind: AlarmKind) -> bool;
}

/// Sink that drops every alarm
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl AlertSink for NullSink {
    fn raise(&self, _kind: AlarmKind) -> bool {
        false
    }
}

impl<T: AlertSink + ?Sized> AlertSink for std::sync::Arc<T> {
    fn raise(&self, kind: AlarmKind) -> bool {
        (**self).raise(kind)
    }
}
