//! Change notifications for the presentation layer.

use crate::session::ConnectionState;

/// Receives counter and status changes from a [`crate::ConnectionManager`].
///
/// All methods default to doing nothing, so implementors only override what
/// they render. Callbacks run on the client's driver task and must not block.
///
/// Server `error` messages arrive through [`Self::on_server_error`] only.
/// They never change the connection state and never reach
/// [`Self::on_status_changed`].
pub trait CounterListener: Send + Sync {
    /// The local (per-client) click count changed.
    fn on_local_count_changed(&self, _count: u64) {}

    /// The global click total reported by the server changed.
    fn on_global_count_changed(&self, _count: u64) {}

    /// The connection state changed.
    fn on_status_changed(&self, _state: ConnectionState) {}

    /// The server sent an `error` message.
    fn on_server_error(&self, _message: &str) {}
}

impl CounterListener for () {}

impl<T: CounterListener + ?Sized> CounterListener for std::sync::Arc<T> {
    fn on_local_count_changed(&self, count: u64) {
        (**self).on_local_count_changed(count);
    }

    fn on_global_count_changed(&self, count: u64) {
        (**self).on_global_count_changed(count);
    }

    fn on_status_changed(&self, state: ConnectionState) {
        (**self).on_status_changed(state);
    }

    fn on_server_error(&self, message: &str) {
        (**self).on_server_error(message);
    }
}
