//! Playback control seam between the dispatch loop and the server client.
//!
//! The dispatch loop only needs "perform this action" and "shut down". The
//! MPD client implements this trait; tests substitute
//! [`MockControl`](crate::hal::MockControl).

use core::future::Future;

use crate::commands::Action;

/// Something that can carry out playback actions.
///
/// Implementations own their connection and are driven by exactly one
/// caller, so methods take `&mut self`.
pub trait PlaybackControl {
    /// Error reported for a failed action.
    type Error: core::fmt::Display + Send;

    /// Perform one action, reconnecting internally if the implementation
    /// supports it.
    fn perform(&mut self, action: Action) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Release the connection. Called once after all inputs have stopped.
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send;
}
