//! External lifecycle triggers.

/// Lifecycle events delivered by the host reading application.
///
/// These are plain signals; position payloads travel through the session
/// tracker API rather than through the trigger itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncTrigger {
    /// The host finished starting up and the document is open.
    Ready,
    /// The reader turned a page (current position already reported).
    PageUpdate,
    /// The device is about to suspend.
    Suspend,
    /// The device woke from suspend.
    Resume,
    /// The current document is closing.
    Close,
    /// The host process is exiting.
    Exit,
}
