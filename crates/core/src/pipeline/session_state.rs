use std::fmt;

/// Lifecycle of one detection session.
///
/// ```text
/// Loading ──► Ready ──► PermissionPending ──► Streaming
///    │                        │
///    ▼                        ▼
/// InitFailed           PermissionDenied
/// ```
/// Every state moves to `Disposed` on teardown.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Loading,
    Ready,
    InitFailed,
    PermissionPending,
    PermissionDenied,
    Streaming,
    Disposed,
}

impl SessionState {
    /// No further transitions except teardown.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::InitFailed | SessionState::PermissionDenied | SessionState::Disposed
        )
    }

    pub fn is_error(self) -> bool {
        self == SessionState::InitFailed
    }

    /// The session cannot stream but nothing is broken; the user can fix
    /// it by granting camera access.
    pub fn is_advisory(self) -> bool {
        self == SessionState::PermissionDenied
    }

    /// One-line status shown to the user.
    pub fn status_message(self) -> &'static str {
        match self {
            SessionState::Loading => "Loading model...",
            SessionState::Ready | SessionState::PermissionPending => {
                "Please allow access to the camera."
            }
            SessionState::Streaming => "Point the camera at objects to see them detected.",
            SessionState::InitFailed => "Failed to initialize the object detection model.",
            SessionState::PermissionDenied => {
                "Camera access was not granted. Allow access to the camera and try again."
            }
            SessionState::Disposed => "Stopped.",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Loading => "loading",
            SessionState::Ready => "ready",
            SessionState::InitFailed => "init-failed",
            SessionState::PermissionPending => "permission-pending",
            SessionState::PermissionDenied => "permission-denied",
            SessionState::Streaming => "streaming",
            SessionState::Disposed => "disposed",
        };
        write!(f, "{name}")
    }
}
