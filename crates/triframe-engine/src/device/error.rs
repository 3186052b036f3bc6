use std::fmt;

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}

/// Lifecycle precondition violated on a [`FrameDriver`](crate::core::FrameDriver).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameError {
    /// Device or swap-chain accessed before `initialize` completed.
    NotInitialized,
    /// `initialize` called on a driver that already owns a device.
    AlreadyInitialized,
    /// Operation requested after `dispose`.
    Disposed,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            FrameError::NotInitialized => "frame driver has not been initialized",
            FrameError::AlreadyInitialized => "frame driver is already initialized",
            FrameError::Disposed => "frame driver has been disposed",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for FrameError {}
