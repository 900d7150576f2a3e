use std::fmt;

/// Every text the status line can show.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    AlignFace,
    MoveLeft,
    MoveRight,
    Centered,
    Capturing,
    Saved,
    SaveFailed,
}

impl Status {
    pub const ALL: &[Status] = &[
        Status::AlignFace,
        Status::MoveLeft,
        Status::MoveRight,
        Status::Centered,
        Status::Capturing,
        Status::Saved,
        Status::SaveFailed,
    ];

    pub fn text(self) -> &'static str {
        match self {
            Status::AlignFace => "Align face in center",
            Status::MoveLeft => "Move left",
            Status::MoveRight => "Move right",
            Status::Centered => "Centered \u{2713}",
            Status::Capturing => "Capturing...",
            Status::Saved => "Saved \u{2713}",
            Status::SaveFailed => "Save failed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Receives status updates destined for the UI.
///
/// Called from the analysis thread; implementations hand the update to the
/// UI's own thread and must never block the caller.
pub trait StatusSink: Send {
    fn publish(&self, status: Status);
}
