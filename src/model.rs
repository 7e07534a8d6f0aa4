// Shared UI model used by state, input handling, and rendering.
// - Focus targets (download form vs. activity log).
// - Form fields in Tab order, with their labels and editing kind.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Form,
    Log,
}

impl Focus {
    pub fn toggled(self) -> Self {
        match self {
            Self::Form => Self::Log,
            Self::Log => Self::Form,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Url,
    Destination,
    Mode,
    Quality,
    AudioFormat,
    Bitrate,
}

impl InputField {
    pub const ALL: [Self; 6] = [
        Self::Url,
        Self::Destination,
        Self::Mode,
        Self::Quality,
        Self::AudioFormat,
        Self::Bitrate,
    ];

    pub fn next(self) -> Self {
        let position = self.position();
        Self::ALL[(position + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let position = self.position();
        Self::ALL[(position + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Url => "URL",
            Self::Destination => "Save to",
            Self::Mode => "Mode",
            Self::Quality => "Quality",
            Self::AudioFormat => "Convert",
            Self::Bitrate => "Bitrate",
        }
    }

    /// Free-text fields take typed characters; the rest are selectors
    /// cycled with Left/Right.
    pub fn is_text(self) -> bool {
        matches!(self, Self::Url | Self::Destination)
    }

    fn position(self) -> usize {
        Self::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0)
    }
}
