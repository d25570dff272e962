//! Render-ready descriptions shared by the controllers. Nothing here knows
//! about markup; a front end maps tones to its own styling.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Danger,
    Warning,
    Info,
    Success,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerTone {
    Loading,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBanner {
    pub tone: BannerTone,
    pub text: String,
    /// Per-target lines; only broadcast operations fill this.
    pub details: Vec<ResultLine>,
}

impl StatusBanner {
    pub fn loading(text: impl Into<String>) -> Self {
        Self::new(BannerTone::Loading, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(BannerTone::Success, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(BannerTone::Error, text)
    }

    fn new(tone: BannerTone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
            details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<ResultLine>) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLine {
    pub target: String,
    pub succeeded: bool,
    pub message: String,
}

impl ResultLine {
    pub fn text(&self) -> String {
        format!("{}: {}", self.target, self.message)
    }
}
