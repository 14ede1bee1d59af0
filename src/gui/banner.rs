use std::time::{Duration, Instant};

/// How long a failed connection attempt stays on screen.
pub const CONNECTION_BANNER_TTL: Duration = Duration::from_millis(5000);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum BannerKind {
    #[default]
    Neutral,
    Success,
    Danger,
}

/// Dismissible status banner. `Neutral` means nothing is shown.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Banner {
    kind: BannerKind,
    message: String,
    expires_at: Option<Instant>,
}

impl Banner {
    /// Show until dismissed.
    pub fn show(&mut self, kind: BannerKind, message: impl Into<String>) {
        self.kind = kind;
        self.message = message.into();
        self.expires_at = None;
    }

    /// Show, then fall back to neutral after `ttl`.
    pub fn show_for(&mut self, kind: BannerKind, message: impl Into<String>, now: Instant, ttl: Duration) {
        self.show(kind, message);
        self.expires_at = Some(now + ttl);
    }

    pub fn dismiss(&mut self) {
        self.kind = BannerKind::Neutral;
        self.expires_at = None;
    }

    /// Expire a timed banner. Returns true if this call cleared it.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.expires_at {
            Some(t) if now >= t => {
                self.dismiss();
                true
            }
            _ => false,
        }
    }

    pub fn is_visible(&self) -> bool { self.kind != BannerKind::Neutral }
    pub fn kind(&self) -> BannerKind { self.kind }
    pub fn message(&self) -> &str { &self.message }
    pub fn expires_at(&self) -> Option<Instant> { self.expires_at }
}
