use chrono::{DateTime, Utc};

use crate::db::StoreError;

/// Payload-less broadcasts exchanged between the resolver, the background
/// task and the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalAction {
    /// Ask the foreground resolver to fetch fresh times.
    RequestRefresh,
    /// Ask the widget to redraw from the cache.
    RenderWidget,
}

impl SignalAction {
    pub fn name(&self) -> &'static str {
        match self {
            SignalAction::RequestRefresh => "miqat.action.REQUEST_REFRESH",
            SignalAction::RenderWidget => "miqat.action.RENDER_WIDGET",
        }
    }
}

impl std::fmt::Display for SignalAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

pub trait SignalBus: Send + Sync {
    /// Marks `action` as pending. Raising an already pending action only
    /// moves its timestamp.
    fn raise(&self, action: SignalAction) -> Result<(), StoreError>;
    /// Clears a pending action and returns when it was raised.
    fn consume(&self, action: SignalAction) -> Result<Option<DateTime<Utc>>, StoreError>;
}
