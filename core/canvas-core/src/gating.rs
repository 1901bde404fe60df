//! Actor gating: whether a remote command's visible effect takes place.

use canvas_protocol::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    SwitchTab,
    OpenRequestTab,
    OpenCollectionRequest,
    CloseTab,
}

impl CommandKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::SwitchTab => "switch_tab",
            Self::OpenRequestTab => "open_request_tab",
            Self::OpenCollectionRequest => "open_collection_request",
            Self::CloseTab => "close_tab",
        }
    }
}

/// What the canvas does with a command after gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEffect {
    Activate,
    RecordOnly,
    OpenActivated,
    OpenInBackground,
    /// Always applied; closing the active tab activates a neighbour.
    Close,
}

impl GateEffect {
    /// Whether the visible effect the actor asked for took place.
    pub fn applied(self) -> bool {
        !matches!(self, Self::RecordOnly | Self::OpenInBackground)
    }
}

/// Follow AI off suppresses AI switches and keeps AI opens in the
/// background. User commands and closes are never gated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatingPolicy {
    pub follow_ai: bool,
}

impl GatingPolicy {
    pub fn new(follow_ai: bool) -> Self {
        Self { follow_ai }
    }

    pub fn decide(&self, kind: CommandKind, actor: &Actor) -> GateEffect {
        let suppressed = actor.is_ai() && !self.follow_ai;
        match kind {
            CommandKind::SwitchTab if suppressed => GateEffect::RecordOnly,
            CommandKind::SwitchTab => GateEffect::Activate,
            CommandKind::OpenRequestTab | CommandKind::OpenCollectionRequest if suppressed => {
                GateEffect::OpenInBackground
            }
            CommandKind::OpenRequestTab | CommandKind::OpenCollectionRequest => {
                GateEffect::OpenActivated
            }
            CommandKind::CloseTab => GateEffect::Close,
        }
    }
}

impl Default for GatingPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CommandKind; 4] = [
        CommandKind::SwitchTab,
        CommandKind::OpenRequestTab,
        CommandKind::OpenCollectionRequest,
        CommandKind::CloseTab,
    ];

    fn ai() -> Actor {
        Actor::ai(Some("model".into()), Some("session".into()))
    }

    #[test]
    fn user_is_never_gated() {
        let policy = GatingPolicy::new(false);
        for kind in ALL {
            assert!(policy.decide(kind, &Actor::User).applied(), "{}", kind.label());
        }
    }

    #[test]
    fn ai_with_follow_on_matches_user() {
        let policy = GatingPolicy::new(true);
        for kind in ALL {
            assert_eq!(policy.decide(kind, &ai()), policy.decide(kind, &Actor::User));
        }
    }

    #[test]
    fn ai_with_follow_off_is_suppressed_except_close() {
        let policy = GatingPolicy::new(false);
        assert_eq!(
            policy.decide(CommandKind::SwitchTab, &ai()),
            GateEffect::RecordOnly
        );
        assert_eq!(
            policy.decide(CommandKind::OpenRequestTab, &ai()),
            GateEffect::OpenInBackground
        );
        assert_eq!(
            policy.decide(CommandKind::OpenCollectionRequest, &ai()),
            GateEffect::OpenInBackground
        );
        assert_eq!(policy.decide(CommandKind::CloseTab, &ai()), GateEffect::Close);
    }
}
