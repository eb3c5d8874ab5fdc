use std::collections::HashMap;
use std::time::{Duration, Instant};

use poise::serenity_prelude::{ButtonStyle, CreateButton, UserId};

/// Identifier of the close button posted in every ticket thread.
pub const CLOSE_BUTTON_ID: &str = "ticket_close";

/// Repeat open attempts inside this window are rejected.
pub const CREATE_COOLDOWN: Duration = Duration::from_millis(3000);

/// The three ticket categories offered on the panel. Button identifiers,
/// labels and thread prefixes are fixed at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TicketKind {
    Support,
    PlayerReport,
    BugReport,
}

impl TicketKind {
    pub const ALL: [TicketKind; 3] = [
        TicketKind::Support,
        TicketKind::PlayerReport,
        TicketKind::BugReport,
    ];

    /// Maps a component identifier back to its category; the close
    /// button and foreign components map to nothing.
    pub fn from_custom_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.custom_id() == id)
    }

    pub fn custom_id(self) -> &'static str {
        match self {
            TicketKind::Support => "ticket_support",
            TicketKind::PlayerReport => "ticket_playerreport",
            TicketKind::BugReport => "ticket_bugreport",
        }
    }

    /// Name shown in embeds and in the ticket log.
    pub fn display_name(self) -> &'static str {
        match self {
            TicketKind::Support => "Support",
            TicketKind::PlayerReport => "Player Report",
            TicketKind::BugReport => "Bug Report",
        }
    }

    /// Short label prefixed to the thread name.
    pub fn prefix(self) -> &'static str {
        match self {
            TicketKind::Support => "support",
            TicketKind::PlayerReport => "report",
            TicketKind::BugReport => "bug",
        }
    }

    fn button_label(self) -> &'static str {
        match self {
            TicketKind::Support => "Support",
            TicketKind::PlayerReport => "Report",
            TicketKind::BugReport => "Bug",
        }
    }

    fn emoji(self) -> char {
        match self {
            TicketKind::Support => '🧰',
            TicketKind::PlayerReport => '🚨',
            TicketKind::BugReport => '🐞',
        }
    }

    fn style(self) -> ButtonStyle {
        match self {
            TicketKind::Support => ButtonStyle::Primary,
            TicketKind::PlayerReport => ButtonStyle::Danger,
            TicketKind::BugReport => ButtonStyle::Success,
        }
    }

    /// Panel button for this category.
    pub fn button(self) -> CreateButton {
        CreateButton::new(self.custom_id())
            .label(self.button_label())
            .style(self.style())
            .emoji(self.emoji())
    }

    /// Thread name for a ticket opened by `username`.
    pub fn thread_name(self, username: &str) -> String {
        format!("{}-{}", self.prefix(), sanitize_username(username))
    }
}

/// Lowercases and strips everything outside `[a-z0-9]` so the result is
/// safe inside a thread name.
pub fn sanitize_username(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Per-user gate against button mashing. A rejected attempt does not
/// refresh the stored timestamp, so the window always counts from the
/// last accepted attempt. Entries are kept for the process lifetime.
#[derive(Debug, Default)]
pub struct CooldownGate {
    last_attempt: HashMap<UserId, Instant>,
}

impl CooldownGate {
    /// Records `now` and returns true when the user may open a ticket,
    /// false while the previous attempt is still inside the window.
    pub fn try_acquire(&mut self, user: UserId, now: Instant) -> bool {
        if let Some(last) = self.last_attempt.get(&user) {
            if now.duration_since(*last) < CREATE_COOLDOWN {
                return false;
            }
        }

        self.last_attempt.insert(user, now);
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sanitizes_usernames() {
        assert_eq!(sanitize_username("Jean-Michel_42"), "jeanmichel42");
        assert_eq!(sanitize_username("  A B C  "), "abc");
        assert_eq!(sanitize_username("héllo wörld"), "hllowrld");
        assert_eq!(sanitize_username("!!!"), "");
    }

    #[test]
    fn derives_the_thread_name_from_the_prefix() {
        assert_eq!(
            TicketKind::PlayerReport.thread_name("Bad.Guy#99"),
            "report-badguy99"
        );
        assert_eq!(TicketKind::Support.thread_name(""), "support-");
    }

    #[test]
    fn maps_custom_ids_to_kinds() {
        for kind in TicketKind::ALL {
            assert_eq!(TicketKind::from_custom_id(kind.custom_id()), Some(kind));
        }

        assert_eq!(TicketKind::from_custom_id(CLOSE_BUTTON_ID), None);
        assert_eq!(TicketKind::from_custom_id("ticket_vip"), None);
    }

    #[test]
    fn first_attempt_passes_the_gate() {
        let mut gate = CooldownGate::default();

        assert!(gate.try_acquire(UserId::new(1), Instant::now()));
    }

    #[test]
    fn a_repeat_attempt_inside_the_window_is_rejected() {
        let mut gate = CooldownGate::default();
        let t0 = Instant::now();

        assert!(gate.try_acquire(UserId::new(1), t0));
        assert!(!gate.try_acquire(UserId::new(1), t0 + Duration::from_millis(2999)));
    }

    #[test]
    fn the_gate_reopens_after_the_window() {
        let mut gate = CooldownGate::default();
        let t0 = Instant::now();

        assert!(gate.try_acquire(UserId::new(1), t0));
        assert!(gate.try_acquire(UserId::new(1), t0 + CREATE_COOLDOWN));
    }

    #[test]
    fn a_rejection_does_not_extend_the_window() {
        let mut gate = CooldownGate::default();
        let t0 = Instant::now();

        assert!(gate.try_acquire(UserId::new(1), t0));
        // hammering the button half-way through the window...
        assert!(!gate.try_acquire(UserId::new(1), t0 + Duration::from_millis(1500)));
        // ...does not push back the moment the gate reopens
        assert!(gate.try_acquire(UserId::new(1), t0 + Duration::from_millis(3000)));
    }

    #[test]
    fn users_are_gated_independently() {
        let mut gate = CooldownGate::default();
        let t0 = Instant::now();

        assert!(gate.try_acquire(UserId::new(1), t0));
        assert!(gate.try_acquire(UserId::new(2), t0 + Duration::from_millis(1)));
        assert!(!gate.try_acquire(UserId::new(1), t0 + Duration::from_millis(2)));
    }
}
