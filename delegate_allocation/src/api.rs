/*!
The collaborators of the allocation engine.

The engine does not own any state: it reads a [`Roster`] snapshot from a
[`RosterStore`], persists each decision through an [`AssignmentApi`] and reports
to a [`Notifier`]. Calls are always made one at a time, and each call returns
before the next delegate is considered.
 */

use std::fmt::{Debug, Display};

use crate::config::Roster;

/// The authoritative source of delegates, committees and countries.
pub trait RosterStore {
    type Error: Display + Debug;

    /// Fetches a fresh snapshot of the roster of an event.
    fn refresh(&self, event_id: &str) -> Result<Roster, Self::Error>;
}

/// Persists assignments. Both calls are safe to repeat.
pub trait AssignmentApi {
    type Error: Display + Debug;

    fn assign(
        &mut self,
        delegate_id: &str,
        committee_id: &str,
        country_id: Option<&str>,
    ) -> Result<(), Self::Error>;

    /// Clears both the committee and the country of a delegate.
    fn unassign(&mut self, delegate_id: &str) -> Result<(), Self::Error>;
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeLevel::Success => "success",
            NoticeLevel::Info => "info",
            NoticeLevel::Error => "error",
        }
    }
}

/// Receives human-readable messages. Purely advisory.
pub trait Notifier {
    fn notify(&mut self, level: NoticeLevel, message: &str);
}

/// A notifier that drops every message.
pub struct Silent;

impl Notifier for Silent {
    fn notify(&mut self, _level: NoticeLevel, _message: &str) {}
}
