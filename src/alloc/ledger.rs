//! An in-memory stand-in for the event backend.
//!
//! The [`Ledger`] hands out roster snapshots, and the [`LedgerApi`] it creates writes
//! the assignments back into the same roster. Both share the data, so a refresh after
//! a run sees every accepted assignment.

use std::cell::RefCell;
use std::rc::Rc;

use delegate_allocation::{AssignmentApi, Roster, RosterStore};
use log::debug;
use snafu::{ensure, OptionExt, Snafu};

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum LedgerError {
    #[snafu(display("Unknown event {event_id:?}"))]
    UnknownEvent { event_id: String },
    #[snafu(display("Unknown delegate {delegate_id:?}"))]
    UnknownDelegate { delegate_id: String },
    #[snafu(display("Unknown committee {committee_id:?}"))]
    UnknownCommittee { committee_id: String },
    #[snafu(display("Unknown country {country_id:?}"))]
    UnknownCountry { country_id: String },
    #[snafu(display("Delegate {delegate_id:?} is locked"))]
    DelegateLocked { delegate_id: String },
    #[snafu(display("Country {country_id:?} is already held by {holder:?}"))]
    CountryTaken { country_id: String, holder: String },
}

pub type LedgerResult<T> = Result<T, LedgerError>;

pub struct Ledger {
    event_id: String,
    roster: Rc<RefCell<Roster>>,
}

impl Ledger {
    pub fn new(event_id: &str, roster: Roster) -> Ledger {
        Ledger {
            event_id: event_id.to_string(),
            roster: Rc::new(RefCell::new(roster)),
        }
    }

    /// An assignment API writing into this ledger.
    pub fn api(&self) -> LedgerApi {
        LedgerApi {
            roster: self.roster.clone(),
        }
    }

    pub fn snapshot(&self) -> Roster {
        self.roster.borrow().clone()
    }
}

impl RosterStore for Ledger {
    type Error = LedgerError;

    fn refresh(&self, event_id: &str) -> LedgerResult<Roster> {
        ensure!(
            event_id == self.event_id,
            UnknownEventSnafu { event_id }
        );
        Ok(self.snapshot())
    }
}

pub struct LedgerApi {
    roster: Rc<RefCell<Roster>>,
}

impl AssignmentApi for LedgerApi {
    type Error = LedgerError;

    fn assign(
        &mut self,
        delegate_id: &str,
        committee_id: &str,
        country_id: Option<&str>,
    ) -> LedgerResult<()> {
        let mut roster = self.roster.borrow_mut();
        roster
            .committee(committee_id)
            .context(UnknownCommitteeSnafu { committee_id })?;
        if let Some(cid) = country_id {
            roster
                .country(cid)
                .context(UnknownCountrySnafu { country_id: cid })?;
            if let Some(holder) = roster.country_holder(cid) {
                ensure!(
                    holder.id == delegate_id,
                    CountryTakenSnafu {
                        country_id: cid,
                        holder: holder.id.clone(),
                    }
                );
            }
        }
        let delegate = roster
            .delegate_mut(delegate_id)
            .context(UnknownDelegateSnafu { delegate_id })?;
        ensure!(!delegate.is_locked, DelegateLockedSnafu { delegate_id });
        delegate.assigned_committee = Some(committee_id.to_string());
        if let Some(cid) = country_id {
            delegate.assigned_country = Some(cid.to_string());
        }
        debug!(
            "ledger: assign: {} -> {} {:?}",
            delegate_id, committee_id, country_id
        );
        Ok(())
    }

    fn unassign(&mut self, delegate_id: &str) -> LedgerResult<()> {
        let mut roster = self.roster.borrow_mut();
        let delegate = roster
            .delegate_mut(delegate_id)
            .context(UnknownDelegateSnafu { delegate_id })?;
        ensure!(!delegate.is_locked, DelegateLockedSnafu { delegate_id });
        delegate.assigned_committee = None;
        delegate.assigned_country = None;
        debug!("ledger: unassign: {}", delegate_id);
        Ok(())
    }
}
