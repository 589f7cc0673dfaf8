pub mod api;
pub mod builder;
mod config;
pub mod manual;

use log::{debug, info, warn};

use std::collections::HashSet;

pub use crate::api::*;
pub use crate::config::*;

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
struct CommitteeIdx(usize);

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
struct CountryIdx(usize);

// Remaining seats, in the order of the committees of the roster.
// Over-booked committees have a negative count.
#[derive(Eq, PartialEq, Debug, Clone)]
struct SeatTracker {
    remaining: Vec<i64>,
}

impl SeatTracker {
    fn new(roster: &Roster, default_seats: u32) -> SeatTracker {
        let remaining = roster
            .committees
            .iter()
            .map(|c| c.capacity(default_seats) as i64 - roster.assigned_count(&c.id) as i64)
            .collect();
        SeatTracker { remaining }
    }

    /// Takes a seat in the first preferred committee that still has one.
    /// Abbreviations that do not match any committee are skipped.
    fn take_preferred(
        &mut self,
        preferences: &[String],
        committees: &[Committee],
    ) -> Option<CommitteeIdx> {
        for abbr in preferences.iter() {
            let idx = match committees.iter().position(|c| c.abbr == *abbr) {
                Some(idx) => idx,
                None => {
                    debug!("take_preferred: unknown committee abbreviation {:?}", abbr);
                    continue;
                }
            };
            if self.remaining[idx] > 0 {
                self.remaining[idx] -= 1;
                return Some(CommitteeIdx(idx));
            }
        }
        None
    }

    /// Takes a seat in the first committee that still has one.
    fn take_any(&mut self) -> Option<CommitteeIdx> {
        let idx = self.remaining.iter().position(|r| *r > 0)?;
        self.remaining[idx] -= 1;
        Some(CommitteeIdx(idx))
    }

    fn release(&mut self, cidx: CommitteeIdx) {
        self.remaining[cidx.0] += 1;
    }
}

// Availability of the countries, in the order of the roster.
#[derive(Eq, PartialEq, Debug, Clone)]
struct CountryPool {
    available: Vec<bool>,
}

impl CountryPool {
    fn new(roster: &Roster) -> CountryPool {
        let held: HashSet<&str> = roster.delegates.iter().filter_map(|d| d.country()).collect();
        let available = roster
            .countries
            .iter()
            .map(|c| !held.contains(c.id.as_str()))
            .collect();
        CountryPool { available }
    }

    fn take(
        &mut self,
        countries: &[Country],
        mun_experience: u32,
        policy: CountryPolicy,
    ) -> Option<CountryIdx> {
        let eligible = match policy {
            CountryPolicy::ExperienceTiers => {
                let tiers = Tier::eligible_for(mun_experience);
                self.first_available(countries, |c| tiers.contains(&c.tier))
            }
            CountryPolicy::FirstAvailable => None,
        };
        let idx = eligible.or_else(|| self.first_available(countries, |_| true))?;
        self.available[idx] = false;
        Some(CountryIdx(idx))
    }

    fn first_available<F>(&self, countries: &[Country], accept: F) -> Option<usize>
    where
        F: Fn(&Country) -> bool,
    {
        countries
            .iter()
            .enumerate()
            .find(|(idx, c)| self.available[*idx] && accept(*c))
            .map(|(idx, _)| idx)
    }

    fn release(&mut self, cidx: CountryIdx) {
        self.available[cidx.0] = true;
    }
}

/// Checks that the roster can be processed: all the ids are present and unique,
/// and no delegate lists too many preferences.
pub fn validate_roster(roster: &Roster) -> Result<(), AllocationErrors> {
    check_ids("delegate", roster.delegates.iter().map(|d| d.id.as_str()))?;
    check_ids("committee", roster.committees.iter().map(|c| c.id.as_str()))?;
    check_ids("country", roster.countries.iter().map(|c| c.id.as_str()))?;
    for d in roster.delegates.iter() {
        if d.preferred_committees.len() > MAX_PREFERENCES {
            return Err(AllocationErrors::TooManyPreferences {
                delegate_id: d.id.clone(),
                count: d.preferred_committees.len(),
            });
        }
    }
    Ok(())
}

fn check_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), AllocationErrors> {
    let mut seen: HashSet<&str> = HashSet::new();
    for id in ids {
        if id.is_empty() {
            return Err(AllocationErrors::EmptyId { kind });
        }
        if !seen.insert(id) {
            return Err(AllocationErrors::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}

/// Runs one allocation pass over the roster.
///
/// Arguments:
/// * `roster` the complete roster of the event. Delegates that get assigned are
/// updated in place, after the assignment API accepted them.
/// * `rules` the rules of this run
/// * `api` receives one call per delegate that could be placed, in priority order
///
/// Failures of individual delegates are collected in the result. An error is only
/// returned for a malformed roster, in which case no call has been made.
pub fn run_allocation<A: AssignmentApi>(
    roster: &mut Roster,
    rules: &AllocationRules,
    api: &mut A,
) -> Result<AllocationResult, AllocationErrors> {
    validate_roster(roster)?;

    let mut candidates: Vec<usize> = roster
        .delegates
        .iter()
        .enumerate()
        .filter(|(_, d)| d.is_candidate())
        .map(|(idx, _)| idx)
        .collect();
    info!(
        "run_allocation: {} candidates out of {} delegates, {} committees, {} countries",
        candidates.len(),
        roster.delegates.len(),
        roster.committees.len(),
        roster.countries.len()
    );

    if candidates.is_empty() {
        return Ok(AllocationResult {
            outcome: AllocationOutcome::NothingToAllocate,
            candidates: 0,
            assignments: Vec::new(),
            failures: Vec::new(),
        });
    }

    let mut seats = SeatTracker::new(roster, rules.default_seats);
    let mut countries = CountryPool::new(roster);
    debug!("run_allocation: remaining seats: {:?}", seats.remaining);

    // Most experienced first. The sort is stable, ties keep the roster order.
    candidates.sort_by(|a, b| {
        let ea = roster.delegates[*a].mun_experience;
        let eb = roster.delegates[*b].mun_experience;
        eb.cmp(&ea)
    });

    let num_candidates = candidates.len();
    let mut assignments: Vec<Assignment> = Vec::new();
    let mut failures: Vec<DelegateFailure> = Vec::new();

    for d_idx in candidates {
        let delegate = &roster.delegates[d_idx];
        let delegate_id = delegate.id.clone();
        let mun_experience = delegate.mun_experience;

        let committee_idx = match seats
            .take_preferred(&delegate.preferred_committees, &roster.committees)
            .or_else(|| seats.take_any())
        {
            Some(cidx) => cidx,
            None => {
                warn!("run_allocation: no seat left for delegate {}", delegate_id);
                failures.push(DelegateFailure {
                    delegate_id,
                    reason: FailureReason::NoCapacity,
                });
                continue;
            }
        };

        let country_idx = if rules.assign_country {
            countries.take(&roster.countries, mun_experience, rules.country_policy)
        } else {
            None
        };

        let committee_id = roster.committees[committee_idx.0].id.clone();
        let country_id = country_idx.map(|cidx| roster.countries[cidx.0].id.clone());
        debug!(
            "run_allocation: delegate {} (experience {}) -> committee {} country {:?}",
            delegate_id, mun_experience, committee_id, country_id
        );

        match api.assign(&delegate_id, &committee_id, country_id.as_deref()) {
            Ok(()) => {
                let d = &mut roster.delegates[d_idx];
                d.assigned_committee = Some(committee_id.clone());
                if country_id.is_some() {
                    d.assigned_country = country_id.clone();
                }
                assignments.push(Assignment {
                    delegate_id,
                    committee_id,
                    country_id,
                });
            }
            Err(e) => {
                warn!(
                    "run_allocation: assignment of delegate {} rejected: {}",
                    delegate_id, e
                );
                if rules.release_on_failure {
                    seats.release(committee_idx);
                    if let Some(cidx) = country_idx {
                        countries.release(cidx);
                    }
                }
                failures.push(DelegateFailure {
                    delegate_id,
                    reason: FailureReason::AssignmentRejected(e.to_string()),
                });
            }
        }
    }

    let outcome = if assignments.is_empty() {
        AllocationOutcome::AllFailed
    } else {
        AllocationOutcome::Completed
    };
    info!(
        "run_allocation: {} allocated, {} failed",
        assignments.len(),
        failures.len()
    );
    Ok(AllocationResult {
        outcome,
        candidates: num_candidates,
        assignments,
        failures,
    })
}

/// Allocates the delegates of an event, end to end.
///
/// The roster is fetched from the store, allocated, and fetched again so that the
/// returned roster reflects the authoritative state. If that last fetch fails, the
/// result is still returned, along with the roster as updated by the run. The
/// notifier receives the messages meant for the organiser.
pub fn allocate_event<S, A, N>(
    event_id: &str,
    rules: &AllocationRules,
    store: &S,
    api: &mut A,
    notifier: &mut N,
) -> Result<(AllocationResult, Roster), AllocationErrors>
where
    S: RosterStore,
    A: AssignmentApi,
    N: Notifier,
{
    let mut roster = fetch_roster(event_id, store, notifier)?;
    let result = match run_allocation(&mut roster, rules, api) {
        Ok(r) => r,
        Err(e) => {
            notifier.notify(NoticeLevel::Error, &format!("Allocation failed: {}", e));
            return Err(e);
        }
    };

    if result.outcome == AllocationOutcome::NothingToAllocate {
        notifier.notify(NoticeLevel::Info, "No eligible delegates to allocate");
        return Ok((result, roster));
    }

    for f in result.failures.iter() {
        if let FailureReason::AssignmentRejected(msg) = &f.reason {
            notifier.notify(
                NoticeLevel::Error,
                &format!("Could not assign delegate {}: {}", f.delegate_id, msg),
            );
        }
    }

    if result.success_count() > 0 {
        notifier.notify(
            NoticeLevel::Success,
            &format!("Allocated {} delegates", result.success_count()),
        );
    }
    if result.error_count() > 0 {
        let msg = if result.outcome == AllocationOutcome::AllFailed {
            format!("Failed to allocate all {} delegates", result.error_count())
        } else {
            format!("Failed to allocate {} delegates", result.error_count())
        };
        notifier.notify(NoticeLevel::Error, &msg);
    }

    // The assignments are already persisted: a failed refresh keeps the local view.
    match store.refresh(event_id) {
        Ok(refreshed) => Ok((result, refreshed)),
        Err(e) => {
            warn!("allocate_event: refresh after the run failed: {}", e);
            notifier.notify(
                NoticeLevel::Error,
                &format!("Could not refresh the roster: {}", e),
            );
            Ok((result, roster))
        }
    }
}

fn fetch_roster<S: RosterStore, N: Notifier>(
    event_id: &str,
    store: &S,
    notifier: &mut N,
) -> Result<Roster, AllocationErrors> {
    store.refresh(event_id).map_err(|e| {
        let err = AllocationErrors::RosterUnavailable(e.to_string());
        notifier.notify(NoticeLevel::Error, &format!("Allocation failed: {}", err));
        err
    })
}

/// Releases the delegates that hold a committee or a country.
///
/// Locked delegates are kept. If `committee_id` is given, only the delegates of
/// that committee are released.
pub fn reset_allocations<A: AssignmentApi>(
    roster: &mut Roster,
    committee_id: Option<&str>,
    api: &mut A,
) -> ResetResult {
    let targets: Vec<usize> = roster
        .delegates
        .iter()
        .enumerate()
        .filter(|(_, d)| !d.is_locked && (d.committee().is_some() || d.country().is_some()))
        .filter(|(_, d)| committee_id.is_none() || d.committee() == committee_id)
        .map(|(idx, _)| idx)
        .collect();
    info!(
        "reset_allocations: releasing {} delegates (committee filter: {:?})",
        targets.len(),
        committee_id
    );

    let mut released: Vec<String> = Vec::new();
    let mut failures: Vec<DelegateFailure> = Vec::new();
    for d_idx in targets {
        let d = &mut roster.delegates[d_idx];
        match api.unassign(&d.id) {
            Ok(()) => {
                d.assigned_committee = None;
                d.assigned_country = None;
                released.push(d.id.clone());
            }
            Err(e) => {
                warn!("reset_allocations: could not release {}: {}", d.id, e);
                failures.push(DelegateFailure {
                    delegate_id: d.id.clone(),
                    reason: FailureReason::AssignmentRejected(e.to_string()),
                });
            }
        }
    }
    ResetResult { released, failures }
}

/// The seat usage of every committee, in roster order.
pub fn committee_fill(roster: &Roster, default_seats: u32) -> Vec<CommitteeFill> {
    roster
        .committees
        .iter()
        .map(|c| CommitteeFill {
            committee_id: c.id.clone(),
            abbr: c.abbr.clone(),
            seats: c.capacity(default_seats),
            assigned: roster.assigned_count(&c.id),
        })
        .collect()
}
