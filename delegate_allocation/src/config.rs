// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// Seat capacity used for committees that do not declare a (non-zero) number of seats.
pub const DEFAULT_SEATS: u32 = 50;

/// The maximum number of committee preferences a delegate may state.
pub const MAX_PREFERENCES: usize = 3;

/// The eligibility class of a country.
///
/// Higher tiers are reserved for more experienced delegates.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd, Default)]
pub enum Tier {
    S,
    A,
    #[default]
    B,
}

impl Tier {
    const ALL: [Tier; 3] = [Tier::S, Tier::A, Tier::B];
    const EXPERIENCED: [Tier; 2] = [Tier::A, Tier::B];
    const NOVICE: [Tier; 1] = [Tier::B];

    /// The tiers a delegate with the given experience may be assigned.
    pub fn eligible_for(mun_experience: u32) -> &'static [Tier] {
        match mun_experience {
            x if x >= 3 => &Tier::ALL,
            x if x >= 1 => &Tier::EXPERIENCED,
            _ => &Tier::NOVICE,
        }
    }

    pub fn parse(s: &str) -> Option<Tier> {
        match s.trim() {
            "S" | "s" => Some(Tier::S),
            "A" | "a" => Some(Tier::A),
            "B" | "b" | "" => Some(Tier::B),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::S => "S",
            Tier::A => "A",
            Tier::B => "B",
        }
    }
}

/// A delegate registration, as seen by the allocation engine.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Delegate {
    pub id: String,
    /// Display name taken from the user profile, if any.
    pub name: Option<String>,
    pub mun_experience: u32,
    /// Committee abbreviations, most preferred first.
    pub preferred_committees: Vec<String>,
    /// The id of the committee this delegate sits in.
    pub assigned_committee: Option<String>,
    /// The id of the country this delegate represents.
    pub assigned_country: Option<String>,
    /// Locked delegates were placed by hand and are never touched by a bulk run.
    pub is_locked: bool,
}

impl Delegate {
    pub fn new(id: &str, mun_experience: u32, preferred_committees: &[&str]) -> Delegate {
        Delegate {
            id: id.to_string(),
            name: None,
            mun_experience,
            preferred_committees: preferred_committees.iter().map(|s| s.to_string()).collect(),
            assigned_committee: None,
            assigned_country: None,
            is_locked: false,
        }
    }

    /// The assigned committee, treating an empty reference as unassigned.
    pub fn committee(&self) -> Option<&str> {
        self.assigned_committee.as_deref().filter(|s| !s.is_empty())
    }

    /// The assigned country, treating an empty reference as unassigned.
    pub fn country(&self) -> Option<&str> {
        self.assigned_country.as_deref().filter(|s| !s.is_empty())
    }

    /// True if a bulk run may assign this delegate.
    pub fn is_candidate(&self) -> bool {
        !self.is_locked && self.committee().is_none()
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Committee {
    pub id: String,
    /// Short display code, referenced by the delegate preferences.
    pub abbr: String,
    pub seats: Option<u32>,
}

impl Committee {
    pub fn new(id: &str, abbr: &str, seats: Option<u32>) -> Committee {
        Committee {
            id: id.to_string(),
            abbr: abbr.to_string(),
            seats,
        }
    }

    /// The seat capacity, with the default applied to missing or zero values.
    pub fn capacity(&self, default_seats: u32) -> u32 {
        match self.seats {
            Some(x) if x > 0 => x,
            _ => default_seats,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Country {
    pub id: String,
    pub name: Option<String>,
    pub tier: Tier,
}

impl Country {
    pub fn new(id: &str, tier: Tier) -> Country {
        Country {
            id: id.to_string(),
            name: None,
            tier,
        }
    }
}

/// A snapshot of everything the engine needs to know about one event.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct Roster {
    pub delegates: Vec<Delegate>,
    pub committees: Vec<Committee>,
    pub countries: Vec<Country>,
}

impl Roster {
    pub fn delegate(&self, id: &str) -> Option<&Delegate> {
        self.delegates.iter().find(|d| d.id == id)
    }

    pub fn delegate_mut(&mut self, id: &str) -> Option<&mut Delegate> {
        self.delegates.iter_mut().find(|d| d.id == id)
    }

    pub fn committee(&self, id: &str) -> Option<&Committee> {
        self.committees.iter().find(|c| c.id == id)
    }

    pub fn country(&self, id: &str) -> Option<&Country> {
        self.countries.iter().find(|c| c.id == id)
    }

    /// Number of delegates currently sitting in the given committee.
    pub fn assigned_count(&self, committee_id: &str) -> usize {
        self.delegates
            .iter()
            .filter(|d| d.committee() == Some(committee_id))
            .count()
    }

    /// The delegate holding the given country, if any.
    pub fn country_holder(&self, country_id: &str) -> Option<&Delegate> {
        self.delegates
            .iter()
            .find(|d| d.country() == Some(country_id))
    }
}

// ******** Output data structures *********

/// One assignment that was accepted by the assignment API.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Assignment {
    pub delegate_id: String,
    pub committee_id: String,
    pub country_id: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum FailureReason {
    /// No committee had a free seat when this delegate came up.
    NoCapacity,
    /// The assignment API refused the call.
    AssignmentRejected(String),
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::NoCapacity => write!(f, "no committee has a free seat"),
            FailureReason::AssignmentRejected(msg) => write!(f, "assignment rejected: {}", msg),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DelegateFailure {
    pub delegate_id: String,
    pub reason: FailureReason,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AllocationOutcome {
    /// Every delegate was either locked or already assigned.
    NothingToAllocate,
    /// At least one delegate was allocated.
    Completed,
    /// There were candidates, and every one of them failed.
    AllFailed,
}

impl AllocationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationOutcome::NothingToAllocate => "nothingToAllocate",
            AllocationOutcome::Completed => "completed",
            AllocationOutcome::AllFailed => "allFailed",
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AllocationResult {
    pub outcome: AllocationOutcome,
    /// The number of delegates that entered the run.
    pub candidates: usize,
    /// Accepted assignments, in processing order.
    pub assignments: Vec<Assignment>,
    /// Failed delegates, in processing order.
    pub failures: Vec<DelegateFailure>,
}

impl AllocationResult {
    pub fn success_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn error_count(&self) -> usize {
        self.failures.len()
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResetResult {
    pub released: Vec<String>,
    pub failures: Vec<DelegateFailure>,
}

/// Seat usage of one committee.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CommitteeFill {
    pub committee_id: String,
    pub abbr: String,
    pub seats: u32,
    pub assigned: usize,
}

impl CommitteeFill {
    /// Free seats; zero for over-booked committees.
    pub fn remaining(&self) -> usize {
        (self.seats as usize).saturating_sub(self.assigned)
    }
}

/// Errors that abort a run before any delegate is processed.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AllocationErrors {
    EmptyId { kind: &'static str },
    DuplicateId { kind: &'static str, id: String },
    TooManyPreferences { delegate_id: String, count: usize },
    RosterUnavailable(String),
}

impl Error for AllocationErrors {}

impl Display for AllocationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationErrors::EmptyId { kind } => write!(f, "a {} has an empty id", kind),
            AllocationErrors::DuplicateId { kind, id } => {
                write!(f, "duplicate {} id {:?}", kind, id)
            }
            AllocationErrors::TooManyPreferences { delegate_id, count } => write!(
                f,
                "delegate {:?} lists {} committee preferences (at most {} allowed)",
                delegate_id, count, MAX_PREFERENCES
            ),
            AllocationErrors::RosterUnavailable(msg) => write!(f, "roster unavailable: {}", msg),
        }
    }
}

// ********* Configuration **********

/// How countries are picked when countries are assigned along with committees.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CountryPolicy {
    /// Countries are gated by the experience tier of the delegate, falling back to
    /// any available country.
    ExperienceTiers,
    /// The first available country, regardless of tier.
    FirstAvailable,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct AllocationRules {
    /// Assign a country in the same pass as the committee.
    pub assign_country: bool,
    pub country_policy: CountryPolicy,
    pub default_seats: u32,
    /// Give back the seat and the country picked for a delegate when the
    /// assignment call fails. Off by default: the seat is lost for the rest of the run.
    pub release_on_failure: bool,
}

impl AllocationRules {
    /// Committee only, as done from the committee allocation screen.
    pub const COMMITTEE_ONLY: AllocationRules = AllocationRules {
        assign_country: false,
        country_policy: CountryPolicy::ExperienceTiers,
        default_seats: DEFAULT_SEATS,
        release_on_failure: false,
    };

    /// Committee and country, as done from the global allocation screen.
    pub const GLOBAL: AllocationRules = AllocationRules {
        assign_country: true,
        country_policy: CountryPolicy::ExperienceTiers,
        default_seats: DEFAULT_SEATS,
        release_on_failure: false,
    };
}
