pub use crate::config::*;

/// A builder for assembling a roster.
///
/// ```
/// use delegate_allocation::builder::Builder;
/// # use delegate_allocation::AllocationErrors;
///
/// let mut builder = Builder::new()
///     .committees(&[("c1", "UNSC", Some(15)), ("c2", "WHO", None)])?;
///
/// builder.add_delegate_simple("d1", 2, &["UNSC".to_string(), "WHO".to_string()])?;
///
/// let roster = builder.build()?;
/// assert_eq!(roster.delegates.len(), 1);
///
/// # Ok::<(), AllocationErrors>(())
/// ```
pub struct Builder {
    pub(crate) _committees: Vec<Committee>,
    pub(crate) _countries: Vec<Country>,
    pub(crate) _delegates: Vec<Delegate>,
}

impl Default for Builder {
    fn default() -> Self {
        Builder::new()
    }
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            _committees: Vec::new(),
            _countries: Vec::new(),
            _delegates: Vec::new(),
        }
    }

    /// Registers the committees, as (id, abbreviation, seats) triples.
    pub fn committees(self, comms: &[(&str, &str, Option<u32>)]) -> Result<Builder, AllocationErrors> {
        let mut committees = self._committees;
        for (id, abbr, seats) in comms {
            committees.push(Committee::new(id, abbr, *seats));
        }
        Ok(Builder {
            _committees: committees,
            _countries: self._countries,
            _delegates: self._delegates,
        })
    }

    /// Registers the countries, as (id, tier) pairs.
    pub fn countries(self, ctrs: &[(&str, Tier)]) -> Result<Builder, AllocationErrors> {
        let mut countries = self._countries;
        for (id, tier) in ctrs {
            countries.push(Country::new(id, *tier));
        }
        Ok(Builder {
            _committees: self._committees,
            _countries: countries,
            _delegates: self._delegates,
        })
    }

    /// Adds an unassigned, unlocked delegate.
    ///
    /// It is the simplest use case for most cases.
    pub fn add_delegate_simple(
        &mut self,
        id: &str,
        mun_experience: u32,
        preferences: &[String],
    ) -> Result<(), AllocationErrors> {
        let prefs: Vec<&str> = preferences.iter().map(|s| s.as_str()).collect();
        self.add_delegate(&Delegate::new(id, mun_experience, &prefs))
    }

    /// Adds a delegate with its current assignment and lock state.
    ///
    /// Empty preferences are dropped. Empty assignment references are stored as unassigned.
    pub fn add_delegate(&mut self, delegate: &Delegate) -> Result<(), AllocationErrors> {
        if delegate.id.is_empty() {
            return Err(AllocationErrors::EmptyId { kind: "delegate" });
        }
        let preferred_committees: Vec<String> = delegate
            .preferred_committees
            .iter()
            .filter(|p| !p.trim().is_empty())
            .cloned()
            .collect();
        if preferred_committees.len() > MAX_PREFERENCES {
            return Err(AllocationErrors::TooManyPreferences {
                delegate_id: delegate.id.clone(),
                count: preferred_committees.len(),
            });
        }
        self._delegates.push(Delegate {
            preferred_committees,
            assigned_committee: delegate.committee().map(|s| s.to_string()),
            assigned_country: delegate.country().map(|s| s.to_string()),
            ..delegate.clone()
        });
        Ok(())
    }

    pub fn build(self) -> Result<Roster, AllocationErrors> {
        let roster = Roster {
            delegates: self._delegates,
            committees: self._committees,
            countries: self._countries,
        };
        crate::validate_roster(&roster)?;
        Ok(roster)
    }
}
