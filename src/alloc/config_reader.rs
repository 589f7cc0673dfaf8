use crate::alloc::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct JsonDelegate {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "munExperience")]
    pub mun_experience: Option<JSValue>,
    #[serde(rename = "preferredCommittees", default)]
    pub preferred_committees: Vec<String>,
    #[serde(rename = "assignedCommittees", alias = "assignedCommittee")]
    pub assigned_committees: Option<String>,
    #[serde(rename = "assignedCountry")]
    pub assigned_country: Option<String>,
    #[serde(rename = "isLocked")]
    pub is_locked: Option<bool>,
}

impl JsonDelegate {
    pub fn to_delegate(&self) -> AllocResult<Delegate> {
        let mun_experience = match &self.mun_experience {
            None | Some(JSValue::Null) => 0,
            x => read_js_u32(x)?,
        };
        Ok(Delegate {
            id: self.id.clone(),
            name: self.name.clone(),
            mun_experience,
            preferred_committees: self.preferred_committees.clone(),
            assigned_committee: self.assigned_committees.clone(),
            assigned_country: self.assigned_country.clone(),
            is_locked: self.is_locked.unwrap_or(false),
        })
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct JsonCommittee {
    pub id: String,
    pub abbr: String,
    pub name: Option<String>,
    #[serde(rename = "seats")]
    _seats: Option<JSValue>,
}

impl JsonCommittee {
    /// The declared seats. Missing, empty and zero values all fall back to the default.
    pub fn seats(&self) -> AllocResult<Option<u32>> {
        match &self._seats {
            None | Some(JSValue::Null) => Ok(None),
            Some(JSValue::String(s)) if s.trim().is_empty() => Ok(None),
            x => {
                let n = read_js_u32(x)?;
                Ok(if n == 0 { None } else { Some(n) })
            }
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct JsonCountry {
    pub id: String,
    pub name: Option<String>,
    pub tier: Option<String>,
}

impl JsonCountry {
    pub fn tier(&self) -> AllocResult<Tier> {
        match self.tier.as_deref() {
            None => Ok(Tier::default()),
            Some(s) => match Tier::parse(s) {
                Some(t) => Ok(t),
                None => {
                    whatever!("country {}: unknown tier {:?}", self.id, s)
                }
            },
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct JsonRules {
    #[serde(rename = "assignCountry")]
    pub assign_country: Option<bool>,
    #[serde(rename = "countryPolicy")]
    pub country_policy: Option<String>,
    #[serde(rename = "defaultSeats")]
    pub default_seats: Option<JSValue>,
    #[serde(rename = "releaseOnFailure")]
    pub release_on_failure: Option<bool>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct DelegateSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    #[serde(rename = "idColumnIndex")]
    _id_column_index: Option<JSValue>,
    #[serde(rename = "nameColumnIndex")]
    _name_column_index: Option<JSValue>,
    #[serde(rename = "experienceColumnIndex")]
    _experience_column_index: Option<JSValue>,
    #[serde(rename = "firstPreferenceColumnIndex")]
    _first_preference_column_index: Option<JSValue>,
    #[serde(rename = "firstRowIndex")]
    _first_row_index: Option<JSValue>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
}

impl DelegateSource {
    /// A source given on the command line, with the default layout:
    /// id, experience, then the preferences, below a header row.
    pub fn from_cli(path: &str, provider: Option<&str>, worksheet: Option<&str>) -> DelegateSource {
        DelegateSource {
            provider: provider.unwrap_or("csv").to_string(),
            file_path: path.to_string(),
            _id_column_index: Some(JSValue::from(1)),
            _name_column_index: None,
            _experience_column_index: Some(JSValue::from(2)),
            _first_preference_column_index: Some(JSValue::from(3)),
            _first_row_index: None,
            excel_worksheet_name: worksheet.map(|s| s.to_string()),
        }
    }

    // All the column indexes below are 0-based.

    pub fn id_column_index(&self) -> AllocResult<usize> {
        let x = read_js_int(&self._id_column_index)?;
        Ok(x - 1)
    }

    pub fn name_column_index(&self) -> AllocResult<Option<usize>> {
        read_optional_index(&self._name_column_index)
    }

    pub fn experience_column_index(&self) -> AllocResult<Option<usize>> {
        read_optional_index(&self._experience_column_index)
    }

    pub fn first_preference_column_index(&self) -> AllocResult<Option<usize>> {
        read_optional_index(&self._first_preference_column_index)
    }

    /// The 1-based index of the first row holding a delegate.
    pub fn first_row_index(&self) -> AllocResult<usize> {
        match &self._first_row_index {
            None => Ok(2),
            x => read_js_int(x),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    #[serde(rename = "eventId")]
    pub event_id: String,
    pub rules: Option<JsonRules>,
    pub committees: Vec<JsonCommittee>,
    #[serde(default)]
    pub countries: Vec<JsonCountry>,
    #[serde(default)]
    pub delegates: Vec<JsonDelegate>,
    #[serde(rename = "delegateSources", default)]
    pub delegate_sources: Vec<DelegateSource>,
}

pub fn read_event_config(path: &str) -> AllocResult<EventConfig> {
    let config_str = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: EventConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    info!(
        "read_event_config: event {}: {} committees, {} countries, {} delegates, {} sources",
        config.event_id,
        config.committees.len(),
        config.countries.len(),
        config.delegates.len(),
        config.delegate_sources.len()
    );
    Ok(config)
}

pub fn read_summary(path: String) -> AllocResult<JSValue> {
    let contents = fs::read_to_string(path.clone()).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

pub fn country_policy_name(policy: CountryPolicy) -> &'static str {
    match policy {
        CountryPolicy::ExperienceTiers => "experienceTiers",
        CountryPolicy::FirstAvailable => "firstAvailable",
    }
}

fn parse_country_policy(s: &str) -> AllocResult<CountryPolicy> {
    match s {
        "experienceTiers" => Ok(CountryPolicy::ExperienceTiers),
        "firstAvailable" => Ok(CountryPolicy::FirstAvailable),
        x => {
            whatever!("unknown country policy: {:?}", x)
        }
    }
}

/// Builds the rules of the run. The command line flags take precedence over the file.
pub fn validate_rules(
    json_rules: Option<&JsonRules>,
    force_assign_country: bool,
    country_policy: Option<&str>,
) -> AllocResult<AllocationRules> {
    let mut rules = AllocationRules::COMMITTEE_ONLY;
    if let Some(jr) = json_rules {
        rules.assign_country = jr.assign_country.unwrap_or(false);
        if let Some(p) = jr.country_policy.as_deref() {
            rules.country_policy = parse_country_policy(p)?;
        }
        rules.default_seats = match &jr.default_seats {
            None | Some(JSValue::Null) => DEFAULT_SEATS,
            x => match read_js_u32(x)? {
                0 => {
                    whatever!("defaultSeats must be positive")
                }
                n => n,
            },
        };
        rules.release_on_failure = jr.release_on_failure.unwrap_or(false);
    }
    if force_assign_country {
        rules.assign_country = true;
    }
    if let Some(p) = country_policy {
        rules.country_policy = parse_country_policy(p)?;
    }
    Ok(rules)
}

fn read_optional_index(x: &Option<JSValue>) -> AllocResult<Option<usize>> {
    match x {
        None | Some(JSValue::Null) => Ok(None),
        _ => read_js_int(x).map(|i| Some(i - 1)),
    }
}

/// Reads a non-negative count, given as a number or as a string.
fn read_js_count(x: &Option<JSValue>) -> AllocResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .and_then(|x| usize::try_from(x).ok())
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) => s
            .trim()
            .parse::<usize>()
            .ok()
            .context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}

fn read_js_u32(x: &Option<JSValue>) -> AllocResult<u32> {
    let n = read_js_count(x)?;
    u32::try_from(n).ok().context(ParsingJsonNumberSnafu {})
}

/// Reads a 1-based index, given as a number or as an Excel-style column name.
fn read_js_int(x: &Option<JSValue>) -> AllocResult<usize> {
    let idx = match x {
        // Parsing the Excel-style columns
        Some(JSValue::String(s)) if !s.is_empty() && s.chars().all(|c| c.is_ascii_alphabetic()) => s
            .to_ascii_lowercase()
            .chars()
            .try_fold(0usize, |acc, c| {
                acc.checked_mul(26)?
                    .checked_add(c as usize - 'a' as usize + 1)
            })
            .context(ParsingJsonNumberSnafu {})?,
        _ => read_js_count(x)?,
    };
    ensure!(idx >= 1, ParsingJsonNumberSnafu {});
    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_indexes() {
        assert_eq!(read_js_int(&Some(json!(3))).unwrap(), 3);
        assert_eq!(read_js_int(&Some(json!("4"))).unwrap(), 4);
        assert_eq!(read_js_int(&Some(json!("C"))).unwrap(), 3);
        assert_eq!(read_js_int(&Some(json!("AA"))).unwrap(), 27);
        assert!(read_js_int(&Some(json!(0))).is_err());
        assert!(read_js_int(&None).is_err());
        assert!(matches!(
            read_js_int(&Some(json!("ZZZZZZZZZZZZZZZZ"))),
            Err(AllocError::ParsingJsonNumber {})
        ));
    }

    #[test]
    fn numbers_beyond_u32_are_rejected() {
        let d: JsonDelegate =
            serde_json::from_value(json!({"id": "d1", "munExperience": 4294967296u64})).unwrap();
        assert!(matches!(
            d.to_delegate(),
            Err(AllocError::ParsingJsonNumber {})
        ));

        let c: JsonCommittee =
            serde_json::from_value(json!({"id": "ga", "abbr": "GA", "seats": 4294967297u64}))
                .unwrap();
        assert!(matches!(c.seats(), Err(AllocError::ParsingJsonNumber {})));

        let jr: JsonRules =
            serde_json::from_value(json!({"defaultSeats": "4294967296"})).unwrap();
        assert!(validate_rules(Some(&jr), false, None).is_err());
    }

    #[test]
    fn committee_seats_fall_back_to_default() {
        let comms: Vec<JsonCommittee> = serde_json::from_value(json!([
            {"id": "a", "abbr": "A", "seats": 12},
            {"id": "b", "abbr": "B", "seats": 0},
            {"id": "c", "abbr": "C", "seats": ""},
            {"id": "d", "abbr": "D"},
            {"id": "e", "abbr": "E", "seats": "7"}
        ]))
        .unwrap();
        let seats: Vec<Option<u32>> = comms.iter().map(|c| c.seats().unwrap()).collect();
        assert_eq!(seats, vec![Some(12), None, None, None, Some(7)]);
    }

    #[test]
    fn delegate_fields() {
        let d: JsonDelegate = serde_json::from_value(json!({
            "id": "d1",
            "munExperience": "2",
            "preferredCommittees": ["GA"],
            "assignedCommittee": "",
            "isLocked": true
        }))
        .unwrap();
        let d = d.to_delegate().unwrap();
        assert_eq!(d.mun_experience, 2);
        assert!(d.is_locked);
        assert_eq!(d.committee(), None);
        assert!(!d.is_candidate());
    }

    #[test]
    fn rules_and_overrides() {
        let jr: JsonRules = serde_json::from_value(json!({
            "assignCountry": false,
            "countryPolicy": "firstAvailable",
            "defaultSeats": 30
        }))
        .unwrap();
        let rules = validate_rules(Some(&jr), true, None).unwrap();
        assert!(rules.assign_country);
        assert_eq!(rules.country_policy, CountryPolicy::FirstAvailable);
        assert_eq!(rules.default_seats, 30);
        assert!(!rules.release_on_failure);

        let rules = validate_rules(None, false, Some("experienceTiers")).unwrap();
        assert_eq!(rules, AllocationRules::COMMITTEE_ONLY);

        assert!(validate_rules(None, false, Some("random")).is_err());
    }

    #[test]
    fn unknown_tier_is_rejected() {
        let c = JsonCountry {
            id: "x".to_string(),
            name: None,
            tier: Some("Z".to_string()),
        };
        assert!(c.tier().is_err());
    }
}
