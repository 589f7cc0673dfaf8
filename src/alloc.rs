use log::{debug, info, warn};

use delegate_allocation::builder::Builder;
use delegate_allocation::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::alloc::config_reader::*;
use crate::alloc::ledger::{Ledger, LedgerError};
use crate::args::Args;

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_xlsx;
pub mod ledger;

#[derive(Debug, Snafu)]
pub enum AllocError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("The workbook or the worksheet is empty"))]
    EmptyExcel {},
    #[snafu(display("Unexpected cell type on line {lineno}: {content}"))]
    ExcelWrongCellType { lineno: u64, content: String },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a number or a column index"))]
    ParsingJsonNumber {},
    #[snafu(display("The config file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Error opening CSV file"))]
    CsvOpen { source: csv::Error },
    #[snafu(display("Error reading a CSV line"))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineToShort { lineno: usize },
    #[snafu(display("Line {lineno}: invalid MUN experience {content:?}"))]
    InvalidExperience { lineno: usize, content: String },
    #[snafu(display("Error writing file {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Allocation failed: {source}"))]
    Allocation { source: AllocationErrors },
    #[snafu(display("Roster store failed: {source}"))]
    Store { source: LedgerError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type AllocResult<T> = Result<T, AllocError>;
pub type BAllocResult<T> = Result<T, Box<AllocError>>;

/// A delegate, as parsed by the readers.
/// This is before checking ids against the rest of the roster.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedDelegate {
    pub id: String,
    pub name: Option<String>,
    pub mun_experience: u32,
    pub preferences: Vec<String>,
}

/// Everything a run needs to know, collected from the command line.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RunSettings {
    pub config_path: String,
    pub reference_path: Option<String>,
    pub out: Option<String>,
    pub input: Option<String>,
    pub input_type: Option<String>,
    pub excel_worksheet_name: Option<String>,
    pub assign_country: bool,
    pub country_policy: Option<String>,
}

impl From<&Args> for RunSettings {
    fn from(args: &Args) -> Self {
        RunSettings {
            config_path: args.config.clone(),
            reference_path: args.reference.clone(),
            out: args.out.clone(),
            input: args.input.clone(),
            input_type: args.input_type.clone(),
            excel_worksheet_name: args.excel_worksheet_name.clone(),
            assign_country: args.assign_country,
            country_policy: args.country_policy.clone(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum RunMode {
    Allocate,
    Reset { committee_id: Option<String> },
}

/// Prints the notices for the organiser and mirrors them in the log.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Error => warn!("notice: {}", message),
            _ => info!("notice: {}", message),
        }
        eprintln!("[{}] {}", level.as_str(), message);
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(rename = "eventId")]
    pub event_id: String,
    #[serde(rename = "assignCountry")]
    pub assign_country: bool,
    #[serde(rename = "countryPolicy")]
    pub country_policy: String,
    #[serde(rename = "defaultSeats")]
    pub default_seats: u32,
    #[serde(rename = "releaseOnFailure")]
    pub release_on_failure: bool,
}

fn output_config(event_id: &str, rules: &AllocationRules) -> OutputConfig {
    OutputConfig {
        event_id: event_id.to_string(),
        assign_country: rules.assign_country,
        country_policy: country_policy_name(rules.country_policy).to_string(),
        default_seats: rules.default_seats,
        release_on_failure: rules.release_on_failure,
    }
}

fn failures_to_json(failures: &[DelegateFailure]) -> Vec<JSValue> {
    failures
        .iter()
        .map(|f| {
            let reason = match &f.reason {
                FailureReason::NoCapacity => "noCapacity".to_string(),
                FailureReason::AssignmentRejected(_) => "assignmentRejected".to_string(),
            };
            json!({"delegate": f.delegate_id, "reason": reason, "message": f.reason.to_string()})
        })
        .collect()
}

fn fill_to_json(roster: &Roster, rules: &AllocationRules) -> Vec<JSValue> {
    committee_fill(roster, rules.default_seats)
        .iter()
        .map(|cf| {
            json!({
                "committee": cf.committee_id,
                "abbr": cf.abbr,
                "seats": cf.seats,
                "assigned": cf.assigned,
                "remaining": cf.remaining()
            })
        })
        .collect()
}

fn build_summary_js(
    event_id: &str,
    rules: &AllocationRules,
    res: &AllocationResult,
    roster: &Roster,
) -> JSValue {
    let assignments: Vec<JSValue> = res
        .assignments
        .iter()
        .map(|a| json!({"delegate": a.delegate_id, "committee": a.committee_id, "country": a.country_id}))
        .collect();
    json!({
        "config": output_config(event_id, rules),
        "results": {
            "outcome": res.outcome.as_str(),
            "candidates": res.candidates,
            "allocated": res.success_count(),
            "failed": res.error_count(),
            "assignments": assignments,
            "failures": failures_to_json(&res.failures),
            "committees": fill_to_json(roster, rules)
        }
    })
}

fn build_reset_summary_js(
    event_id: &str,
    rules: &AllocationRules,
    res: &ResetResult,
    roster: &Roster,
) -> JSValue {
    json!({
        "config": output_config(event_id, rules),
        "results": {
            "released": res.released,
            "failures": failures_to_json(&res.failures),
            "committees": fill_to_json(roster, rules)
        }
    })
}

fn read_delegate_source(root_path: &Path, src: &DelegateSource) -> AllocResult<Vec<ParsedDelegate>> {
    let p: PathBuf = root_path.join(&src.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read delegate file {:?}", p2);
    match src.provider.as_str() {
        "csv" => io_csv::read_csv_delegates(p2, src),
        "xlsx" => io_xlsx::read_xlsx_delegates(p2, src),
        x => {
            whatever!("Provider not implemented {:?}", x)
        }
    }
}

fn build_roster(config: &EventConfig, imported: &[ParsedDelegate]) -> AllocResult<Roster> {
    let mut builder = Builder::new();
    for c in config.committees.iter() {
        let seats = c.seats()?;
        builder = builder
            .committees(&[(c.id.as_str(), c.abbr.as_str(), seats)])
            .context(AllocationSnafu {})?;
    }
    for c in config.countries.iter() {
        builder = builder
            .countries(&[(c.id.as_str(), c.tier()?)])
            .context(AllocationSnafu {})?;
    }
    for d in config.delegates.iter() {
        builder.add_delegate(&d.to_delegate()?).context(AllocationSnafu {})?;
    }
    for pd in imported.iter() {
        let prefs: Vec<&str> = pd.preferences.iter().map(|s| s.as_str()).collect();
        let mut d = Delegate::new(&pd.id, pd.mun_experience, &prefs);
        d.name = pd.name.clone();
        builder.add_delegate(&d).context(AllocationSnafu {})?;
    }
    let mut roster = builder.build().context(AllocationSnafu {})?;
    // Names are not carried by the builder triples.
    for (country, jc) in roster.countries.iter_mut().zip(config.countries.iter()) {
        country.name = jc.name.clone();
    }
    Ok(roster)
}

fn write_output(out: Option<&str>, pretty: &str) -> AllocResult<()> {
    match out {
        None | Some("stdout") | Some("") => {
            println!("{}", pretty);
            Ok(())
        }
        Some(path) => {
            info!("Writing summary to {:?}", path);
            fs::write(path, pretty).context(WritingOutputSnafu { path })
        }
    }
}

fn check_reference(reference_path: &str, pretty_js_stats: &str) -> AllocResult<()> {
    let summary_ref = read_summary(reference_path.to_string())?;
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_stats {
        warn!("Found differences with the reference summary");
        print_diff(pretty_js_summary_ref.as_str(), pretty_js_stats, "\n");
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

/// Runs one allocation (or reset) over the event described in the config file.
pub fn run_event(settings: &RunSettings, mode: &RunMode) -> BAllocResult<()> {
    let config_p = Path::new(settings.config_path.as_str());
    let config = read_event_config(&settings.config_path)?;
    debug!("config: {:?}", config);

    let rules = validate_rules(
        config.rules.as_ref(),
        settings.assign_country,
        settings.country_policy.as_deref(),
    )?;
    info!("rules: {:?}", rules);

    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let mut imported: Vec<ParsedDelegate> = Vec::new();
    for src in config.delegate_sources.iter() {
        let mut file_data = read_delegate_source(root_p, src)?;
        imported.append(&mut file_data);
    }
    if let Some(input) = settings.input.as_deref() {
        let src = DelegateSource::from_cli(
            input,
            settings.input_type.as_deref(),
            settings.excel_worksheet_name.as_deref(),
        );
        let mut file_data = read_delegate_source(Path::new(""), &src)?;
        imported.append(&mut file_data);
    }
    info!("Imported {} delegates from files", imported.len());

    let roster = build_roster(&config, &imported)?;
    let ledger = Ledger::new(&config.event_id, roster);
    let mut api = ledger.api();
    let mut notifier = ConsoleNotifier;

    let summary_js = match mode {
        RunMode::Allocate => {
            let (res, refreshed) =
                allocate_event(&config.event_id, &rules, &ledger, &mut api, &mut notifier)
                    .context(AllocationSnafu {})?;
            build_summary_js(&config.event_id, &rules, &res, &refreshed)
        }
        RunMode::Reset { committee_id } => {
            let mut roster = ledger.refresh(&config.event_id).context(StoreSnafu {})?;
            let res = reset_allocations(&mut roster, committee_id.as_deref(), &mut api);
            if !res.released.is_empty() {
                notifier.notify(
                    NoticeLevel::Success,
                    &format!("Released {} delegates", res.released.len()),
                );
            }
            if !res.failures.is_empty() {
                notifier.notify(
                    NoticeLevel::Error,
                    &format!("Failed to release {} delegates", res.failures.len()),
                );
            }
            let refreshed = ledger.refresh(&config.event_id).context(StoreSnafu {})?;
            build_reset_summary_js(&config.event_id, &rules, &res, &refreshed)
        }
    };

    let pretty_js_stats = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;
    write_output(settings.out.as_deref(), &pretty_js_stats)?;

    // The reference summary, if provided for comparison
    if let Some(reference_path) = settings.reference_path.as_deref() {
        check_reference(reference_path, &pretty_js_stats)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_dir() -> String {
        option_env!("MUNALLOC_TEST_DIR")
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("{}/test_data", env!("CARGO_MANIFEST_DIR")))
    }

    fn run_event_test(test_name: &str, mode: RunMode) {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = test_dir();
        let settings = RunSettings {
            config_path: format!("{}/{}/{}_config.json", dir, test_name, test_name),
            reference_path: Some(format!(
                "{}/{}/{}_expected_summary.json",
                dir, test_name, test_name
            )),
            out: Some(
                std::env::temp_dir()
                    .join(format!("munalloc_{}_summary.json", test_name))
                    .display()
                    .to_string(),
            ),
            ..RunSettings::default()
        };
        let res = run_event(&settings, &mode);
        if let Err(e) = &res {
            eprintln!("An error occured {}", e);
        }
        assert!(res.is_ok());
    }

    fn test_wrapper(test_name: &str) {
        run_event_test(test_name, RunMode::Allocate)
    }

    #[test]
    fn global_allocation() {
        test_wrapper("global_allocation");
    }

    #[test]
    fn committee_only() {
        test_wrapper("committee_only");
    }

    #[test]
    fn csv_import() {
        test_wrapper("csv_import");
    }

    #[test]
    fn reset_committee() {
        run_event_test(
            "reset_committee",
            RunMode::Reset {
                committee_id: Some("ga".to_string()),
            },
        );
    }

    #[test]
    fn reference_mismatch_is_an_error() {
        let dir = test_dir();
        let settings = RunSettings {
            config_path: format!("{}/committee_only/committee_only_config.json", dir),
            reference_path: Some(format!(
                "{}/global_allocation/global_allocation_expected_summary.json",
                dir
            )),
            out: Some(
                std::env::temp_dir()
                    .join("munalloc_mismatch_summary.json")
                    .display()
                    .to_string(),
            ),
            ..RunSettings::default()
        };
        assert!(run_event(&settings, &RunMode::Allocate).is_err());
    }

    #[test]
    fn imported_ids_must_be_unique() {
        let config: EventConfig = serde_json::from_str(
            r#"{"eventId": "e", "committees": [{"id": "ga", "abbr": "GA"}],
                "delegates": [{"id": "d1", "munExperience": 1}]}"#,
        )
        .unwrap();
        let imported = vec![ParsedDelegate {
            id: "d1".to_string(),
            name: None,
            mun_experience: 0,
            preferences: vec![],
        }];
        let res = build_roster(&config, &imported);
        assert!(matches!(
            res,
            Err(AllocError::Allocation {
                source: AllocationErrors::DuplicateId { .. }
            })
        ));
    }
}
