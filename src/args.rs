use clap::Parser;

/// This is a delegate allocation program for Model United Nations events.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file describing the event: rules, committees, countries and delegates, in JSON format.
    /// For more information about the file format, read the documentation of the `manual` module.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path) A reference file containing the summary of an allocation in JSON format. If provided, munalloc will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the run will be written in JSON format to the given
    /// location. Otherwise it is printed on the standard output.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) An additional roster of delegates to import before allocating.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the additional roster: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// Assign a country along with the committee, regardless of the rules of the event file.
    #[clap(long, takes_value = false)]
    pub assign_country: bool,

    /// (experienceTiers or firstAvailable) Overrides the country policy of the event file.
    #[clap(long, value_parser)]
    pub country_policy: Option<String>,

    /// Releases the assigned, unlocked delegates instead of allocating.
    #[clap(long, takes_value = false)]
    pub reset: bool,

    /// (committee id) With --reset, only releases the delegates of this committee.
    #[clap(long, value_parser, requires = "reset")]
    pub reset_committee: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
