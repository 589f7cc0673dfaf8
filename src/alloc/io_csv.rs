// Primitives for reading CSV files.

use std::io::Read;

use crate::alloc::{
    io_common::{assemble_preferences, non_empty, parse_experience, simplify_file_name},
    *,
};

pub fn read_csv_delegates(path: String, src: &DelegateSource) -> AllocResult<Vec<ParsedDelegate>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)
        .context(CsvOpenSnafu {})?;
    let res = read_records(rdr, src)?;
    info!(
        "read_csv_delegates: {}: {} delegates",
        simplify_file_name(&path),
        res.len()
    );
    Ok(res)
}

fn read_records<R: Read>(rdr: csv::Reader<R>, src: &DelegateSource) -> AllocResult<Vec<ParsedDelegate>> {
    let first_row = src.first_row_index()?;
    let id_idx = src.id_column_index()?;
    let name_idx_o = src.name_column_index()?;
    let experience_idx_o = src.experience_column_index()?;
    let preference_idx_o = src.first_preference_column_index()?;

    let mut res: Vec<ParsedDelegate> = Vec::new();
    // The index starts at 1 to respect most conventions in the excel world
    for (idx, line_r) in rdr.into_records().enumerate() {
        let lineno = idx + 1;
        if lineno < first_row {
            continue;
        }
        let line = line_r.context(CsvLineParseSnafu {})?;
        debug!("read_csv_delegates: lineno: {:?} row: {:?}", lineno, line);

        let id = line
            .get(id_idx)
            .context(CsvLineToShortSnafu { lineno })?
            .trim()
            .to_string();
        if id.is_empty() {
            warn!("read_csv_delegates: line {}: no id, skipping", lineno);
            continue;
        }

        let mun_experience = match experience_idx_o {
            Some(exp_idx) => parse_experience(line.get(exp_idx).unwrap_or(""), lineno)?,
            None => 0,
        };
        let preferences = match preference_idx_o {
            Some(pref_idx) => assemble_preferences(line.iter().skip(pref_idx)),
            None => Vec::new(),
        };

        res.push(ParsedDelegate {
            id,
            name: name_idx_o.and_then(|i| non_empty(line.get(i))),
            mun_experience,
            preferences,
        });
    }
    Ok(res)
}
