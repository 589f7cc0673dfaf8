use calamine::{open_workbook, DataType, Reader, Xlsx};

use crate::alloc::{
    io_common::{assemble_preferences, non_empty, parse_experience, simplify_file_name},
    *,
};

pub fn read_xlsx_delegates(path: String, src: &DelegateSource) -> AllocResult<Vec<ParsedDelegate>> {
    let wrange = get_range(&path, src)?;

    let first_row = src.first_row_index()?;
    let id_idx = src.id_column_index()?;
    let name_idx_o = src.name_column_index()?;
    let experience_idx_o = src.experience_column_index()?;
    let preference_idx_o = src.first_preference_column_index()?;

    let mut res: Vec<ParsedDelegate> = Vec::new();
    for (idx, row) in wrange.rows().enumerate() {
        let lineno = idx + 1;
        if lineno < first_row {
            continue;
        }
        let cells: Vec<String> = row
            .iter()
            .map(|c| cell_to_string(c, lineno))
            .collect::<AllocResult<Vec<String>>>()?;
        debug!("read_xlsx_delegates: lineno: {:?} row: {:?}", lineno, cells);

        let id = cells.get(id_idx).map(|s| s.trim()).unwrap_or("").to_string();
        if id.is_empty() {
            warn!("read_xlsx_delegates: line {}: no id, skipping", lineno);
            continue;
        }
        let mun_experience = match experience_idx_o {
            Some(exp_idx) => parse_experience(cells.get(exp_idx).map(|s| s.as_str()).unwrap_or(""), lineno)?,
            None => 0,
        };
        let preferences = match preference_idx_o {
            Some(pref_idx) => assemble_preferences(cells.iter().skip(pref_idx).map(|s| s.as_str())),
            None => Vec::new(),
        };
        res.push(ParsedDelegate {
            id,
            name: name_idx_o.and_then(|i| non_empty(cells.get(i).map(|s| s.as_str()))),
            mun_experience,
            preferences,
        });
    }
    info!(
        "read_xlsx_delegates: {}: {} delegates",
        simplify_file_name(&path),
        res.len()
    );
    Ok(res)
}

fn cell_to_string(cell: &DataType, lineno: usize) -> AllocResult<String> {
    match cell {
        DataType::String(s) => Ok(s.trim().to_string()),
        DataType::Int(i) => Ok(i.to_string()),
        DataType::Float(f) if f.fract() == 0.0 => Ok(format!("{}", *f as i64)),
        DataType::Float(f) => Ok(f.to_string()),
        DataType::Bool(b) => Ok(b.to_string()),
        DataType::Empty => Ok("".to_string()),
        _ => ExcelWrongCellTypeSnafu {
            lineno: lineno as u64,
            content: format!("{:?}", cell),
        }
        .fail(),
    }
}

fn get_range(path: &String, src: &DelegateSource) -> AllocResult<calamine::Range<DataType>> {
    let worksheet_name_o = src.excel_worksheet_name.clone();
    debug!(
        "read_xlsx_delegates: path: {:?} worksheet: {:?}",
        &path, &worksheet_name_o
    );
    let mut workbook: Xlsx<_> =
        open_workbook(path.clone()).context(OpeningExcelSnafu { path: path.clone() })?;

    // A worksheet name was provided, use it.
    if let Some(worksheet_name) = worksheet_name_o {
        let wrange = workbook
            .worksheet_range(&worksheet_name)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path: path.clone() })?;
        Ok(wrange)
    } else {
        let all_worksheets = workbook.worksheets();
        match all_worksheets.as_slice() {
            [] => EmptyExcelSnafu {}.fail(),
            [(_, wrange)] => Ok(wrange.clone()),
            _ => {
                let names: Vec<&String> = all_worksheets.iter().map(|(n, _)| n).collect();
                whatever!(
                    "The workbook {} has several worksheets ({:?}), use --excel-worksheet-name",
                    path,
                    names
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workbook_path() -> String {
        format!(
            "{}/test_data/xlsx_import/delegates.xlsx",
            env!("CARGO_MANIFEST_DIR")
        )
    }

    fn source(worksheet: Option<&str>) -> DelegateSource {
        let mut src: DelegateSource = serde_json::from_value(serde_json::json!({
            "provider": "xlsx",
            "filePath": "delegates.xlsx",
            "idColumnIndex": 1,
            "nameColumnIndex": "B",
            "experienceColumnIndex": 3,
            "firstPreferenceColumnIndex": 4
        }))
        .unwrap();
        src.excel_worksheet_name = worksheet.map(|s| s.to_string());
        src
    }

    #[test]
    fn named_worksheet() {
        let res = read_xlsx_delegates(workbook_path(), &source(Some("Delegates"))).unwrap();
        assert_eq!(
            res,
            vec![
                ParsedDelegate {
                    id: "x1".to_string(),
                    name: Some("Lin".to_string()),
                    mun_experience: 2,
                    preferences: vec!["GA".to_string(), "SC".to_string()],
                },
                ParsedDelegate {
                    id: "x2".to_string(),
                    name: None,
                    mun_experience: 0,
                    preferences: vec!["WHO".to_string()],
                },
                ParsedDelegate {
                    id: "x3".to_string(),
                    name: Some("Mo".to_string()),
                    mun_experience: 0,
                    preferences: vec![],
                },
            ]
        );
    }

    #[test]
    fn several_worksheets_need_a_name() {
        let res = read_xlsx_delegates(workbook_path(), &source(None));
        assert!(matches!(res, Err(AllocError::Whatever { .. })));
    }

    #[test]
    fn unknown_worksheet() {
        let res = read_xlsx_delegates(workbook_path(), &source(Some("Speakers")));
        assert!(matches!(res, Err(AllocError::EmptyExcel {})));
    }

    #[test]
    fn cells() {
        assert_eq!(cell_to_string(&DataType::Float(2.0), 1).unwrap(), "2");
        assert_eq!(cell_to_string(&DataType::Int(4), 1).unwrap(), "4");
        assert_eq!(
            cell_to_string(&DataType::String(" GA ".to_string()), 1).unwrap(),
            "GA"
        );
        assert_eq!(cell_to_string(&DataType::Empty, 1).unwrap(), "");
        assert!(matches!(
            cell_to_string(&DataType::DateTime(44000.5), 3),
            Err(AllocError::ExcelWrongCellType { lineno: 3, .. })
        ));
    }
}
