use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::input::{InputError, RowSet};

pub fn open_maybe_gz(path: &Path) -> Result<Box<dyn BufRead>, InputError> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// `<stem>.tsv` if present, else `<stem>.tsv.gz`.
pub fn find_table(dir: &Path, stem: &str) -> Option<PathBuf> {
    [format!("{stem}.tsv"), format!("{stem}.tsv.gz")]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|p| p.is_file())
}

pub fn parse_cell(raw: &str) -> Option<String> {
    let v = raw.trim();
    match v {
        "" | "NA" | "NaN" | "nan" | "NULL" | "null" | "None" => None,
        _ => Some(v.to_string()),
    }
}

/// Header line plus tab-separated rows. Short rows are padded with missing
/// values; extra fields are ignored.
pub fn read_rowset(path: &Path) -> Result<RowSet, InputError> {
    let mut reader = open_maybe_gz(path)?;
    let mut buf = String::new();

    let read = reader.read_line(&mut buf)?;
    if read == 0 {
        return Err(InputError::Parse(format!("{} is empty", path.display())));
    }
    let columns: Vec<String> = buf
        .trim_end_matches(['\r', '\n'])
        .split('\t')
        .map(|s| s.trim().to_string())
        .collect();
    if columns.iter().all(|c| c.is_empty()) {
        return Err(InputError::Parse(format!(
            "{} has an empty header",
            path.display()
        )));
    }

    let mut out = RowSet::new(columns);
    loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            break;
        }
        let line = buf.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        out.push_row(line.split('\t').map(parse_cell));
    }
    Ok(out)
}

pub fn parse_number(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

#[cfg(test)]
#[path = "../../tests/src_inline/input/tsv.rs"]
mod tests;
