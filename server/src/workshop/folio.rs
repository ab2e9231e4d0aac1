//! Work order folios have the form `OT-<year>-<NNNN>`, numbered per year.

/// Returns the prefix shared by every folio issued in `year`.
pub fn prefix(year: i32) -> String {
    format!("OT-{year}-")
}

pub fn format(year: i32, sequence: u32) -> String {
    format!("{}{sequence:04}", prefix(year))
}

/// Extracts the sequence number of `folio` if it was issued in `year`.
pub fn sequence(folio: &str, year: i32) -> Option<u32> {
    folio.strip_prefix(&prefix(year))?.parse().ok()
}

/// Returns the folio that follows the highest sequence among `existing` folios of `year`.
pub fn next<'a>(existing: impl IntoIterator<Item = &'a str>, year: i32) -> String {
    let highest = existing
        .into_iter()
        .filter_map(|folio| sequence(folio, year))
        .max()
        .unwrap_or(0);
    format(year, highest + 1)
}
