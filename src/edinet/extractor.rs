//! Filtering of listing responses down to listed-company securities reports

use crate::edinet::types::{
    is_valid_doc_id, ListingEntry, ListingResponse, ReportFilter, SecuritiesReport,
};
use std::slice;
use tracing::warn;

/// Lazy iterator over the securities reports of one listing response.
///
/// It borrows the already-parsed response, so cloning it or calling
/// [`extract_securities_reports`] again restarts the walk without touching
/// the network. Listing order is preserved.
#[derive(Debug, Clone)]
pub struct SecuritiesReports<'a> {
    entries: slice::Iter<'a, ListingEntry>,
    filter: &'a ReportFilter,
}

impl<'a> Iterator for SecuritiesReports<'a> {
    type Item = SecuritiesReport<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.entries.find_map(|entry| to_report(entry, filter))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.entries.size_hint().1)
    }
}

/// Reports whose ordinance and form codes match `filter` and whose filer
/// carries a security code. Entries without a usable document id or filer
/// name cannot be stored and are skipped as well.
pub fn extract_securities_reports<'a>(
    response: &'a ListingResponse,
    filter: &'a ReportFilter,
) -> SecuritiesReports<'a> {
    SecuritiesReports {
        entries: response.results.iter(),
        filter,
    }
}

fn to_report<'a>(entry: &'a ListingEntry, filter: &ReportFilter) -> Option<SecuritiesReport<'a>> {
    if !filter.matches(entry) {
        return None;
    }

    // unlisted filer
    let sec_code = entry.sec_code.as_deref()?;

    let doc_id = entry.doc_id.as_deref()?;
    if !is_valid_doc_id(doc_id) {
        warn!(doc_id, "Skipping listing entry with malformed document id");
        return None;
    }

    Some(SecuritiesReport {
        filer_name: entry.filer_name.as_deref()?,
        doc_id,
        sec_code,
    })
}
