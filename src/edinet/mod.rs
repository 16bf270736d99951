//! EDINET (Japan Financial Services Agency) module
//!
//! Access to EDINET, Japan's electronic disclosure system: submission date
//! ranges, the listing and document endpoints, and the filter that picks
//! annual securities reports of listed companies out of a daily listing.

pub mod client;
pub mod dates;
pub mod errors;
pub mod extractor;
pub mod types;

pub use client::{DocumentPayload, EdinetClient};
pub use dates::generate_date_sequence;
pub use errors::EdinetError;
pub use extractor::{extract_securities_reports, SecuritiesReports};
pub use types::*;
