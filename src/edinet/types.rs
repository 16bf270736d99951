//! Shared EDINET types and data structures

use serde::Deserialize;
use std::str::FromStr;

/// EDINET listing response (`documents.json`) for one submission date
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingResponse {
    /// Optional metadata about the response
    pub metadata: Option<ListingMetadata>,
    /// Submissions of the day. A response without `results` lists nothing.
    #[serde(default)]
    pub results: Vec<ListingEntry>,
}

/// Metadata block of a listing response
#[derive(Debug, Clone, Deserialize)]
pub struct ListingMetadata {
    pub title: Option<String>,
    /// Status echoed inside the body (EDINET reports some errors with HTTP 200)
    pub status: Option<String>,
    pub message: Option<String>,
    pub resultset: Option<ListingResultSet>,
}

/// Information about the result set
#[derive(Debug, Clone, Deserialize)]
pub struct ListingResultSet {
    pub count: i64,
}

/// One submission in the listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingEntry {
    #[serde(rename = "seqNumber")]
    pub seq_number: Option<i64>,

    /// Document ID - required for downloading
    #[serde(rename = "docID")]
    pub doc_id: Option<String>,

    #[serde(rename = "edinetCode")]
    pub edinet_code: Option<String>,

    /// Securities code. Null for filers that are not listed on an exchange.
    #[serde(rename = "secCode")]
    pub sec_code: Option<String>,

    #[serde(rename = "filerName")]
    pub filer_name: Option<String>,

    #[serde(rename = "ordinanceCode")]
    pub ordinance_code: Option<String>,

    #[serde(rename = "formCode")]
    pub form_code: Option<String>,

    #[serde(rename = "docTypeCode")]
    pub doc_type_code: Option<String>,

    #[serde(rename = "periodStart")]
    pub period_start: Option<String>,

    #[serde(rename = "periodEnd")]
    pub period_end: Option<String>,

    #[serde(rename = "submitDateTime")]
    pub submit_date_time: Option<String>,

    #[serde(rename = "docDescription")]
    pub doc_description: Option<String>,

    #[serde(rename = "withdrawalStatus")]
    pub withdrawal_status: Option<String>,

    #[serde(rename = "xbrlFlag")]
    pub xbrl_flag: Option<String>,

    #[serde(rename = "pdfFlag")]
    pub pdf_flag: Option<String>,
}

/// EDINET API error body returned with non-2xx statuses
#[derive(Debug, Deserialize)]
pub struct EdinetErrorResponse {
    #[serde(rename = "statusCode", alias = "StatusCode")]
    pub status_code: u16,
    pub message: String,
}

/// `type` parameter of the listing endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListingType {
    /// `1`: metadata only
    #[default]
    MetadataOnly,
    /// `2`: metadata and document list
    MetadataAndData,
}

impl ListingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingType::MetadataOnly => "1",
            ListingType::MetadataAndData => "2",
        }
    }
}

impl FromStr for ListingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(ListingType::MetadataOnly),
            "2" => Ok(ListingType::MetadataAndData),
            other => Err(format!("unknown listing type '{}', expected 1 or 2", other)),
        }
    }
}

/// `type` parameter of the document endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentFormat {
    /// `1`: filing body and audit report as an XBRL archive
    #[default]
    Xbrl,
    /// `2`: PDF
    Pdf,
    /// `3`: substitute and attached documents
    Attachments,
    /// `4`: English documents
    English,
    /// `5`: CSV conversion of the XBRL
    Csv,
}

impl DocumentFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Xbrl => "1",
            DocumentFormat::Pdf => "2",
            DocumentFormat::Attachments => "3",
            DocumentFormat::English => "4",
            DocumentFormat::Csv => "5",
        }
    }

    /// Extension of the stored file
    pub fn file_extension(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            _ => "zip",
        }
    }
}

impl FromStr for DocumentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1" => Ok(DocumentFormat::Xbrl),
            "2" => Ok(DocumentFormat::Pdf),
            "3" => Ok(DocumentFormat::Attachments),
            "4" => Ok(DocumentFormat::English),
            "5" => Ok(DocumentFormat::Csv),
            other => Err(format!("unknown document format '{}', expected 1-5", other)),
        }
    }
}

/// Ordinance and form codes selecting the reports to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFilter {
    pub ordinance_code: String,
    pub form_code: String,
}

impl ReportFilter {
    /// Cabinet Office Ordinance on Disclosure of Corporate Affairs
    pub const CORPORATE_DISCLOSURE_ORDINANCE: &'static str = "010";
    /// Annual securities report (有価証券報告書)
    pub const SECURITIES_REPORT_FORM: &'static str = "030000";

    pub fn matches(&self, entry: &ListingEntry) -> bool {
        entry.ordinance_code.as_deref() == Some(self.ordinance_code.as_str())
            && entry.form_code.as_deref() == Some(self.form_code.as_str())
    }
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            ordinance_code: Self::CORPORATE_DISCLOSURE_ORDINANCE.to_string(),
            form_code: Self::SECURITIES_REPORT_FORM.to_string(),
        }
    }
}

/// A qualifying report: filer name, document id and security code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecuritiesReport<'a> {
    pub filer_name: &'a str,
    pub doc_id: &'a str,
    pub sec_code: &'a str,
}

impl<'a> SecuritiesReport<'a> {
    pub fn as_tuple(&self) -> (&'a str, &'a str, &'a str) {
        (self.filer_name, self.doc_id, self.sec_code)
    }
}

/// EDINET document ids are short ASCII alphanumeric codes such as
/// `S100ABCD`. Anything else cannot be used as a file name component.
pub fn is_valid_doc_id(doc_id: &str) -> bool {
    !doc_id.is_empty() && doc_id.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing_entry() {
        let json = r#"{
            "metadata": {
                "title": "提出された書類を把握するためのAPI",
                "status": "200",
                "message": "OK",
                "resultset": { "count": 1 }
            },
            "results": [{
                "seqNumber": 1,
                "docID": "S100ABCD",
                "edinetCode": "E00001",
                "secCode": "12340",
                "filerName": "Acme Co",
                "ordinanceCode": "010",
                "formCode": "030000",
                "docTypeCode": "120",
                "submitDateTime": "2024-03-25 09:00",
                "docDescription": "有価証券報告書－第10期",
                "xbrlFlag": "1",
                "pdfFlag": "1"
            }]
        }"#;

        let response: ListingResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results.len(), 1);
        let entry = &response.results[0];
        assert_eq!(entry.doc_id.as_deref(), Some("S100ABCD"));
        assert_eq!(entry.sec_code.as_deref(), Some("12340"));
        assert!(entry.period_start.is_none());
        assert_eq!(
            response.metadata.and_then(|m| m.resultset).map(|r| r.count),
            Some(1)
        );
    }

    #[test]
    fn test_missing_results_is_empty() {
        let response: ListingResponse =
            serde_json::from_str(r#"{"metadata": {"status": "404", "message": "Not Found"}}"#)
                .unwrap();
        assert!(response.results.is_empty());
    }

    #[test]
    fn test_codes_parse() {
        assert_eq!("2".parse::<ListingType>().unwrap(), ListingType::MetadataAndData);
        assert!("3".parse::<ListingType>().is_err());
        assert_eq!("2".parse::<DocumentFormat>().unwrap().file_extension(), "pdf");
        assert_eq!(DocumentFormat::default().file_extension(), "zip");
        assert!("x".parse::<DocumentFormat>().is_err());
    }

    #[test]
    fn test_doc_id_validation() {
        assert!(is_valid_doc_id("S100ABCD"));
        assert!(is_valid_doc_id("BADID"));
        assert!(!is_valid_doc_id(""));
        assert!(!is_valid_doc_id("../evil"));
        assert!(!is_valid_doc_id("a/b"));
        assert!(!is_valid_doc_id("S100 ABCD"));
        assert!(!is_valid_doc_id("S100ＡＢ"));
    }
}
