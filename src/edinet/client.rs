//! Blocking-in-sequence access to the EDINET listing and document endpoints

use crate::config::{ApiConfig, Config};
use crate::edinet::errors::{EdinetError, Result};
use crate::edinet::types::{EdinetErrorResponse, ListingResponse, ListingType};
use chrono::NaiveDate;
use futures::{stream, Stream, StreamExt};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::debug;

const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// HTTP client for the two EDINET endpoints the pipeline consumes
#[derive(Debug, Clone)]
pub struct EdinetClient {
    client: Client,
    api: ApiConfig,
    api_key: Option<String>,
    timeout: Duration,
}

/// Successful response of the document endpoint, not yet read
#[derive(Debug)]
pub struct DocumentPayload {
    doc_id: String,
    response: Response,
    idle_timeout: Duration,
}

impl DocumentPayload {
    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    /// Size announced by the server, if any
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Body as a stream of network chunks. There is no deadline for the
    /// whole body; only the wait for each next chunk is bounded.
    pub fn into_stream(self) -> impl Stream<Item = Result<impl AsRef<[u8]>>> {
        with_idle_timeout(self.response.bytes_stream(), self.idle_timeout, self.doc_id)
    }
}

/// Fail with [`EdinetError::Timeout`] when `body` stays silent for `idle`.
/// The stream ends after the first error.
fn with_idle_timeout<S, T, E>(
    body: S,
    idle: Duration,
    what: String,
) -> impl Stream<Item = Result<T>>
where
    S: Stream<Item = std::result::Result<T, E>>,
    E: Into<EdinetError>,
{
    stream::unfold(Some(Box::pin(body)), move |state| {
        let what = what.clone();
        async move {
            let mut body = state?;
            match tokio::time::timeout(idle, body.next()).await {
                Ok(Some(Ok(chunk))) => Some((Ok(chunk), Some(body))),
                Ok(Some(Err(e))) => Some((Err(e.into()), None)),
                Ok(None) => None,
                Err(_) => Some((Err(EdinetError::Timeout(what)), None)),
            }
        }
    })
}

impl EdinetClient {
    /// Build a client with the configured user agent and connect timeout.
    ///
    /// Listing requests get the configured timeout as a whole-request
    /// deadline. Document downloads are bounded per wait instead, so a large
    /// archive on a slow link can still finish.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.http.user_agent)
            .connect_timeout(config.http_timeout())
            .build()?;

        Ok(Self {
            client,
            api: config.api.clone(),
            api_key: config.edinet_api_key.clone(),
            timeout: config.http_timeout(),
        })
    }

    /// Fetch the submission listing for one date
    pub async fn fetch_listing(
        &self,
        date: NaiveDate,
        listing_type: ListingType,
    ) -> Result<ListingResponse> {
        let url = self.api.listing_url();
        let date_str = date.format("%Y-%m-%d").to_string();

        debug!(%date, url = %url, "Fetching EDINET listing");

        let response = self
            .authorize(self.client.get(&url))
            .query(&[("date", date_str.as_str()), ("type", listing_type.as_str())])
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), response_text));
        }

        let listing: ListingResponse = serde_json::from_str(&response_text)
            .map_err(|e| EdinetError::ResponseParse { date, source: e })?;

        // EDINET reports some request errors inside a 200 body
        if let Some(status) = listing.metadata.as_ref().and_then(|m| m.status.as_deref()) {
            if status != "200" {
                let message = listing
                    .metadata
                    .as_ref()
                    .and_then(|m| m.message.clone())
                    .unwrap_or_default();
                return Err(EdinetError::Api {
                    status_code: status.parse().unwrap_or(500),
                    message,
                });
            }
        }

        debug!(%date, count = listing.results.len(), "Parsed EDINET listing");
        Ok(listing)
    }

    /// Request the archive of one document; the body is streamed by the caller
    pub async fn fetch_document(&self, doc_id: &str) -> Result<DocumentPayload> {
        let url = self.api.document_url(doc_id);

        debug!(doc_id, url = %url, "Fetching EDINET document");

        let request = self
            .authorize(self.client.get(&url))
            .query(&[("type", self.api.document_format.as_str())])
            .send();
        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| EdinetError::Timeout(format!("document {}", doc_id)))??;

        let status = response.status();
        if !status.is_success() {
            let response_text = response.text().await.unwrap_or_default();
            return Err(api_error(status.as_u16(), response_text));
        }

        Ok(DocumentPayload {
            doc_id: doc_id.to_string(),
            response,
            idle_timeout: self.timeout,
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.header(API_KEY_HEADER, key),
            None => request,
        }
    }
}

fn api_error(status_code: u16, body: String) -> EdinetError {
    match serde_json::from_str::<EdinetErrorResponse>(&body) {
        Ok(error_response) => EdinetError::Api {
            status_code: error_response.status_code,
            message: error_response.message,
        },
        Err(_) => EdinetError::Api {
            status_code,
            message: body,
        },
    }
}
