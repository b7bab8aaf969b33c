use std::time::Duration;

use chan_msg::{parse_catalog, ApiThread, CatalogPage, MarkupPost, MsgError};
use chan_ref::{catalog_url, ThreadUrl};
use log::debug;
use reqwest::{blocking::Client, StatusCode};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum FetchError {
    #[error("Resource is gone: {url}")]
    Gone { url: String },
    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("Failed to request {url}, cause: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to decode {url}, cause: {source}")]
    Decode {
        url: String,
        #[source]
        source: MsgError,
    },
    #[error("Failed to build http client, cause: {0}")]
    Client(#[source] reqwest::Error),
}

/// Which representation of a thread to fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Json,
    Html,
}

/// A fetched thread, in either format.
#[derive(Debug)]
pub enum ThreadDocument {
    Api(ApiThread),
    Page(Vec<MarkupPost>),
}

pub trait Source {
    /// Fails with [`FetchError::Gone`] once the thread has been pruned.
    fn thread(&self, url: &ThreadUrl) -> Result<ThreadDocument, FetchError>;
    fn catalog(&self, board: &str) -> Result<Vec<CatalogPage>, FetchError>;
}

pub struct HttpSource {
    client: Client,
    format: Format,
}

impl HttpSource {
    pub fn new(timeout: Duration, format: Format) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client, format })
    }

    // no retries, the next scheduled run tries again
    fn get(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().map_err(transport)?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(FetchError::Gone {
                url: url.to_string(),
            }),
            status if !status.is_success() => Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }),
            _ => response.text().map_err(transport),
        }
    }
}

impl Source for HttpSource {
    fn thread(&self, url: &ThreadUrl) -> Result<ThreadDocument, FetchError> {
        let (address, document) = match self.format {
            Format::Json => {
                let address = url.api();
                let text = self.get(&address)?;
                (address, ApiThread::from_json(&text).map(ThreadDocument::Api))
            }
            Format::Html => {
                let address = url.web();
                let text = self.get(&address)?;
                (address, MarkupPost::parse_page(&text).map(ThreadDocument::Page))
            }
        };
        document.map_err(|source| FetchError::Decode {
            url: address,
            source,
        })
    }

    // the web catalog is rendered client side, so this is always json
    fn catalog(&self, board: &str) -> Result<Vec<CatalogPage>, FetchError> {
        let address = catalog_url(board);
        let text = self.get(&address)?;
        parse_catalog(&text).map_err(|source| FetchError::Decode {
            url: address,
            source,
        })
    }
}
