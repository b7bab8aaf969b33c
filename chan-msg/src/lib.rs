// https://github.com/4chan/4chan-API/tree/master/pages

use chan_ref::media_url;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnError};
use thiserror::Error as ThisError;

pub mod markup;
pub use markup::MarkupPost;

#[derive(Debug, ThisError)]
pub enum MsgError {
    #[error("Failed to decode json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Post markup is missing {field}: {post}")]
    MissingField { field: &'static str, post: String },
}

/// The fields every raw post exposes, whichever format it was fetched in.
pub trait RawRecord {
    fn id(&self) -> u64;
    fn author(&self) -> &str;
    /// Html fragment of the post body, absent for image-only posts.
    fn markup(&self) -> Option<&str>;
    fn media_url(&self, board: &str) -> Option<String>;
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApiThread {
    pub posts: Vec<ApiPost>,
}

impl ApiThread {
    pub fn from_json(text: &str) -> Result<Self, MsgError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ApiPost {
    pub no: u64,
    #[serde(default)]
    pub name: String,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub com: Option<String>,
    // renamed upload timestamp, doubles as the media file name
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub tim: Option<u64>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub ext: Option<String>,
}

impl RawRecord for ApiPost {
    fn id(&self) -> u64 {
        self.no
    }

    fn author(&self) -> &str {
        self.name.as_str()
    }

    fn markup(&self) -> Option<&str> {
        self.com.as_deref()
    }

    fn media_url(&self, board: &str) -> Option<String> {
        let tim = self.tim?;
        let ext = self.ext.as_deref().unwrap_or(".jpg");
        Some(media_url(board, &tim.to_string(), ext))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub threads: Vec<CatalogThread>,
}

#[serde_as]
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CatalogThread {
    pub no: u64,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub sub: Option<String>,
}

impl CatalogThread {
    /// Exact match, or `/subject/` anywhere in a tagged subject like `/sqt/ - Questions`.
    /// Case-sensitive.
    pub fn has_subject(&self, subject: &str) -> bool {
        match self.sub.as_deref() {
            Some(sub) => sub == subject || sub.contains(&format!("/{}/", subject)),
            None => false,
        }
    }
}

pub fn parse_catalog(text: &str) -> Result<Vec<CatalogPage>, MsgError> {
    Ok(serde_json::from_str(text)?)
}
