// https://github.com/4chan/4chan-API

use lazy_static::lazy_static;
use regex::Regex;
use std::{convert::TryFrom, fmt, num::ParseIntError};
use thiserror::Error as ThisError;
use urlencoding::encode;

/// Human-browsable site root, used for deep links and canonical thread urls.
pub const SITE_ROOT: &str = "https://boards.4chan.org";
pub const API_ROOT: &str = "https://a.4cdn.org";
pub const MEDIA_ROOT: &str = "https://i.4cdn.org";

#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum RefError {
    #[error("Does not match as {ref_type}: {input}")]
    BadFormat {
        ref_type: &'static str,
        input: String,
    },
    #[error("Failed to parse post id from reference {input}: {source}")]
    BadPostId {
        input: String,
        #[source]
        source: ParseIntError,
    },
}

/// What a single anchor href inside a post body points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PostLink {
    /// Absolute link with a post fragment, usually to another board. Never yields an id.
    CrossBoard,
    /// Link to a post on this board, either in this thread or another one.
    Thread(u64),
    NotALink,
}

impl PostLink {
    pub fn classify(href: &str) -> Result<Self, RefError> {
        if !href.contains("#p") {
            return Ok(PostLink::NotALink);
        }
        if href.contains("://") {
            return Ok(PostLink::CrossBoard);
        }

        // everything after the last `p`, e.g. `/g/thread/123#p456` -> 456
        let digits = href.rsplit('p').next().unwrap_or_default();
        digits
            .parse()
            .map(PostLink::Thread)
            .map_err(|source| RefError::BadPostId {
                input: href.to_string(),
                source,
            })
    }

    pub fn post_id(&self) -> Option<u64> {
        match self {
            PostLink::Thread(id) => Some(*id),
            _ => None,
        }
    }
}

/// Ids of every thread-local or cross-thread link in `hrefs`, in order.
pub fn referenced_ids<'a, I>(hrefs: I) -> Result<Vec<u64>, RefError>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ids = Vec::new();
    for href in hrefs {
        if let Some(id) = PostLink::classify(href)?.post_id() {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// A thread address, independent of whether it came from the web or api host.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ThreadUrl {
    pub board: String,
    pub id: u64,
}

impl ThreadUrl {
    pub fn new(board: impl Into<String>, id: u64) -> Self {
        Self {
            board: board.into(),
            id,
        }
    }

    pub fn from_string(string: String) -> Result<Self, RefError> {
        let regex = Self::single_regex();
        let caps = regex
            .captures(string.trim())
            .ok_or_else(|| RefError::BadFormat {
                ref_type: "Thread",
                input: string.clone(),
            })?;
        let board = caps["board"].to_string();
        let id = caps["id"].parse().map_err(|source| RefError::BadPostId {
            input: string.clone(),
            source,
        })?;
        Ok(Self { board, id })
    }

    pub fn single_regex() -> &'static Regex {
        lazy_static! {
            static ref RE: Regex = Regex::new(
                r"^https?://(?:boards\.4chan(?:nel)?\.org|a\.4cdn\.org)/(?P<board>[0-9a-z]+)/thread/(?P<id>[0-9]+)(?:\.json)?(?:[/#?].*)?$"
            )
            .unwrap();
        }
        &*RE
    }

    pub fn is_match(string: &str) -> bool {
        Self::single_regex().is_match(string.trim())
    }

    /// Canonical, human-browsable form. This is what gets persisted.
    pub fn web(&self) -> String {
        format!("{}/{}/thread/{}", SITE_ROOT, self.board, self.id)
    }

    pub fn api(&self) -> String {
        format!("{}/{}/thread/{}.json", API_ROOT, self.board, self.id)
    }

    pub fn post_url(&self, post_id: &str) -> String {
        format!("{}#p{}", self.web(), post_id)
    }
}

impl TryFrom<String> for ThreadUrl {
    type Error = RefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ThreadUrl::from_string(value)
    }
}

impl fmt::Display for ThreadUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.web())
    }
}

/// Rewrite an api address into its web form and drop any fragment.
pub fn to_web_url(url: &str) -> String {
    let url = url.split('#').next().unwrap_or_default();
    let url = url.replace("a.4cdn", "boards.4chan");
    url.strip_suffix(".json").unwrap_or(&url).to_string()
}

/// `path` is whatever follows the chevrons of a `>>>/board/...` line.
pub fn deep_link(path: &str) -> String {
    format!("{}{}", SITE_ROOT, path)
}

pub fn catalog_url(board: &str) -> String {
    format!("{}/{}/catalog.json", API_ROOT, board)
}

pub fn media_url(board: &str, file: &str, ext: &str) -> String {
    format!("{}/{}/{}{}", MEDIA_ROOT, board, file, ext)
}

/// File stem used for everything stored on behalf of one tracked subject.
pub fn subject_stem(board: &str, subject: &str) -> String {
    let key = format!("{}-{}", board, subject.to_lowercase());
    encode(key.as_str()).into_owned()
}
