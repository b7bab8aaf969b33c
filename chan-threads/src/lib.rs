use std::{collections::BTreeSet, io};

use chan_markup::{reconstruct, Body, MarkupError, WIDTH};
use chan_msg::RawRecord;
use chan_ref::ThreadUrl;
use indexmap::IndexMap;
use log::info;
use thiserror::Error as ThisError;

pub mod follow;
pub mod pointer;
pub mod resolve;
pub mod source;

pub use follow::Follower;
pub use pointer::PointerStore;
pub use resolve::find_thread;
pub use source::{FetchError, Format, HttpSource, Source, ThreadDocument};

/// Only posts by this name are shown or considered for a reload.
pub const ANONYMOUS: &str = "Anonymous";

/// Opening posts link their predecessor with this, they must never trigger a reload.
const OPENING_MARKER: &str = "Previous:";

/// Below this many posts a link to an unseen post is more likely an old post than a new thread.
const RELOAD_MIN_POSTS: usize = 300;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Failed to reconstruct post {id}: {source}")]
    Post {
        id: u64,
        #[source]
        source: MarkupError,
    },
    #[error("Failed to fetch: {0}")]
    Fetch(#[from] FetchError),
    #[error("Thread not found: /{board}/ {subject}")]
    NotFound { board: String, subject: String },
    #[error("Failed to read stored thread url, cause: {0}")]
    ReadPointer(#[source] io::Error),
    #[error("Failed to write stored thread url, cause: {0}")]
    WritePointer(#[source] io::Error),
}

/// What is being followed: one subject on one board.
#[derive(Clone, Debug)]
pub struct Config {
    pub board: String,
    pub subject: String,
    /// Catalog pages searched before giving up on the subject.
    pub max_pages: usize,
}

impl Config {
    pub const DEFAULT_MAX_PAGES: usize = 16;

    pub fn new(board: impl Into<String>, subject: impl Into<String>) -> Self {
        Self {
            board: board.into(),
            subject: subject.into(),
            max_pages: Self::DEFAULT_MAX_PAGES,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub id: u64,
    pub author: String,
    pub body: String,
    pub referenced_ids: Vec<u64>,
    pub media_url: Option<String>,
}

impl Post {
    pub fn from_record<R: RawRecord>(record: &R, thread: &ThreadUrl) -> Result<Self, Error> {
        let id = record.id();
        let Body {
            text,
            referenced_ids,
        } = match record.markup() {
            Some(markup) => {
                reconstruct(markup, thread).map_err(|source| Error::Post { id, source })?
            }
            None => Body::default(),
        };

        Ok(Self {
            id,
            author: record.author().to_string(),
            body: text,
            referenced_ids,
            media_url: record.media_url(&thread.board),
        })
    }

    pub fn is_anonymous(&self) -> bool {
        self.author == ANONYMOUS
    }

    /// Separator with the id, then the media url and the body when present.
    pub fn render(&self) -> String {
        let header = leftpad(&self.id.to_string());
        [
            Some(header.as_str()),
            self.media_url.as_deref(),
            Some(self.body.as_str()),
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
    }
}

/// The thread has ended; follow `target` from the next run on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReloadSignal {
    pub post_id: u64,
    pub target: ThreadUrl,
}

#[derive(Debug)]
pub struct Thread {
    pub url: ThreadUrl,
    pub posts: IndexMap<u64, Post>,
}

impl Thread {
    pub fn from_records<R: RawRecord>(url: ThreadUrl, records: &[R]) -> Result<Self, Error> {
        let mut posts = IndexMap::with_capacity(records.len());
        for record in records {
            let post = Post::from_record(record, &url)?;
            posts.insert(post.id, post);
        }
        Ok(Self { url, posts })
    }

    pub fn from_document(url: ThreadUrl, document: ThreadDocument) -> Result<Self, Error> {
        match document {
            ThreadDocument::Api(thread) => Self::from_records(url, &thread.posts),
            ThreadDocument::Page(posts) => Self::from_records(url, &posts),
        }
    }

    pub fn anonymous_posts(&self) -> impl Iterator<Item = &Post> {
        self.posts.values().filter(|post| post.is_anonymous())
    }

    /// Ids `post` links to that are not part of this thread.
    pub fn cross_ids(&self, post: &Post) -> BTreeSet<u64> {
        post.referenced_ids
            .iter()
            .copied()
            .filter(|id| !self.posts.contains_key(id))
            .collect()
    }

    /// The newest unseen post `post` links to, if that means the thread has moved on.
    pub fn reload_target(&self, post: &Post) -> Option<u64> {
        if self.posts.len() <= RELOAD_MIN_POSTS || post.body.contains(OPENING_MARKER) {
            return None;
        }
        self.cross_ids(post).into_iter().max()
    }

    /// Evaluated over every anonymous post; the last one to trigger wins.
    pub fn reload_signal(&self) -> Option<ReloadSignal> {
        self.anonymous_posts()
            .filter_map(|post| {
                self.reload_target(post).map(|target| ReloadSignal {
                    post_id: post.id,
                    target: ThreadUrl::new(self.url.board.clone(), target),
                })
            })
            .last()
    }

    pub fn render(&self) -> Vec<String> {
        let separator = leftpad(&self.url.web());
        let mut blocks = vec![separator.clone()];
        for post in self.anonymous_posts() {
            blocks.push(post.render());
            if let Some(target) = self.reload_target(post) {
                blocks.push(format!("WILL RELOAD: {}", target));
            }
        }
        blocks.push(separator);
        blocks
    }

    /// Write the thread to the log sink.
    pub fn display(&self) -> Option<ReloadSignal> {
        for block in self.render() {
            info!("{}", block);
        }
        self.reload_signal()
    }
}

fn leftpad(text: &str) -> String {
    format!("{:->width$}", text, width = WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chan_msg::ApiPost;

    fn record(no: u64, name: &str, com: Option<&str>) -> ApiPost {
        ApiPost {
            no,
            name: name.to_string(),
            com: com.map(str::to_string),
            tim: None,
            ext: None,
        }
    }

    fn quote(id: u64) -> String {
        format!(
            r##"<a href="#p{id}" class="quotelink">&gt;&gt;{id}</a>"##,
            id = id
        )
    }

    /// `count` anonymous posts numbered from 1, the last one carrying `last`.
    fn records(count: u64, last: &str) -> Vec<ApiPost> {
        let mut records: Vec<ApiPost> = (1..count)
            .map(|no| record(no, ANONYMOUS, Some("bump")))
            .collect();
        records.push(record(count, ANONYMOUS, Some(last)));
        records
    }

    fn thread(records: &[ApiPost]) -> Thread {
        Thread::from_records(ThreadUrl::new("g", 1), records).unwrap()
    }

    #[test]
    fn test_post_from_record() {
        let mut raw = record(5, ANONYMOUS, Some(&format!("{}<br>hello", quote(3))));
        raw.tim = Some(1700000000000);
        raw.ext = Some(".webm".to_string());
        let post = Post::from_record(&raw, &ThreadUrl::new("g", 1)).unwrap();

        assert_eq!(post.id, 5);
        assert!(post.is_anonymous());
        assert_eq!(post.referenced_ids, vec![3]);
        assert_eq!(
            post.body,
            "[https://boards.4chan.org/g/thread/1#p3]\nhello"
        );
        assert_eq!(
            post.media_url.as_deref(),
            Some("https://i.4cdn.org/g/1700000000000.webm")
        );
    }

    #[test]
    fn test_post_from_record_is_idempotent() {
        let raw = record(5, ANONYMOUS, Some("a<br>b"));
        let url = ThreadUrl::new("g", 1);
        assert_eq!(
            Post::from_record(&raw, &url).unwrap(),
            Post::from_record(&raw, &url).unwrap()
        );
    }

    #[test]
    fn test_post_with_bad_link() {
        let raw = record(5, ANONYMOUS, Some(r##"<a href="#pxyz">&gt;&gt;xyz</a>"##));
        let err = Post::from_record(&raw, &ThreadUrl::new("g", 1)).unwrap_err();
        assert!(matches!(err, Error::Post { id: 5, .. }));
    }

    #[test]
    fn test_post_render() {
        let mut post = Post::from_record(&record(42, ANONYMOUS, Some("hi")), &ThreadUrl::new("g", 1))
            .unwrap();
        let separator = format!("{}42", "-".repeat(WIDTH - 2));
        assert_eq!(post.render(), format!("{}\nhi", separator));

        post.media_url = Some("https://i.4cdn.org/g/1.jpg".to_string());
        post.body = String::new();
        assert_eq!(
            post.render(),
            format!("{}\nhttps://i.4cdn.org/g/1.jpg", separator)
        );
    }

    #[test]
    fn test_reload_signal_fires_past_threshold() {
        let thread = thread(&records(301, &quote(999999)));
        assert_eq!(
            thread.reload_signal(),
            Some(ReloadSignal {
                post_id: 301,
                target: ThreadUrl::new("g", 999999),
            })
        );
    }

    #[test]
    fn test_reload_signal_needs_more_than_threshold() {
        let thread = thread(&records(300, &quote(999999)));
        assert_eq!(thread.reload_signal(), None);
    }

    #[test]
    fn test_reload_signal_ignores_opening_post() {
        let body = format!("Previous: {}", quote(999999));
        let thread = thread(&records(301, &body));
        assert_eq!(thread.reload_signal(), None);
    }

    #[test]
    fn test_reload_signal_ignores_known_posts() {
        let thread = thread(&records(301, &quote(17)));
        assert_eq!(thread.reload_signal(), None);
    }

    #[test]
    fn test_reload_signal_ignores_named_posts() {
        let mut records = records(301, "bump");
        records.push(record(302, "tripfag", Some(&quote(999999))));
        assert_eq!(thread(&records).reload_signal(), None);
    }

    #[test]
    fn test_reload_signal_picks_highest_cross_id() {
        let body = [quote(500000), quote(12), quote(700000), quote(600000)].join("<br>");
        let thread = thread(&records(301, &body));
        let post = &thread.posts[&301];
        assert_eq!(
            thread.cross_ids(post).into_iter().collect::<Vec<u64>>(),
            vec![500000, 600000, 700000]
        );
        assert_eq!(thread.reload_signal().unwrap().target.id, 700000);
    }

    #[test]
    fn test_reload_signal_last_trigger_wins() {
        let mut records = records(301, &quote(800000));
        records.push(record(302, ANONYMOUS, Some(&quote(900000))));
        records.push(record(303, ANONYMOUS, Some("sage")));
        let signal = thread(&records).reload_signal().unwrap();
        assert_eq!(signal.post_id, 302);
        assert_eq!(signal.target, ThreadUrl::new("g", 900000));
    }

    #[test]
    fn test_render_thread() {
        let records = vec![
            record(1, ANONYMOUS, Some("op")),
            record(2, "named", Some("hidden")),
            record(3, ANONYMOUS, None),
        ];
        let blocks = thread(&records).render();
        let separator = leftpad("https://boards.4chan.org/g/thread/1");

        assert_eq!(blocks.len(), 4);
        assert_eq!(blocks[0], separator);
        assert_eq!(blocks[1], format!("{}1\nop", "-".repeat(WIDTH - 1)));
        assert_eq!(blocks[2], format!("{}3", "-".repeat(WIDTH - 1)));
        assert_eq!(blocks[3], separator);
    }

    #[test]
    fn test_render_marks_reload() {
        let blocks = thread(&records(301, &quote(999999))).render();
        assert_eq!(blocks[blocks.len() - 2], "WILL RELOAD: 999999");
    }

    #[test]
    fn test_repeated_id_keeps_last() {
        let records = vec![
            record(1, ANONYMOUS, Some("first")),
            record(1, ANONYMOUS, Some("second")),
        ];
        let thread = thread(&records);
        assert_eq!(thread.posts.len(), 1);
        assert_eq!(thread.posts[&1].body, "second");
    }
}
