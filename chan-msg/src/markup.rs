//! Records scraped from a rendered thread page instead of the json api.

use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};

use crate::{MsgError, RawRecord};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupPost {
    pub id: u64,
    pub author: String,
    pub markup: Option<String>,
    pub media: Option<String>,
}

fn selector(css: &'static str) -> Selector {
    Selector::parse(css).unwrap()
}

lazy_static! {
    static ref POST: Selector = selector("div.post");
    static ref NAME: Selector = selector(".postInfo .name");
    static ref MESSAGE: Selector = selector("blockquote.postMessage");
    static ref FILE_THUMB: Selector = selector("a.fileThumb");
}

impl MarkupPost {
    /// Every post element of a thread page, in document order.
    pub fn parse_page(html: &str) -> Result<Vec<Self>, MsgError> {
        let document = Html::parse_document(html);
        document.select(&POST).map(Self::from_element).collect()
    }

    fn from_element(element: ElementRef<'_>) -> Result<Self, MsgError> {
        let id = element
            .value()
            .id()
            .and_then(|id| id.strip_prefix('p'))
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| MsgError::MissingField {
                field: "id",
                post: element.html(),
            })?;

        let author = element
            .select(&NAME)
            .next()
            .map(|name| name.text().collect::<String>())
            .unwrap_or_default();

        let markup = element
            .select(&MESSAGE)
            .next()
            .map(|message| message.inner_html())
            .filter(|markup| !markup.trim().is_empty());

        let media = element
            .select(&FILE_THUMB)
            .next()
            .and_then(|thumb| thumb.value().attr("href"))
            .map(|href| match href.strip_prefix("//") {
                Some(rest) => format!("https://{}", rest),
                None => href.to_string(),
            });

        Ok(Self {
            id,
            author,
            markup,
            media,
        })
    }
}

impl RawRecord for MarkupPost {
    fn id(&self) -> u64 {
        self.id
    }

    fn author(&self) -> &str {
        self.author.as_str()
    }

    fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }

    // the page already links the file with its board baked in
    fn media_url(&self, _board: &str) -> Option<String> {
        self.media.clone()
    }
}
