use chan_ref::{deep_link, referenced_ids, RefError, ThreadUrl};
use lazy_static::lazy_static;
use log::trace;
use scraper::{Html, Selector};
use thiserror::Error as ThisError;

/// Column width of the rendered output.
pub const WIDTH: usize = 69;

/// The source force-wraps long words with a soft break every this many characters.
const SOFT_BREAK_INTERVAL: usize = 35;

#[derive(Debug, ThisError)]
pub enum MarkupError {
    #[error("Failed to classify post link: {0}")]
    Link(#[from] RefError),
}

/// A post body turned back into plain text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Body {
    pub text: String,
    /// Ids of posts linked from the body, in document order.
    pub referenced_ids: Vec<u64>,
}

pub fn reconstruct(markup: &str, thread: &ThreadUrl) -> Result<Body, MarkupError> {
    let fragment = Html::parse_fragment(markup);

    let referenced_ids = referenced_ids(link_hrefs(&fragment))?;
    let lines = wrap_lines(clean_lines(&text_segments(&fragment), thread));
    trace!(
        "reconstructed body: {} lines, {} links",
        lines.len(),
        referenced_ids.len()
    );

    Ok(Body {
        text: lines.join("\n"),
        referenced_ids,
    })
}

fn link_hrefs(fragment: &Html) -> impl Iterator<Item = &str> {
    lazy_static! {
        static ref LINK: Selector = Selector::parse("a[href]").unwrap();
    }
    fragment
        .select(&LINK)
        .filter_map(|anchor| anchor.value().attr("href"))
}

/// Every text node on its own line. Line breaks, links and soft breaks all end a segment.
fn text_segments(fragment: &Html) -> Vec<String> {
    let text: Vec<&str> = fragment.root_element().text().collect();
    text.join("\n").split('\n').map(str::to_string).collect()
}

/// Classify and merge raw text segments into output lines. Pure, no markup involved.
pub fn clean_lines<S: AsRef<str>>(segments: &[S], thread: &ThreadUrl) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();

    for segment in segments {
        let segment = segment.as_ref();
        if segment.trim().is_empty() {
            continue;
        }

        if segment.starts_with(">>>") {
            lines.push(format!("[{}]", deep_link(segment.trim_start_matches('>'))));
        } else if let Some(id) = quoted_post(segment) {
            lines.push(format!("[{}]", thread.post_url(id)));
        } else if segment.starts_with("http") {
            lines.push(segment.to_string());
        } else if let Some(last) = lines.last_mut().filter(|last| is_broken_url(last)) {
            last.push_str(segment);
        } else {
            lines.push(segment.to_string());
        }
    }

    lines
}

/// `>>123` -> `123`. Anything else after two chevrons is plain text.
fn quoted_post(segment: &str) -> Option<&str> {
    let rest = segment.strip_prefix(">>")?;
    rest.starts_with(|c: char| c.is_ascii_digit())
        .then_some(rest)
}

// There is no way to tell when a url is complete, but all urls contain http
// and the pieces the source cut them into are a fixed length.
// TODO: a url preceded by other text on the same line is never merged
fn is_broken_url(line: &str) -> bool {
    if !line.contains("http") {
        return false;
    }
    match line.split_whitespace().last() {
        Some(token) => token.chars().count() % SOFT_BREAK_INTERVAL == 0,
        None => false,
    }
}

/// Reflow prose to [`WIDTH`]. Lines with a url stay whole.
pub fn wrap_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| {
            if line.contains("http") {
                line
            } else {
                textwrap::fill(&line, WIDTH)
            }
        })
        .filter(|line| !line.is_empty())
        .collect()
}
