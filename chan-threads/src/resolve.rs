use chan_ref::ThreadUrl;
use log::{debug, info};

use crate::{Config, Error, Source};

/// Search the board catalog for the thread currently carrying the followed subject.
///
/// Pages are walked in listing order, at most `config.max_pages` of them, and the
/// first match wins. See [`chan_msg::CatalogThread::has_subject`] for matching.
pub fn find_thread<S: Source + ?Sized>(source: &S, config: &Config) -> Result<ThreadUrl, Error> {
    let pages = source.catalog(&config.board)?;

    for page in pages.iter().take(config.max_pages) {
        if let Some(thread) = page
            .threads
            .iter()
            .find(|thread| thread.has_subject(&config.subject))
        {
            let url = ThreadUrl::new(config.board.clone(), thread.no);
            debug!("Found {} on catalog page {}", url, page.page);
            return Ok(url);
        }
    }

    info!("Thread not found: {}", config.subject);
    Err(Error::NotFound {
        board: config.board.clone(),
        subject: config.subject.clone(),
    })
}
