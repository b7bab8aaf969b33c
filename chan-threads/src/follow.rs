use chan_ref::ThreadUrl;
use log::info;

use crate::{find_thread, Config, Error, FetchError, PointerStore, ReloadSignal, Source, Thread};

/// One run: find the followed thread, show it, and remember where it continues.
pub struct Follower<'a, S: Source + ?Sized> {
    source: &'a S,
    store: &'a PointerStore,
    config: &'a Config,
}

impl<'a, S: Source + ?Sized> Follower<'a, S> {
    pub fn new(source: &'a S, store: &'a PointerStore, config: &'a Config) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    fn relocate(&self) -> Result<ThreadUrl, Error> {
        let url = find_thread(self.source, self.config)?;
        self.store.save(&url)?;
        Ok(url)
    }

    /// Fetch and build the thread. A pruned thread is looked up again, once per run.
    pub fn fetch(&self) -> Result<Thread, Error> {
        let url = match self.store.load()? {
            Some(url) => url,
            // resolved here, a Gone from it is final
            None => return self.fetch_resolved(),
        };
        match self.source.thread(&url) {
            Ok(document) => Thread::from_document(url, document),
            Err(FetchError::Gone { .. }) => {
                info!("Gone: {}, finding new thread...", url);
                self.fetch_resolved()
            }
            Err(err) => Err(err.into()),
        }
    }

    fn fetch_resolved(&self) -> Result<Thread, Error> {
        let url = self.relocate()?;
        let document = self.source.thread(&url)?;
        Thread::from_document(url, document)
    }

    /// Display the thread and persist its successor if it has one.
    ///
    /// The successor itself is only fetched by the next run.
    pub fn run(&self) -> Result<Option<ReloadSignal>, Error> {
        let thread = self.fetch()?;
        let signal = thread.display();
        if let Some(signal) = &signal {
            self.store.save(&signal.target)?;
        }
        Ok(signal)
    }
}
