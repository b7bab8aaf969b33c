use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chan_ref::{to_web_url, ThreadUrl};
use log::{debug, warn};

use crate::Error;

/// The one piece of state kept between runs: the url of the thread being followed.
pub struct PointerStore {
    path: PathBuf,
}

impl PointerStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when nothing usable is stored yet.
    pub fn load(&self) -> Result<Option<ThreadUrl>, Error> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(Error::ReadPointer(err)),
        };

        let line = contents.trim();
        if line.is_empty() {
            return Ok(None);
        }
        match ThreadUrl::from_string(to_web_url(line)) {
            Ok(url) => {
                debug!("Loaded {} from {}", url, self.path.display());
                Ok(Some(url))
            }
            Err(err) => {
                warn!("Ignoring stored thread url: {}", err);
                Ok(None)
            }
        }
    }

    /// Always stores the fragment-free web form.
    pub fn save(&self, url: &ThreadUrl) -> Result<(), Error> {
        debug!("Storing {} in {}", url, self.path.display());
        fs::write(&self.path, format!("{}\n", url.web())).map_err(Error::WritePointer)
    }
}
