// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Where sample payloads come from.

use std::io;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

/// Retrieves the raw bytes of a sample file.
pub trait SampleFetcher: Send + Sync {
    /// Fetches the payload at `path`, relative to wherever this fetcher reads
    /// from.
    fn fetch(&self, path: &Path) -> BoxFuture<'static, io::Result<Vec<u8>>>;
}

/// Reads samples from a directory on disk.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    base: PathBuf,
}

impl FileFetcher {
    pub fn new(base: &Path) -> FileFetcher {
        FileFetcher {
            base: base.to_path_buf(),
        }
    }
}

impl SampleFetcher for FileFetcher {
    fn fetch(&self, path: &Path) -> BoxFuture<'static, io::Result<Vec<u8>>> {
        let full_path = self.base.join(path);
        async move {
            tokio::fs::read(&full_path)
                .await
                .map_err(|e| io::Error::new(e.kind(), format!("{}: {}", full_path.display(), e)))
        }
        .boxed()
    }
}
