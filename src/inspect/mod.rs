// src/inspect/mod.rs

//! File tree inspection: sizes and checksums.
//!
//! The stability detector only talks to the [`Inspector`] trait. The
//! production implementation, [`FsInspector`], walks a [`FileSystem`] and
//! hashes file contents with BLAKE3. Both the walk and the hashing run on
//! tokio's blocking pool.

pub mod hash;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use futures::future::BoxFuture;
use tracing::debug;

use crate::fs::{FileSystem, RealFileSystem};

pub use hash::compute_file_hash;

/// Capability the stability detector consumes.
pub trait Inspector: Send + Sync {
    /// Every regular file at or beneath `path`, mapped to its byte size.
    ///
    /// A path that does not exist is an error.
    fn sizes_under<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<BTreeMap<PathBuf, u64>>>;

    /// Content checksum of a single file.
    fn checksum<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>>;
}

/// Inspector over a [`FileSystem`].
#[derive(Debug, Clone)]
pub struct FsInspector {
    fs: Arc<dyn FileSystem>,
}

impl FsInspector {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Inspector over the real filesystem.
    pub fn real() -> Self {
        Self::new(Arc::new(RealFileSystem))
    }
}

fn walk(fs: &dyn FileSystem, path: &Path, out: &mut BTreeMap<PathBuf, u64>) -> Result<()> {
    if fs.is_file(path) {
        out.insert(path.to_path_buf(), fs.file_len(path)?);
        return Ok(());
    }

    if fs.is_dir(path) {
        for child in fs.read_dir(path)? {
            walk(fs, &child, out)?;
        }
        return Ok(());
    }

    Err(anyhow!("path vanished during inspection: {:?}", path))
}

impl Inspector for FsInspector {
    fn sizes_under<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<BTreeMap<PathBuf, u64>>> {
        let fs = Arc::clone(&self.fs);
        let root = path.to_path_buf();
        Box::pin(async move {
            let sizes = tokio::task::spawn_blocking(move || {
                let mut sizes = BTreeMap::new();
                walk(fs.as_ref(), &root, &mut sizes).map(|()| sizes)
            })
            .await
            .context("size walk task failed")??;
            debug!(?path, files = sizes.len(), "collected sizes");
            Ok(sizes)
        })
    }

    fn checksum<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<String>> {
        let fs = Arc::clone(&self.fs);
        let file = path.to_path_buf();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || compute_file_hash(fs.as_ref(), &file))
                .await
                .context("hashing task failed")?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[tokio::test]
    async fn sizes_cover_every_file_beneath_a_directory() {
        let fs = MockFileSystem::new();
        fs.add_file("inbox/batch/1.csv", "one");
        fs.add_file("inbox/batch/deep/2.csv", "twotwo");
        fs.add_file("inbox/other.txt", "x");

        let inspector = FsInspector::new(Arc::new(fs));
        let sizes = inspector
            .sizes_under(Path::new("inbox/batch"))
            .await
            .unwrap();

        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[Path::new("inbox/batch/1.csv")], 3);
        assert_eq!(sizes[Path::new("inbox/batch/deep/2.csv")], 6);
    }

    #[tokio::test]
    async fn single_file_maps_to_itself() {
        let fs = MockFileSystem::new();
        fs.add_file("a.txt", "hello");

        let inspector = FsInspector::new(Arc::new(fs));
        let sizes = inspector.sizes_under(Path::new("a.txt")).await.unwrap();

        assert_eq!(sizes.into_iter().collect::<Vec<_>>(), vec![(PathBuf::from("a.txt"), 5)]);
    }

    #[tokio::test]
    async fn vanished_path_is_an_error() {
        let inspector = FsInspector::new(Arc::new(MockFileSystem::new()));
        assert!(inspector.sizes_under(Path::new("nope")).await.is_err());
        assert!(inspector.checksum(Path::new("nope")).await.is_err());
    }

    /// Blocks in `open_read` until the test lets it continue.
    #[derive(Debug)]
    struct GatedFs {
        inner: MockFileSystem,
        gate: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl FileSystem for GatedFs {
        fn open_read(&self, path: &Path) -> Result<Box<dyn std::io::Read + Send>> {
            self.gate
                .lock()
                .unwrap()
                .recv_timeout(std::time::Duration::from_secs(2))
                .map_err(|_| anyhow!("gate never opened"))?;
            self.inner.open_read(path)
        }
        fn file_len(&self, path: &Path) -> Result<u64> {
            self.inner.file_len(path)
        }
        fn exists(&self, path: &Path) -> bool {
            self.inner.exists(path)
        }
        fn is_file(&self, path: &Path) -> bool {
            self.inner.is_file(path)
        }
        fn is_dir(&self, path: &Path) -> bool {
            self.inner.is_dir(path)
        }
        fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
            self.inner.read_dir(path)
        }
        fn create_dir_all(&self, path: &Path) -> Result<()> {
            self.inner.create_dir_all(path)
        }
        fn remove_dir(&self, path: &Path) -> Result<()> {
            self.inner.remove_dir(path)
        }
        fn rename(&self, from: &Path, to: &Path) -> Result<()> {
            self.inner.rename(from, to)
        }
    }

    // Single-threaded runtime: if hashing ran inline, the sibling branch
    // could never open the gate.
    #[tokio::test(flavor = "current_thread")]
    async fn hashing_leaves_the_runtime_free() {
        let inner = MockFileSystem::new();
        inner.add_file("big.bin", "payload");
        let (open, gate) = std::sync::mpsc::channel();
        let inspector = FsInspector::new(Arc::new(GatedFs {
            inner,
            gate: std::sync::Mutex::new(gate),
        }));

        let (sum, ()) = tokio::join!(inspector.checksum(Path::new("big.bin")), async {
            open.send(()).unwrap();
        });

        assert_eq!(sum.unwrap().len(), 64);
    }
}
