// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir,
}

/// In-memory filesystem whose contents can be changed while a detector or a
/// scheduler pass is in flight.
///
/// Paths are normalised by dropping `.` components, so `"./a.txt"` and
/// `"a.txt"` address the same entry and `"."` is the root. Parent
/// directories of added files exist implicitly.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<BTreeMap<PathBuf, MockEntry>>>,
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a file.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(normalize(path.as_ref()), MockEntry::File(content.into()));
    }

    /// Append to a file, creating it if needed. Simulates a slow writer.
    pub fn append(&self, path: impl AsRef<Path>, content: impl AsRef<[u8]>) {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .entry(normalize(path.as_ref()))
            .or_insert_with(|| MockEntry::File(Vec::new()));
        if let MockEntry::File(bytes) = entry {
            bytes.extend_from_slice(content.as_ref());
        }
    }

    /// Remove a path and everything beneath it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let key = normalize(path.as_ref());
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|k, _| !k.starts_with(&key));
    }

    /// All file paths currently stored, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .filter(|(_, e)| matches!(e, MockEntry::File(_)))
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn has_descendant(entries: &BTreeMap<PathBuf, MockEntry>, key: &Path) -> bool {
        entries.keys().any(|k| k != key && k.starts_with(key))
    }
}

impl FileSystem for MockFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let entries = self.entries.lock().unwrap();
        match entries.get(&normalize(path)) {
            Some(MockEntry::File(content)) => Ok(Box::new(Cursor::new(content.clone()))),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn file_len(&self, path: &Path) -> Result<u64> {
        let entries = self.entries.lock().unwrap();
        match entries.get(&normalize(path)) {
            Some(MockEntry::File(content)) => Ok(content.len() as u64),
            Some(MockEntry::Dir) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let entries = self.entries.lock().unwrap();
        matches!(entries.get(&normalize(path)), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let key = normalize(path);
        if key.as_os_str().is_empty() {
            return true;
        }
        let entries = self.entries.lock().unwrap();
        matches!(entries.get(&key), Some(MockEntry::Dir)) || Self::has_descendant(&entries, &key)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !self.is_dir(path) {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }

        let key = normalize(path);
        let entries = self.entries.lock().unwrap();
        let mut children: Vec<PathBuf> = Vec::new();

        for k in entries.keys() {
            let Ok(rest) = k.strip_prefix(&key) else {
                continue;
            };
            if let Some(first) = rest.components().next() {
                let child = path.join(first.as_os_str());
                if !children.contains(&child) {
                    children.push(child);
                }
            }
        }

        Ok(children)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let key = normalize(path);
        let mut entries = self.entries.lock().unwrap();
        if let Some(MockEntry::File(_)) = entries.get(&key) {
            return Err(anyhow!("Is a file: {:?}", path));
        }
        entries.insert(key, MockEntry::Dir);
        Ok(())
    }

    fn remove_dir(&self, path: &Path) -> Result<()> {
        let key = normalize(path);
        let mut entries = self.entries.lock().unwrap();
        if Self::has_descendant(&entries, &key) {
            return Err(anyhow!("Directory not empty: {:?}", path));
        }
        match entries.get(&key) {
            Some(MockEntry::Dir) => {
                entries.remove(&key);
                Ok(())
            }
            Some(MockEntry::File(_)) => Err(anyhow!("Not a directory: {:?}", path)),
            None => Err(anyhow!("Directory not found: {:?}", path)),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let from_key = normalize(from);
        let to_key = normalize(to);
        let mut entries = self.entries.lock().unwrap();

        let moved: Vec<PathBuf> = entries
            .keys()
            .filter(|k| k.starts_with(&from_key))
            .cloned()
            .collect();

        if moved.is_empty() {
            return Err(anyhow!("File not found: {:?}", from));
        }

        for old in moved {
            if let Some(entry) = entries.remove(&old) {
                let rest = old.strip_prefix(&from_key).unwrap_or(Path::new(""));
                let new = if rest.as_os_str().is_empty() {
                    to_key.clone()
                } else {
                    to_key.join(rest)
                };
                entries.insert(new, entry);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_dir_lists_direct_children_once() {
        let fs = MockFileSystem::new();
        fs.add_file("inbox/a.txt", "a");
        fs.add_file("inbox/batch/1.csv", "1");
        fs.add_file("inbox/batch/2.csv", "2");

        let mut children = fs.read_dir(Path::new("inbox")).unwrap();
        children.sort();
        assert_eq!(
            children,
            vec![PathBuf::from("inbox/a.txt"), PathBuf::from("inbox/batch")]
        );
        assert!(fs.is_dir(Path::new("inbox/batch")));
        assert!(fs.read_dir(Path::new("missing")).is_err());
    }

    #[test]
    fn rename_moves_whole_subtree() {
        let fs = MockFileSystem::new();
        fs.add_file("inbox/batch/1.csv", "1");
        fs.add_file("inbox/batch/2.csv", "22");

        fs.rename(Path::new("inbox/batch"), Path::new("runs/x/batch"))
            .unwrap();

        assert_eq!(
            fs.files(),
            vec![
                PathBuf::from("runs/x/batch/1.csv"),
                PathBuf::from("runs/x/batch/2.csv")
            ]
        );
        assert_eq!(fs.file_len(Path::new("runs/x/batch/2.csv")).unwrap(), 2);
        assert!(fs.rename(Path::new("inbox/batch"), Path::new("y")).is_err());
    }

    #[test]
    fn append_grows_a_file_and_current_dir_prefix_is_ignored() {
        let fs = MockFileSystem::new();
        fs.append("./log.txt", "ab");
        fs.append("log.txt", "cd");

        assert_eq!(fs.file_len(Path::new("log.txt")).unwrap(), 4);
        assert!(fs.is_dir(Path::new(".")));
    }
}
