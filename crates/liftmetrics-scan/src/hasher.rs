//! BLAKE3 digests of files and directories.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use blake3::Hasher;

use liftmetrics_core::{Digest, LiftError};

/// Files above this size are hashed through a memory map.
const MMAP_THRESHOLD: u64 = 128 * 1024;

/// Buffer size for streamed hashing.
const READ_BUFFER: usize = 64 * 1024;

/// Digest of an entry together with the bytes it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hashed {
    pub digest: Digest,
    /// File length, or the total of all regular files below a directory.
    pub size: u64,
}

/// Entries already hashed during a run, keyed by path.
///
/// Directory digests are built from their children, so hashing a tree
/// children-first with one cache reads every file once.
#[derive(Debug, Default)]
pub struct DigestCache {
    entries: HashMap<PathBuf, Hashed>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Hashed> {
        self.entries.get(path).copied()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, hashed: Hashed) {
        self.entries.insert(path.into(), hashed);
    }
}

/// Computes file and directory digests.
///
/// A directory digest is fed, in name order, with one tagged entry per child:
/// the child's file digest or, recursively, its directory digest. File names
/// themselves do not contribute, so two directories holding the same contents
/// under different names are equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentHasher;

impl ContentHasher {
    /// Create a new hasher.
    pub fn new() -> Self {
        Self
    }

    /// Digest and length of a file's raw bytes.
    pub fn hash_file(&self, path: &Path) -> Result<Hashed, LiftError> {
        let file = File::open(path).map_err(|e| LiftError::FileUnreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        let size = file.metadata().map_err(|e| LiftError::io(path, e))?.len();

        if size > MMAP_THRESHOLD {
            // SAFETY: the deduplicator is the only writer of the tree while it runs.
            let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| LiftError::io(path, e))?;
            return Ok(Hashed {
                digest: Digest::new(*blake3::hash(&mmap).as_bytes()),
                size,
            });
        }

        let mut hasher = Hasher::new();
        let mut buffer = vec![0u8; READ_BUFFER];
        let mut file = file;
        loop {
            let bytes_read = file.read(&mut buffer).map_err(|e| LiftError::io(path, e))?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(Hashed {
            digest: Digest::new(*hasher.finalize().as_bytes()),
            size,
        })
    }

    /// Digest of a directory, computed from its current children.
    pub fn hash_dir(&self, path: &Path) -> Result<Hashed, LiftError> {
        self.hash_dir_cached(path, &mut DigestCache::new())
    }

    /// Like [`hash_dir`](Self::hash_dir), reusing and filling `cache`.
    pub fn hash_dir_cached(&self, path: &Path, cache: &mut DigestCache) -> Result<Hashed, LiftError> {
        if let Some(hashed) = cache.get(path) {
            return Ok(hashed);
        }

        let mut hasher = Hasher::new();
        let mut size = 0;
        for child in sorted_children(path)? {
            let file_type = fs::symlink_metadata(&child)
                .map_err(|e| LiftError::io(&child, e))?
                .file_type();
            let (tag, hashed) = if file_type.is_dir() {
                (b"d", self.hash_dir_cached(&child, cache)?)
            } else if file_type.is_file() {
                let hashed = match cache.get(&child) {
                    Some(hashed) => hashed,
                    None => self.hash_file(&child)?,
                };
                (b"f", hashed)
            } else {
                continue;
            };
            hasher.update(tag);
            hasher.update(hashed.digest.as_bytes());
            size += hashed.size;
        }

        let hashed = Hashed {
            digest: Digest::new(*hasher.finalize().as_bytes()),
            size,
        };
        cache.insert(path, hashed);
        Ok(hashed)
    }
}

/// Children of `path`, sorted by file name.
fn sorted_children(path: &Path) -> Result<Vec<PathBuf>, LiftError> {
    let mut children = fs::read_dir(path)
        .map_err(|e| LiftError::io(path, e))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LiftError::io(path, e))?;
    children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_file_equal_content() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("a.csv"), "id,_mb1s\n1,1\n").unwrap();
        fs::write(root.join("b.csv"), "id,_mb1s\n1,1\n").unwrap();
        fs::write(root.join("c.csv"), "id,_mb1s\n1,0\n").unwrap();

        let hasher = ContentHasher::new();
        let a = hasher.hash_file(&root.join("a.csv")).unwrap();
        let b = hasher.hash_file(&root.join("b.csv")).unwrap();
        let c = hasher.hash_file(&root.join("c.csv")).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_large_file_matches_streamed_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("big.csv");
        let content = "1,1,3\n".repeat(40_000);
        fs::write(&path, &content).unwrap();

        let hashed = ContentHasher::new().hash_file(&path).unwrap();
        assert_eq!(hashed.digest.as_bytes(), blake3::hash(content.as_bytes()).as_bytes());
        assert_eq!(hashed.size, content.len() as u64);
    }

    #[test]
    fn test_empty_files_hash_equal() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("x.csv"), "").unwrap();
        fs::write(temp.path().join("y.csv"), "").unwrap();

        let hasher = ContentHasher::new();
        assert_eq!(
            hasher.hash_file(&temp.path().join("x.csv")).unwrap(),
            hasher.hash_file(&temp.path().join("y.csv")).unwrap()
        );
    }

    #[test]
    fn test_dir_digest_ignores_names_but_not_order() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        for (dir, first, second) in [("one", "a", "b"), ("two", "c", "d"), ("three", "b", "a")] {
            fs::create_dir(root.join(dir)).unwrap();
            fs::write(root.join(dir).join(first), "first").unwrap();
            fs::write(root.join(dir).join(second), "second").unwrap();
        }

        let hasher = ContentHasher::new();
        let one = hasher.hash_dir(&root.join("one")).unwrap();
        let two = hasher.hash_dir(&root.join("two")).unwrap();
        let three = hasher.hash_dir(&root.join("three")).unwrap();

        assert_eq!(one, two);
        assert_eq!(one.size, 11);
        // Same bytes under swapped names sort into a different sequence
        assert_ne!(one, three);
    }

    #[test]
    fn test_cached_dir_digest_matches_fresh() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("site/lift")).unwrap();
        fs::write(root.join("site/lift/S-L1-a.csv"), "id\n1\n").unwrap();
        fs::write(root.join("site/notes.txt"), "n").unwrap();

        let hasher = ContentHasher::new();
        let mut cache = DigestCache::new();
        let inner = hasher.hash_dir_cached(&root.join("site/lift"), &mut cache).unwrap();
        assert_eq!(cache.get(&root.join("site/lift")), Some(inner));

        let outer = hasher.hash_dir_cached(&root.join("site"), &mut cache).unwrap();
        assert_eq!(outer, hasher.hash_dir(&root.join("site")).unwrap());
        assert_eq!(outer.size, 6);
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let err = ContentHasher::new()
            .hash_file(Path::new("/no/such/file.csv"))
            .unwrap_err();
        assert!(matches!(err, LiftError::FileUnreadable { .. }));
    }
}
