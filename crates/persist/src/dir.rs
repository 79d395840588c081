use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use newsfeed_core::ContentKey;
use tracing::warn;

use crate::BlobStore;

/// One file per content address under `base_dir`. Hex keys never escape the
/// directory. Writes go through a uniquely named temp file and a rename so
/// readers never see a partial blob. Recency is the file's modification time,
/// bumped on every read.
pub struct DirStore {
    base_dir: PathBuf,
}

impl DirStore {
    pub fn open(base_dir: &Path) -> Result<Self> {
        fs::create_dir_all(base_dir).with_context(|| format!("creating {}", base_dir.display()))?;
        Ok(Self { base_dir: base_dir.to_path_buf() })
    }

    fn path_of(&self, key: &ContentKey) -> PathBuf { self.base_dir.join(key.to_hex()) }
}

fn touch(path: &Path) -> std::io::Result<()> {
    fs::File::options().write(true).open(path)?.set_modified(SystemTime::now())
}

impl BlobStore for DirStore {
    fn read(&self, key: &ContentKey) -> Result<Option<Vec<u8>>> {
        let path = self.path_of(key);
        match fs::read(&path) {
            Ok(data) => {
                if let Err(e) = touch(&path) {
                    warn!(key = %key, error = %e, "blob recency not updated");
                }
                Ok(Some(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading blob {}", key)),
        }
    }

    fn write(&self, key: &ContentKey, bytes: &[u8]) -> Result<()> {
        let path = self.path_of(key);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.base_dir).context("creating temp blob")?;
        tmp.write_all(bytes).with_context(|| format!("writing {}", tmp.path().display()))?;
        tmp.persist(&path).with_context(|| format!("renaming into {}", path.display()))?;
        Ok(())
    }

    fn trim(&self, keep: usize) -> Result<usize> {
        let mut files: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();
        for entry in fs::read_dir(&self.base_dir).context("listing blob dir")? {
            let entry = entry?;
            let path = entry.path();
            let is_blob = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| ContentKey::from_hex(n).is_some())
                .unwrap_or(false);
            if !is_blob {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            files.push((modified, path));
        }
        if files.len() <= keep {
            return Ok(0);
        }
        files.sort_by(|a, b| b.0.cmp(&a.0));
        let mut removed = 0;
        for (_, path) in files.into_iter().skip(keep) {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_and_miss() {
        let dir = tempfile::tempdir().unwrap();
        let s = DirStore::open(dir.path()).unwrap();
        let k = ContentKey::of("https://img/a.jpg?size=100&x=/../y");
        assert!(s.read(&k).unwrap().is_none());
        s.write(&k, b"jpeg").unwrap();
        assert_eq!(s.read(&k).unwrap().as_deref(), Some(&b"jpeg"[..]));
        assert!(dir.path().join(k.to_hex()).is_file());
    }

    #[test]
    fn trim_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("README"), b"not a blob").unwrap();
        let s = DirStore::open(dir.path()).unwrap();
        for i in 0..3 {
            s.write(&ContentKey::of(&format!("l{}", i)), b"x").unwrap();
        }
        assert_eq!(s.trim(1).unwrap(), 2);
        assert!(dir.path().join("README").exists());
    }

    #[test]
    fn read_refreshes_recency() {
        let dir = tempfile::tempdir().unwrap();
        let s = DirStore::open(dir.path()).unwrap();
        let a = ContentKey::of("https://img/a.jpg");
        let b = ContentKey::of("https://img/b.jpg");
        s.write(&a, b"a").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        s.write(&b, b"b").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert!(s.read(&a).unwrap().is_some());
        assert_eq!(s.trim(1).unwrap(), 1);
        assert!(s.read(&a).unwrap().is_some());
        assert!(s.read(&b).unwrap().is_none());
    }

    #[test]
    fn concurrent_writes_of_one_key_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let s = DirStore::open(dir.path()).unwrap();
        let k = ContentKey::of("https://img/shared.jpg");
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8).map(|_| scope.spawn(|| s.write(&k, b"same bytes"))).collect();
            for h in handles {
                h.join().unwrap().unwrap();
            }
        });
        assert_eq!(s.read(&k).unwrap().as_deref(), Some(&b"same bytes"[..]));
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
