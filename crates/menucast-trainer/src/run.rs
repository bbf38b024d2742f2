//! Run directories `<work_dir>/logs/run_<version>/` and how versions are
//! picked.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use menucast_core::error::{ForecastError, Result};

pub const RUN_PREFIX: &str = "run_";
pub const COUNTER_FILE: &str = "run_counter";

/// Hands out run versions under a log root.
pub trait RunAllocator {
    /// Propose the next version for `log_root`. The root exists when this is
    /// called.
    fn next_version(&mut self, log_root: &Path) -> Result<u64>;
}

/// Versions from a counter file in the log root.
///
/// The first call seeds the counter from the highest existing `run_<n>`, so
/// foreign files in the log root never shift the numbering.
#[derive(Debug, Default, Clone, Copy)]
pub struct CounterFileAllocator;

impl RunAllocator for CounterFileAllocator {
    fn next_version(&mut self, log_root: &Path) -> Result<u64> {
        let counter = log_root.join(COUNTER_FILE);
        let next = match fs::read_to_string(&counter) {
            Ok(text) => text
                .trim()
                .parse::<u64>()
                .map_err(|e| ForecastError::parse(&counter, e))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                existing_versions(log_root)?.into_iter().max().map_or(0, |v| v + 1)
            }
            Err(e) => return Err(ForecastError::io(&counter, e)),
        };
        fs::write(&counter, (next + 1).to_string()).map_err(|e| ForecastError::io(&counter, e))?;
        Ok(next)
    }
}

/// Version = number of entries in the log root.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirCountAllocator;

impl RunAllocator for DirCountAllocator {
    fn next_version(&mut self, log_root: &Path) -> Result<u64> {
        let count = fs::read_dir(log_root)
            .map_err(|e| ForecastError::io(log_root, e))?
            .count();
        Ok(count as u64)
    }
}

/// Versions of every `run_<n>` directory under `log_root`.
pub fn existing_versions(log_root: &Path) -> Result<Vec<u64>> {
    let entries = fs::read_dir(log_root).map_err(|e| ForecastError::io(log_root, e))?;
    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ForecastError::io(log_root, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        if let Some(v) = entry
            .file_name()
            .to_str()
            .and_then(|name| name.strip_prefix(RUN_PREFIX))
            .and_then(|n| n.parse().ok())
        {
            versions.push(v);
        }
    }
    versions.sort_unstable();
    Ok(versions)
}

/// Parse the trailing `_<n>` of a directory name.
pub fn version_from_path(path: &Path) -> Option<u64> {
    let name = path.file_name()?.to_str()?;
    let (_, suffix) = name.rsplit_once('_')?;
    suffix.parse().ok()
}

/// One run's output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDirectory {
    path: PathBuf,
    version: u64,
}

impl RunDirectory {
    /// Create a fresh run directory under `log_root`.
    ///
    /// The directory is created exclusively; if the proposed version is
    /// already taken the allocator is asked again.
    pub fn allocate(log_root: &Path, allocator: &mut dyn RunAllocator) -> Result<Self> {
        const MAX_ATTEMPTS: usize = 64;

        fs::create_dir_all(log_root).map_err(|e| ForecastError::io(log_root, e))?;
        let mut version = allocator.next_version(log_root)?;
        for _ in 0..MAX_ATTEMPTS {
            let path = log_root.join(format!("{RUN_PREFIX}{version}"));
            match fs::create_dir(&path) {
                Ok(()) => {
                    log::info!("run directory {}", path.display());
                    return Ok(Self { path, version });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    log::debug!("{} exists, asking for another version", path.display());
                    let proposed = allocator.next_version(log_root)?;
                    version = if proposed > version { proposed } else { version + 1 };
                }
                Err(e) => return Err(ForecastError::io(&path, e)),
            }
        }
        Err(ForecastError::Config(format!(
            "could not allocate a run directory under {}",
            log_root.display()
        )))
    }

    /// Adopt an existing directory, taking the version from its `_<n>` suffix.
    pub fn from_existing(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(ForecastError::Config(format!(
                "run directory {} does not exist",
                path.display()
            )));
        }
        let version = version_from_path(path).ok_or_else(|| {
            ForecastError::Config(format!(
                "cannot infer a run version from {}",
                path.display()
            ))
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            version,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_from_path() {
        assert_eq!(version_from_path(Path::new("/w/logs/run_12")), Some(12));
        assert_eq!(version_from_path(Path::new("my_run_3")), Some(3));
        assert_eq!(version_from_path(Path::new("run_x")), None);
        assert_eq!(version_from_path(Path::new("latest")), None);
    }

    #[test]
    fn test_counter_allocator_is_monotonic() {
        let dir = tempfile::tempdir().unwrap();
        let mut alloc = CounterFileAllocator;
        let a = RunDirectory::allocate(dir.path(), &mut alloc).unwrap();
        let b = RunDirectory::allocate(dir.path(), &mut alloc).unwrap();
        assert_eq!(a.version(), 0);
        assert_eq!(b.version(), 1);
        assert!(b.path().ends_with("run_1"));
    }

    #[test]
    fn test_counter_allocator_seeds_from_existing_runs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("run_4")).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let run = RunDirectory::allocate(dir.path(), &mut CounterFileAllocator).unwrap();
        assert_eq!(run.version(), 5);
    }

    #[test]
    fn test_dir_count_allocator_skips_taken_versions() {
        let dir = tempfile::tempdir().unwrap();
        // one stray file and run_1: the count proposes 2, which is free
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::create_dir(dir.path().join("run_1")).unwrap();
        let run = RunDirectory::allocate(dir.path(), &mut DirCountAllocator).unwrap();
        assert_eq!(run.version(), 2);

        // now run_0 is missing but count says 3
        let next = RunDirectory::allocate(dir.path(), &mut DirCountAllocator).unwrap();
        assert_eq!(next.version(), 3);

        // a taken proposal is bumped instead of reused
        fs::create_dir(dir.path().join("run_5")).unwrap();
        let bumped = RunDirectory::allocate(dir.path(), &mut DirCountAllocator).unwrap();
        assert_eq!(bumped.version(), 6);
    }

    #[test]
    fn test_from_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run_7");
        fs::create_dir(&path).unwrap();
        let run = RunDirectory::from_existing(&path).unwrap();
        assert_eq!(run.version(), 7);
        assert_eq!(run.file("actual.csv"), path.join("actual.csv"));

        assert!(matches!(
            RunDirectory::from_existing(&dir.path().join("run_8")),
            Err(ForecastError::Config(_))
        ));
    }
}
