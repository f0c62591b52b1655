//! Run directories: result records and the append-only cache file

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cache::CacheEntry;
use crate::engine::ResultRecord;
use crate::error::Result;

pub const CACHE_FILE: &str = "cache.jsonl";
const RUN_PREFIX: &str = "run";

/// Output directory of one run, `<root>/run<N>`
pub struct RunDirectory {
    path: PathBuf,
    next_result: u64,
    cache: Option<BufWriter<File>>,
}

fn run_number(name: &str) -> Option<u64> {
    name.strip_prefix(RUN_PREFIX)?.parse().ok()
}

impl RunDirectory {
    /// Allocate the next free run directory under `root`. Directory creation
    /// is the allocation step, so engines sharing a root never collide.
    pub fn create(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        let mut number = 1;
        for entry in fs::read_dir(root)? {
            let entry = entry?;
            if let Some(n) = entry.file_name().to_str().and_then(run_number) {
                number = number.max(n + 1);
            }
        }

        loop {
            let path = root.join(format!("{}{}", RUN_PREFIX, number));
            match fs::create_dir(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "allocated run directory");
                    return Ok(Self {
                        path,
                        next_result: 1,
                        cache: None,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => number += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cache_path(&self) -> PathBuf {
        self.path.join(CACHE_FILE)
    }

    /// Append one cache entry as a JSON line
    pub fn append_cache(&mut self, entry: &CacheEntry) -> Result<()> {
        if self.cache.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(self.cache_path())?;
            self.cache = Some(BufWriter::new(file));
        }
        if let Some(writer) = self.cache.as_mut() {
            serde_json::to_writer(&mut *writer, entry)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Write a result record as `<id>.json`, ids counting up from 1
    pub fn write_result(&mut self, record: &ResultRecord) -> Result<PathBuf> {
        let path = self.path.join(format!("{}.json", self.next_result));
        self.next_result += 1;
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(path)
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(writer) = self.cache.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for RunDirectory {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Read the result records of a run directory in id order
pub fn read_results(dir: &Path) -> Result<Vec<ResultRecord>> {
    let mut numbered = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let id = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_suffix(".json"))
            .and_then(|stem| stem.parse::<u64>().ok());
        if let Some(id) = id {
            numbered.push((id, path));
        }
    }
    numbered.sort();

    let mut records = Vec::with_capacity(numbered.len());
    for (_, path) in numbered {
        records.push(serde_json::from_str(&fs::read_to_string(path)?)?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Terminal;
    use crate::symbolic::SymbolicContext;

    #[test]
    fn test_run_numbers_increase() {
        let root = tempfile::tempdir().unwrap();
        let first = RunDirectory::create(root.path()).unwrap();
        let second = RunDirectory::create(root.path()).unwrap();
        assert!(first.path().ends_with("run1"));
        assert!(second.path().ends_with("run2"));

        fs::create_dir(root.path().join("run7")).unwrap();
        fs::create_dir(root.path().join("notes")).unwrap();
        let third = RunDirectory::create(root.path()).unwrap();
        assert!(third.path().ends_with("run8"));
    }

    #[test]
    fn test_results_are_numbered_from_one() {
        let root = tempfile::tempdir().unwrap();
        let mut run = RunDirectory::create(root.path()).unwrap();
        let record = ResultRecord {
            witnesses: Vec::new(),
            terminal: Terminal::ReachedEnd,
        };
        let first = run.write_result(&record).unwrap();
        let second = run.write_result(&record).unwrap();
        assert!(first.ends_with("1.json"));
        assert!(second.ends_with("2.json"));
        assert_eq!(read_results(run.path()).unwrap(), vec![record.clone(), record]);
    }

    #[test]
    fn test_cache_lines_append() {
        let root = tempfile::tempdir().unwrap();
        let mut run = RunDirectory::create(root.path()).unwrap();
        let entry = CacheEntry::snapshot(&SymbolicContext::default(), None, None);
        run.append_cache(&entry).unwrap();
        run.append_cache(&entry).unwrap();
        run.flush().unwrap();

        let entries = crate::cache::read_cache(&run.cache_path()).unwrap();
        assert_eq!(entries, vec![entry.clone(), entry]);
        // The cache file is not a result record
        assert_eq!(read_results(run.path()).unwrap().len(), 0);
    }
}
