//! In-process stand-in for a set of nodes.
//!
//! Every node is a subdirectory of one temporary directory. Copies follow
//! rsync's rules for trailing slashes and `--files-from`, line transfers
//! follow `sed -n`.

#![allow(dead_code)]

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use distcopy::{DistcopyError, LineInterval, NodeRef, PathSpec, RemoteExecutor, Result, Transfer};

/// One finished (or failed) transfer, stamped with a logical clock.
#[derive(Debug, Clone)]
pub struct Event {
    pub src: PathSpec,
    pub dst: PathSpec,
    pub started: usize,
    pub finished: usize,
    pub ok: bool,
}

pub struct LocalCluster {
    dir: TempDir,
    delay: Duration,
    failing: Mutex<HashSet<NodeRef>>,
    events: Mutex<Vec<Event>>,
    clock: AtomicUsize,
}

impl LocalCluster {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            delay: Duration::ZERO,
            failing: Mutex::new(HashSet::new()),
            events: Mutex::new(vec![]),
            clock: AtomicUsize::new(0),
        }
    }

    /// Every transfer takes at least `delay`.
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay = Duration::from_millis(delay_ms);
        self
    }

    /// Transfers into `node` fail from now on.
    pub fn fail_transfers_to(&self, node: &str) {
        self.failing.lock().unwrap().insert(NodeRef::new(node));
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn local(&self, spec: &PathSpec) -> PathBuf {
        self.dir
            .path()
            .join(spec.node.as_str())
            .join(spec.path.trim_start_matches('/'))
    }

    pub fn write(&self, spec: &PathSpec, content: &str) {
        let path = self.local(spec);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    pub fn read(&self, spec: &PathSpec) -> String {
        fs::read_to_string(self.local(spec)).unwrap()
    }

    pub fn exists(&self, spec: &PathSpec) -> bool {
        self.local(spec).exists()
    }

    /// Sorted relative paths of every regular file under `spec`.
    pub fn tree(&self, spec: &PathSpec) -> Vec<String> {
        let root = self.local(spec);
        let mut files = vec![];
        if root.is_dir() {
            walk(&root, &root, &mut files).unwrap();
        }
        files.sort();
        files
    }

    async fn transfer<F>(&self, src: &PathSpec, dst: &PathSpec, work: F) -> Result<()>
    where
        F: FnOnce() -> io::Result<()>,
    {
        let started = self.clock.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let failing = self.failing.lock().unwrap().contains(&dst.node);
        let result = if failing {
            Err(DistcopyError::Transfer("Error during copy".to_string()))
        } else {
            work().map_err(|e| DistcopyError::Transfer(format!("{} -> {}: {}", src, dst, e)))
        };
        let finished = self.clock.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(Event {
            src: src.clone(),
            dst: dst.clone(),
            started,
            finished,
            ok: result.is_ok(),
        });
        result
    }
}

#[async_trait]
impl RemoteExecutor for LocalCluster {
    async fn list_files(&self, node: &NodeRef, folder: &str) -> Result<Vec<String>> {
        let root = self.local(&PathSpec::new(node.clone(), folder));
        let mut files = vec![];
        walk(&root, &root, &mut files).map_err(|e| {
            DistcopyError::Query(format!("Error during listing files in {}: {}", folder, e))
        })?;
        Ok(files)
    }

    async fn is_file(&self, node: &NodeRef, path: &str) -> Result<bool> {
        Ok(self.local(&PathSpec::new(node.clone(), path)).is_file())
    }

    async fn line_count(&self, node: &NodeRef, path: &str) -> Result<usize> {
        let content = fs::read_to_string(self.local(&PathSpec::new(node.clone(), path)))
            .map_err(|e| DistcopyError::Query(e.to_string()))?;
        Ok(content.split_inclusive('\n').count())
    }

    async fn remove_file(&self, node: &NodeRef, path: &str) -> Result<()> {
        match fs::remove_file(self.local(&PathSpec::new(node.clone(), path))) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(DistcopyError::Query(e.to_string())),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Transfer for LocalCluster {
    async fn copy(&self, src: &PathSpec, dst: &PathSpec, files: Option<&[String]>) -> Result<()> {
        let from = self.local(src);
        let to = self.local(dst);
        let contents_only = src.path.ends_with('/');
        let into_dir = dst.path.ends_with('/');
        self.transfer(src, dst, || rsync(&from, contents_only, &to, into_dir, files))
            .await
    }

    async fn send_lines(
        &self,
        src: &PathSpec,
        dst: &PathSpec,
        interval: LineInterval,
        append: bool,
    ) -> Result<()> {
        let from = self.local(src);
        let to = self.local(dst);
        self.transfer(src, dst, || {
            let content = fs::read_to_string(&from)?;
            let lines: Vec<&str> = content.split_inclusive('\n').collect();
            let end = interval.to.unwrap_or(lines.len()).min(lines.len());
            let start = interval.from.min(end);
            fs::create_dir_all(to.parent().unwrap())?;
            let mut file = OpenOptions::new()
                .create(true)
                .write(true)
                .append(append)
                .truncate(!append)
                .open(&to)?;
            file.write_all(lines[start..end].concat().as_bytes())
        })
        .await
    }
}

fn walk(root: &Path, dir: &Path, files: &mut Vec<String>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk(root, &path, files)?;
        } else {
            let relative = path.strip_prefix(root).unwrap();
            files.push(relative.to_string_lossy().into_owned());
        }
    }
    Ok(())
}

fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to.parent().unwrap())?;
    fs::copy(from, to)?;
    Ok(())
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    fs::create_dir_all(to)?;
    let mut files = vec![];
    walk(from, from, &mut files)?;
    for file in files {
        copy_file(&from.join(&file), &to.join(&file))?;
    }
    Ok(())
}

/// `rsync -a [--files-from=-] from to`.
fn rsync(
    from: &Path,
    contents_only: bool,
    to: &Path,
    into_dir: bool,
    files: Option<&[String]>,
) -> io::Result<()> {
    if let Some(files) = files {
        fs::create_dir_all(to)?;
        for file in files {
            copy_file(&from.join(file), &to.join(file))?;
        }
        Ok(())
    } else if from.is_file() {
        if into_dir || to.is_dir() {
            copy_file(from, &to.join(from.file_name().unwrap()))
        } else {
            copy_file(from, to)
        }
    } else if from.is_dir() {
        if contents_only {
            copy_tree(from, to)
        } else {
            copy_tree(from, &to.join(from.file_name().unwrap()))
        }
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} does not exist", from.display()),
        ))
    }
}

/// `count` numbered lines, the last one without a trailing newline.
pub fn numbered_lines(count: usize) -> String {
    (0..count)
        .map(|i| format!("line {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}
