//! In-memory filesystem for tests and dry-run style callers.
//!
//! Deterministic: modification times come from a logical clock that ticks on
//! every write, so collision policies comparing timestamps behave the same on
//! every run. The tree can be created case-insensitive to model filesystems
//! where `Foo` and `foo` are the same entry.

use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::{FileOp, VfsEntry, validate_child_name};

#[derive(Debug, Clone)]
enum Node {
    Dir,
    File { data: Vec<u8>, modified_ms: i64 },
}

#[derive(Debug)]
struct Tree {
    /// Keyed by normalized path; keeps the display path alongside.
    nodes: HashMap<String, (PathBuf, Node)>,
    clock: i64,
}

impl Tree {
    fn tick(&mut self) -> i64 {
        self.clock += 1;
        self.clock
    }
}

#[derive(Clone)]
pub struct MemoryFs {
    tree: Arc<Mutex<Tree>>,
    case_insensitive: bool,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::build(false)
    }

    /// A tree where lookups fold letter case, like HFS+/NTFS defaults.
    pub fn new_case_insensitive() -> Self {
        Self::build(true)
    }

    fn build(case_insensitive: bool) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert("/".to_string(), (PathBuf::from("/"), Node::Dir));
        Self {
            tree: Arc::new(Mutex::new(Tree { nodes, clock: 0 })),
            case_insensitive,
        }
    }

    pub fn root(&self) -> MemoryEntry {
        self.entry("/")
    }

    /// Handle for an arbitrary absolute path; the entry need not exist.
    pub fn entry(&self, path: &str) -> MemoryEntry {
        MemoryEntry {
            fs: self.clone(),
            path: PathBuf::from(path),
        }
    }

    /// Create a directory (and its ancestors).
    pub fn add_dir(&self, path: &str) -> MemoryEntry {
        self.insert_dirs(Path::new(path));
        self.entry(path)
    }

    /// Create a file with explicit content and modification time, creating
    /// parent directories as needed.
    pub fn add_file(&self, path: &str, data: &[u8], modified_ms: i64) -> MemoryEntry {
        let p = PathBuf::from(path);
        if let Some(parent) = p.parent() {
            self.insert_dirs(parent);
        }
        let key = self.norm(&p);
        let mut tree = self.tree.lock().unwrap();
        tree.nodes.insert(
            key,
            (p.clone(), Node::File { data: data.to_vec(), modified_ms }),
        );
        drop(tree);
        self.entry(path)
    }

    /// Current content of a file, if it exists.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        let key = self.norm(Path::new(path));
        let tree = self.tree.lock().unwrap();
        match tree.nodes.get(&key) {
            Some((_, Node::File { data, .. })) => Some(data.clone()),
            _ => None,
        }
    }

    fn insert_dirs(&self, path: &Path) {
        let mut tree = self.tree.lock().unwrap();
        let mut acc = PathBuf::new();
        for comp in path.components() {
            acc.push(comp);
            let key = self.norm(&acc);
            tree.nodes.entry(key).or_insert_with(|| (acc.clone(), Node::Dir));
        }
    }

    fn norm(&self, path: &Path) -> String {
        let s = path.to_string_lossy().replace('\\', "/");
        let s = if s.is_empty() { "/".to_string() } else { s };
        if self.case_insensitive { s.to_lowercase() } else { s }
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone)]
pub struct MemoryEntry {
    fs: MemoryFs,
    path: PathBuf,
}

impl MemoryEntry {
    fn key(&self) -> String {
        self.fs.norm(&self.path)
    }

    fn node(&self) -> Option<Node> {
        let tree = self.fs.tree.lock().unwrap();
        tree.nodes.get(&self.key()).map(|(_, n)| n.clone())
    }
}

impl std::fmt::Debug for MemoryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEntry").field("path", &self.path).finish()
    }
}

impl PartialEq for MemoryEntry {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.fs.tree, &other.fs.tree) && self.key() == other.key()
    }
}

impl Eq for MemoryEntry {}

impl VfsEntry for MemoryEntry {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }

    fn canonical_path(&self) -> PathBuf {
        PathBuf::from(self.key())
    }

    fn exists(&self) -> bool {
        self.node().is_some()
    }

    fn is_dir(&self) -> bool {
        matches!(self.node(), Some(Node::Dir))
    }

    fn size(&self) -> u64 {
        match self.node() {
            Some(Node::File { data, .. }) => data.len() as u64,
            _ => 0,
        }
    }

    fn modified_ms(&self) -> i64 {
        match self.node() {
            Some(Node::File { modified_ms, .. }) => modified_ms,
            _ => 0,
        }
    }

    fn parent(&self) -> Option<Self> {
        self.path.parent().map(|p| MemoryEntry {
            fs: self.fs.clone(),
            path: p.to_path_buf(),
        })
    }

    fn child(&self, name: &str) -> io::Result<Self> {
        validate_child_name(name)?;
        Ok(MemoryEntry {
            fs: self.fs.clone(),
            path: self.path.join(name),
        })
    }

    fn children(&self) -> io::Result<Vec<Self>> {
        let self_key = self.key();
        let tree = self.fs.tree.lock().unwrap();
        let mut out: Vec<Self> = tree
            .nodes
            .iter()
            .filter(|(key, _)| {
                key.as_str() != self_key
                    && parent_key(key).is_some_and(|p| p == self_key)
            })
            .map(|(_, (display, _))| MemoryEntry {
                fs: self.fs.clone(),
                path: display.clone(),
            })
            .collect();
        out.sort_by_key(|e| e.path.clone());
        Ok(out)
    }

    fn supports(&self, _op: FileOp) -> bool {
        true
    }

    fn open_read(&self) -> io::Result<Box<dyn Read + Send>> {
        match self.node() {
            Some(Node::File { data, .. }) => Ok(Box::new(Cursor::new(data))),
            Some(Node::Dir) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", self.path.display()),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", self.path.display()),
            )),
        }
    }

    fn open_write(&self, append: bool) -> io::Result<Box<dyn Write + Send>> {
        if self.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is a directory", self.path.display()),
            ));
        }
        let initial = if append {
            match self.node() {
                Some(Node::File { data, .. }) => data,
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };
        Ok(Box::new(MemWriter {
            fs: self.fs.clone(),
            path: self.path.clone(),
            buf: initial,
            committed: false,
        }))
    }

    fn mkdir(&self) -> io::Result<()> {
        self.fs.insert_dirs(&self.path);
        Ok(())
    }

    fn delete(&self) -> io::Result<()> {
        let key = self.key();
        let mut tree = self.fs.tree.lock().unwrap();
        if matches!(tree.nodes.get(&key), Some((_, Node::Dir))) {
            let occupied = tree
                .nodes
                .keys()
                .any(|k| k != &key && parent_key(k).is_some_and(|p| p == key));
            if occupied {
                return Err(io::Error::new(
                    io::ErrorKind::DirectoryNotEmpty,
                    format!("{} is not empty", self.path.display()),
                ));
            }
        }
        match tree.nodes.remove(&key) {
            Some(_) => Ok(()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", self.path.display()),
            )),
        }
    }

    fn rename_to(&self, dest: &Self) -> io::Result<()> {
        let src_key = self.key();
        let dest_key = dest.key();
        let mut tree = self.fs.tree.lock().unwrap();
        let moved: Vec<String> = tree
            .nodes
            .keys()
            .filter(|k| k.as_str() == src_key || k.starts_with(&format!("{src_key}/")))
            .cloned()
            .collect();
        if moved.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", self.path.display()),
            ));
        }
        for key in moved {
            if let Some((display, node)) = tree.nodes.remove(&key) {
                let suffix = key[src_key.len()..].to_string();
                let new_key = format!("{dest_key}{suffix}");
                let new_display = if suffix.is_empty() {
                    dest.path.clone()
                } else {
                    dest.path.join(
                        display
                            .strip_prefix(&self.path)
                            .unwrap_or(display.as_path()),
                    )
                };
                tree.nodes.insert(new_key, (new_display, node));
            }
        }
        Ok(())
    }

    fn set_modified_ms(&self, ms: i64) -> io::Result<()> {
        let key = self.key();
        let mut tree = self.fs.tree.lock().unwrap();
        match tree.nodes.get_mut(&key) {
            Some((_, Node::File { modified_ms, .. })) => {
                *modified_ms = ms;
                Ok(())
            }
            _ => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a file", self.path.display()),
            )),
        }
    }
}

fn parent_key(key: &str) -> Option<String> {
    if key == "/" {
        return None;
    }
    match key.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(i) => Some(key[..i].to_string()),
        None => None,
    }
}

struct MemWriter {
    fs: MemoryFs,
    path: PathBuf,
    buf: Vec<u8>,
    committed: bool,
}

impl MemWriter {
    fn commit(&mut self) {
        let key = self.fs.norm(&self.path);
        let mut tree = self.fs.tree.lock().unwrap();
        let ms = tree.tick();
        tree.nodes.insert(
            key,
            (self.path.clone(), Node::File { data: self.buf.clone(), modified_ms: ms }),
        );
        self.committed = true;
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        self.committed = false;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.commit();
        Ok(())
    }
}

impl Drop for MemWriter {
    fn drop(&mut self) {
        if !self.committed {
            self.commit();
        }
    }
}
