use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Trait for filesystem operations to enable testing with mocks
pub trait FileSystem: Send + Sync {
    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Write string contents to file, replacing any previous contents
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Rename a file, replacing the destination if it exists
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Check if path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a file
    fn is_file(&self, path: &Path) -> bool;

    /// Read directory entries
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Walk directory recursively (for picking up generated files)
    fn walk_dir(&self, path: &Path, max_depth: usize) -> Result<Vec<PathBuf>>;
}

/// Real filesystem implementation using std::fs
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create parent directory: {:?}", parent))?;
        }

        std::fs::write(path, contents).with_context(|| format!("Failed to write file: {:?}", path))
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        std::fs::rename(from, to)
            .with_context(|| format!("Failed to rename {:?} to {:?}", from, to))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)
            .with_context(|| format!("Failed to read directory: {:?}", path))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.context("Failed to read directory entry")?;
            paths.push(entry.path());
        }

        paths.sort();
        Ok(paths)
    }

    fn walk_dir(&self, path: &Path, max_depth: usize) -> Result<Vec<PathBuf>> {
        use walkdir::WalkDir;

        let mut paths = Vec::new();
        for entry in WalkDir::new(path).max_depth(max_depth).sort_by_file_name() {
            let entry = entry.context("Failed to walk directory")?;
            paths.push(entry.path().to_path_buf());
        }

        Ok(paths)
    }
}

/// Mock filesystem implementation for testing (in-memory)
#[allow(dead_code)]
pub struct MockFileSystem {
    files: Arc<RwLock<HashMap<PathBuf, String>>>,
    directories: Arc<RwLock<HashSet<PathBuf>>>,
}

#[allow(dead_code)]
impl MockFileSystem {
    /// Create new empty mock filesystem
    pub fn new() -> Self {
        Self {
            files: Arc::new(RwLock::new(HashMap::new())),
            directories: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Get captured file contents for testing assertions
    pub fn get_file_contents(&self, path: &Path) -> Option<String> {
        self.files.read().unwrap().get(path).cloned()
    }

    /// Check if file was written
    pub fn has_file(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    /// List all files in mock filesystem, sorted
    pub fn list_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.files.read().unwrap().keys().cloned().collect();
        files.sort();
        files
    }

    fn add_directories(&self, path: &Path) {
        let mut directories = self.directories.write().unwrap();
        let mut current = Some(path);

        while let Some(dir) = current {
            if dir.as_os_str().is_empty() {
                break;
            }
            directories.insert(dir.to_path_buf());
            current = dir.parent();
        }
    }
}

impl Default for MockFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.files
            .read()
            .unwrap()
            .get(path)
            .cloned()
            .with_context(|| format!("File not found in mock filesystem: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            self.add_directories(parent);
        }

        self.files
            .write()
            .unwrap()
            .insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        let mut files = self.files.write().unwrap();
        let contents = files
            .remove(from)
            .with_context(|| format!("File not found in mock filesystem: {:?}", from))?;
        files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
            || self.directories.read().unwrap().contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let files = self.files.read().unwrap();
        let directories = self.directories.read().unwrap();

        let mut entries: Vec<PathBuf> = files
            .keys()
            .chain(directories.iter())
            .filter(|entry| entry.parent() == Some(path))
            .cloned()
            .collect();

        entries.sort();
        Ok(entries)
    }

    fn walk_dir(&self, path: &Path, max_depth: usize) -> Result<Vec<PathBuf>> {
        let files = self.files.read().unwrap();
        let directories = self.directories.read().unwrap();

        // max_depth=0: only root, max_depth=1: root + immediate children
        let mut entries: Vec<PathBuf> = files
            .keys()
            .chain(directories.iter())
            .filter(|entry| match entry.strip_prefix(path) {
                Ok(relative) => relative.components().count() <= max_depth,
                Err(_) => false,
            })
            .cloned()
            .collect();

        entries.sort();
        Ok(entries)
    }
}
