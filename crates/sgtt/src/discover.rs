//! Project file discovery.
//!
//! Walks a project root in file-name order, skipping hidden directories and
//! the output directory, and collects template and include files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sgtt_template::{FileSource, IncludeLookup, SourceFile};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

/// What to look for.
#[derive(Debug, Clone)]
pub struct DiscoverOptions {
    pub template_extension: String,
    pub include_extension: String,
    /// Directories not descended into (e.g. the output directory).
    pub skip: Vec<PathBuf>,
}

/// Files found under a project root.
#[derive(Debug, Clone, Default)]
pub struct Project {
    /// Templates in discovery order.
    pub templates: Vec<PathBuf>,
    pub includes: Vec<PathBuf>,
}

impl Project {
    /// Include lookup over every discovered include file.
    pub fn include_lookup(&self) -> IncludeLookup {
        self.includes
            .iter()
            .map(|path| Arc::new(FileSource::new(path)) as Arc<dyn SourceFile>)
            .collect()
    }

    /// Add the files of `other`, keeping discovery order.
    pub fn extend(&mut self, other: Project) {
        self.templates.extend(other.templates);
        self.includes.extend(other.includes);
    }
}

/// Walk `root` and classify files by extension (case-insensitive).
pub fn discover(root: &Path, options: &DiscoverOptions) -> Project {
    let mut project = Project::default();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_skipped(entry, options));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.into_path();
        if has_extension(&path, &options.template_extension) {
            project.templates.push(path);
        } else if has_extension(&path, &options.include_extension) {
            project.includes.push(path);
        }
    }

    project
}

fn is_skipped(entry: &DirEntry, options: &DiscoverOptions) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let hidden = entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'));
    hidden || options.skip.iter().any(|skip| skip == entry.path())
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}
