//! Project-wide generation.
//!
//! Discovers every template under a project root, renders them one after
//! another and writes the generated files. Rendering is sequential because
//! generator programs switch the process-wide locale.

use std::path::{Path, PathBuf};

use serde::Serialize;
use sgtt_runtime::{CancelFlag, Diagnostic, Libraries, RuntimeError};
use sgtt_template::{FileSource, ResolveOptions};
use tracing::{debug, info};

use crate::config::SgttConfig;
use crate::discover::{DiscoverOptions, discover};
use crate::naming::output_names;
use crate::render::{Outcome, RenderRequest, Renderer};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Resolved settings for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub root: PathBuf,
    pub output_dir: PathBuf,
    pub template_extension: String,
    pub include_extension: String,
    pub output_extension: String,
    pub locale: Option<String>,
    pub libraries: Libraries,
}

impl GenerateOptions {
    pub fn from_config(root: &Path, config: &SgttConfig) -> Result<Self, RuntimeError> {
        Ok(Self {
            root: root.to_path_buf(),
            output_dir: config.output_dir(root),
            template_extension: config.template_extension().to_string(),
            include_extension: config.include_extension().to_string(),
            output_extension: config.output_extension().to_string(),
            locale: config.locale().map(str::to_string),
            libraries: config.libraries()?,
        })
    }
}

/// A file written by [`generate`].
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedFile {
    pub template: PathBuf,
    pub path: PathBuf,
    pub outcome: Outcome,
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of a generation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateSummary {
    pub files: Vec<GeneratedFile>,
    /// True when the run stopped early on cancellation.
    pub cancelled: bool,
}

impl GenerateSummary {
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|file| &file.diagnostics)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics().any(Diagnostic::is_error)
    }
}

/// Render every template of the project and write the outputs.
pub fn generate(options: &GenerateOptions, cancel: &CancelFlag) -> Result<GenerateSummary, GenerateError> {
    let mut skip = Vec::new();
    if options.output_dir != options.root {
        skip.push(options.output_dir.clone());
    }
    let project = discover(
        &options.root,
        &DiscoverOptions {
            template_extension: options.template_extension.clone(),
            include_extension: options.include_extension.clone(),
            skip,
        },
    );
    debug!(
        templates = project.templates.len(),
        includes = project.includes.len(),
        "discovered project files"
    );

    let includes = project.include_lookup();
    let names = output_names(&project.templates, &options.output_extension);
    let renderer = Renderer::new(
        options.libraries.clone(),
        ResolveOptions {
            include_extension: options.include_extension.clone(),
        },
    );

    let mut summary = GenerateSummary::default();
    for (template, file_name) in project.templates.iter().zip(&names) {
        if cancel.is_cancelled() {
            summary.cancelled = true;
            break;
        }

        let source = FileSource::new(template);
        let request = RenderRequest {
            template: &source,
            includes: &includes,
            file_name,
            locale: options.locale.as_deref(),
        };
        let Some(generated) = renderer.render(&request, cancel) else {
            summary.cancelled |= cancel.is_cancelled();
            continue;
        };

        let path = options.output_dir.join(&generated.file_name);
        write_output(&path, &generated.text)?;
        info!(template = %template.display(), output = %path.display(), outcome = ?generated.outcome, "generated");

        summary.files.push(GeneratedFile {
            template: template.clone(),
            path,
            outcome: generated.outcome,
            diagnostics: generated.diagnostics,
        });
    }

    Ok(summary)
}

fn write_output(path: &Path, text: &str) -> Result<(), GenerateError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)
    };
    write().map_err(|source| GenerateError::Write {
        path: path.to_path_buf(),
        source,
    })
}
