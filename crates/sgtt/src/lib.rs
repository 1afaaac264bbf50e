//! sgtt: source-generator text templates.
//!
//! Host side of the template pipeline: finds templates in a project, renders
//! each one through [`sgtt_template`] and [`sgtt_runtime`], and writes the
//! generated files.
//!
//! ```text
//! project root ─> discover ─> naming ─> render (per template) ─> write
//!                                         │
//!                                         └─> report (diagnostics)
//! ```

pub mod config;
pub mod discover;
pub mod generate;
pub mod logging;
pub mod naming;
pub mod render;
pub mod report;

pub use config::{ConfigError, SgttConfig};
pub use generate::{GenerateError, GenerateOptions, GenerateSummary, GeneratedFile, generate};
pub use render::{GeneratedSource, Outcome, RenderRequest, Renderer};
