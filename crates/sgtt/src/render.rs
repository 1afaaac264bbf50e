//! Render driver.
//!
//! Runs one template through the whole pipeline and decides what the
//! generated file contains:
//!
//! ```text
//! read ─> resolve ──errors──> directive comments
//!            │
//!            └─> synthesize ─> compile ──errors──> fallback document + remapped diagnostics
//!                                 │
//!                                 └─> execute ──fault──> fault comments
//!                                        │
//!                                        └─> rendered text (+ annotations)
//! ```
//!
//! Cancellation at any checkpoint, or an unreadable template, produces no
//! output at all.

use serde::Serialize;
use sgtt_runtime::{
    Artifact, CancelFlag, Compiler, Diagnostic, Execution, Executor, Fault, Libraries,
    LuaCompiler, LuaExecutor, comment_out, remap,
};
use sgtt_template::{
    IncludeLookup, OutputFlags, ProgramOptions, ResolveOptions, SourceFile, SynthesizedProgram,
    resolve, synthesize,
};
use tracing::{debug, warn};

const LIBRARIES_BANNER: &str = "// *** Above source is compiled with following libraries. ***";
const PROGRAM_BANNER: &str = "// *** Above source is generated from following code. ***";

/// One template to render.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub template: &'a dyn SourceFile,
    pub includes: &'a IncludeLookup,
    /// Name of the generated file.
    pub file_name: &'a str,
    pub locale: Option<&'a str>,
}

/// What ended up in a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Rendered,
    DirectiveErrors,
    CompileFailed,
    Faulted,
}

/// A generated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub file_name: String,
    pub text: String,
    pub outcome: Outcome,
    /// Remapped compile diagnostics. Empty unless compilation failed.
    pub diagnostics: Vec<Diagnostic>,
}

/// Template renderer over a compiler and an executor.
#[derive(Debug, Clone)]
pub struct Renderer<C = LuaCompiler, E = LuaExecutor> {
    compiler: C,
    executor: E,
    resolve_options: ResolveOptions,
}

impl Renderer {
    /// Lua renderer linking `libraries`.
    pub fn new(libraries: Libraries, resolve_options: ResolveOptions) -> Self {
        Self::with_backend(LuaCompiler::new(libraries), LuaExecutor, resolve_options)
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(Libraries::default(), ResolveOptions::default())
    }
}

impl<C: Compiler, E: Executor> Renderer<C, E> {
    pub fn with_backend(compiler: C, executor: E, resolve_options: ResolveOptions) -> Self {
        Self {
            compiler,
            executor,
            resolve_options,
        }
    }

    /// Render one template. `None` when cancelled or when the template text
    /// is unavailable.
    pub fn render(&self, request: &RenderRequest<'_>, cancel: &CancelFlag) -> Option<GeneratedSource> {
        let path = request.template.path();
        let text = match request.template.read_text() {
            Ok(text) => text,
            Err(err) => {
                warn!(template = %path.display(), "cannot read template: {err}");
                return None;
            }
        };

        let resolution = resolve(path, &text, request.includes, &self.resolve_options);
        if !resolution.is_ok() {
            return Some(self.generated(
                request,
                resolution.error_comments(),
                Outcome::DirectiveErrors,
                Vec::new(),
            ));
        }

        let options = ProgramOptions::new(path).with_locale(request.locale.map(str::to_string));
        let program = synthesize(&resolution, &options);
        if cancel.is_cancelled() {
            debug!(template = %path.display(), "render cancelled after synthesis");
            return None;
        }

        let artifact = match self.compiler.compile(&program) {
            Ok(artifact) => artifact,
            Err(diagnostics) => {
                let remapped = remap(&program, &text, &diagnostics);
                return Some(self.generated(
                    request,
                    remapped.fallback,
                    Outcome::CompileFailed,
                    remapped.reported,
                ));
            }
        };
        if cancel.is_cancelled() {
            debug!(template = %path.display(), "render cancelled after compilation");
            return None;
        }

        match self.executor.execute(&artifact, cancel) {
            Execution::Rendered(output) => Some(self.generated(
                request,
                annotate(output, resolution.flags, &artifact, &program),
                Outcome::Rendered,
                Vec::new(),
            )),
            Execution::Faulted(fault) => {
                warn!(template = %path.display(), "generator program failed: {}", fault.message);
                Some(self.generated(
                    request,
                    fault_comments(&fault, &program),
                    Outcome::Faulted,
                    Vec::new(),
                ))
            }
            Execution::Cancelled => {
                debug!(template = %path.display(), "render cancelled before execution");
                None
            }
        }
    }

    fn generated(
        &self,
        request: &RenderRequest<'_>,
        text: String,
        outcome: Outcome,
        diagnostics: Vec<Diagnostic>,
    ) -> GeneratedSource {
        GeneratedSource {
            file_name: request.file_name.to_string(),
            text,
            outcome,
            diagnostics,
        }
    }
}

/// Rendered text followed by the annotations `flags` ask for.
fn annotate(
    output: String,
    flags: OutputFlags,
    artifact: &Artifact,
    program: &SynthesizedProgram,
) -> String {
    if !flags.append_libraries && !flags.append_program {
        return output;
    }

    let mut text = output;
    text.push('\n');

    if flags.append_libraries {
        text.push('\n');
        text.push_str(LIBRARIES_BANNER);
        text.push_str("\n//\n");
        for entry in artifact.library_entries() {
            text.push_str("// ");
            text.push_str(&entry);
            text.push('\n');
        }
    }

    if flags.append_program {
        text.push('\n');
        text.push_str(PROGRAM_BANNER);
        text.push_str("\n//\n");
        text.push_str(&comment_out(&program.source));
    }

    text
}

/// Fault description as comment lines, led by the template location when the
/// failing line maps back to one.
fn fault_comments(fault: &Fault, program: &SynthesizedProgram) -> String {
    let mut description = String::new();
    let located = fault
        .line
        .and_then(|line| program.line_map.origin(line).map(|origin| (line, origin)));
    if let Some((line, origin)) = located {
        let column = program
            .line(line)
            .map(|text| text.chars().take_while(|c| c.is_whitespace()).count())
            .unwrap_or(0);
        description.push_str(&format!(
            "at {}({},{})\n",
            origin.file.display(),
            origin.line,
            column + 1
        ));
    }
    description.push_str(&fault.message);
    comment_out(&description)
}
