//! Compile diagnostic remapping.
//!
//! Compile diagnostics point at lines of the synthesized program. This module
//! turns them into:
//!
//! - `reported`: diagnostics against the template (or include) file the
//!   failing line came from, for the build to display;
//! - `fallback`: the output document written in place of rendered text.
//!
//! ```text
//! // <program line 1>
//! // ...
//! // <program line N>
//! #error main.sgtt: failed to compile the program generated from this template
//! #if false
//! sgtt_program(12,13): error LUA001: <name> expected near '='
//! #endif
//! ```

use std::fmt::Write as _;
use std::path::Path;

use sgtt_template::SynthesizedProgram;
use tracing::debug;

use crate::comment::comment_out;
use crate::diagnostic::{Diagnostic, Location};

/// Width of the `// ` prefix added to every program line in the fallback.
const COMMENT_PREFIX_WIDTH: usize = 3;
const REWRITTEN_CODE_PREFIX: &str = "SGTT_";

/// Remapped compile failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remapped {
    pub reported: Vec<Diagnostic>,
    pub fallback: String,
}

/// Remap `diagnostics` of `program`, generated from `template_text`.
pub fn remap(
    program: &SynthesizedProgram,
    template_text: &str,
    diagnostics: &[Diagnostic],
) -> Remapped {
    let template_lines: Vec<&str> = template_text.split('\n').collect();
    let reported = diagnostics
        .iter()
        .map(|diagnostic| report(program, &template_lines, diagnostic))
        .collect();

    debug!(
        template = %program.template.display(),
        diagnostics = diagnostics.len(),
        "remapped compile diagnostics"
    );
    Remapped {
        reported,
        fallback: fallback(program, diagnostics),
    }
}

fn report(program: &SynthesizedProgram, template_lines: &[&str], diagnostic: &Diagnostic) -> Diagnostic {
    let template: &Path = &program.template;
    match program.line_map.origin(diagnostic.location.line) {
        Some(origin) if *origin.file == *template => {
            let text = template_lines
                .get(origin.line.saturating_sub(1))
                .copied()
                .unwrap_or_default();
            let width = text.trim_end_matches('\r').chars().count();
            let column = diagnostic.location.column.min(width);
            let length = diagnostic.location.length.min(width - column);
            Diagnostic {
                location: Location::new(template, origin.line, column, length),
                ..diagnostic.clone()
            }
        }
        Some(origin) => rewritten(
            diagnostic,
            Location::new(
                origin.file.to_path_buf(),
                origin.line,
                diagnostic.location.column,
                diagnostic.location.length,
            ),
        ),
        None => rewritten(diagnostic, Location::new(template, 1, 0, 0)),
    }
}

/// Diagnostic for a line the template does not own directly.
fn rewritten(diagnostic: &Diagnostic, location: Location) -> Diagnostic {
    Diagnostic {
        code: format!("{REWRITTEN_CODE_PREFIX}{}", diagnostic.code),
        severity: diagnostic.severity,
        message: format!(
            "TemplateCompile{} {}",
            diagnostic.severity.title(),
            diagnostic.message
        ),
        location,
    }
}

fn fallback(program: &SynthesizedProgram, diagnostics: &[Diagnostic]) -> String {
    let name = program
        .template
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.template.display().to_string());

    let mut out = comment_out(&program.source);
    let _ = writeln!(
        out,
        "#error {name}: failed to compile the program generated from this template"
    );
    out.push_str("#if false\n");
    for diagnostic in diagnostics {
        let mut shifted = diagnostic.clone();
        shifted.location.column += COMMENT_PREFIX_WIDTH;
        let _ = writeln!(out, "{shifted}");
    }
    out.push_str("#endif\n");
    out
}
