//! Diagnostic output.
//!
//! Diagnostics are printed with `codespan-reporting` when their file can be
//! read, and as a plain `file(line,col): severity CODE: message` line
//! otherwise.

use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;

use codespan_reporting::diagnostic::{Diagnostic as Report, Label, Severity as ReportSeverity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::{self, termcolor::WriteColor};
use sgtt_runtime::{Diagnostic, Location, Severity};

use crate::generate::GenerateSummary;

/// Print `diagnostics` to `writer`.
pub fn emit(writer: &mut dyn WriteColor, diagnostics: &[Diagnostic]) -> anyhow::Result<()> {
    let config = term::Config::default();
    let mut files = SimpleFiles::new();
    let mut ids: HashMap<PathBuf, Option<usize>> = HashMap::new();

    for diagnostic in diagnostics {
        let file = &diagnostic.location.file;
        let id = *ids.entry(file.clone()).or_insert_with(|| {
            std::fs::read_to_string(file)
                .ok()
                .map(|source| files.add(file.display().to_string(), source))
        });

        let Some(id) = id else {
            writeln!(writer, "{diagnostic}")?;
            continue;
        };

        let source = files.get(id)?.source();
        let range = byte_range(source, &diagnostic.location);
        let report = Report::new(severity(diagnostic.severity))
            .with_code(diagnostic.code.clone())
            .with_message(diagnostic.message.clone())
            .with_labels(vec![Label::primary(id, range)]);
        term::emit(writer, &config, &files, &report)?;
    }
    Ok(())
}

/// Summary as pretty-printed JSON.
pub fn to_json(summary: &GenerateSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}

fn severity(severity: Severity) -> ReportSeverity {
    match severity {
        Severity::Error => ReportSeverity::Error,
        Severity::Warning => ReportSeverity::Warning,
        Severity::Info => ReportSeverity::Note,
    }
}

/// Byte range of a character-based location inside `source`.
fn byte_range(source: &str, location: &Location) -> Range<usize> {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(location.line.saturating_sub(1))
        .map(str::len)
        .sum();
    let line = source[line_start..].split('\n').next().unwrap_or_default();
    let start = line_start + char_offset(line, location.column);
    let end = line_start + char_offset(line, location.column + location.length);
    start..end
}

fn char_offset(line: &str, chars: usize) -> usize {
    line.char_indices()
        .nth(chars)
        .map(|(index, _)| index)
        .unwrap_or(line.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codespan_reporting::term::termcolor::NoColor;
    use tempfile::TempDir;

    fn render(diagnostics: &[Diagnostic]) -> String {
        let mut buffer = NoColor::new(Vec::new());
        emit(&mut buffer, diagnostics).unwrap();
        String::from_utf8(buffer.into_inner()).unwrap()
    }

    #[test]
    fn test_byte_range() {
        let source = "ab\nhé = x\n";
        assert_eq!(byte_range(source, &Location::new("f", 2, 3, 1)), 7..8);
        assert_eq!(byte_range(source, &Location::new("f", 2, 40, 2)), 10..10);
        assert_eq!(byte_range(source, &Location::new("f", 9, 0, 0)), 11..11);
    }

    #[test]
    fn test_snippet_for_readable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("main.sgtt");
        std::fs::write(&path, "a\n<# local = 1 #>\n").unwrap();

        let output = render(&[Diagnostic::error(
            "LUA001",
            "<name> expected near '='",
            Location::new(&path, 2, 9, 1),
        )]);
        assert!(output.contains("error[LUA001]: <name> expected near '='"), "{output}");
        assert!(output.contains("main.sgtt:2:10"), "{output}");
    }

    #[test]
    fn test_plain_line_for_unreadable_file() {
        let output = render(&[Diagnostic::error(
            "SGTT_LUA002",
            "TemplateCompileError boom",
            Location::new("/no/such/file.sgtt", 1, 0, 0),
        )]);
        insta::assert_snapshot!(
            output.trim_end(),
            @"/no/such/file.sgtt(1,1): error SGTT_LUA002: TemplateCompileError boom"
        );
    }
}
