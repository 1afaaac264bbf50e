//! Program synthesis.
//!
//! Emits one Lua chunk per render. The chunk returns a generator table whose
//! `execute` function runs every section in order and returns the output:
//!
//! ```text
//! -- Generated from main.sgtt
//! local string = require("string") -- from import directive of main.sgtt(1,4)
//!
//! local GenClass = {}
//!
//! function GenClass.execute()
//!     local builder = {}
//!     ...locale setup...
//!     local ok, failure = pcall(function()
//!         builder[#builder + 1] = "Hello "          <- Text
//!         builder[#builder + 1] = tostring((        <- Expression
//! --#line 1 "main.sgtt"
//!          name                                     <- mapped, padded to column 9
//! --#line default
//!         ))
//! --#line 2 "main.sgtt"
//!   for i = 1, 3 do                                 <- Code, mapped
//! --#line default
//!     end)
//!     ...restore locale, re-raise...
//!     return table.concat(builder)
//! end
//!
//! function GenClass.main(path) ... end
//!
//! return GenClass
//! ```
//!
//! `--#line` markers are plain Lua comments kept for readers of the appended
//! program. The authoritative mapping is the [`LineMap`] returned alongside the
//! source: one optional [`Origin`] per emitted line. Mapped lines keep the
//! template's columns because the first line of every mapped block is padded
//! with the section's start column.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::directive::{Import, Resolution};
use crate::section::{SectionKind, TemplateSection};

/// Chunk name given to the loader. The `=` prefix keeps Lua from decorating it.
pub const CHUNK_NAME: &str = "=sgtt_program";
/// Chunk name as it appears in Lua error messages.
pub const CHUNK_LABEL: &str = "sgtt_program";
/// Name of the table the chunk returns.
pub const GENERATOR_TABLE: &str = "GenClass";
/// Function of the generator table that renders the output.
pub const RENDER_METHOD: &str = "execute";
/// Function that writes the rendered output to a path given on the command line.
pub const MAIN_METHOD: &str = "main";

const BODY_INDENT: &str = "        ";
const LINE_DEFAULT: &str = "--#line default";
const INVARIANT_LOCALE: &str = "C";

/// Options for [`synthesize`].
#[derive(Debug, Clone)]
pub struct ProgramOptions {
    /// Template being rendered, named in the program header.
    pub template: PathBuf,
    /// Locale the program switches to while rendering. `None` uses the
    /// invariant `C` locale.
    pub locale: Option<String>,
}

impl ProgramOptions {
    pub fn new(template: impl Into<PathBuf>) -> Self {
        Self {
            template: template.into(),
            locale: None,
        }
    }

    pub fn with_locale(mut self, locale: Option<String>) -> Self {
        self.locale = locale;
        self
    }
}

/// Template location a program line was emitted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub file: Arc<Path>,
    /// 1-based line in `file`.
    pub line: usize,
}

/// Program line to template line mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineMap {
    lines: Vec<Option<Origin>>,
}

impl LineMap {
    /// Origin of 1-based program `line`. `None` for synthetic lines and for
    /// lines past the end of the program.
    pub fn origin(&self, line: usize) -> Option<&Origin> {
        line.checked_sub(1)
            .and_then(|index| self.lines.get(index))
            .and_then(Option::as_ref)
    }

    /// Number of program lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// A generator program and its line map.
#[derive(Debug, Clone)]
pub struct SynthesizedProgram {
    pub template: Arc<Path>,
    pub source: String,
    pub line_map: LineMap,
}

impl SynthesizedProgram {
    /// Text of 1-based program `line`, without its newline.
    pub fn line(&self, line: usize) -> Option<&str> {
        line.checked_sub(1)
            .and_then(|index| self.source.split('\n').nth(index))
    }
}

/// Emit the generator program for a resolved template.
pub fn synthesize(resolution: &Resolution, options: &ProgramOptions) -> SynthesizedProgram {
    let mut writer = ProgramWriter::new();
    writer.header(&options.template, &resolution.imports);
    writer.execute_prologue(options.locale.as_deref());
    for section in &resolution.sections {
        writer.section(section);
    }
    writer.execute_epilogue();
    writer.main_function();

    let program = SynthesizedProgram {
        template: Arc::from(options.template.as_path()),
        source: writer.output,
        line_map: writer.line_map,
    };
    debug!(
        template = %options.template.display(),
        lines = program.line_map.len(),
        "synthesized generator program"
    );
    program
}

/// Writes program text one line at a time, recording each line's origin.
struct ProgramWriter {
    output: String,
    line_map: LineMap,
    /// Origin of the next line while inside a mapped block.
    mapping: Option<Origin>,
}

impl ProgramWriter {
    fn new() -> Self {
        Self {
            output: String::new(),
            line_map: LineMap::default(),
            mapping: None,
        }
    }

    /// Write one line. `text` must not contain a newline.
    fn line(&mut self, text: &str) {
        self.output.push_str(text);
        self.output.push('\n');
        let origin = self.mapping.clone();
        if let Some(next) = self.mapping.as_mut() {
            next.line += 1;
        }
        self.line_map.lines.push(origin);
    }

    fn map_to(&mut self, file: &Arc<Path>, line: usize) {
        self.mapping = None;
        self.line(&format!(
            "--#line {line} \"{}\"",
            escape_lua_string(&file.display().to_string())
        ));
        self.mapping = Some(Origin {
            file: file.clone(),
            line,
        });
    }

    fn unmap(&mut self) {
        if self.mapping.take().is_some() {
            self.line(LINE_DEFAULT);
        }
    }

    /// Write section content as mapped lines, padding the first line so its
    /// columns match the template.
    fn mapped_block(&mut self, section: &TemplateSection) {
        self.map_to(&section.file, section.line);
        let content = normalize_newlines(&section.content);
        let padding = " ".repeat(section.column);
        for (index, text) in content.split('\n').enumerate() {
            if index == 0 {
                self.line(&format!("{padding}{text}"));
            } else {
                self.line(text);
            }
        }
    }

    fn header(&mut self, template: &Path, imports: &[Import]) {
        let name = template
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| template.display().to_string());
        self.line(&format!("-- Generated from {name}"));
        for import in imports {
            self.line(&format!(
                "local {} = require(\"{}\") -- from import directive of {}({},{})",
                import.binding,
                import.module,
                import.file.display(),
                import.line,
                import.column + 1
            ));
        }
        self.line("");
        self.line(&format!("local {GENERATOR_TABLE} = {{}}"));
        self.line("");
    }

    fn execute_prologue(&mut self, locale: Option<&str>) {
        self.line(&format!("function {GENERATOR_TABLE}.{RENDER_METHOD}()"));
        self.line("    local builder = {}");
        self.line("    local previous_locale = os.setlocale()");
        match locale {
            None => self.line(&format!("    os.setlocale(\"{INVARIANT_LOCALE}\")")),
            Some(name) => {
                let warning = format!(
                    "#warning The culture \"{name}\" could not be resolved. \
                     This source is generated using the invariant culture.\n"
                );
                self.line(&format!(
                    "    if os.setlocale(\"{}\") == nil then",
                    escape_lua_string(name)
                ));
                self.line(&format!("        os.setlocale(\"{INVARIANT_LOCALE}\")"));
                self.line(&format!(
                    "        builder[#builder + 1] = \"{}\"",
                    escape_lua_string(&warning)
                ));
                self.line("    end");
            }
        }
        self.line("    local ok, failure = pcall(function()");
    }

    fn section(&mut self, section: &TemplateSection) {
        match section.kind {
            SectionKind::Text => {
                self.unmap();
                self.line(&format!(
                    "{BODY_INDENT}builder[#builder + 1] = \"{}\"",
                    escape_lua_string(&section.content)
                ));
            }
            SectionKind::Expression => {
                self.unmap();
                self.line(&format!("{BODY_INDENT}builder[#builder + 1] = tostring(("));
                self.mapped_block(section);
                self.unmap();
                self.line(&format!("{BODY_INDENT}))"));
            }
            SectionKind::Code => self.mapped_block(section),
        }
    }

    fn execute_epilogue(&mut self) {
        self.unmap();
        self.line("    end)");
        self.line("    os.setlocale(previous_locale)");
        self.line("    if not ok then error(failure, 0) end");
        self.line("    return table.concat(builder)");
        self.line("end");
        self.line("");
    }

    fn main_function(&mut self) {
        self.line(&format!("function {GENERATOR_TABLE}.{MAIN_METHOD}(path)"));
        self.line("    local file = assert(io.open(path, \"wb\"))");
        self.line(&format!("    file:write({GENERATOR_TABLE}.{RENDER_METHOD}())"));
        self.line("    file:close()");
        self.line("end");
        self.line("");
        self.line(&format!("return {GENERATOR_TABLE}"));
    }
}

/// `\r\n` becomes `\n`. A lone `\r` becomes a space so that Lua and the
/// lexer agree on line numbers.
fn normalize_newlines(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', " ")
}

/// Escape `text` for a double-quoted Lua string literal.
pub fn escape_lua_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\{:03}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out
}
