//! Generator program compilation.
//!
//! The Lua compiler parses the synthesized source in a throwaway Lua state
//! and dumps the resulting function to LuaJIT bytecode. Debug information is
//! kept so runtime errors still carry program line numbers.

use std::path::PathBuf;
use std::sync::LazyLock;

use mlua::{Lua, LuaOptions, StdLib};
use regex::Regex;
use sgtt_template::{CHUNK_LABEL, CHUNK_NAME, SynthesizedProgram};
use tracing::debug;

use crate::diagnostic::{Diagnostic, Location};
use crate::libraries::Libraries;

/// Diagnostic code for a syntax error in the generator program.
pub const SYNTAX_ERROR: &str = "LUA001";
/// Diagnostic code for any other failure to load the generator program.
pub const LOAD_ERROR: &str = "LUA002";

/// `sgtt_program:12: message` (optionally wrapped as `[string "sgtt_program"]:12:`).
pub(crate) static PROGRAM_POSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?s){}"?\]?:(\d+):\s?(.*)"#,
        regex::escape(CHUNK_LABEL)
    ))
    .expect("program position pattern is valid")
});

static NEAR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"near '(.*)'\s*\z").expect("near token pattern is valid"));

/// A compiled generator program.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytecode: Vec<u8>,
    pub libraries: Libraries,
    /// Runtime version string, e.g. `Lua 5.1`.
    pub runtime: String,
}

impl Artifact {
    /// `<runtime> <library>` per linked library.
    pub fn library_entries(&self) -> Vec<String> {
        self.libraries
            .names()
            .iter()
            .map(|name| format!("{} {name}", self.runtime))
            .collect()
    }
}

/// Turns a synthesized program into an executable artifact.
pub trait Compiler {
    /// Compile `program`. On failure the diagnostic list is never empty and
    /// every location refers to program lines.
    fn compile(&self, program: &SynthesizedProgram) -> Result<Artifact, Vec<Diagnostic>>;
}

/// Compiles generator programs to LuaJIT bytecode.
#[derive(Debug, Clone, Default)]
pub struct LuaCompiler {
    libraries: Libraries,
}

impl LuaCompiler {
    pub fn new(libraries: Libraries) -> Self {
        Self { libraries }
    }

    pub fn libraries(&self) -> &Libraries {
        &self.libraries
    }

    fn dump(&self, source: &str) -> mlua::Result<(Vec<u8>, String)> {
        let lua = Lua::new_with(self.libraries.std_lib(), LuaOptions::default())?;
        let function = lua.load(source).set_name(CHUNK_NAME).into_function()?;
        let version: Option<String> = lua.globals().get("_VERSION")?;
        let runtime = version.unwrap_or_else(|| "Lua".to_string());
        Ok((function.dump(false), runtime))
    }
}

impl Compiler for LuaCompiler {
    fn compile(&self, program: &SynthesizedProgram) -> Result<Artifact, Vec<Diagnostic>> {
        match self.dump(&program.source) {
            Ok((bytecode, runtime)) => {
                debug!(bytes = bytecode.len(), "compiled generator program");
                Ok(Artifact {
                    bytecode,
                    libraries: self.libraries.clone(),
                    runtime,
                })
            }
            Err(err) => {
                let diagnostic = load_diagnostic(program, &err);
                debug!(%diagnostic, "generator program failed to compile");
                Err(vec![diagnostic])
            }
        }
    }
}

fn load_diagnostic(program: &SynthesizedProgram, err: &mlua::Error) -> Diagnostic {
    let (code, text) = match err {
        mlua::Error::SyntaxError { message, .. } => (SYNTAX_ERROR, message.clone()),
        other => (LOAD_ERROR, other.to_string()),
    };

    let Some((line, message)) = program_position(&text) else {
        return Diagnostic::error(code, text.trim(), Location::new(CHUNK_LABEL, 1, 0, 0));
    };
    let (column, length) = token_span(program, line, &message);

    Diagnostic::error(
        code,
        message,
        Location::new(PathBuf::from(CHUNK_LABEL), line, column, length),
    )
}

/// Program line and message of a Lua error naming the generator chunk.
fn program_position(text: &str) -> Option<(usize, String)> {
    let captures = PROGRAM_POSITION.captures(text)?;
    let line = captures[1].parse().ok()?;
    Some((line, captures[2].trim().to_string()))
}

/// Column and length of the `near '<token>'` token on program line `line`,
/// or of the line's non-blank content when the token is not on it.
fn token_span(program: &SynthesizedProgram, line: usize, message: &str) -> (usize, usize) {
    let Some(source_line) = program.line(line) else {
        return (0, 0);
    };
    let token = NEAR_TOKEN
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|token| !token.is_empty());

    match token.and_then(|t| token_offset(program, line, source_line, t, message).map(|i| (i, t))) {
        Some((index, token)) => (
            source_line[..index].chars().count(),
            token.chars().count(),
        ),
        None => content_span(source_line),
    }
}

/// Byte offset of the offending `token` within `source_line`.
///
/// A token can occur several times on one line. The offending occurrence is
/// the first one whose program prefix, cut right after it, fails to load
/// with the same error.
fn token_offset(
    program: &SynthesizedProgram,
    line: usize,
    source_line: &str,
    token: &str,
    message: &str,
) -> Option<usize> {
    let offsets: Vec<usize> = source_line.match_indices(token).map(|(i, _)| i).collect();
    if offsets.len() < 2 {
        return offsets.first().copied();
    }

    let line_start: usize = program
        .source
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    let Ok(lua) = Lua::new_with(StdLib::NONE, LuaOptions::default()) else {
        return offsets.first().copied();
    };
    let reproduces = |cut: usize| match lua
        .load(&program.source[..cut])
        .set_name(CHUNK_NAME)
        .into_function()
    {
        Err(mlua::Error::SyntaxError { message: text, .. }) => {
            program_position(&text).is_some_and(|(l, m)| l == line && m == message)
        }
        _ => false,
    };

    offsets
        .iter()
        .copied()
        .find(|&i| reproduces(line_start + i + token.len()))
        .or(offsets.first().copied())
}

fn content_span(line: &str) -> (usize, usize) {
    let content = line.trim_start();
    let column = line.chars().count() - content.chars().count();
    (column, content.trim_end().chars().count())
}
