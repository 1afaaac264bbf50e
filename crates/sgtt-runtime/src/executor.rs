//! Isolated execution of compiled generator programs.
//!
//! Every execution gets its own Lua state. Nothing survives between runs:
//! the state is dropped on every return path, which releases everything the
//! program loaded.

use mlua::{ChunkMode, Function, Lua, LuaOptions, Table};
use sgtt_template::{CHUNK_NAME, RENDER_METHOD};
use tracing::debug;

use crate::cancel::CancelFlag;
use crate::compiler::{Artifact, PROGRAM_POSITION};

const TRACEBACK_MARKER: &str = "\nstack traceback:";

/// Outcome of running a generator program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Execution {
    /// The program returned its output.
    Rendered(String),
    /// The program raised an error.
    Faulted(Fault),
    /// Cancellation was requested before the program ran.
    Cancelled,
}

/// A runtime error raised by a generator program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    pub message: String,
    /// Program line the error was raised on, when the message names one.
    pub line: Option<usize>,
}

impl Fault {
    fn from_lua(err: &mlua::Error) -> Self {
        let text = err.to_string();
        let message = text
            .split(TRACEBACK_MARKER)
            .next()
            .unwrap_or(&text)
            .trim_end()
            .to_string();
        let line = PROGRAM_POSITION
            .captures(&message)
            .and_then(|c| c[1].parse().ok());
        Self { message, line }
    }
}

/// Runs compiled artifacts.
pub trait Executor {
    fn execute(&self, artifact: &Artifact, cancel: &CancelFlag) -> Execution;
}

/// Runs LuaJIT bytecode in a fresh Lua state per call.
#[derive(Debug, Clone, Copy, Default)]
pub struct LuaExecutor;

impl Executor for LuaExecutor {
    fn execute(&self, artifact: &Artifact, cancel: &CancelFlag) -> Execution {
        if cancel.is_cancelled() {
            return Execution::Cancelled;
        }
        match run(artifact, cancel) {
            Ok(Some(output)) => {
                debug!(bytes = output.len(), "generator program rendered");
                Execution::Rendered(output)
            }
            Ok(None) => Execution::Cancelled,
            Err(err) => {
                let fault = Fault::from_lua(&err);
                debug!(message = %fault.message, line = ?fault.line, "generator program faulted");
                Execution::Faulted(fault)
            }
        }
    }
}

/// Fresh Lua state linking the artifact's libraries, and its loaded chunk.
fn load(artifact: &Artifact) -> mlua::Result<(Lua, Function)> {
    let lua = Lua::new_with(artifact.libraries.std_lib(), LuaOptions::default())?;
    let chunk = lua
        .load(&artifact.bytecode[..])
        .set_name(CHUNK_NAME)
        .set_mode(ChunkMode::Binary)
        .into_function()?;
    Ok((lua, chunk))
}

fn run(artifact: &Artifact, cancel: &CancelFlag) -> mlua::Result<Option<String>> {
    let (_lua, chunk) = load(artifact)?;
    if cancel.is_cancelled() {
        return Ok(None);
    }

    let generator: Table = chunk.call(())?;
    let render: Function = generator.get(RENDER_METHOD)?;
    let output: mlua::String = render.call(())?;
    Ok(Some(output.to_string_lossy().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{Compiler, LuaCompiler};
    use crate::libraries::Libraries;
    use sgtt_template::synth::MAIN_METHOD;
    use sgtt_template::{
        IncludeLookup, ProgramOptions, ResolveOptions, SynthesizedProgram, resolve, synthesize,
    };
    use tempfile::TempDir;
    use std::path::Path;

    fn program_with(text: &str, locale: Option<&str>) -> SynthesizedProgram {
        let path = Path::new("/t/main.sgtt");
        let resolution = resolve(path, text, &IncludeLookup::new(), &ResolveOptions::default());
        assert!(resolution.is_ok());
        let options = ProgramOptions::new(path).with_locale(locale.map(str::to_string));
        synthesize(&resolution, &options)
    }

    fn execute(text: &str) -> Execution {
        execute_with(text, None)
    }

    fn execute_with(text: &str, locale: Option<&str>) -> Execution {
        let artifact = LuaCompiler::default()
            .compile(&program_with(text, locale))
            .unwrap();
        LuaExecutor.execute(&artifact, &CancelFlag::new())
    }

    #[test]
    fn test_hello_world() {
        assert_eq!(
            execute("Hello <#= \"World\" #>!"),
            Execution::Rendered("Hello World!".to_string())
        );
    }

    #[test]
    fn test_code_sections_drive_text() {
        assert_eq!(
            execute("<# for i = 1, 3 do #>[<#= i #>]<# end #>"),
            Execution::Rendered("[1][2][3]".to_string())
        );
    }

    #[test]
    fn test_no_tags_identity() {
        let text = "plain \"quoted\" text\r\nwith \\ backslash\tand tab\u{1}";
        assert_eq!(execute(text), Execution::Rendered(text.to_string()));
    }

    #[test]
    fn test_import_binds_module() {
        assert_eq!(
            execute("<#@ import namespace=\"string\" #><#= string.upper(\"abc\") #>"),
            Execution::Rendered("ABC".to_string())
        );
    }

    #[test]
    fn test_fault_carries_program_line() {
        let text = "a\n<# error(\"boom\") #>b";
        let program = program_with(text, None);
        let artifact = LuaCompiler::default().compile(&program).unwrap();

        let Execution::Faulted(fault) = LuaExecutor.execute(&artifact, &CancelFlag::new()) else {
            panic!("expected a fault");
        };
        assert!(fault.message.contains("boom"), "{}", fault.message);
        assert!(!fault.message.contains("stack traceback"));

        let line = fault.line.expect("fault line");
        assert_eq!(program.line_map.origin(line).map(|o| o.line), Some(2));
    }

    #[test]
    fn test_cancelled_before_run() {
        let artifact = LuaCompiler::default()
            .compile(&program_with("x", None))
            .unwrap();
        let cancel = CancelFlag::new();
        cancel.cancel();
        assert_eq!(LuaExecutor.execute(&artifact, &cancel), Execution::Cancelled);
    }

    #[test]
    fn test_unresolvable_locale_warns() {
        let Execution::Rendered(output) = execute_with("x", Some("no_SUCH.locale-xyz")) else {
            panic!("expected output");
        };
        assert_eq!(
            output,
            "#warning The culture \"no_SUCH.locale-xyz\" could not be resolved. \
             This source is generated using the invariant culture.\nx"
        );
    }

    #[test]
    fn test_invariant_number_formatting() {
        assert_eq!(
            execute("<#= 1.5 #>"),
            Execution::Rendered("1.5".to_string())
        );
    }

    #[test]
    fn test_c_modules_are_disabled() {
        assert_eq!(
            execute("<#= tostring(pcall(package.loadlib, \"x\", \"y\")) #>"),
            Execution::Rendered("false".to_string())
        );
    }

    #[test]
    fn test_main_writes_rendered_text() {
        let artifact = LuaCompiler::default()
            .compile(&program_with("Hello <#= 40 + 2 #>", None))
            .unwrap();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");

        let (_lua, chunk) = load(&artifact).unwrap();
        let generator: Table = chunk.call(()).unwrap();
        let main: Function = generator.get(MAIN_METHOD).unwrap();
        main.call::<()>(path.to_string_lossy().to_string()).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Hello 42");
    }

    #[test]
    fn test_libraries_limit_globals() {
        let compiler = LuaCompiler::new(Libraries::from_names(["bit"]).unwrap());
        let artifact = compiler
            .compile(&program_with("<#= type(math) #>", None))
            .unwrap();
        assert_eq!(
            LuaExecutor.execute(&artifact, &CancelFlag::new()),
            Execution::Rendered("nil".to_string())
        );
    }
}
