//! Template front end for sgtt.
//!
//! Turns template text into a single Lua generator program:
//!
//! ```text
//! template text ─> lexer ─> directive resolver ─> synthesizer ─> SynthesizedProgram
//!                     ^            │                               (source + LineMap)
//!                     └─ includes ─┘
//! ```
//!
//! - [`lexer`] splits text into Text / Code / Expression / Directive tokens.
//! - [`directive`] interprets directives, splices include files in place and
//!   collects imports, output flags and directive errors.
//! - [`synth`] emits the Lua program and records, for every emitted line, the
//!   template file and line it came from.
//!
//! # Example
//!
//! ```ignore
//! use sgtt_template::{IncludeLookup, ProgramOptions, ResolveOptions, resolve, synthesize};
//!
//! let resolution = resolve(path, "Hello <#= name #>!", &IncludeLookup::new(), &ResolveOptions::default());
//! assert!(resolution.is_ok());
//! let program = synthesize(&resolution, &ProgramOptions::new(path));
//! ```

pub mod directive;
pub mod lexer;
pub mod section;
pub mod source;
pub mod synth;

pub use directive::{
    DirectiveError, DirectiveErrorKind, Import, OutputFlags, Resolution, ResolveOptions, resolve,
};
pub use lexer::{Lexer, lex};
pub use section::{SectionKind, TemplateSection, Token, TokenKind};
pub use source::{FileSource, IncludeLookup, MemorySource, ReadError, SourceFile};
pub use synth::{
    CHUNK_LABEL, CHUNK_NAME, GENERATOR_TABLE, LineMap, Origin, ProgramOptions, RENDER_METHOD,
    SynthesizedProgram, synthesize,
};
