//! Directive resolution.
//!
//! Walks the lexed tokens of a template, passing Text / Code / Expression
//! tokens through as [`TemplateSection`]s and interpreting directives:
//!
//! - `<#@ import namespace="string" #>` adds `local string = require("string")`
//! - `<#@ include file="common.ttinc" once="true" #>` splices another file in place
//! - `<#@ AppendReferenceAssemblies #>` / `<#@ AppendGeneraterSource #>` set output flags
//!
//! The first token may also carry its primary attribute directly:
//! `<#@ include="common.ttinc" #>` or `<#@ include="file=common.ttinc" once="true" #>`.
//!
//! Errors never abort resolution; they are collected and rendered as comment
//! lines by [`Resolution::error_comments`].

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::lexer::lex;
use crate::section::{SectionKind, TemplateSection, Token};
use crate::source::{IncludeLookup, ReadError, SourceFile};

/// Default include file extension (without the dot).
pub const DEFAULT_INCLUDE_EXTENSION: &str = "ttinc";

const IMPORT_PREFIX: &str = "namespace=\"";

static INCLUDE_ARGS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\Afile="(?P<file>[^"]+)"(?P<once>\s+once="true")?\s*\z"#)
        .expect("include directive pattern is valid")
});

const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Options for [`resolve`].
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Extension include file names must carry, without the dot.
    pub include_extension: String,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            include_extension: DEFAULT_INCLUDE_EXTENSION.to_string(),
        }
    }
}

/// A module import requested by an `import` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Module path passed to `require`.
    pub module: String,
    /// Local name the module is bound to (last path segment).
    pub binding: String,
    pub file: Arc<Path>,
    pub line: usize,
    pub column: usize,
}

/// Render-wide output annotations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputFlags {
    /// `AppendReferenceAssemblies`: list the linked libraries after the output.
    pub append_libraries: bool,
    /// `AppendGeneraterSource`: append the generator program as comments.
    pub append_program: bool,
}

/// Label of a directive error, as shown in the comment line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectiveErrorKind {
    #[error("UnknownDirective")]
    UnknownDirective,

    #[error("InvalidImportDirective")]
    InvalidImportDirective,

    #[error("InvalidIncludeDirective")]
    InvalidIncludeDirective,

    #[error("UnsupportedExtension")]
    UnsupportedExtension,

    #[error("IncludeFileNotFound")]
    IncludeFileNotFound,

    #[error("IncludeFileDuplicated")]
    IncludeFileDuplicated,

    #[error("CyclicInclude")]
    CyclicInclude,

    #[error("MissingSourceText")]
    MissingSourceText,

    #[error("InvalidIncludeDirective \"{0}\" is not found.")]
    IncludeNotReadable(String),

    #[error("InvalidIncludeDirective permission error.")]
    IncludePermissionDenied,

    #[error("InvalidIncludeDirective io error.")]
    IncludeIo,
}

/// A directive that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveError {
    pub kind: DirectiveErrorKind,
    pub file: Arc<Path>,
    pub line: usize,
    pub column: usize,
    /// Raw directive content.
    pub content: String,
}

impl fmt::Display for DirectiveError {
    /// `// <file>(<line>,<column>) [<label>]: <directive on one line>`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let content = self.content.replace("\r\n", " ").replace('\n', " ");
        write!(
            f,
            "// {}({},{}) [{}]: {}",
            self.file.display(),
            self.line,
            self.column + 1,
            self.kind,
            content.trim()
        )
    }
}

impl std::error::Error for DirectiveError {}

/// Result of resolving one template with all of its includes.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Program body in document order, includes spliced in.
    pub sections: Vec<TemplateSection>,
    pub imports: Vec<Import>,
    pub flags: OutputFlags,
    pub errors: Vec<DirectiveError>,
}

impl Resolution {
    /// True when no directive failed anywhere in the render.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// One comment line per directive error.
    pub fn error_comments(&self) -> String {
        let mut out = String::new();
        for error in &self.errors {
            out.push_str(&error.to_string());
            out.push('\n');
        }
        out
    }
}

/// Resolve the template at `path` whose text is `text`.
pub fn resolve(
    path: &Path,
    text: &str,
    includes: &IncludeLookup,
    options: &ResolveOptions,
) -> Resolution {
    let mut resolver = Resolver {
        includes,
        include_suffix: format!(".{}", options.include_extension),
        once_guard: HashSet::new(),
        active: Vec::new(),
        out: Resolution::default(),
    };
    resolver.resolve_file(Arc::from(path), text);

    debug!(
        template = %path.display(),
        sections = resolver.out.sections.len(),
        imports = resolver.out.imports.len(),
        errors = resolver.out.errors.len(),
        "resolved template"
    );
    resolver.out
}

struct Resolver<'a> {
    includes: &'a IncludeLookup,
    include_suffix: String,
    /// Every include seen in this render.
    once_guard: HashSet<Arc<Path>>,
    /// Includes on the current inclusion path.
    active: Vec<Arc<Path>>,
    out: Resolution,
}

impl Resolver<'_> {
    fn resolve_file(&mut self, file: Arc<Path>, text: &str) {
        for token in lex(text) {
            match SectionKind::from_token(token.kind) {
                Some(kind) => self.out.sections.push(TemplateSection {
                    kind,
                    file: file.clone(),
                    line: token.line,
                    column: token.column,
                    content: token.content,
                }),
                None => self.directive(&file, &token),
            }
        }
    }

    fn directive(&mut self, file: &Arc<Path>, token: &Token) {
        let Some((name, args)) = split_directive(&token.content) else {
            self.fail(DirectiveErrorKind::UnknownDirective, file, token);
            return;
        };

        match name {
            "import" => self.import(file, token, &args),
            "include" => self.include(file, token, &args),
            "AppendReferenceAssemblies" => self.out.flags.append_libraries = true,
            "AppendGeneraterSource" => self.out.flags.append_program = true,
            _ => self.fail(DirectiveErrorKind::UnknownDirective, file, token),
        }
    }

    fn import(&mut self, file: &Arc<Path>, token: &Token, args: &str) {
        let module = args
            .strip_prefix(IMPORT_PREFIX)
            .and_then(|rest| rest.strip_suffix('"'))
            .map(|module| module.trim_matches(' '))
            .filter(|module| is_module_path(module));

        let Some(module) = module else {
            self.fail(DirectiveErrorKind::InvalidImportDirective, file, token);
            return;
        };

        let binding = module.rsplit('.').next().unwrap_or(module);
        self.out.imports.push(Import {
            module: module.to_string(),
            binding: binding.to_string(),
            file: file.clone(),
            line: token.line,
            column: token.column,
        });
    }

    fn include(&mut self, file: &Arc<Path>, token: &Token, args: &str) {
        let Some(captures) = INCLUDE_ARGS.captures(args) else {
            self.fail(DirectiveErrorKind::InvalidIncludeDirective, file, token);
            return;
        };
        let name = &captures["file"];
        let once = captures.name("once").is_some();

        if !name.ends_with(&self.include_suffix) {
            self.fail(DirectiveErrorKind::UnsupportedExtension, file, token);
            return;
        }

        let source = match self.includes.candidates(name) {
            [] => {
                self.fail(DirectiveErrorKind::IncludeFileNotFound, file, token);
                return;
            }
            [single] => Arc::clone(single),
            _ => {
                self.fail(DirectiveErrorKind::IncludeFileDuplicated, file, token);
                return;
            }
        };

        let path: Arc<Path> = Arc::from(source.path());
        let first_time = self.once_guard.insert(path.clone());
        if once && !first_time {
            debug!(include = %path.display(), "skipping include already expanded once");
            return;
        }

        if self.active.contains(&path) {
            self.fail(DirectiveErrorKind::CyclicInclude, file, token);
            return;
        }

        let text = match source.read_text() {
            Ok(text) => text,
            Err(err) => {
                let kind = match err {
                    ReadError::Missing => DirectiveErrorKind::MissingSourceText,
                    ReadError::NotFound => DirectiveErrorKind::IncludeNotReadable(name.to_string()),
                    ReadError::PermissionDenied => DirectiveErrorKind::IncludePermissionDenied,
                    ReadError::Io(_) => DirectiveErrorKind::IncludeIo,
                };
                self.fail(kind, file, token);
                return;
            }
        };

        self.active.push(path.clone());
        self.resolve_file(path, &text);
        self.active.pop();
    }

    fn fail(&mut self, kind: DirectiveErrorKind, file: &Arc<Path>, token: &Token) {
        let error = DirectiveError {
            kind,
            file: file.clone(),
            line: token.line,
            column: token.column,
            content: token.content.clone(),
        };
        warn!("{error}");
        self.out.errors.push(error);
    }
}

/// Split a directive body into its name and normalized argument text.
///
/// Returns `None` for an empty directive.
fn split_directive(content: &str) -> Option<(&str, String)> {
    let body = content.trim_start();
    if body.is_empty() {
        return None;
    }

    let (head, rest) = body.split_once(char::is_whitespace).unwrap_or((body, ""));
    let rest = rest.trim();

    let Some((name, value)) = head.split_once('=') else {
        return Some((head, rest.to_string()));
    };

    let attribute = match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => match inner.split_once('=') {
            Some((key, value)) => format!("{key}=\"{value}\""),
            None => format!("{}=\"{inner}\"", primary_attribute(name)),
        },
        None => value.to_string(),
    };

    if rest.is_empty() {
        Some((name, attribute))
    } else {
        Some((name, format!("{attribute} {rest}")))
    }
}

fn primary_attribute(directive: &str) -> &'static str {
    match directive {
        "import" => "namespace",
        _ => "file",
    }
}

fn is_module_path(module: &str) -> bool {
    !module.is_empty() && module.split('.').all(is_identifier)
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !LUA_KEYWORDS.contains(&segment)
}
