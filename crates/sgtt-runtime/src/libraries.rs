//! Standard libraries linked into generator programs.

use mlua::StdLib;

/// Libraries every generator program needs: `table.concat` builds the
/// output, `io` backs the `main` entry point, `os.setlocale` switches
/// locale, `string` backs `tostring` of formatted values and `package`
/// provides `require` for imports.
pub const ALWAYS_LINKED: &[&str] = &["table", "io", "os", "string", "package"];

/// Libraries linked when nothing is configured.
pub const DEFAULT_LIBRARIES: &[&str] = &["table", "io", "os", "string", "package", "math"];

/// Known library names, in link order.
const KNOWN: &[(&str, StdLib)] = &[
    // part of the base library in LuaJIT
    ("coroutine", StdLib::NONE),
    ("table", StdLib::TABLE),
    ("io", StdLib::IO),
    ("os", StdLib::OS),
    ("string", StdLib::STRING),
    ("math", StdLib::MATH),
    ("package", StdLib::PACKAGE),
    ("bit", StdLib::BIT),
    ("jit", StdLib::JIT),
];

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("unknown library '{name}' (known: {known})")]
    UnknownLibrary { name: String, known: String },
}

/// A validated set of library names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Libraries {
    names: Vec<&'static str>,
}

impl Libraries {
    /// Validate `names`, adding the always-linked libraries.
    pub fn from_names<I, S>(names: I) -> Result<Self, RuntimeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut requested: Vec<&'static str> = ALWAYS_LINKED.to_vec();
        for name in names {
            let name = name.as_ref().trim();
            let Some((known, _)) = KNOWN.iter().find(|(known, _)| *known == name) else {
                return Err(RuntimeError::UnknownLibrary {
                    name: name.to_string(),
                    known: KNOWN
                        .iter()
                        .map(|(n, _)| *n)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            };
            requested.push(*known);
        }

        let names = KNOWN
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| requested.contains(name))
            .collect();
        Ok(Self { names })
    }

    /// Linked library names, in link order.
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Library flags for creating a Lua state.
    pub fn std_lib(&self) -> StdLib {
        KNOWN
            .iter()
            .filter(|(name, _)| self.names.contains(name))
            .fold(StdLib::NONE, |libs, (_, lib)| libs | *lib)
    }
}

impl Default for Libraries {
    fn default() -> Self {
        Self {
            names: KNOWN
                .iter()
                .map(|(name, _)| *name)
                .filter(|name| DEFAULT_LIBRARIES.contains(name))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_linked_are_added() {
        let libraries = Libraries::from_names(["math"]).unwrap();
        assert_eq!(
            libraries.names(),
            &["table", "io", "os", "string", "math", "package"]
        );
    }

    #[test]
    fn test_duplicates_and_order() {
        let libraries = Libraries::from_names(["jit", " io ", "io", "coroutine"]).unwrap();
        assert_eq!(
            libraries.names(),
            &["coroutine", "table", "io", "os", "string", "package", "jit"]
        );
    }

    #[test]
    fn test_unknown_library() {
        let err = Libraries::from_names(["socket"]).unwrap_err();
        assert!(err.to_string().starts_with("unknown library 'socket'"));
    }

    #[test]
    fn test_std_lib_flags() {
        let libraries = Libraries::from_names(["bit"]).unwrap();
        assert_eq!(
            libraries.std_lib(),
            StdLib::TABLE | StdLib::IO | StdLib::OS | StdLib::STRING | StdLib::PACKAGE | StdLib::BIT
        );
    }

    #[test]
    fn test_default() {
        assert_eq!(
            Libraries::default().names(),
            &["table", "io", "os", "string", "math", "package"]
        );
    }
}
