//! Path-segment safety checks.
//!
//! Owner logins and repository names come from the API and end up both in
//! filesystem paths and in `git` invocations, so they are restricted to ASCII
//! word characters, `.` and `-`.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

// `\w` in the regex crate is Unicode-aware; spell the ASCII class out.
static SAFE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-.A-Za-z0-9_]*$").unwrap_or_else(|e| panic!("invalid name pattern: {e}"))
});

/// A name failed the safe-character check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid name '{name}'")]
pub struct NameError {
    pub name: String,
}

/// Return `name` unchanged if it only contains `[-.A-Za-z0-9_]`.
pub fn validate(name: &str) -> Result<&str, NameError> {
    if SAFE_NAME.is_match(name) {
        Ok(name)
    } else {
        Err(NameError {
            name: name.to_string(),
        })
    }
}

/// [`validate`], and additionally reject names that do not denote a child
/// directory (`""`, `"."`, `".."`).
pub fn path_segment(name: &str) -> Result<&str, NameError> {
    match validate(name)? {
        "" | "." | ".." => Err(NameError {
            name: name.to_string(),
        }),
        ok => Ok(ok),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_safe_names() {
        for name in ["my-repo.v2", "dotfiles", "A_b-C.d", "123", ".github", ""] {
            assert_eq!(validate(name), Ok(name), "{name} should pass");
        }
    }

    #[test]
    fn test_rejects_unsafe_names() {
        for name in [
            "../etc",
            "a;rm -rf",
            "a/b",
            "a\\b",
            "has space",
            "tab\tname",
            "new\nline",
            "$(whoami)",
            "back`tick`",
            "ünïcödé",
            "名前",
        ] {
            assert!(validate(name).is_err(), "{name:?} should fail");
        }
    }

    #[test]
    fn test_path_segment_rejects_relative_names() {
        assert!(validate("..").is_ok());
        for name in ["", ".", ".."] {
            assert!(path_segment(name).is_err(), "{name:?} should fail");
        }
        assert_eq!(path_segment("...").unwrap(), "...");
        assert_eq!(path_segment(".github").unwrap(), ".github");
        assert!(path_segment("../x").is_err());
    }

    #[test]
    fn test_error_message() {
        let err = validate("a;b").unwrap_err();
        assert_eq!(err.to_string(), "invalid name 'a;b'");
        assert_eq!(err.name, "a;b");
    }
}
