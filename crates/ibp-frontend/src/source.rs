//! Source ingestion for plain and literate program files.
//!
//! - **Literate** (`.md`): Markdown where fenced code blocks tagged `ibp` hold
//!   the program and everything else is prose.
//! - **Plain** (anything else): the whole file is program text.
//!
//! Prose and fence lines are replaced by blank lines, so the program text has
//! the same line numbering as the file and branch program counters match what
//! the reader sees.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use ibp_core::Program;

use crate::parser::{parse, ParseError};

/// Program text extracted from an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceContent {
    /// Program text with the file's line numbering.
    pub text: String,
    /// The file path (for error reporting).
    pub file_path: String,
}

/// Extracts program text from a file's contents.
#[must_use]
pub fn extract_source(file_path: &Path, content: &str) -> SourceContent {
    let text = if is_literate_file(file_path) {
        extract_literate_source(content)
    } else {
        content.to_string()
    };
    SourceContent {
        text,
        file_path: file_path.to_string_lossy().to_string(),
    }
}

fn is_literate_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
}

fn extract_literate_source(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    let mut in_block = false;
    let mut fence_len = 0;

    for line in content.lines() {
        let mut keep = false;
        if let Some(len) = fence_length(line) {
            if in_block && len >= fence_len {
                in_block = false;
            } else if !in_block {
                let tag = line.trim_start()[len..].trim();
                if tag == "ibp" {
                    in_block = true;
                    fence_len = len;
                }
            } else {
                keep = true;
            }
        } else {
            keep = in_block;
        }

        if keep {
            text.push_str(line);
        }
        text.push('\n');
    }

    text
}

/// Number of backticks when `line` is a code fence (three or more).
fn fence_length(line: &str) -> Option<usize> {
    let count = line.trim_start().chars().take_while(|&c| c == '`').count();
    (count >= 3).then_some(count)
}

/// A parsed input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedProgram {
    /// Extracted program text.
    pub source: SourceContent,
    /// Parsed program tree.
    pub program: Program,
}

/// Failure to read or parse an input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The file could not be read.
    Io {
        /// File that failed.
        path: PathBuf,
        /// Operating system message.
        message: String,
    },
    /// The file was read but does not parse.
    Parse {
        /// File that failed.
        path: PathBuf,
        /// First syntax error.
        error: ParseError,
    },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "{}: error: cannot read file: {message}", path.display())
            }
            Self::Parse { path, error } => {
                let ParseError { location, kind } = error;
                write!(f, "{}:{location}: error: {kind}", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {}

/// Reads and parses a program file.
///
/// # Errors
///
/// Returns [`LoadError::Io`] when the file cannot be read and
/// [`LoadError::Parse`] when its program text is malformed.
pub fn load(path: &Path) -> Result<LoadedProgram, LoadError> {
    let content = fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    let source = extract_source(path, &content);
    let program = parse(&source.text).map_err(|error| LoadError::Parse {
        path: path.to_path_buf(),
        error,
    })?;
    Ok(LoadedProgram { source, program })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibp_core::LineRange;

    #[test]
    fn plain_file_passthrough() {
        let content = "let x = 1;\n// note\nlet y = x;\n";
        let result = extract_source(Path::new("demo.ibp"), content);
        assert_eq!(result.text, content);
        assert_eq!(result.file_path, "demo.ibp");
    }

    #[test]
    fn literate_blocks_keep_file_line_numbers() {
        let content = "# Title

Some prose.

```ibp
let x = 5;
```

More prose.

```ibp
if (x > 0) {
    let y = 1;
}
```
";
        let result = extract_source(Path::new("demo.md"), content);
        let lines: Vec<&str> = result.text.lines().collect();
        assert_eq!(lines[5], "let x = 5;");
        assert_eq!(lines[11], "if (x > 0) {");
        assert!(lines[2].is_empty());

        let program = parse(&result.text).expect("parses");
        assert_eq!(program.statements()[0].lines(), LineRange::single(6));
        assert_eq!(program.statements()[1].lines(), LineRange::new(12, 14));
    }

    #[test]
    fn literate_ignores_other_language_blocks() {
        let content = "```rust\nlet x = 1;\n```\n\n```ibp\nlet a = 2;\n```\n\n```\nlet b = 3;\n```\n";
        let result = extract_source(Path::new("notes.MD"), content);
        let program = parse(&result.text).expect("parses");
        assert_eq!(program.statements().len(), 1);
        assert_eq!(program.statements()[0].lines(), LineRange::single(6));
    }

    #[test]
    fn literate_four_backtick_fence_keeps_inner_fences() {
        let content = "````ibp\nlet a = 1;\n```\n````\n";
        let result = extract_source(Path::new("doc.md"), content);
        assert_eq!(result.text, "\nlet a = 1;\n```\n\n");
    }

    #[test]
    fn literate_without_blocks_is_blank() {
        let result = extract_source(Path::new("doc.md"), "# Title\n\nProse only.\n");
        assert!(parse(&result.text).expect("parses").is_empty());
    }

    #[test]
    fn fence_length_detection() {
        assert_eq!(fence_length("```"), Some(3));
        assert_eq!(fence_length("  ```ibp"), Some(3));
        assert_eq!(fence_length("````"), Some(4));
        assert_eq!(fence_length("``"), None);
        assert_eq!(fence_length("text"), None);
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.ibp");
        fs::write(&path, "let x = ;\n").expect("write");

        let error = load(&path).expect_err("malformed");
        assert!(matches!(error, LoadError::Parse { .. }));
        let expected = "broken.ibp:1:9: error: expected an expression, found `;`";
        assert!(error.to_string().ends_with(expected));
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let error = load(&dir.path().join("absent.ibp")).expect_err("missing");
        assert!(matches!(error, LoadError::Io { .. }));
    }

    #[test]
    fn load_parses_literate_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("lesson.md");
        fs::write(&path, "Intro\n\n```ibp\nlet a = i % 2;\n```\n").expect("write");

        let loaded = load(&path).expect("loads");
        assert_eq!(loaded.program.statements()[0].lines(), LineRange::single(4));
    }
}
