//! Dockerfile rendering and structural validation.
//!
//! The generator emits the instruction set verbatim; validation parses the
//! emitted text and checks that it yields one instruction per emitted line.
//! The rendered text is always returned as-is, never rebuilt from the parse,
//! so escapes inside exec-form arrays survive byte for byte.

use crate::error::{BuildError, Result};
use crate::instructions::InstructionSet;

/// Renders an [`InstructionSet`] into Dockerfile text.
pub struct DockerfileGenerator<'a> {
    spec: &'a InstructionSet,
}

impl<'a> DockerfileGenerator<'a> {
    pub fn new(spec: &'a InstructionSet) -> Self {
        Self { spec }
    }

    pub fn render(&self) -> String {
        let mut out = format!("FROM {}\n", self.spec.base_image());
        for line in self.spec.instructions() {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// `FROM` plus every appended instruction.
    pub fn expected_instruction_count(&self) -> usize {
        self.spec.instructions().len() + 1
    }

    /// Render and validate.
    pub fn generate(&self) -> Result<String> {
        let text = self.render();
        validate(&text, self.expected_instruction_count())?;
        Ok(text)
    }
}

/// Fail unless `content` parses into exactly `expected` instructions.
pub fn validate(content: &str, expected: usize) -> Result<()> {
    let parsed = parse(content)?.len();
    if parsed != expected {
        return Err(BuildError::Syntax {
            reason: format!(
                "instruction count mismatch after parsing (expected {expected}, parsed {parsed})"
            ),
        });
    }
    Ok(())
}

/// One logical Dockerfile instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedInstruction {
    /// Upper-cased keyword
    pub keyword: String,
    pub args: String,
    /// 1-based physical line where the instruction starts
    pub line: usize,
    /// Arguments of a JSON exec-form array, when present
    pub exec: Option<Vec<String>>,
}

const KEYWORDS: &[&str] = &[
    "ADD",
    "ARG",
    "CMD",
    "COPY",
    "ENTRYPOINT",
    "ENV",
    "EXPOSE",
    "FROM",
    "HEALTHCHECK",
    "LABEL",
    "MAINTAINER",
    "ONBUILD",
    "RUN",
    "SHELL",
    "STOPSIGNAL",
    "USER",
    "VOLUME",
    "WORKDIR",
];

/// Keywords whose `[...]` argument must be a JSON string array.
const EXEC_FORM_KEYWORDS: &[&str] = &["CMD", "ENTRYPOINT", "RUN", "SHELL"];

/// Parse Dockerfile text into logical instructions.
///
/// Handles `\` line continuations, blank lines and `#` comments. Only
/// structure is checked: every instruction must start with a known keyword
/// and carry arguments. Bracketed `CMD`/`ENTRYPOINT`/`RUN`/`SHELL` arguments
/// that parse as a JSON string array are exec form; anything else is shell
/// form, as Docker reads it.
pub fn parse(content: &str) -> Result<Vec<ParsedInstruction>> {
    let mut instructions = Vec::new();

    for (line, text) in logical_lines(content) {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let (keyword, args) = split_first_word(trimmed);
        let keyword = keyword.to_uppercase();
        if !KEYWORDS.contains(&keyword.as_str()) {
            return Err(BuildError::Syntax {
                reason: format!("line {line}: unknown instruction '{keyword}'"),
            });
        }
        if args.is_empty() {
            return Err(BuildError::Syntax {
                reason: format!("line {line}: {keyword} requires arguments"),
            });
        }

        let exec = if EXEC_FORM_KEYWORDS.contains(&keyword.as_str()) && args.starts_with('[') {
            match serde_json::from_str::<Vec<String>>(args) {
                Ok(parsed) => Some(parsed),
                // Not a JSON array: shell form, e.g. `RUN [ -f x ] && ...`
                Err(e) => {
                    tracing::trace!(
                        line,
                        keyword = %keyword,
                        error = %e,
                        "bracketed arguments are not JSON, treating as shell form"
                    );
                    None
                }
            }
        } else {
            None
        };

        instructions.push(ParsedInstruction {
            keyword,
            args: args.to_owned(),
            line,
            exec,
        });
    }

    Ok(instructions)
}

/// Join lines ending with `\` into logical lines, keeping each one's start line.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut start = 0;

    for (index, line) in content.lines().enumerate() {
        let line = if current.is_empty() {
            start = index + 1;
            line
        } else {
            line.trim_start()
        };
        match line.strip_suffix('\\') {
            Some(head) => {
                current.push_str(head.trim_end());
                current.push(' ');
            }
            None => {
                current.push_str(line);
                lines.push((start, std::mem::take(&mut current)));
            }
        }
    }

    // Trailing continuation with nothing after it
    if !current.is_empty() {
        lines.push((start, current));
    }

    lines
}

fn split_first_word(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}
