use std::path::{Path, PathBuf};

/// A host file or directory bound into the build context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    /// Absolute host path
    pub source: PathBuf,
    /// Path inside the image
    pub destination: String,
    /// Entry name inside the generated build directory
    pub context_name: String,
}

/// The ordered instruction list behind an [`Image`](crate::Image).
///
/// Instances are shared between image versions and never mutated once
/// shared; the builder clones and extends instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionSet {
    base_image: String,
    instructions: Vec<String>,
    local_files: Vec<LocalFile>,
    has_entrypoint: bool,
}

/// Names the materializer writes next to bound files.
const RESERVED_CONTEXT_NAMES: &[&str] = &["Dockerfile", "manifest.json"];

impl InstructionSet {
    pub fn new(base_image: impl Into<String>) -> Self {
        Self {
            base_image: base_image.into(),
            instructions: Vec::new(),
            local_files: Vec::new(),
            has_entrypoint: false,
        }
    }

    pub fn base_image(&self) -> &str {
        &self.base_image
    }

    /// Rendered instruction lines, excluding the `FROM` line.
    pub fn instructions(&self) -> &[String] {
        &self.instructions
    }

    pub fn local_files(&self) -> &[LocalFile] {
        &self.local_files
    }

    pub fn has_entrypoint(&self) -> bool {
        self.has_entrypoint
    }

    pub(crate) fn push(&mut self, line: String) {
        self.instructions.push(line);
    }

    pub(crate) fn push_entrypoint(&mut self, line: String) {
        self.instructions.push(line);
        self.has_entrypoint = true;
    }

    /// Record a binding and its `COPY` line, returning the context name used.
    pub(crate) fn bind(&mut self, source: PathBuf, destination: &str, requested: &str) -> String {
        let context_name = self.unique_context_name(requested);
        self.instructions
            .push(copy_line(&context_name, destination));
        self.local_files.push(LocalFile {
            source,
            destination: destination.to_owned(),
            context_name: context_name.clone(),
        });
        context_name
    }

    fn unique_context_name(&self, requested: &str) -> String {
        let taken = |name: &str| {
            RESERVED_CONTEXT_NAMES.contains(&name)
                || self.local_files.iter().any(|f| f.context_name == name)
        };

        if !taken(requested) {
            return requested.to_owned();
        }
        (2..)
            .map(|n| format!("{requested}-{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| requested.to_owned())
    }
}

/// `COPY src dest`, switching to the JSON array form when either side
/// contains whitespace.
fn copy_line(source: &str, destination: &str) -> String {
    if source.contains(char::is_whitespace) || destination.contains(char::is_whitespace) {
        format!(
            "COPY [{}, {}]",
            json_string(source),
            json_string(destination)
        )
    } else {
        format!("COPY {source} {destination}")
    }
}

/// A JSON string literal, escaped so that parsing it yields `value`.
pub(crate) fn json_string(value: &str) -> String {
    serde_json::Value::String(value.to_owned()).to_string()
}

/// Context name derived from the final segment of a host path.
pub(crate) fn derive_context_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => "context".to_owned(),
    }
}
