use std::path::{Path, PathBuf};
use std::sync::Arc;

use kiln_core::config::parse_key_value;
use kiln_core::{ImageConfig, Step};

use crate::dockerfile::DockerfileGenerator;
use crate::error::{BuildError, Result};
use crate::instructions::{InstructionSet, derive_context_name, json_string};

/// Immutable container image description.
///
/// Every mutator returns a new `Image` backed by a cloned and extended
/// [`InstructionSet`]. A call that would add nothing (an empty list of
/// commands, variables, ports, labels or entrypoint arguments) returns an
/// image sharing the receiver's instruction set, which
/// [`Image::same_instance`] observes.
///
/// ```
/// use kiln_build::Image;
///
/// let image = Image::from_registry("python:3.11-slim")
///     .run_commands(["pip install uvicorn"])
///     .workdir("/app")
///     .expose([8080]);
///
/// assert!(image.render().starts_with("FROM python:3.11-slim\nRUN pip install uvicorn\n"));
/// ```
#[derive(Debug, Clone)]
pub struct Image {
    spec: Arc<InstructionSet>,
}

impl Image {
    pub fn from_registry(base_image: impl Into<String>) -> Self {
        Self {
            spec: Arc::new(InstructionSet::new(base_image)),
        }
    }

    /// Build an image from `[image]` in kiln.toml.
    ///
    /// Relative local paths are resolved against `base_dir`.
    pub fn from_config(config: &ImageConfig, base_dir: &Path) -> Result<Self> {
        let mut image = Self::from_registry(config.base.as_str());

        for step in &config.steps {
            image = match step {
                Step::Run(commands) => image.run_commands(commands),
                Step::Workdir(path) => image.workdir(path),
                Step::Env(entries) => image.env(key_values("env", entries)?),
                Step::Copy { src, dest } => image.copy(src, dest),
                Step::LocalFile { path, dest, name } => {
                    image.add_local_file(base_dir.join(path), dest, name.as_deref())?
                }
                Step::LocalDir { path, dest, name } => {
                    image.add_local_dir(base_dir.join(path), dest, name.as_deref())?
                }
                Step::Expose(ports) => image.expose(ports.iter().copied()),
                Step::Entrypoint(args) => image.entrypoint(args),
                Step::User(user) => image.user(user),
                Step::Label(entries) => image.label(key_values("label", entries)?),
                Step::Arg { name, default } => image.arg(name, default.as_deref()),
            };
        }

        Ok(image)
    }

    pub fn instruction_set(&self) -> &InstructionSet {
        &self.spec
    }

    /// Whether both images share the same underlying instruction set.
    pub fn same_instance(&self, other: &Image) -> bool {
        Arc::ptr_eq(&self.spec, &other.spec)
    }

    // ── Mutators ──

    pub fn workdir(&self, path: impl AsRef<str>) -> Self {
        let line = format!("WORKDIR {}", path.as_ref());
        self.extend(|spec| spec.push(line))
    }

    /// Append one `RUN` line per command.
    pub fn run_commands<I>(&self, commands: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let lines: Vec<String> = commands
            .into_iter()
            .map(|c| format!("RUN {}", c.into()))
            .collect();
        if lines.is_empty() {
            return self.clone();
        }
        self.extend(|spec| lines.into_iter().for_each(|line| spec.push(line)))
    }

    /// Append a single `ENV` line setting every variable, in order.
    pub fn env<I, K, V>(&self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        match key_value_line("ENV", vars) {
            Some(line) => self.extend(|spec| spec.push(line)),
            None => self.clone(),
        }
    }

    pub fn copy(&self, src: impl AsRef<str>, dest: impl AsRef<str>) -> Self {
        let line = format!("COPY {} {}", src.as_ref(), dest.as_ref());
        self.extend(|spec| spec.push(line))
    }

    /// Bind a host file into the build context and copy it to `dest`.
    ///
    /// The file is not read until the image is hashed or written.
    pub fn add_local_file(
        &self,
        path: impl AsRef<Path>,
        dest: impl AsRef<str>,
        context_name: Option<&str>,
    ) -> Result<Self> {
        self.bind_local(path.as_ref(), dest.as_ref(), context_name)
    }

    /// Bind a host directory into the build context and copy it to `dest`.
    pub fn add_local_dir(
        &self,
        path: impl AsRef<Path>,
        dest: impl AsRef<str>,
        context_name: Option<&str>,
    ) -> Result<Self> {
        self.bind_local(path.as_ref(), dest.as_ref(), context_name)
    }

    pub fn expose<I>(&self, ports: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        let ports: Vec<String> = ports.into_iter().map(|p| p.to_string()).collect();
        if ports.is_empty() {
            return self.clone();
        }
        let line = format!("EXPOSE {}", ports.join(" "));
        self.extend(|spec| spec.push(line))
    }

    /// Set the exec-form entrypoint.
    ///
    /// Each argument is JSON-escaped so that parsing the rendered array
    /// yields the original strings.
    pub fn entrypoint<I>(&self, args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let args: Vec<String> = args
            .into_iter()
            .map(|a| {
                let a: String = a.into();
                json_string(&a)
            })
            .collect();
        if args.is_empty() {
            return self.clone();
        }
        let line = format!("ENTRYPOINT [{}]", args.join(", "));
        self.extend(|spec| spec.push_entrypoint(line))
    }

    pub fn user(&self, user: impl AsRef<str>) -> Self {
        let line = format!("USER {}", user.as_ref());
        self.extend(|spec| spec.push(line))
    }

    /// Append a single `LABEL` line with every label, in order.
    pub fn label<I, K, V>(&self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        match key_value_line("LABEL", labels) {
            Some(line) => self.extend(|spec| spec.push(line)),
            None => self.clone(),
        }
    }

    pub fn arg(&self, name: impl AsRef<str>, default: Option<&str>) -> Self {
        let line = match default {
            Some(value) => format!("ARG {}={}", name.as_ref(), quote(value)),
            None => format!("ARG {}", name.as_ref()),
        };
        self.extend(|spec| spec.push(line))
    }

    // ── Outputs ──

    /// Raw Dockerfile text, without structural validation.
    pub fn render(&self) -> String {
        DockerfileGenerator::new(&self.spec).render()
    }

    /// Dockerfile text, validated by parsing it back.
    pub fn dockerfile(&self) -> Result<String> {
        DockerfileGenerator::new(&self.spec).generate()
    }

    /// 12-character content address over instructions and bound file mtimes.
    pub fn hash(&self) -> Result<String> {
        crate::hash::content_hash(&self.spec)
    }

    /// Materialize the build context under `destination_root`.
    pub fn write(&self, destination_root: &Path, name: Option<&str>) -> Result<PathBuf> {
        crate::bundle::write(self, destination_root, name)
    }

    /// Materialize the build context under a fresh temporary root.
    pub fn write_temp(&self, name: Option<&str>) -> Result<crate::bundle::TempBuild> {
        crate::bundle::write_temp(self, name)
    }

    fn bind_local(&self, path: &Path, dest: &str, context_name: Option<&str>) -> Result<Self> {
        let source = std::path::absolute(path).map_err(|e| BuildError::ResolvePath {
            path: path.to_path_buf(),
            source: e,
        })?;
        let requested = match context_name {
            Some(name) => name.to_owned(),
            None => derive_context_name(&source),
        };
        Ok(self.extend(|spec| {
            spec.bind(source, dest, &requested);
        }))
    }

    fn extend(&self, apply: impl FnOnce(&mut InstructionSet)) -> Self {
        let mut next = InstructionSet::clone(&self.spec);
        apply(&mut next);
        Self {
            spec: Arc::new(next),
        }
    }
}

/// `KEYWORD K1="v1" K2="v2"`, or `None` when there are no pairs.
fn key_value_line<I, K, V>(keyword: &str, pairs: I) -> Option<String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let pairs: Vec<String> = pairs
        .into_iter()
        .map(|(k, v)| format!("{}={}", k.into(), quote(&v.into())))
        .collect();
    if pairs.is_empty() {
        None
    } else {
        Some(format!("{keyword} {}", pairs.join(" ")))
    }
}

/// Double-quote a value, escaping backslashes and quotes.
fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

fn key_values(field: &'static str, entries: &[String]) -> Result<Vec<(String, String)>> {
    entries
        .iter()
        .map(|entry| parse_key_value(field, entry).map_err(BuildError::from))
        .collect()
}
