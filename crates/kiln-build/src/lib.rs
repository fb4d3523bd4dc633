//! Image description, Dockerfile generation, content addressing and
//! build-context packaging for kiln.
//!
//! # Build pipeline
//!
//! ```text
//! Image::from_registry(..).run_commands(..)...
//!   1. Render    ── DockerfileGenerator::render() / generate() (parse-back check)
//!   2. Hash      ── hash::content_hash() over Dockerfile + bound file mtimes
//!   3. Prepare   ── sandbox::prepare() injects the runtime binary + entrypoint
//!   4. Write     ── bundle::write() → image-{hash}/{Dockerfile, manifest.json, ...}
//!   5. Package   ── package::package() → in-memory .tar.gz
//! ```
//!
//! # Build directory layout
//!
//! - `Dockerfile`: the rendered instructions, exactly as hashed
//! - `manifest.json`: base image, hash and instruction/local-file counts
//! - one entry per bound local file or directory, named by its context name

pub mod bundle;
pub mod dockerfile;
pub mod error;
pub mod hash;
pub mod image;
pub mod instructions;
pub mod package;
pub mod sandbox;

pub use bundle::{Manifest, TempBuild};
pub use dockerfile::DockerfileGenerator;
pub use error::{BuildError, Result};
pub use image::Image;
pub use instructions::{InstructionSet, LocalFile};
