//! Control-plane client and deployment driver for kiln.
//!
//! # Deploy flow
//!
//! ```text
//! Deployer::build(image, options)
//!   1. Prepare   ── inject sandbox runtime + default entrypoint
//!   2. Context   ── write to a temp dir, package as .tar.gz
//!   3. Upsert    ── update(name), or create on not-found; both request an upload URL
//!   4. Upload    ── PUT the archive to the upload URL
//!   5. Poll      ── get(name) every poll_interval until terminal or timeout
//!   6. Fetch     ── return the final remote resource
//! ```

pub mod control_plane;
pub mod deploy;
pub mod error;
pub mod resource;
pub mod status;

pub use control_plane::{ControlPlane, HttpControlPlane};
pub use deploy::{DeployOptions, Deployer, StatusObserver};
pub use error::{ControlPlaneError, DeployError};
pub use resource::{RemoteResource, SandboxResource, UploadTicket};
pub use status::{DeploymentStatus, PollOutcome, PollState};
