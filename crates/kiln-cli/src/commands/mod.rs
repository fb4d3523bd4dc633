mod deploy;
mod package;
mod render;
mod write;

use std::path::Path;

use kiln_build::Image;
use kiln_core::KilnConfig;

pub use deploy::{DeployArgs, deploy};
pub use package::package;
pub use render::{hash, render};
pub use write::write;

/// Load kiln.toml from `project_dir` and build the image it describes.
///
/// Relative local paths in the steps resolve against `project_dir`.
pub(crate) fn load_image(project_dir: &Path) -> anyhow::Result<(KilnConfig, Image)> {
    let config = KilnConfig::load(project_dir)?;
    let image = Image::from_config(&config.image, project_dir)?;
    Ok((config, image))
}
