use std::path::PathBuf;

use kiln_build::{bundle, package as packager};

pub fn package(out: Option<PathBuf>) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let (_, image) = super::load_image(&project_dir)?;

    let context = bundle::write_temp(&image, None)?;
    let archive = packager::package(context.path())?;
    let hash = kiln_build::Manifest::read(context.path())?.hash;
    context.close()?;

    let out = out.unwrap_or_else(|| PathBuf::from(format!("image-{hash}.tar.gz")));
    std::fs::write(&out, &archive)?;

    println!("Packaged {} bytes to {}", archive.len(), out.display());
    Ok(())
}
