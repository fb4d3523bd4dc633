use std::path::PathBuf;

use kiln_build::bundle;

pub fn write(out: Option<PathBuf>, name: Option<&str>) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let (_, image) = super::load_image(&project_dir)?;

    let destination_root = out.unwrap_or_else(|| project_dir.clone());
    let build_dir = bundle::write(&image, &destination_root, name)?;

    println!("Wrote build context to {}", build_dir.display());
    Ok(())
}
