use std::path::PathBuf;

use kiln_build::sandbox;

pub fn render(with_sandbox: bool) -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let (config, image) = super::load_image(&project_dir)?;

    let image = if with_sandbox {
        sandbox::prepare_with(&config.sandbox, &image, &config.deploy.runtime_version)
    } else {
        image
    };

    print!("{}", image.dockerfile()?);
    Ok(())
}

pub fn hash() -> anyhow::Result<()> {
    let project_dir = PathBuf::from(".");
    let (_, image) = super::load_image(&project_dir)?;

    println!("{}", image.hash()?);
    Ok(())
}
