use kiln_core::SandboxConfig;

use crate::image::Image;

/// Inject the sandbox runtime using the default runtime location.
pub fn prepare(image: &Image, runtime_version: &str) -> Image {
    prepare_with(&SandboxConfig::default(), image, runtime_version)
}

/// Inject the sandbox runtime binary and a default entrypoint.
///
/// The binary is copied from `{config.image}:{runtime_version}` unless the
/// rendered Dockerfile already mentions the binary or the runtime image
/// (a previous preparation, or a runtime-based `FROM`). An entrypoint
/// running the binary is added only when none has been set.
pub fn prepare_with(config: &SandboxConfig, image: &Image, runtime_version: &str) -> Image {
    let rendered = image.render();
    let already_present = rendered.contains(&config.binary) || rendered.contains(&config.image);

    let mut prepared = image.clone();
    if already_present {
        tracing::debug!(binary = %config.binary, "sandbox runtime already present");
    } else {
        prepared = prepared.copy(
            format!(
                "--from={}:{} /{}",
                config.image, runtime_version, config.binary
            ),
            &config.install_path,
        );
    }

    if !prepared.instruction_set().has_entrypoint() {
        prepared = prepared.entrypoint([config.install_path.as_str()]);
    }

    prepared
}
