use std::path::Path;
use std::time::{Duration, SystemTime};

use kiln_build::dockerfile::{self, DockerfileGenerator};
use kiln_build::{BuildError, Image};
use kiln_core::{ImageConfig, Step};
use tempfile::TempDir;

fn sample_image() -> Image {
    Image::from_registry("python:3.11-slim")
        .run_commands(["echo hi"])
        .workdir("/app")
        .expose([8080])
}

fn set_mtime(path: &Path, secs: u64) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

// ── Identity-preserving no-ops ──

#[test]
fn empty_env_returns_same_instance() {
    let image = sample_image();
    let next = image.env(Vec::<(String, String)>::new());
    assert!(next.same_instance(&image));
}

#[test]
fn empty_expose_returns_same_instance() {
    let image = sample_image();
    assert!(image.expose([]).same_instance(&image));
}

#[test]
fn empty_entrypoint_returns_same_instance() {
    let image = sample_image();
    let next = image.entrypoint(Vec::<String>::new());
    assert!(next.same_instance(&image));
    assert!(!next.instruction_set().has_entrypoint());
}

#[test]
fn empty_label_and_run_return_same_instance() {
    let image = sample_image();
    assert!(image.label(Vec::<(&str, &str)>::new()).same_instance(&image));
    assert!(image.run_commands(Vec::<String>::new()).same_instance(&image));
}

#[test]
fn mutator_returns_new_instance_and_leaves_receiver_untouched() {
    let image = sample_image();
    let next = image.env([("PORT", "8080")]);

    assert!(!next.same_instance(&image));
    assert_eq!(image.instruction_set().instructions().len(), 3);
    assert_eq!(next.instruction_set().instructions().len(), 4);
    assert!(!image.render().contains("ENV"));
}

// ── Rendering ──

#[test]
fn renders_four_line_dockerfile_in_call_order() {
    let image = sample_image();
    assert_eq!(
        image.render(),
        "FROM python:3.11-slim\nRUN echo hi\nWORKDIR /app\nEXPOSE 8080\n"
    );
    assert_eq!(image.dockerfile().unwrap(), image.render());
}

#[test]
fn run_commands_emit_one_line_each() {
    let image = Image::from_registry("alpine").run_commands(["apk add curl", "curl --version"]);
    assert_eq!(
        image.instruction_set().instructions(),
        ["RUN apk add curl", "RUN curl --version"]
    );
}

#[test]
fn env_values_are_double_quoted_and_escaped() {
    let image = Image::from_registry("alpine").env([("A", "1"), ("B", r#"say "hi" \ bye"#)]);
    assert_eq!(
        image.instruction_set().instructions(),
        [r#"ENV A="1" B="say \"hi\" \\ bye""#]
    );
    assert!(image.dockerfile().is_ok());
}

#[test]
fn label_user_copy_and_arg_render_as_single_lines() {
    let image = Image::from_registry("alpine")
        .label([("org.opencontainers.image.title", "demo")])
        .user("app")
        .copy("--from=builder /out/app", "/usr/local/bin/app")
        .arg("VERSION", Some("1.0"))
        .arg("TARGET", None)
        .expose([80, 443]);

    assert_eq!(
        image.instruction_set().instructions(),
        [
            r#"LABEL org.opencontainers.image.title="demo""#,
            "USER app",
            "COPY --from=builder /out/app /usr/local/bin/app",
            r#"ARG VERSION="1.0""#,
            "ARG TARGET",
            "EXPOSE 80 443",
        ]
    );
    assert!(image.dockerfile().is_ok());
}

#[test]
fn entrypoint_arguments_round_trip_through_json() {
    let args = vec![
        "/bin/sh".to_owned(),
        "-c".to_owned(),
        "echo \"quoted\" back\\slash\nnext line".to_owned(),
    ];
    let image = Image::from_registry("alpine").entrypoint(&args);

    assert!(image.instruction_set().has_entrypoint());
    let rendered = image.dockerfile().unwrap();
    assert!(rendered.contains(r#"\"quoted\""#));
    assert!(rendered.contains(r"back\\slash"));
    assert!(rendered.contains(r"\nnext line"));
    assert_eq!(rendered.lines().count(), 2);

    let parsed = dockerfile::parse(&rendered).unwrap();
    let entrypoint = parsed
        .iter()
        .find(|i| i.keyword == "ENTRYPOINT")
        .unwrap();
    assert_eq!(entrypoint.exec.as_ref().unwrap(), &args);
}

// ── Structural validation ──

#[test]
fn trailing_backslash_fails_instruction_count_parity() {
    let image = Image::from_registry("alpine")
        .run_commands(["echo a \\"])
        .workdir("/app");

    let err = image.dockerfile().unwrap_err();
    assert!(matches!(err, BuildError::Syntax { .. }));
    assert!(
        err.to_string()
            .contains("instruction count mismatch after parsing")
    );
}

#[test]
fn multiline_env_value_is_rejected() {
    let image = Image::from_registry("alpine").env([("A", "line1\nline2")]);
    assert!(matches!(
        image.dockerfile(),
        Err(BuildError::Syntax { .. })
    ));
}

#[test]
fn generator_counts_from_line() {
    let image = sample_image();
    let generator = DockerfileGenerator::new(image.instruction_set());
    assert_eq!(generator.expected_instruction_count(), 4);
    assert!(dockerfile::validate(&generator.render(), 4).is_ok());
    assert!(dockerfile::validate(&generator.render(), 5).is_err());
}

#[test]
fn parser_skips_comments_and_joins_continuations() {
    let content = "# syntax comment\nFROM alpine\n\nRUN apk add \\\n    curl\nCMD [\"sh\"]\n";
    let parsed = dockerfile::parse(content).unwrap();

    let keywords: Vec<&str> = parsed.iter().map(|i| i.keyword.as_str()).collect();
    assert_eq!(keywords, ["FROM", "RUN", "CMD"]);
    assert_eq!(parsed[1].line, 4);
    assert_eq!(parsed[1].args, "apk add curl");
    assert_eq!(parsed[2].exec.as_deref(), Some(&["sh".to_owned()][..]));
}

#[test]
fn parser_rejects_unknown_instruction() {
    let err = dockerfile::parse("FROM alpine\nFROBNICATE now\n").unwrap_err();
    assert!(err.to_string().contains("FROBNICATE"));
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn parser_rejects_missing_arguments() {
    let err = dockerfile::parse("FROM\n").unwrap_err();
    assert!(err.to_string().contains("FROM requires arguments"));
}

#[test]
fn parser_reads_non_json_brackets_as_shell_form() {
    let parsed =
        dockerfile::parse("FROM alpine\nRUN [ -f /etc/os-release ] && cat /etc/os-release\nCMD [\"unterminated\n")
            .unwrap();

    assert_eq!(parsed.len(), 3);
    assert_eq!(parsed[1].args, "[ -f /etc/os-release ] && cat /etc/os-release");
    assert_eq!(parsed[1].exec, None);
    assert_eq!(parsed[2].exec, None);
}

#[test]
fn shell_test_bracket_command_renders_and_writes() {
    let tmp = TempDir::new().unwrap();
    let image = Image::from_registry("alpine:3")
        .run_commands(["[ -f /etc/os-release ] && cat /etc/os-release"]);

    assert_eq!(
        image.dockerfile().unwrap(),
        "FROM alpine:3\nRUN [ -f /etc/os-release ] && cat /etc/os-release\n"
    );
    let build_dir = image.write(tmp.path(), None).unwrap();
    assert!(build_dir.join("Dockerfile").is_file());
}

// ── Content hash ──

#[test]
fn hash_is_twelve_lowercase_hex_and_stable() {
    let first = sample_image().hash().unwrap();
    let second = sample_image().hash().unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 12);
    assert!(
        first
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    );
}

#[test]
fn hash_changes_with_base_image_and_arguments() {
    let base = sample_image().hash().unwrap();

    let other_base = Image::from_registry("python:3.12-slim")
        .run_commands(["echo hi"])
        .workdir("/app")
        .expose([8080])
        .hash()
        .unwrap();
    let other_port = Image::from_registry("python:3.11-slim")
        .run_commands(["echo hi"])
        .workdir("/app")
        .expose([8081])
        .hash()
        .unwrap();

    assert_ne!(base, other_base);
    assert_ne!(base, other_port);
}

#[test]
fn hash_changes_with_local_file_mtime() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("app.py");
    std::fs::write(&file, "print('hi')").unwrap();
    set_mtime(&file, 1_700_000_000);

    let image = Image::from_registry("python:3.11-slim")
        .add_local_file(&file, "/app/app.py", None)
        .unwrap();
    let before = image.hash().unwrap();
    assert_eq!(before, image.hash().unwrap());

    set_mtime(&file, 1_700_000_060);
    assert_ne!(before, image.hash().unwrap());
}

#[test]
fn hash_fails_fast_on_missing_local_file() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("gone.txt");
    std::fs::write(&file, "x").unwrap();

    let image = Image::from_registry("alpine")
        .add_local_file(&file, "/gone.txt", None)
        .unwrap();
    std::fs::remove_file(&file).unwrap();

    let err = image.hash().unwrap_err();
    assert!(matches!(err, BuildError::LocalFileNotFound { ref path } if path == &file));
    assert!(err.to_string().contains("local file not found"));
    assert!(err.to_string().contains("gone.txt"));
}

// ── Local file binding ──

#[test]
fn binding_records_absolute_path_and_copy_line() {
    let image = Image::from_registry("alpine")
        .add_local_dir("relative/src", "/app/src", None)
        .unwrap();

    let files = image.instruction_set().local_files();
    assert_eq!(files.len(), 1);
    assert!(files[0].source.is_absolute());
    assert!(files[0].source.ends_with("relative/src"));
    assert_eq!(files[0].context_name, "src");
    assert_eq!(files[0].destination, "/app/src");
    assert_eq!(
        image.instruction_set().instructions(),
        ["COPY src /app/src"]
    );
}

#[test]
fn explicit_context_name_is_used() {
    let image = Image::from_registry("alpine")
        .add_local_file("/etc/hosts", "/etc/hosts.copy", Some("hosts-file"))
        .unwrap();
    assert_eq!(
        image.instruction_set().instructions(),
        ["COPY hosts-file /etc/hosts.copy"]
    );
}

#[test]
fn whitespace_in_context_name_or_destination_uses_json_copy() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("my file.txt");
    std::fs::write(&file, "x").unwrap();

    let image = Image::from_registry("alpine")
        .add_local_file(&file, "/data/my file.txt", None)
        .unwrap()
        .add_local_file(&file, "/data/plain.txt", Some("plain"))
        .unwrap();

    assert_eq!(
        image.instruction_set().instructions(),
        [
            r#"COPY ["my file.txt", "/data/my file.txt"]"#,
            "COPY plain /data/plain.txt",
        ]
    );

    let rendered = image.dockerfile().unwrap();
    let parsed = dockerfile::parse(&rendered).unwrap();
    assert_eq!(parsed[1].args, r#"["my file.txt", "/data/my file.txt"]"#);

    let build_dir = image.write(&tmp.path().join("out"), None).unwrap();
    assert!(build_dir.join("my file.txt").is_file());
}

#[test]
fn colliding_context_names_get_suffixes() {
    let image = Image::from_registry("alpine")
        .add_local_dir("/a/src", "/one", None)
        .unwrap()
        .add_local_dir("/b/src", "/two", None)
        .unwrap()
        .add_local_file("/c/Dockerfile", "/three", None)
        .unwrap();

    let names: Vec<&str> = image
        .instruction_set()
        .local_files()
        .iter()
        .map(|f| f.context_name.as_str())
        .collect();
    assert_eq!(names, ["src", "src-2", "Dockerfile-2"]);
}

// ── Config ──

#[test]
fn from_config_applies_steps_in_order() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("main.py"), "print('hi')").unwrap();

    let config = ImageConfig {
        base: "python:3.11-slim".to_owned(),
        steps: vec![
            Step::Run(vec!["pip install flask".to_owned()]),
            Step::Env(vec!["PORT=8080".to_owned()]),
            Step::LocalFile {
                path: "main.py".to_owned(),
                dest: "/app/main.py".to_owned(),
                name: None,
            },
            Step::Entrypoint(vec!["python".to_owned(), "/app/main.py".to_owned()]),
        ],
    };

    let image = Image::from_config(&config, tmp.path()).unwrap();
    assert_eq!(
        image.render(),
        "FROM python:3.11-slim\n\
         RUN pip install flask\n\
         ENV PORT=\"8080\"\n\
         COPY main.py /app/main.py\n\
         ENTRYPOINT [\"python\", \"/app/main.py\"]\n"
    );
    assert_eq!(
        image.instruction_set().local_files()[0].source,
        std::path::absolute(tmp.path().join("main.py")).unwrap()
    );
    assert!(image.instruction_set().has_entrypoint());
}

#[test]
fn from_config_rejects_malformed_env() {
    let config = ImageConfig {
        base: "alpine".to_owned(),
        steps: vec![Step::Env(vec!["NOEQUALS".to_owned()])],
    };
    let err = Image::from_config(&config, Path::new(".")).unwrap_err();
    assert!(matches!(err, BuildError::Config(_)));
}
