use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn spec(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("specs").join(name)
}

fn mail_pipe(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mail-pipe"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run mail-pipe")
}

#[test]
fn test_writes_to_stdout() {
    let out = mail_pipe(&[&spec("forward-erich.pipe"), &spec("mailbox.data")]);
    assert!(out.status.success());

    let expected = fs::read_to_string(spec("forward-erich.out")).unwrap();
    assert_eq!(String::from_utf8(out.stdout).unwrap(), expected);
}

#[test]
fn test_writes_to_output_file_in_new_dir() {
    let dir = tempfile::tempdir().unwrap();
    let out_path = dir.path().join("nested").join("sent.data");

    let out = Command::new(env!("CARGO_BIN_EXE_mail-pipe"))
        .arg(spec("forward-erich.pipe"))
        .arg(spec("mailbox.data"))
        .arg("-o")
        .arg(&out_path)
        .arg("--verbose")
        .output()
        .unwrap();
    assert!(out.status.success());
    assert!(out.stdout.is_empty());

    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("Records:  3 in -> 3 out"));

    let expected = fs::read_to_string(spec("forward-erich.out")).unwrap();
    assert_eq!(fs::read_to_string(&out_path).unwrap(), expected);
}

#[test]
fn test_source_only_pipeline_prints_nothing() {
    let out = mail_pipe(&[&spec("drop-all.pipe"), &spec("mailbox.data")]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
}

#[test]
fn test_partial_trailing_unit_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("short.data");
    fs::write(&input, "a@x\nb@x\nfirst\nc@x\nd@x\n").unwrap();
    let pipeline = dir.path().join("all.pipe");
    fs::write(&pipeline, "PIPE READ\n| SEND\n?\n").unwrap();

    let out = mail_pipe(&[&pipeline, &input]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout).unwrap(), "a@x\nb@x\nfirst\n");
}

#[test]
fn test_invalid_pipeline_fails() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = dir.path().join("bad.pipe");
    fs::write(&pipeline, "PIPE COPY \"x@example.com\"\n| SEND\n").unwrap();

    let out = mail_pipe(&[&pipeline, &spec("mailbox.data")]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("COPY cannot be the first stage"));
}

#[test]
fn test_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.data");

    let out = mail_pipe(&[&spec("forward-erich.pipe"), &missing]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("Error reading input file"));
}
