use assert_fs::TempDir;
use assert_fs::prelude::*;
use std::io::Write;
use std::process::{Command, Stdio};

fn atomwrite(cfg_dir: &TempDir) -> Command {
    let me = assert_cmd::cargo::cargo_bin!("atomwrite");
    let mut cmd = Command::new(me);
    // Keep the user's real config out of the picture.
    cmd.env("ATOMWRITE_CONFIG", cfg_dir.child("config.xml").path());
    cmd
}

#[test]
fn binary_print_config_succeeds() {
    let cfg = TempDir::new().unwrap();
    let out = atomwrite(&cfg)
        .arg("--print-config")
        .output()
        .expect("spawn binary");
    assert!(out.status.success(), "binary should succeed with --print-config");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("config.xml"), "stdout: {stdout}");
}

#[test]
fn writes_stdin_to_destination() {
    let cfg = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let dest = work.child("out.txt");

    let mut child = atomwrite(&cfg)
        .arg(dest.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn binary");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"piped payload\n")
        .unwrap();
    let out = child.wait_with_output().unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    dest.assert("piped payload\n");
}

#[test]
fn writes_input_file_to_destination() {
    let cfg = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let input = work.child("in.bin");
    input.write_binary(&[0u8, 1, 2, 255]).unwrap();
    let dest = work.child("out.bin");
    dest.write_str("old").unwrap();

    let out = atomwrite(&cfg)
        .arg("--input")
        .arg(input.path())
        .arg(dest.path())
        .stdin(Stdio::null())
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert_eq!(std::fs::read(dest.path()).unwrap(), vec![0u8, 1, 2, 255]);
}

#[test]
fn no_clobber_exits_with_destination_exists_code() {
    let cfg = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let dest = work.child("taken.txt");
    dest.write_str("original").unwrap();
    let input = work.child("in.txt");
    input.write_str("new").unwrap();

    let out = atomwrite(&cfg)
        .args(["--no-clobber", "--input"])
        .arg(input.path())
        .arg(dest.path())
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(81));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("already exists"), "stderr: {stderr}");
    dest.assert("original");
}

#[test]
fn missing_input_file_fails_cleanly() {
    let cfg = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let dest = work.child("never.txt");

    let out = atomwrite(&cfg)
        .arg("--input")
        .arg(work.child("absent.txt").path())
        .arg(dest.path())
        .output()
        .unwrap();
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("read input"), "stderr: {stderr}");
    dest.assert(predicates::path::missing());
}

#[test]
fn init_config_creates_template_under_env_path() {
    let cfg = TempDir::new().unwrap();
    let out = atomwrite(&cfg).arg("--init-config").output().unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    cfg.child("config.xml").assert(predicates::str::contains("<config>"));

    // Running again reports the existing file and keeps it.
    let again = atomwrite(&cfg).arg("--init-config").output().unwrap();
    assert!(again.status.success());
    assert!(String::from_utf8_lossy(&again.stdout).contains("already exists"));
}

#[test]
fn config_no_clobber_applies_and_replace_flag_overrides_it() {
    let cfg = TempDir::new().unwrap();
    cfg.child("config.xml")
        .write_str("<config><strategy>no_clobber</strategy><log_level>quiet</log_level></config>")
        .unwrap();
    let work = TempDir::new().unwrap();
    let dest = work.child("f.txt");
    dest.write_str("v1").unwrap();
    let input = work.child("in.txt");
    input.write_str("v2").unwrap();

    let refused = atomwrite(&cfg).arg("-i").arg(input.path()).arg(dest.path()).output().unwrap();
    assert_eq!(refused.status.code(), Some(81));
    dest.assert("v1");

    let replaced = atomwrite(&cfg)
        .arg("--replace")
        .arg("-i")
        .arg(input.path())
        .arg(dest.path())
        .output()
        .unwrap();
    assert!(replaced.status.success());
    dest.assert("v2");
}

#[cfg(unix)]
#[test]
fn interrupt_while_waiting_on_stdin_exits_without_eof() {
    use std::os::unix::process::ExitStatusExt;
    use std::time::{Duration, Instant};

    let cfg = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let dest = work.child("never.txt");

    let mut child = atomwrite(&cfg)
        .arg(dest.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn binary");
    // Keep stdin open so the read can only end through the interrupt.
    let _stdin = child.stdin.take().unwrap();
    std::thread::sleep(Duration::from_millis(500));
    unsafe {
        libc::kill(child.id() as libc::pid_t, libc::SIGINT);
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    let status = loop {
        if let Some(status) = child.try_wait().unwrap() {
            break status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("process still blocked on stdin after SIGINT");
        }
        std::thread::sleep(Duration::from_millis(20));
    };
    // 130 from the handler; a bare SIGINT death if it landed before installation.
    assert!(
        status.code() == Some(130) || status.signal() == Some(libc::SIGINT),
        "status: {status:?}"
    );
    dest.assert(predicates::path::missing());
}
