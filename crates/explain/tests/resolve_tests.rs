//! The path resolution simulator against constructed trees.

mod common;

use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use common::TestEnv;
use explain::fs::identity::{IdKind, Identity};
use explain::fs::resolve::{self, FinalComponent, Problem, Want};
use explain::libc;
use explain::{Buffer, Errno};

fn run(errnum: i32, path: &Path, fc: &FinalComponent) -> Option<String> {
    let mut out = Buffer::new();
    resolve::explain(&mut out, Errno(errnum), "pathname", path, fc)
        .is_explained()
        .then(|| out.into_string())
}

/// An identity that owns nothing in the tree.
fn stranger(env: &TestEnv) -> Identity {
    let meta = std::fs::metadata(env.root()).unwrap();
    let uid = meta.uid().wrapping_add(4242).max(1);
    let gid = meta.gid().wrapping_add(4242).max(1);
    Identity::with_ids(uid, gid, Vec::new(), IdKind::Effective)
}

#[test]
fn test_must_not_exist_reports_existing() {
    let env = TestEnv::new();
    let path = env.file("here", 0o644);
    let fc = FinalComponent::new(Want::MUST_NOT_EXIST | Want::WANT_TO_CREATE);
    let text = run(libc::EEXIST, &path, &fc).expect("explained");
    assert!(text.starts_with("pathname already exists"), "{text}");
}

#[test]
fn test_file_used_as_directory_names_the_component() {
    let env = TestEnv::new();
    env.file("plain", 0o644);
    let path = env.path("plain/leaf");
    let fc = FinalComponent::new(Want::MUST_EXIST);
    let text = run(libc::ENOTDIR, &path, &fc).expect("explained");
    assert!(text.starts_with("the \"plain\" regular file"), "{text}");
    assert!(text.ends_with("is being used as a directory when it is not"), "{text}");
    assert!(!text.contains("leaf"));

    let problems = resolve::problems(path.as_os_str().as_bytes(), &fc);
    assert!(matches!(problems.as_slice(), [Problem::NotADirectory { step, .. }] if step.name == b"plain"));
}

#[test]
fn test_read_permission_follows_other_bits() {
    let env = TestEnv::new();
    let path = env.file("secret", 0o600);
    let fc = FinalComponent::new(Want::MUST_EXIST | Want::WANT_TO_READ).with_identity(stranger(&env));

    let text = run(libc::EACCES, &path, &fc).expect("explained");
    assert!(text.starts_with("the process does not have read permission to the \"secret\" regular file"), "{text}");
    assert!(text.contains("others permission mode"), "{text}");

    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o604)).unwrap();
    assert!(resolve::problems(path.as_os_str().as_bytes(), &fc).is_empty());
    assert_eq!(run(libc::EACCES, &path, &fc), None);
}

#[test]
fn test_search_permission_on_parent() {
    let env = TestEnv::new();
    let locked = env.dir("locked");
    env.file("locked/inside", 0o644);
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o700)).unwrap();
    let fc = FinalComponent::new(Want::MUST_EXIST).with_identity(stranger(&env));
    let text = run(libc::EACCES, &env.path("locked/inside"), &fc).expect("explained");
    assert!(text.starts_with("the process does not have search permission to the \"locked\" directory"), "{text}");
}

#[test]
fn test_symlink_loop() {
    let env = TestEnv::new();
    let a = env.path("a");
    let b = env.path("b");
    std::os::unix::fs::symlink(&b, &a).unwrap();
    std::os::unix::fs::symlink(&a, &b).unwrap();
    let text = run(libc::ELOOP, &a, &FinalComponent::new(Want::MUST_EXIST)).expect("explained");
    assert!(text.starts_with("too many symbolic links were encountered"), "{text}");
    assert!(text.ends_with("this is probably a loop"));
}

#[test]
fn test_dangling_symlink() {
    let env = TestEnv::new();
    let link = env.path("dangling");
    std::os::unix::fs::symlink(env.path("nowhere"), &link).unwrap();
    let text = run(libc::ENOENT, &link, &FinalComponent::new(Want::MUST_EXIST)).expect("explained");
    assert!(text.contains("symbolic link"), "{text}");
    assert!(text.ends_with("which does not exist"), "{text}");
}

#[test]
fn test_unrelated_errno_is_inconclusive() {
    let env = TestEnv::new();
    let path = env.file("fine", 0o644);
    assert_eq!(run(libc::ENOENT, &path, &FinalComponent::new(Want::MUST_EXIST)), None);
}
