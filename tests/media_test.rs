use insa_db::error::HrError;
use insa_db::media::{MediaKind, MediaResolver};
use std::fs;
use tempfile::TempDir;

struct Private {
    root: TempDir,
    resolver: MediaResolver,
}

fn private_dirs() -> Private {
    let root = TempDir::new().unwrap();
    let resume = root.path().join("private").join("resume");
    let photo = root.path().join("private").join("photo");
    fs::create_dir_all(&resume).unwrap();
    fs::create_dir_all(&photo).unwrap();
    Private {
        resolver: MediaResolver::new(resume, photo),
        root,
    }
}

fn assert_not_found(result: Result<std::path::PathBuf, HrError>) {
    match result {
        Err(HrError::NotFound(_)) => {}
        other => panic!("expected NotFound, got {:?}", other),
    }
}

#[test]
fn existing_resume_resolves() {
    let p = private_dirs();
    let file = p.resolver.dir(MediaKind::Resume).join("홍길동.pdf");
    fs::write(&file, b"%PDF-1.4").unwrap();

    let resolved = p.resolver.resolve(MediaKind::Resume, "홍길동").unwrap();
    assert_eq!(resolved, fs::canonicalize(&file).unwrap());
}

#[test]
fn missing_resume_is_not_found() {
    let p = private_dirs();
    assert_not_found(p.resolver.resolve(MediaKind::Resume, "홍길동"));
}

#[test]
fn missing_photo_falls_back_to_default() {
    let p = private_dirs();
    let default = p.resolver.dir(MediaKind::Photo).join("default.png");
    fs::write(&default, b"png").unwrap();

    let resolved = p.resolver.resolve(MediaKind::Photo, "홍길동").unwrap();
    assert_eq!(resolved, fs::canonicalize(&default).unwrap());

    let own = p.resolver.dir(MediaKind::Photo).join("홍길동.png");
    fs::write(&own, b"png").unwrap();
    let resolved = p.resolver.resolve(MediaKind::Photo, "홍길동").unwrap();
    assert_eq!(resolved, fs::canonicalize(&own).unwrap());
}

#[test]
fn missing_photo_without_default_is_not_found() {
    let p = private_dirs();
    assert_not_found(p.resolver.resolve(MediaKind::Photo, "홍길동"));
}

#[test]
fn traversal_is_rejected_even_when_target_exists() {
    let p = private_dirs();
    // private/secret.pdf sits one level above the resume directory.
    fs::write(p.root.path().join("private").join("secret.pdf"), b"%PDF").unwrap();
    fs::write(p.resolver.dir(MediaKind::Photo).join("default.png"), b"png").unwrap();

    for name in ["../secret", "..", ".", "", "a/b", "a\\b", "/etc/passwd"] {
        assert_not_found(p.resolver.resolve(MediaKind::Resume, name));
    }
    // A rejected photo name does not fall back to the default photo.
    assert_not_found(p.resolver.resolve(MediaKind::Photo, "../photo/default"));
}

#[cfg(unix)]
#[test]
fn symlink_out_of_the_directory_is_rejected() {
    let p = private_dirs();
    let outside = p.root.path().join("outside.pdf");
    fs::write(&outside, b"%PDF").unwrap();
    std::os::unix::fs::symlink(&outside, p.resolver.dir(MediaKind::Resume).join("evil.pdf"))
        .unwrap();

    assert_not_found(p.resolver.resolve(MediaKind::Resume, "evil"));
}

#[test]
fn content_types() {
    assert_eq!(MediaKind::Resume.content_type(), "application/pdf");
    assert_eq!(MediaKind::Photo.content_type(), "image/png");
}
