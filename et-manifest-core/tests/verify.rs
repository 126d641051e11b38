use chrono::NaiveDate;
use et_manifest_core::build::{build, BuildOptions};
use et_manifest_core::error::CatalogError;
use et_manifest_core::manifest::Manifest;
use et_manifest_core::verify::{verify, Problem};
use std::fs;
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

fn setup() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let td = tempfile::tempdir().unwrap();
    let src = td.path().join("files");
    fs::create_dir_all(src.join("bin")).unwrap();
    fs::write(src.join("bin/a.sh"), "# Version: 1.0\necho a\n").unwrap();
    fs::write(src.join("bin/b.sh"), "# Version: 2.0\necho b\n").unwrap();
    fs::write(src.join("c.txt"), vec![7u8; 4096]).unwrap();
    let out = td.path().join("manifest.json");
    let opts = BuildOptions { release_date: NaiveDate::from_ymd_opt(2026, 1, 1), ..BuildOptions::new(&src, &out) };
    build(&opts).unwrap();
    (td, src, out)
}

fn problem_for<'a>(rep: &'a et_manifest_core::verify::VerifyReport, path: &str) -> Option<&'a Problem> {
    rep.problems.iter().find(|(p, _)| p == path).map(|(_, pr)| pr)
}

#[test]
fn clean_tree_verifies() {
    let (_td, src, out) = setup();
    let rep = verify(&out, &src).unwrap();
    assert!(rep.is_ok(), "{:?}", rep.problems);
    assert_eq!(rep.files_ok, 3);
}

#[test]
fn detects_corruption_truncation_and_removal() {
    let (_td, src, out) = setup();
    {
        let mut f = fs::OpenOptions::new().read(true).write(true).open(src.join("c.txt")).unwrap();
        f.seek(SeekFrom::Start(100)).unwrap();
        f.write_all(&[0xFF]).unwrap();
    }
    fs::write(src.join("bin/b.sh"), "# Version: 2.0\n").unwrap();
    fs::remove_file(src.join("bin/a.sh")).unwrap();

    let rep = verify(&out, &src).unwrap();
    assert_eq!(rep.files_ok, 0);
    assert_eq!(problem_for(&rep, "bin/a.sh"), Some(&Problem::Missing));
    assert!(matches!(problem_for(&rep, "bin/b.sh"), Some(Problem::SizeMismatch { .. })));
    assert!(matches!(problem_for(&rep, "c.txt"), Some(Problem::ChecksumMismatch { .. })));
}

#[test]
fn extra_files_on_disk_are_ignored() {
    let (_td, src, out) = setup();
    fs::write(src.join("new-file"), "x").unwrap();
    assert!(verify(&out, &src).unwrap().is_ok());
}

#[test]
fn traversal_in_manifest_is_rejected() {
    let (_td, src, out) = setup();
    let mut m = Manifest::load(&out).unwrap();
    m.files[0].path = "../manifest.json".into();
    fs::write(&out, serde_json::to_string_pretty(&m).unwrap()).unwrap();
    let rep = verify(&out, &src).unwrap();
    match problem_for(&rep, "../manifest.json") {
        Some(Problem::Unsafe(msg)) => assert!(msg.contains("parent traversal"), "{msg}"),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn newer_schema_major_is_rejected() {
    let (_td, src, out) = setup();
    let mut raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    raw["schema_version"] = "2.0".into();
    fs::write(&out, raw.to_string()).unwrap();
    let err = verify(&out, Path::new(&src)).unwrap_err();
    assert!(matches!(err.downcast_ref::<CatalogError>(), Some(CatalogError::SchemaMismatch { .. })));
}
