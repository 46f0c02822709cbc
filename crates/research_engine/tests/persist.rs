use std::fs;

use research_engine::{ensure_output_dir, AtomicFileWriter};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("downloads").join("papers");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn rejects_file_as_output_dir() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    assert!(ensure_output_dir(&file_path).is_err());
}

#[test]
fn atomic_write_replaces_existing_binary_content() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("paper.pdf", b"%PDF-1.4 first").unwrap();
    assert_eq!(first.file_name().unwrap(), "paper.pdf");
    assert_eq!(fs::read(&first).unwrap(), b"%PDF-1.4 first");

    let second = writer.write("paper.pdf", &[0u8, 159, 146, 150]).unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read(&second).unwrap(), vec![0u8, 159, 146, 150]);

    // Only the target remains; no temp files are left behind.
    let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    let result = writer.write("paper.pdf", b"data");
    assert!(result.is_err());
    assert!(!file_path.with_file_name("paper.pdf").exists());
}
