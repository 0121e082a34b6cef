use pzip::{
    bytes_only, create_archive, create_tar_gz, create_zip, extract_archive, list_archive, verify_archive,
    ArchiveFormat, ArchiveOptions, ArchiverError,
};
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;
use walkdir::WalkDir;

/// Relative path -> `None` for directories, contents for files.
fn snapshot(root: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|e| e.unwrap())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            let contents = e.file_type().is_file().then(|| fs::read(e.path()).unwrap());
            (rel, contents)
        })
        .collect()
}

fn populate(root: &Path, seed: u64) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    fs::create_dir_all(root.join("docs/nested/deeper")).unwrap();
    fs::create_dir_all(root.join("empty_dir")).unwrap();
    fs::create_dir_all(root.join("media")).unwrap();

    fs::write(root.join("readme.txt"), "hello pzip\n".repeat(200)).unwrap();
    fs::write(root.join("empty.txt"), b"").unwrap();
    fs::write(root.join("docs/nested/deeper/notes.md"), b"# notes\n").unwrap();
    let noise: Vec<u8> = (0..64 * 1024).map(|_| rng.gen()).collect();
    fs::write(root.join("media/photo.png"), &noise).unwrap();
    let noise: Vec<u8> = (0..5000).map(|_| rng.gen()).collect();
    fs::write(root.join("docs/blob.bin"), &noise).unwrap();
}

fn round_trip(format: ArchiveFormat) {
    let src = tempdir().unwrap();
    populate(src.path(), 1);
    let work = tempdir().unwrap();
    let archive = work.path().join(format!("out.{}", format.extension()));
    let options = ArchiveOptions::default().with_workers(3);

    let created = create_archive(src.path(), &archive, format, &options, None).unwrap();
    assert_eq!(created.file_count, 5);
    assert_eq!(created.total_bytes, 2200 + 8 + 64 * 1024 + 5000);
    assert_eq!(created.checksum.len(), 64);

    let dest = work.path().join("restored");
    let extracted = extract_archive(&archive, &dest, &options, None).unwrap();
    assert_eq!(extracted.file_count, created.file_count);
    assert_eq!(extracted.total_bytes, created.total_bytes);
    assert_eq!(snapshot(src.path()), snapshot(&dest));

    assert_eq!(verify_archive(&archive).unwrap(), (true, created.checksum));
}

#[test]
fn zip_round_trip() {
    round_trip(ArchiveFormat::Zip);
}

#[test]
fn tar_gz_round_trip() {
    round_trip(ArchiveFormat::TarGz);
}

#[test]
fn zip_comment_carries_digest() {
    let src = tempdir().unwrap();
    populate(src.path(), 2);
    let work = tempdir().unwrap();
    let archive = work.path().join("a.zip");
    let stats = create_zip(src.path(), &archive, &ArchiveOptions::default(), None).unwrap();

    let zip = zip::ZipArchive::new(fs::File::open(&archive).unwrap()).unwrap();
    assert_eq!(zip.comment(), format!("SHA256: {}", stats.checksum).as_bytes());
}

#[test]
fn tar_gz_writes_sidecar() {
    let src = tempdir().unwrap();
    populate(src.path(), 3);
    let work = tempdir().unwrap();
    let archive = work.path().join("a.tar.gz");
    let stats = create_tar_gz(src.path(), &archive, &ArchiveOptions::default(), None).unwrap();

    let sidecar = fs::read_to_string(work.path().join("a.tar.gz.sha256")).unwrap();
    assert_eq!(sidecar, format!("{} *a.tar.gz\n", stats.checksum));
}

#[test]
fn empty_source_directory() {
    for format in [ArchiveFormat::Zip, ArchiveFormat::TarGz] {
        let src = tempdir().unwrap();
        let work = tempdir().unwrap();
        let archive = work.path().join(format!("empty.{}", format.extension()));

        let stats = create_archive(src.path(), &archive, format, &ArchiveOptions::default(), None).unwrap();
        assert_eq!((stats.file_count, stats.total_bytes), (0, 0));
        assert!(verify_archive(&archive).unwrap().0);

        let dest = work.path().join("out");
        let extracted = extract_archive(&archive, &dest, &ArchiveOptions::default(), None).unwrap();
        assert_eq!(extracted.file_count, 0);
        assert!(snapshot(&dest).is_empty());
    }
}

#[test]
fn missing_source_fails_before_creating_archive() {
    let work = tempdir().unwrap();
    let archive = work.path().join("never.zip");
    let err = create_zip(&work.path().join("nope"), &archive, &ArchiveOptions::default(), None).unwrap_err();
    assert!(matches!(err, ArchiverError::Scan(_)));
    assert!(!archive.exists());
}

#[test]
fn many_files_are_independent_of_pool_size() {
    let src = tempdir().unwrap();
    for i in 0..500 {
        let dir = src.path().join(format!("bucket{}", i % 10));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("file{i}.txt")), format!("payload {i}\n")).unwrap();
    }
    let expected = snapshot(src.path());

    // Explicit sizes so more than one worker runs even on small machines.
    for options in [
        ArchiveOptions::default().with_workers(1),
        ArchiveOptions::default().with_workers(2),
        ArchiveOptions::default().with_workers(8),
        ArchiveOptions::default(),
    ] {
        let work = tempdir().unwrap();
        let archive = work.path().join("many.zip");
        let stats = create_zip(src.path(), &archive, &options, None).unwrap();
        assert_eq!(stats.file_count, 500);
        assert_eq!(list_archive(&archive).unwrap().iter().filter(|e| !e.is_dir).count(), 500);

        let dest = work.path().join("out");
        extract_archive(&archive, &dest, &options, None).unwrap();
        assert_eq!(snapshot(&dest), expected);
    }
}

#[test]
fn format_is_detected_from_contents() {
    let src = tempdir().unwrap();
    populate(src.path(), 4);
    let work = tempdir().unwrap();
    // A tar.gz wearing a zip extension.
    let archive = work.path().join("misleading.zip");
    create_tar_gz(src.path(), &archive, &ArchiveOptions::default(), None).unwrap();

    assert_eq!(ArchiveFormat::detect(&archive).unwrap(), ArchiveFormat::TarGz);
    let dest = work.path().join("out");
    extract_archive(&archive, &dest, &ArchiveOptions::default(), None).unwrap();
    assert_eq!(snapshot(src.path()), snapshot(&dest));
    assert!(verify_archive(&archive).unwrap().0);
}

#[test]
fn unsupported_files_are_rejected() {
    let work = tempdir().unwrap();
    let bogus = work.path().join("notes.zip");
    fs::write(&bogus, b"just text").unwrap();
    let err = extract_archive(&bogus, &work.path().join("out"), &ArchiveOptions::default(), None).unwrap_err();
    assert!(matches!(err, ArchiverError::UnsupportedFormat { .. }));
    assert!(matches!(verify_archive(&bogus), Err(ArchiverError::UnsupportedFormat { .. })));
}

#[test]
fn progress_is_monotonic_and_complete() {
    let src = tempdir().unwrap();
    populate(src.path(), 5);
    let work = tempdir().unwrap();

    for format in [ArchiveFormat::Zip, ArchiveFormat::TarGz] {
        let archive = work.path().join(format!("p.{}", format.extension()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let stats = create_archive(
            src.path(),
            &archive,
            format,
            &ArchiveOptions::default().with_workers(4),
            Some(bytes_only(move |done, total| sink.lock().unwrap().push((done, total)))),
        )
        .unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
        assert!(seen.iter().all(|&(done, total)| done <= total && total == stats.total_bytes));
        assert_eq!(seen.last(), Some(&(stats.total_bytes, stats.total_bytes)));
    }
}

#[test]
fn junk_is_kept_unless_excluded() {
    let src = tempdir().unwrap();
    fs::create_dir_all(src.path().join(".git")).unwrap();
    fs::write(src.path().join(".git/HEAD"), b"ref: main\n").unwrap();
    fs::write(src.path().join("keep.txt"), b"keep").unwrap();
    fs::write(src.path().join("scratch.tmp"), b"tmp").unwrap();
    let work = tempdir().unwrap();

    let all = create_zip(src.path(), &work.path().join("all.zip"), &ArchiveOptions::default(), None).unwrap();
    assert_eq!(all.file_count, 3);

    let options = ArchiveOptions::default().exclude_junk(true);
    let archive = work.path().join("clean.zip");
    let clean = create_zip(src.path(), &archive, &options, None).unwrap();
    assert_eq!(clean.file_count, 1);
    let names: Vec<String> = list_archive(&archive).unwrap().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["keep.txt".to_string()]);
}

#[cfg(unix)]
#[test]
fn unix_permissions_survive() {
    use std::os::unix::fs::PermissionsExt;

    let src = tempdir().unwrap();
    let script = src.path().join("run.sh");
    fs::write(&script, b"#!/bin/sh\necho hi\n").unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();

    for format in [ArchiveFormat::Zip, ArchiveFormat::TarGz] {
        let work = tempdir().unwrap();
        let archive = work.path().join(format!("perm.{}", format.extension()));
        create_archive(src.path(), &archive, format, &ArchiveOptions::default(), None).unwrap();
        let dest = work.path().join("out");
        extract_archive(&archive, &dest, &ArchiveOptions::default(), None).unwrap();
        let mode = fs::metadata(dest.join("run.sh")).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o750, "{format:?}");
    }
}

#[test]
fn extraction_overwrites_existing_files() {
    let src = tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"fresh").unwrap();
    let work = tempdir().unwrap();
    let archive = work.path().join("a.zip");
    create_zip(src.path(), &archive, &ArchiveOptions::default(), None).unwrap();

    let dest = work.path().join("out");
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("a.txt"), b"stale and longer").unwrap();
    extract_archive(&archive, &dest, &ArchiveOptions::default(), None).unwrap();
    assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"fresh");
}
