mod common;

use std::fs::{self, File};
use std::path::Path;

use apklib::native::sum_native_binaries;
use apklib::{Error, InstallStatus};
use common::{
    ApkBuilder, TestReader, corrupt_payload, open_bytes, open_plain, zip64_sized_directory,
};
use tempfile::tempdir;

fn leftover_temp_files(dir: &Path) -> Vec<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("tmp."))
        .collect()
}

fn sample_apk() -> Vec<u8> {
    ApkBuilder::new()
        .stored("lib/x86/libfoo.so", b"\x7fELF foo for x86")
        .deflated("lib/x86/libbar.so", &b"\x7fELF bar ".repeat(200))
        .stored("lib/arm64-v8a/libfoo.so", b"\x7fELF foo for arm64")
        .stored("lib/x86/notes.txt", b"not a library")
        .build()
}

#[test]
fn installs_only_the_requested_abi() {
    let apk = open_bytes(sample_apk());
    let dir = tempdir().unwrap();

    let result = apk.copy_native_binaries(dir.path(), "x86");
    assert_eq!(InstallStatus::of(&result), InstallStatus::Succeeded);

    let mut names: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, ["libbar.so", "libfoo.so"]);
    assert_eq!(
        fs::read(dir.path().join("libfoo.so")).unwrap(),
        b"\x7fELF foo for x86"
    );
    assert_eq!(
        fs::read(dir.path().join("libbar.so")).unwrap(),
        b"\x7fELF bar ".repeat(200)
    );
}

#[test]
fn installed_file_carries_entry_time() {
    let apk = open_bytes(sample_apk());
    let dir = tempdir().unwrap();
    apk.copy_native_binaries(dir.path(), "x86").unwrap();

    let entry = apk.archive().find_entry("lib/x86/libfoo.so").unwrap().unwrap();
    let mtime = fs::metadata(dir.path().join("libfoo.so"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(mtime, entry.modified());
}

#[cfg(unix)]
#[test]
fn installed_file_is_executable() {
    use std::os::unix::fs::PermissionsExt;

    let apk = open_bytes(sample_apk());
    let dir = tempdir().unwrap();
    apk.copy_native_binaries(dir.path(), "x86").unwrap();

    let mode = fs::metadata(dir.path().join("libfoo.so"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o755);
}

#[cfg(unix)]
#[test]
fn second_copy_reads_nothing_and_keeps_files() {
    use std::os::unix::fs::MetadataExt;

    let reader = TestReader::new(sample_apk());
    let apk = open_plain(reader.clone());
    let dir = tempdir().unwrap();
    let path = dir.path().join("libbar.so");

    apk.copy_native_binaries(dir.path(), "x86").unwrap();
    let first = fs::metadata(&path).unwrap();

    reader.reset_count();
    apk.copy_native_binaries(dir.path(), "x86").unwrap();
    assert_eq!(reader.bytes_read(), 0);

    let second = fs::metadata(&path).unwrap();
    assert_eq!(first.ino(), second.ino());
    assert_eq!(first.mode(), second.mode());
    assert_eq!(first.modified().unwrap(), second.modified().unwrap());
    assert_eq!(fs::read(&path).unwrap(), b"\x7fELF bar ".repeat(200));
}

#[test]
fn same_size_and_time_but_other_content_is_rewritten() {
    let apk = open_bytes(sample_apk());
    let dir = tempdir().unwrap();
    let path = dir.path().join("libfoo.so");
    apk.copy_native_binaries(dir.path(), "x86").unwrap();

    let modified = fs::metadata(&path).unwrap().modified().unwrap();
    fs::write(&path, b"\x7fELF FOO FOR X86").unwrap();
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(modified)
        .unwrap();

    apk.copy_native_binaries(dir.path(), "x86").unwrap();
    assert_eq!(fs::read(&path).unwrap(), b"\x7fELF foo for x86");
}

#[test]
fn failed_decompression_leaves_previous_file_untouched() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("libfoo.so");

    let old = open_bytes(ApkBuilder::new().stored("lib/x86/libfoo.so", b"version one").build());
    old.copy_native_binaries(dir.path(), "x86").unwrap();

    let reader = TestReader::new(
        ApkBuilder::new()
            .deflated("lib/x86/libfoo.so", b"version two, a little longer")
            .build(),
    );
    let new = open_plain(reader.clone());
    // Load the directory, then break every later read.
    assert!(new.archive().find_entry("lib/x86/libfoo.so").unwrap().is_some());
    reader.fail_reads(true);

    let result = new.copy_native_binaries(dir.path(), "x86");
    assert_eq!(InstallStatus::of(&result), InstallStatus::ContainerError);
    assert_eq!(fs::read(&path).unwrap(), b"version one");
    assert!(leftover_temp_files(dir.path()).is_empty());
}

#[test]
fn crc_mismatch_is_a_container_error() {
    let mut bytes = ApkBuilder::new().stored("lib/x86/libfoo.so", b"genuine payload").build();
    let at = bytes
        .windows(15)
        .position(|w| w == b"genuine payload")
        .unwrap();
    bytes[at] = b'G';

    let apk = open_bytes(bytes);
    let dir = tempdir().unwrap();
    let result = apk.copy_native_binaries(dir.path(), "x86");

    let err = result.as_ref().unwrap_err();
    assert_eq!(err.status(), InstallStatus::ContainerError);
    assert!(format!("{}", err).contains("CRC mismatch"));
    assert!(!dir.path().join("libfoo.so").exists());
    assert!(leftover_temp_files(dir.path()).is_empty());
}

#[test]
fn missing_destination_is_a_container_error() {
    let apk = open_bytes(sample_apk());
    let dir = tempdir().unwrap();
    let result = apk.copy_native_binaries(&dir.path().join("absent"), "x86");
    assert_eq!(InstallStatus::of(&result), InstallStatus::ContainerError);
}

#[test]
fn overlong_destination_is_an_internal_error() {
    let apk = open_bytes(sample_apk());
    let dir = tempdir().unwrap();
    let deep = dir.path().join("d".repeat(4096));
    let result = apk.copy_native_binaries(&deep, "x86");
    assert_eq!(InstallStatus::of(&result), InstallStatus::InternalError);
}

#[test]
fn unknown_abi_copies_nothing() {
    let apk = open_bytes(sample_apk());
    let dir = tempdir().unwrap();
    apk.copy_native_binaries(dir.path(), "mips").unwrap();
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn size_sums_only_the_requested_abi() {
    let apk = open_bytes(
        ApkBuilder::new()
            .sized("lib/x86/liba.so", 100)
            .sized("lib/x86/libb.so", 250)
            .sized("lib/armeabi-v7a/liba.so", 999)
            .sized("lib/x86/lib unsafe.so", 7)
            .build(),
    );
    assert_eq!(apk.sum_native_binaries("x86"), 350);
    assert_eq!(apk.sum_native_binaries("armeabi-v7a"), 999);
    assert_eq!(apk.sum_native_binaries("mips"), 0);
}

#[test]
fn size_saturates_on_huge_declared_sizes() {
    let bytes = zip64_sized_directory(&[("lib/x86/liba.so", 1 << 63), ("lib/x86/libb.so", 1 << 63)]);
    let apk = open_bytes(bytes);
    assert_eq!(apk.sum_native_binaries("x86"), u64::MAX);
    assert_eq!(sum_native_binaries(apk.archive(), "x86").unwrap(), u64::MAX);
}

#[test]
fn copy_stops_at_first_failing_entry() {
    let mut bytes = ApkBuilder::new()
        .stored("lib/x86/liba.so", b"first library")
        .stored("lib/x86/libb.so", b"second library")
        .build();
    corrupt_payload(&mut bytes, b"first library");

    let apk = open_bytes(bytes);
    let dir = tempdir().unwrap();
    let result = apk.copy_native_binaries(dir.path(), "x86");

    match result {
        Err(Error::Container { ref name, .. }) => assert_eq!(name, "liba.so"),
        other => panic!("expected a container error for liba.so, got {:?}", other),
    }
    assert!(!dir.path().join("liba.so").exists());
    assert!(!dir.path().join("libb.so").exists());
    assert!(leftover_temp_files(dir.path()).is_empty());
}
