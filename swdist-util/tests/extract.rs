//! Extracting small distributions built on the fly.

use std::cell::Cell;
use std::fs;
use std::path::Path;
use swdist_idb::FileEntry;
use swdist_util::{ExtractOptions, ExtractResult, SilentProgress};
use tempfile::TempDir;

/// `compress -b 16` output for "ab".
const AB_Z: &[u8] = &[0x1F, 0x9D, 0x90, 0x61, 0xC4, 0x00];

/// Builds a `prod` distribution with a single `prod.sw` subproduct.
struct Dist {
    manifest: String,
    sw: Vec<u8>,
}

impl Dist {
    fn new() -> Self {
        Self {
            manifest: String::new(),
            sw: vec![0; swdist_idb::SUBPRODUCT_HEADER_LEN as usize],
        }
    }

    fn line(&mut self, line: &str) -> &mut Self {
        self.manifest.push_str(line);
        self.manifest.push('\n');
        self
    }

    fn dir(&mut self, name: &str, mode: u32) -> &mut Self {
        self.line(&format!("d {mode:04o} root sys {name} src prod.sw.base"))
    }

    fn symlink(&mut self, name: &str, target: &str) -> &mut Self {
        self.line(&format!(
            "l 0777 root sys {name} src prod.sw.base symval({target})"
        ))
    }

    /// Adds a file whose payload is stored as is.
    fn stored(&mut self, name: &str, mode: u32, data: &[u8]) -> &mut Self {
        self.record(name.as_bytes(), data);
        self.line(&format!(
            "f {mode:04o} root sys {name} src prod.sw.base size({})",
            data.len()
        ))
    }

    /// Adds a file with a compressed payload.
    fn compressed(&mut self, name: &str, mode: u32, payload: &[u8], size: usize) -> &mut Self {
        self.record(name.as_bytes(), payload);
        self.line(&format!(
            "f {mode:04o} root sys {name} src prod.sw.base size({size}) cmpsize({})",
            payload.len()
        ))
    }

    /// Appends bytes the manifest does not account for.
    fn junk(&mut self, len: usize) -> &mut Self {
        self.sw.extend(std::iter::repeat_n(0xAA, len));
        self
    }

    fn record(&mut self, name: &[u8], payload: &[u8]) {
        self.sw
            .extend_from_slice(&(name.len() as u16).to_be_bytes());
        self.sw.extend_from_slice(name);
        self.sw.extend_from_slice(payload);
    }

    fn build(&self) -> (TempDir, Vec<FileEntry>) {
        let dir = TempDir::new().unwrap();

        fs::write(dir.path().join("prod.idb"), &self.manifest).unwrap();
        fs::write(dir.path().join("prod.sw"), &self.sw).unwrap();

        let parsed = swdist_idb::parse(dir.path(), "prod").unwrap();

        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);

        (dir, parsed.entries)
    }
}

fn run(dir: &TempDir, entries: &[FileEntry], options: ExtractOptions) -> ExtractResult {
    swdist_util::extract(
        dir.path(),
        entries,
        &dir.path().join("out"),
        options,
        SilentProgress,
    )
}

fn out(dir: &TempDir, name: &str) -> std::path::PathBuf {
    dir.path().join("out").join(name)
}

#[cfg(unix)]
fn mode_of(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path).unwrap().permissions().mode() & 0o777
}

#[cfg(unix)]
#[test]
fn directory_file_and_symlink() {
    let (dir, entries) = Dist::new()
        .dir("usr/bin", 0o755)
        .compressed("usr/bin/ab", 0o750, AB_Z, 2)
        .symlink("usr/bin/ba", "ab")
        .build();

    let result = run(&dir, &entries, ExtractOptions::default());

    assert_eq!(result.extracted, 3, "{:?}", result.messages);
    assert_eq!(result.errors, 0);
    assert!(result.is_success());

    assert!(out(&dir, "usr/bin").is_dir());
    assert_eq!(mode_of(&out(&dir, "usr/bin")), 0o755);
    assert_eq!(fs::read(out(&dir, "usr/bin/ab")).unwrap(), b"ab");
    assert_eq!(mode_of(&out(&dir, "usr/bin/ab")), 0o750);
    assert_eq!(
        fs::read_link(out(&dir, "usr/bin/ba")).unwrap(),
        Path::new("ab")
    );
    assert!(!out(&dir, "usr/bin/ab.Z").exists());
}

#[test]
fn stored_and_empty_files() {
    let (dir, entries) = Dist::new()
        .stored("etc/motd", 0o644, b"hello\n")
        .line("f 0644 root sys etc/empty src prod.sw.base size(0)")
        .build();

    let result = run(&dir, &entries, ExtractOptions::default());

    assert_eq!(result.extracted, 2, "{:?}", result.messages);
    assert_eq!(fs::read(out(&dir, "etc/motd")).unwrap(), b"hello\n");
    assert_eq!(fs::read(out(&dir, "etc/empty")).unwrap(), b"");
}

#[test]
fn cancel_on_second_entry() {
    let (dir, entries) = Dist::new()
        .dir("a", 0o755)
        .dir("b", 0o755)
        .dir("c", 0o755)
        .build();

    let calls = Cell::new(0);
    let progress = |current: usize, total: usize, _: &str| {
        calls.set(calls.get() + 1);
        assert_eq!(total, 3);
        current < 2
    };

    let result = swdist_util::extract(
        dir.path(),
        &entries,
        &dir.path().join("out"),
        ExtractOptions::default(),
        progress,
    );

    assert!(result.canceled);
    assert!(result.extracted <= 1);
    assert_eq!(result.errors, 0);
    assert_eq!(calls.get(), 2);
    assert!(!out(&dir, "b").exists());
}

#[test]
fn dot_segments_are_stripped() {
    let (dir, entries) = Dist::new()
        .stored("../../etc/passwd", 0o644, b"root")
        .build();

    let result = run(&dir, &entries, ExtractOptions::default());

    assert_eq!(result.extracted, 1, "{:?}", result.messages);
    assert_eq!(fs::read(out(&dir, "etc/passwd")).unwrap(), b"root");
    assert!(!dir.path().join("etc").exists());
}

#[test]
fn drifted_records_are_found() {
    let (dir, entries) = Dist::new()
        .stored("one", 0o644, b"1111")
        .junk(5)
        .stored("two", 0o644, b"2222")
        .stored("three", 0o644, b"3333")
        .build();

    let result = run(&dir, &entries, ExtractOptions::default());

    assert_eq!(result.extracted, 3, "{:?}", result.messages);
    assert_eq!(fs::read(out(&dir, "two")).unwrap(), b"2222");
    assert_eq!(fs::read(out(&dir, "three")).unwrap(), b"3333");
}

#[test]
fn no_decompress_keeps_only_the_payload() {
    let (dir, entries) = Dist::new().compressed("ab", 0o644, AB_Z, 2).build();

    let options = ExtractOptions {
        no_decompress: true,
        ..ExtractOptions::default()
    };
    let result = run(&dir, &entries, options);

    assert_eq!(result.extracted, 1, "{:?}", result.messages);
    assert_eq!(fs::read(out(&dir, "ab.Z")).unwrap(), AB_Z);
    assert!(!out(&dir, "ab").exists());
}

#[test]
fn keep_z_leaves_both() {
    let (dir, entries) = Dist::new().compressed("ab", 0o644, AB_Z, 2).build();

    let options = ExtractOptions {
        keep_z: true,
        ..ExtractOptions::default()
    };
    let result = run(&dir, &entries, options);

    assert_eq!(result.extracted, 1, "{:?}", result.messages);
    assert_eq!(fs::read(out(&dir, "ab.Z")).unwrap(), AB_Z);
    assert_eq!(fs::read(out(&dir, "ab")).unwrap(), b"ab");
}

#[test]
fn corrupt_payload_is_reported() {
    // 'a', then code 400 while 257 is the next free entry.
    let corrupt = [0x1F, 0x9D, 0x90, 0x61, 0x20, 0x03];
    let (dir, entries) = Dist::new()
        .compressed("bad", 0o644, &corrupt, 10)
        .stored("good", 0o644, b"ok")
        .build();

    let result = run(&dir, &entries, ExtractOptions::default());

    assert_eq!(result.errors, 1);
    assert_eq!(result.extracted, 1);
    assert_eq!(result.messages, ["bad: LZW decompress failed: bad"]);
    assert!(!out(&dir, "bad").exists());
    assert_eq!(fs::read(out(&dir, "good")).unwrap(), b"ok");
}

#[test]
fn stop_on_first_error() {
    let (dir, mut entries) = Dist::new()
        .stored("one", 0o644, b"1")
        .stored("two", 0o644, b"2")
        .build();

    // Point the first entry somewhere no record can be found.
    entries[0].payload_offset = Some(1 << 40);

    let options = ExtractOptions {
        continue_on_error: false,
        ..ExtractOptions::default()
    };
    let result = run(&dir, &entries, options);

    assert_eq!(result.errors, 1);
    assert_eq!(result.extracted, 0);
    assert!(result.messages[0].starts_with("one: out of sync at"));
    assert!(!out(&dir, "two").exists());
}

#[test]
fn unknown_types_are_skipped() {
    let (dir, entries) = Dist::new()
        .line("x 0644 root sys dev/null src prod.sw.base")
        .dir("dev", 0o755)
        .build();

    let result = run(&dir, &entries, ExtractOptions::default());

    assert_eq!(result.skipped, 1);
    assert_eq!(result.extracted, 1);
    assert_eq!(result.errors, 0);
}

#[test]
fn output_root_that_cannot_be_created() {
    let (dir, entries) = Dist::new().dir("a", 0o755).build();
    let blocker = dir.path().join("file");

    fs::write(&blocker, b"").unwrap();

    let result = swdist_util::extract(
        dir.path(),
        &entries,
        &blocker.join("out"),
        ExtractOptions::default(),
        SilentProgress,
    );

    assert_eq!(result.errors, 1);
    assert_eq!(result.extracted, 0);
    assert!(result.messages[0].starts_with("Cannot create output directory: "));
}

#[test]
fn rerun_overwrites() {
    let (dir, entries) = Dist::new()
        .dir("etc", 0o755)
        .stored("etc/motd", 0o444, b"hello")
        .build();

    assert!(run(&dir, &entries, ExtractOptions::default()).is_success());

    let again = run(&dir, &entries, ExtractOptions::default());

    assert!(again.is_success(), "{:?}", again.messages);
    assert_eq!(again.extracted, 2);
}
