//! Fixtures shared by unit tests.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};
use xz2::write::XzEncoder;

/// Write a tar.gz containing `files` as executable regular files.
pub fn write_tar_gz(path: &Path, files: &[(&str, &str)]) {
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = Builder::new(encoder);
    for (name, contents) in files {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Write a tar.xz containing `files` as executable regular files.
pub fn write_tar_xz(path: &Path, files: &[(&str, &str)]) {
    let mut builder = Builder::new(XzEncoder::new(File::create(path).unwrap(), 6));
    for (name, contents) in files {
        let mut header = Header::new_gnu();
        header.set_entry_type(EntryType::Regular);
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Like [`write_tar_gz`] but writes entry names verbatim, so `..` and absolute
/// names survive into the archive.
pub fn write_raw_tar_gz(path: &Path, files: &[(&str, &str)]) {
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = Builder::new(encoder);
    for (name, contents) in files {
        let mut header = Header::new_old();
        let bytes = name.as_bytes();
        header.as_old_mut().name[..bytes.len()].copy_from_slice(bytes);
        header.set_entry_type(EntryType::Regular);
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, contents.as_bytes()).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

/// Build `{dir}/{top}.tar.gz` holding `{top}/bin/{executable}` and return its path.
pub fn sdk_archive(dir: &Path, top: &str, executable: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(format!("{top}.tar.gz"));
    let exe = format!("{top}/bin/{executable}");
    let readme = format!("{top}/README");
    write_tar_gz(&path, &[(&exe, "#!/bin/sh\necho ok\n"), (&readme, top)]);
    path
}

pub fn file_url(path: &Path) -> String {
    url::Url::from_file_path(path).unwrap().to_string()
}
