use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tar::Archive;
use tracing::debug;
use xz2::read::XzDecoder;
use zip::ZipArchive;

use crate::cancel::{CancelReader, CancelToken};
use crate::error::{EnvError, Result};

/// Supported SDK archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    TarXz,
    Zip,
}

impl ArchiveFormat {
    /// Pick the format from a file name, defaulting to tar+gzip.
    pub fn from_file_name(name: &str) -> Self {
        let lowered = name.to_ascii_lowercase();
        if lowered.ends_with(".tar.xz") || lowered.ends_with(".txz") {
            ArchiveFormat::TarXz
        } else if lowered.ends_with(".zip") {
            ArchiveFormat::Zip
        } else {
            ArchiveFormat::TarGz
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarXz => "tar.xz",
            ArchiveFormat::Zip => "zip",
        }
    }
}

/// Extract `archive_path` into `dest`, entry by entry.
///
/// Any entry whose path (or link target) would land outside `dest` fails the
/// whole extraction. `dest` should be a scratch directory the caller discards
/// on error.
pub fn extract_archive(
    archive_path: &Path,
    format: ArchiveFormat,
    dest: &Path,
    cancel: &CancelToken,
) -> Result<()> {
    fs::create_dir_all(dest).map_err(|err| {
        EnvError::Extract(format!(
            "failed to create destination directory {}: {err}",
            dest.display()
        ))
    })?;

    let file = File::open(archive_path).map_err(|err| {
        EnvError::Extract(format!("failed to open archive {}: {err}", archive_path.display()))
    })?;

    debug!(archive = %archive_path.display(), ?format, "extracting");
    let input = CancelReader::new(file, cancel);
    let result = match format {
        ArchiveFormat::TarGz => extract_tar(GzDecoder::new(input), dest, cancel),
        ArchiveFormat::TarXz => extract_tar(XzDecoder::new(input), dest, cancel),
        ArchiveFormat::Zip => extract_zip(input, dest, cancel),
    };
    // A cancelled read surfaces as an IO failure somewhere inside the decoder.
    if result.is_err() {
        cancel.check()?;
    }
    result
}

fn extract_tar<R: Read>(reader: R, dest: &Path, cancel: &CancelToken) -> Result<()> {
    let mut archive = Archive::new(reader);
    let entries = archive
        .entries()
        .map_err(|err| EnvError::Extract(format!("failed to read tar stream: {err}")))?;

    for entry in entries {
        cancel.check()?;
        let mut entry =
            entry.map_err(|err| EnvError::Extract(format!("failed to read tar header: {err}")))?;

        let path = entry
            .path()
            .map_err(|err| EnvError::Extract(format!("invalid entry path in archive: {err}")))?
            .into_owned();
        let relative = enclosed_path(&path)?;

        let entry_type = entry.header().entry_type();
        if entry_type.is_symlink() || entry_type.is_hard_link() {
            let target = entry
                .link_name()
                .map_err(|err| EnvError::Extract(format!("invalid link in archive: {err}")))?
                .ok_or_else(|| {
                    EnvError::Extract(format!("link entry {} has no target", path.display()))
                })?
                .into_owned();

            let escapes = if entry_type.is_hard_link() {
                enclosed_path(&target).is_err()
            } else {
                link_escapes(&relative, &target)
            };
            if escapes {
                return Err(EnvError::Extract(format!(
                    "link {} -> {} points outside the destination directory",
                    path.display(),
                    target.display()
                )));
            }
        }

        let unpacked = entry.unpack_in(dest).map_err(|err| {
            EnvError::Extract(format!("failed to extract {}: {err}", path.display()))
        })?;
        if !unpacked {
            return Err(EnvError::Extract(format!(
                "invalid file path in archive: {}",
                path.display()
            )));
        }
    }

    Ok(())
}

fn extract_zip(input: CancelReader<File>, dest: &Path, cancel: &CancelToken) -> Result<()> {
    let mut archive = ZipArchive::new(input)
        .map_err(|err| EnvError::Extract(format!("failed to read zip archive: {err}")))?;

    for index in 0..archive.len() {
        cancel.check()?;
        let mut entry = archive
            .by_index(index)
            .map_err(|err| EnvError::Extract(format!("failed to read zip entry #{index}: {err}")))?;

        let name = entry.name().to_string();
        let relative = entry
            .enclosed_name()
            .map(Path::to_path_buf)
            .ok_or_else(|| EnvError::Extract(format!("invalid file path in archive: {name}")))?;
        let target = dest.join(enclosed_path(&relative)?);

        if name.ends_with('/') {
            fs::create_dir_all(&target).map_err(|err| {
                EnvError::Extract(format!("failed to create directory {}: {err}", target.display()))
            })?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                EnvError::Extract(format!(
                    "failed to create parent directory {}: {err}",
                    parent.display()
                ))
            })?;
        }

        let mut outfile = File::create(&target).map_err(|err| {
            EnvError::Extract(format!("failed to create file {}: {err}", target.display()))
        })?;
        io::copy(&mut entry, &mut outfile).map_err(|err| {
            EnvError::Extract(format!("failed to extract zip entry {}: {err}", target.display()))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Some(mode) = entry.unix_mode() {
                fs::set_permissions(&target, fs::Permissions::from_mode(mode)).map_err(|err| {
                    EnvError::Extract(format!(
                        "failed to set permissions on {}: {err}",
                        target.display()
                    ))
                })?;
            }
        }
    }

    Ok(())
}

/// Normalise an archive entry path, rejecting anything that is absolute or climbs out.
fn enclosed_path(path: &Path) -> Result<PathBuf> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(EnvError::Extract(format!(
                    "invalid file path in archive: {}",
                    path.display()
                )));
            }
        }
    }
    Ok(relative)
}

/// Whether a symlink at `entry` (relative to the archive root) pointing at
/// `target` would resolve outside the root.
fn link_escapes(entry: &Path, target: &Path) -> bool {
    if target.is_absolute() {
        return true;
    }

    let mut depth = entry.parent().map_or(0, |parent| parent.components().count()) as isize;
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::RootDir | Component::Prefix(_) => return true,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testutil::{write_raw_tar_gz, write_tar_gz, write_tar_xz};
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_file_name() {
        assert_eq!(ArchiveFormat::from_file_name("go1.21.linux-amd64.tar.gz"), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::from_file_name("node.TGZ"), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::from_file_name("node-v18.tar.xz"), ArchiveFormat::TarXz);
        assert_eq!(ArchiveFormat::from_file_name("go1.21.windows-amd64.zip"), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_file_name("download"), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::Zip.extension(), "zip");
    }

    #[test]
    fn test_extract_tar_gz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("sdk.tar.gz");
        write_tar_gz(
            &archive,
            &[("go/bin/go", "#!/bin/sh\n"), ("go/VERSION", "go1.21.5")],
        );

        let dest = temp.path().join("out");
        extract_archive(&archive, ArchiveFormat::TarGz, &dest, &CancelToken::new()).unwrap();

        assert!(dest.join("go/bin/go").is_file());
        assert_eq!(fs::read_to_string(dest.join("go/VERSION")).unwrap(), "go1.21.5");
    }

    #[test]
    fn test_extract_rejects_path_traversal() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.tar.gz");
        write_raw_tar_gz(&archive, &[("ok/file", "fine"), ("../../etc/passwd", "root")]);

        let dest = temp.path().join("a/b/out");
        let err = extract_archive(&archive, ArchiveFormat::TarGz, &dest, &CancelToken::new())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Extract);
        assert!(err.to_string().contains("../../etc/passwd"));
        assert!(!temp.path().join("etc/passwd").exists());
        assert!(!temp.path().join("a/etc/passwd").exists());
    }

    #[test]
    fn test_extract_zip_rejects_path_traversal() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("evil.zip");
        {
            let mut writer = zip::ZipWriter::new(File::create(&archive).unwrap());
            let options = zip::write::FileOptions::default();
            writer.start_file("../../etc/passwd", options).unwrap();
            std::io::Write::write_all(&mut writer, b"root").unwrap();
            writer.finish().unwrap();
        }

        let dest = temp.path().join("a/b/out");
        let err = extract_archive(&archive, ArchiveFormat::Zip, &dest, &CancelToken::new())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Extract);
        assert!(err.to_string().contains("../../etc/passwd"));
        assert!(!temp.path().join("etc/passwd").exists());
        assert!(!temp.path().join("a/etc/passwd").exists());
    }

    #[test]
    fn test_extract_tar_xz() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("node-v18.tar.xz");
        write_tar_xz(
            &archive,
            &[("node/bin/node", "#!/bin/sh\n"), ("node/LICENSE", "MIT")],
        );

        let dest = temp.path().join("out");
        extract_archive(&archive, ArchiveFormat::TarXz, &dest, &CancelToken::new()).unwrap();

        assert!(dest.join("node/bin/node").is_file());
        assert_eq!(fs::read_to_string(dest.join("node/LICENSE")).unwrap(), "MIT");
    }

    #[test]
    fn test_extract_rejects_escaping_symlink() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("link.tar.gz");
        {
            let encoder = GzEncoder::new(File::create(&archive).unwrap(), Compression::default());
            let mut builder = tar::Builder::new(encoder);
            let mut header = tar::Header::new_gnu();
            header.set_entry_type(tar::EntryType::Symlink);
            header.set_size(0);
            header.set_mode(0o777);
            header.set_link_name("../../../outside").unwrap();
            builder
                .append_data(&mut header, "go/bin/evil", std::io::empty())
                .unwrap();
            builder.into_inner().unwrap().finish().unwrap();
        }

        let dest = temp.path().join("out");
        let err = extract_archive(&archive, ArchiveFormat::TarGz, &dest, &CancelToken::new())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Extract);
        assert!(err.to_string().contains("points outside"));
        assert!(fs::symlink_metadata(dest.join("go/bin/evil")).is_err());
    }

    #[test]
    fn test_extract_rejects_absolute_path() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("abs.tar.gz");
        write_raw_tar_gz(&archive, &[("/tmp/ktenv-abs-escape", "x")]);

        let err = extract_archive(
            &archive,
            ArchiveFormat::TarGz,
            &temp.path().join("out"),
            &CancelToken::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extract);
    }

    #[test]
    fn test_extract_honours_cancellation() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("sdk.tar.gz");
        write_tar_gz(&archive, &[("go/bin/go", "x")]);

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = extract_archive(&archive, ArchiveFormat::TarGz, &temp.path().join("out"), &cancel)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[test]
    fn test_extract_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("sdk.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::FileOptions::default().unix_permissions(0o755);
            writer.add_directory("node/bin/", options).unwrap();
            writer.start_file("node/bin/node", options).unwrap();
            std::io::Write::write_all(&mut writer, b"#!/bin/sh\n").unwrap();
            writer.finish().unwrap();
        }

        let dest = temp.path().join("out");
        extract_archive(&archive, ArchiveFormat::Zip, &dest, &CancelToken::new()).unwrap();
        assert!(dest.join("node/bin/node").is_file());
    }

    #[test]
    fn test_enclosed_path() {
        assert_eq!(enclosed_path(Path::new("./go/bin")).unwrap(), PathBuf::from("go/bin"));
        assert!(enclosed_path(Path::new("go/../../x")).is_err());
        assert!(enclosed_path(Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_link_escapes() {
        assert!(!link_escapes(Path::new("go/bin/gofmt"), Path::new("../pkg/tool/gofmt")));
        assert!(!link_escapes(Path::new("go/bin/go"), Path::new("go-real")));
        assert!(link_escapes(Path::new("go/bin/go"), Path::new("../../../etc/passwd")));
        assert!(link_escapes(Path::new("link"), Path::new("/etc/passwd")));
    }
}
