//! SDK installation on local disk.
//!
//! An SDK version is installed when its resolved `install_dir` exists. Installs
//! are staged in a hidden scratch directory next to the install path and only
//! renamed into place once download, checksum and extraction all succeed.

mod archive;
mod fetch;

pub use archive::{extract_archive, ArchiveFormat};
pub use fetch::{format_digest, parse_sha256, ArchiveSource, Fetcher};

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::config::{ConfigManager, SdkConfig, ShellEnvConfig};
use crate::error::{EnvError, Result, ResultExt};
use crate::receipt::InstallReceipt;
use crate::version::{is_valid_version, validate_version};

const VERSION_PLACEHOLDER: &str = "{version}";

/// Downloads, installs and inspects SDK versions.
pub struct SdkManager {
    config: Arc<ConfigManager>,
    fetcher: Fetcher,
}

impl SdkManager {
    pub fn new(config: Arc<ConfigManager>) -> Result<Self> {
        Ok(Self {
            config,
            fetcher: Fetcher::new()?,
        })
    }

    /// Download and install `sdk` at `version`, returning the install path.
    pub fn download_sdk(&self, sdk: &str, version: &str, cancel: &CancelToken) -> Result<PathBuf> {
        validate_version(version)?;
        let sdk_config = self.config.get_sdk_config(sdk)?;

        let install_path = build_install_path(&sdk_config.install_dir_template, version);
        if install_path.exists() {
            return Err(EnvError::AlreadyInstalled {
                sdk: sdk.to_string(),
                version: version.to_string(),
                path: install_path,
            });
        }

        if sdk_config.install_url_template.trim().is_empty() {
            return Err(EnvError::Config(format!(
                "no install_url configured for SDK {sdk}"
            )));
        }

        let url = build_download_url(&sdk_config.install_url_template, version);
        let source = ArchiveSource::parse(&url)?;
        let format = ArchiveFormat::from_file_name(&source.file_name().unwrap_or_default());

        let parent = install_path.parent().ok_or_else(|| {
            EnvError::Config(format!("invalid install path {}", install_path.display()))
        })?;
        fs::create_dir_all(parent).map_err(|err| {
            EnvError::Download(format!(
                "failed to create install parent directory {}: {err}",
                parent.display()
            ))
        })?;

        // Same filesystem as the install path so the final move is a rename.
        let scratch = tempfile::Builder::new()
            .prefix(".ktenv-")
            .tempdir_in(parent)
            .map_err(|err| {
                EnvError::Download(format!(
                    "failed to create scratch directory in {}: {err}",
                    parent.display()
                ))
            })?;

        let archive_path = scratch.path().join(format!("download.{}", format.extension()));
        let digest = self.fetcher.fetch(&source, &archive_path, cancel)?;
        if let Some(expected) = sdk_config.checksums.get(version) {
            verify_checksum(expected, &digest, &url)?;
        }

        let extract_dir = scratch.path().join("extract");
        extract_archive(&archive_path, format, &extract_dir, cancel)?;
        cancel.check()?;

        move_to_install_path(&extract_dir, &install_path)?;

        let receipt = InstallReceipt::new(sdk, version, &url, Some(format_digest(&digest)));
        if let Err(err) = receipt.save(&install_path) {
            warn!(error = %err, path = %install_path.display(), "failed to write install receipt");
        }

        info!(sdk, version, path = %install_path.display(), "installed SDK");
        Ok(install_path)
    }

    pub fn install_sdk(&self, sdk: &str, version: &str, cancel: &CancelToken) -> Result<PathBuf> {
        self.download_sdk(sdk, version, cancel)
    }

    pub fn uninstall_sdk(&self, sdk: &str, version: &str) -> Result<()> {
        let install_path = self.get_sdk_path(sdk, version)?;
        if !install_path.is_dir() {
            return Err(EnvError::NotInstalled {
                sdk: sdk.to_string(),
                version: version.to_string(),
            });
        }

        fs::remove_dir_all(&install_path).map_err(|err| {
            EnvError::StateIo(format!(
                "failed to remove {}: {err}",
                install_path.display()
            ))
        })?;
        info!(sdk, version, path = %install_path.display(), "uninstalled SDK");
        Ok(())
    }

    pub fn get_sdk_path(&self, sdk: &str, version: &str) -> Result<PathBuf> {
        let sdk_config = self.config.get_sdk_config(sdk)?;
        Ok(build_install_path(&sdk_config.install_dir_template, version))
    }

    /// Whether the resolved install directory exists. Unknown SDKs are never installed.
    pub fn is_installed(&self, sdk: &str, version: &str) -> bool {
        is_valid_version(version)
            && self
                .get_sdk_path(sdk, version)
                .map(|path| path.is_dir())
                .unwrap_or(false)
    }

    /// Installed versions of `sdk`, sorted.
    ///
    /// Directories carrying an install receipt are identified by it. Others are
    /// matched against the `install_dir` template, ignoring names claimed by
    /// another SDK with a longer prefix (`goland1.0` is not `go` version `land1.0`).
    pub fn list_versions(&self, sdk: &str) -> Result<Vec<String>> {
        let config = self.config.load_config()?;
        let sdk_config = config
            .sdk(sdk)
            .ok_or_else(|| EnvError::not_found("SDK config", sdk))?;

        let Some(layout) = InstallLayout::parse(&sdk_config.install_dir_template) else {
            debug!(sdk, "install_dir has no {{version}} placeholder, nothing to scan");
            return Ok(Vec::new());
        };
        if !layout.base.is_dir() {
            return Ok(Vec::new());
        }

        let rivals = rival_layouts(&config, sdk_config, &layout);
        let entries = fs::read_dir(&layout.base).map_err(|err| {
            EnvError::StateIo(format!(
                "failed to list SDK directory {}: {err}",
                layout.base.display()
            ))
        })?;

        let mut versions = Vec::new();
        for entry in entries.filter_map(|entry| entry.ok()) {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.path().is_dir() {
                continue;
            }

            let install_dir = layout.base.join(&name).join(&layout.rest);
            match InstallReceipt::load(&install_dir) {
                Ok(Some(receipt)) => {
                    if receipt.sdk != sdk || !is_valid_version(&receipt.sdk_version) {
                        continue;
                    }
                    // Only trust receipts sitting where the version would be installed.
                    let expected =
                        build_install_path(&sdk_config.install_dir_template, &receipt.sdk_version);
                    if expected == install_dir {
                        versions.push(receipt.sdk_version);
                    } else {
                        warn!(
                            dir = %install_dir.display(),
                            expected = %expected.display(),
                            "ignoring receipt outside its install path"
                        );
                    }
                    continue;
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(error = %err, dir = %install_dir.display(), "ignoring unreadable receipt");
                }
            }

            let Some(version) = layout.match_dir(&name) else {
                continue;
            };
            if rivals.iter().any(|rival| rival.match_dir(&name).is_some()) {
                continue;
            }
            if is_valid_version(version) && install_dir.is_dir() {
                versions.push(version.to_string());
            }
        }

        versions.sort();
        versions.dedup();
        Ok(versions)
    }

    /// `{install}/{bin_dir}`, `bin` unless configured otherwise.
    pub fn get_sdk_bin_path(&self, sdk: &str, version: &str) -> Result<PathBuf> {
        let sdk_config = self.config.get_sdk_config(sdk)?;
        Ok(build_install_path(&sdk_config.install_dir_template, version).join(sdk_config.bin_dir()))
    }

    /// The SDK's `active_env` with `{sdk_path}`, `{version}`, `{os}` and `{arch}` filled in.
    pub fn get_sdk_env_vars(&self, sdk: &str, version: &str) -> Result<BTreeMap<String, String>> {
        let sdk_config = self.config.get_sdk_config(sdk)?;
        let sdk_path = build_install_path(&sdk_config.install_dir_template, version);
        let sdk_path = sdk_path.to_string_lossy();

        Ok(sdk_config
            .active_env
            .iter()
            .map(|(name, value)| {
                let value = render_template(&value.replace("{sdk_path}", &sdk_path), version);
                (name.clone(), value)
            })
            .collect())
    }

    /// Check the install has its bin directory and main executable.
    pub fn validate_sdk(&self, sdk: &str, version: &str) -> Result<()> {
        if !self.is_installed(sdk, version) {
            return Err(EnvError::NotInstalled {
                sdk: sdk.to_string(),
                version: version.to_string(),
            });
        }

        let sdk_config = self.config.get_sdk_config(sdk)?;
        let bin_path = self.get_sdk_bin_path(sdk, version)?;
        if !bin_path.is_dir() {
            return Err(EnvError::Validation(format!(
                "SDK {sdk}:{version} bin directory not found: {}",
                bin_path.display()
            )));
        }

        if let Some(executable) = sdk_config.main_executable() {
            let candidates = executable_candidates(&bin_path, executable);
            if !candidates.iter().any(|path| path.is_file()) {
                return Err(EnvError::Validation(format!(
                    "SDK {sdk}:{version} main executable not found: {}",
                    candidates[0].display()
                )));
            }
        }

        Ok(())
    }
}

#[cfg(windows)]
fn executable_candidates(bin_path: &Path, executable: &str) -> Vec<PathBuf> {
    ["exe", "cmd", "bat"]
        .iter()
        .map(|ext| bin_path.join(format!("{executable}.{ext}")))
        .collect()
}

#[cfg(not(windows))]
fn executable_candidates(bin_path: &Path, executable: &str) -> Vec<PathBuf> {
    vec![bin_path.join(executable)]
}

fn verify_checksum(expected: &str, actual: &[u8; 32], url: &str) -> Result<()> {
    let expected = parse_sha256(expected).with_context(|| format!("invalid checksum for {url}"))?;
    if &expected != actual {
        return Err(EnvError::Download(format!(
            "checksum mismatch for {url}: expected sha256:{}, got sha256:{}",
            format_digest(&expected),
            format_digest(actual)
        )));
    }
    debug!(url, "checksum verified");
    Ok(())
}

/// Go-style OS name used in download URLs.
pub fn host_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    }
}

/// Go-style architecture name used in download URLs.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}

fn render_template(template: &str, version: &str) -> String {
    template
        .replace(VERSION_PLACEHOLDER, version)
        .replace("{os}", host_os())
        .replace("{arch}", host_arch())
}

pub fn build_download_url(template: &str, version: &str) -> String {
    render_template(template, version)
}

pub fn build_install_path(template: &str, version: &str) -> PathBuf {
    PathBuf::from(render_template(template, version))
}

/// Place extracted content at `install_path`.
///
/// A single top-level directory is renamed straight onto the install path;
/// anything else is moved entry by entry into a fresh install directory.
fn move_to_install_path(extract_dir: &Path, install_path: &Path) -> Result<()> {
    let entries: Vec<PathBuf> = fs::read_dir(extract_dir)
        .map_err(|err| {
            EnvError::Extract(format!(
                "failed to read extract directory {}: {err}",
                extract_dir.display()
            ))
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .collect();

    if entries.is_empty() {
        return Err(EnvError::Extract("archive is empty".to_string()));
    }

    if entries.len() == 1 && entries[0].is_dir() {
        return fs::rename(&entries[0], install_path).map_err(|err| {
            EnvError::Extract(format!(
                "failed to move extracted directory to {}: {err}",
                install_path.display()
            ))
        });
    }

    fs::create_dir(install_path).map_err(|err| {
        EnvError::Extract(format!(
            "failed to create install directory {}: {err}",
            install_path.display()
        ))
    })?;

    for source in &entries {
        let Some(name) = source.file_name() else {
            continue;
        };
        if let Err(err) = fs::rename(source, install_path.join(name)) {
            let _ = fs::remove_dir_all(install_path);
            return Err(EnvError::Extract(format!(
                "failed to move {}: {err}",
                name.to_string_lossy()
            )));
        }
    }

    Ok(())
}

/// The `install_dir` template split around the path component holding `{version}`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InstallLayout {
    base: PathBuf,
    prefix: String,
    suffix: String,
    rest: PathBuf,
}

impl InstallLayout {
    fn parse(template: &str) -> Option<Self> {
        let template = PathBuf::from(render_template(
            &template.replace(VERSION_PLACEHOLDER, "\u{0}"),
            "",
        ));

        let mut base = PathBuf::new();
        let mut components = template.components();
        for component in components.by_ref() {
            let part = component.as_os_str().to_string_lossy();
            if let Some((prefix, suffix)) = part.split_once('\u{0}') {
                return Some(Self {
                    base,
                    prefix: prefix.to_string(),
                    suffix: suffix.replace('\u{0}', ""),
                    rest: components.as_path().to_path_buf(),
                });
            }
            base.push(component);
        }
        None
    }

    /// Version encoded in directory `name`, if it fits this layout.
    fn match_dir<'a>(&self, name: &'a str) -> Option<&'a str> {
        let version = name.strip_prefix(&self.prefix)?.strip_suffix(&self.suffix)?;
        (!version.is_empty()).then_some(version)
    }
}

/// Layouts of other SDKs sharing `layout.base` whose prefix extends ours.
fn rival_layouts(config: &ShellEnvConfig, sdk: &SdkConfig, layout: &InstallLayout) -> Vec<InstallLayout> {
    config
        .sdks
        .iter()
        .filter(|other| other.name != sdk.name)
        .filter_map(|other| InstallLayout::parse(&other.install_dir_template))
        .filter(|other| {
            other.base == layout.base
                && other.prefix.len() > layout.prefix.len()
                && other.prefix.starts_with(&layout.prefix)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testutil::{file_url, sdk_archive, write_raw_tar_gz, write_tar_gz};
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        config: Arc<ConfigManager>,
        sdks: SdkManager,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let config = Arc::new(ConfigManager::new(
                temp.path().join("config/module/shell_env.yml"),
                temp.path(),
            ));
            let sdks = SdkManager::new(Arc::clone(&config)).unwrap();
            Self { temp, config, sdks }
        }

        fn sdk_dir(&self) -> PathBuf {
            self.temp.path().join("sdk")
        }

        fn mirror(&self) -> PathBuf {
            self.temp.path().join("mirror")
        }

        /// Configure `name` with archives served from the local mirror.
        fn configure(&self, name: &str, install_dir: &str) {
            let url = format!(
                "{}/{name}-{{version}}.tar.gz",
                file_url(&self.mirror()).trim_end_matches('/')
            );
            self.config
                .add_sdk_config(SdkConfig::new(name, install_dir).with_install_url(url))
                .unwrap();
        }

        fn publish(&self, name: &str, version: &str) {
            sdk_archive(&self.mirror(), &format!("{name}-{version}"), name);
        }
    }

    #[test]
    fn test_build_templates() {
        let url = build_download_url("https://go.dev/dl/go{version}.{os}-{arch}.tar.gz", "1.21.5");
        assert_eq!(
            url,
            format!("https://go.dev/dl/go1.21.5.{}-{}.tar.gz", host_os(), host_arch())
        );
        assert_eq!(
            build_install_path("/sdk/node{version}", "18.0.0"),
            PathBuf::from("/sdk/node18.0.0")
        );
    }

    #[test]
    fn test_install_and_validate() {
        let fx = Fixture::new();
        fx.configure("go", "go{version}");
        fx.publish("go", "1.21.5");

        assert!(!fx.sdks.is_installed("go", "1.21.5"));
        let err = fx.sdks.validate_sdk("go", "1.21.5").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInstalled);

        let path = fx
            .sdks
            .install_sdk("go", "1.21.5", &CancelToken::new())
            .unwrap();

        assert_eq!(path, fx.sdk_dir().join("go1.21.5"));
        assert!(fx.sdks.is_installed("go", "1.21.5"));
        assert!(path.join("bin/go").is_file());
        assert!(path.join(crate::receipt::RECEIPT_FILE).is_file());
        fx.sdks.validate_sdk("go", "1.21.5").unwrap();
        assert_eq!(
            fx.sdks.get_sdk_bin_path("go", "1.21.5").unwrap(),
            path.join("bin")
        );

        let leftovers: Vec<_> = fs::read_dir(fx.sdk_dir())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with('.'))
            .collect();
        assert!(leftovers.is_empty(), "scratch directory was not removed");
    }

    #[test]
    fn test_install_twice_is_already_installed() {
        let fx = Fixture::new();
        fx.configure("go", "go{version}");
        fx.publish("go", "1.21.5");

        fx.sdks.install_sdk("go", "1.21.5", &CancelToken::new()).unwrap();
        let err = fx
            .sdks
            .install_sdk("go", "1.21.5", &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyInstalled);
    }

    #[test]
    fn test_failed_extract_leaves_no_install() {
        let fx = Fixture::new();
        fx.configure("go", "go{version}");
        fs::create_dir_all(fx.mirror()).unwrap();
        write_raw_tar_gz(
            &fx.mirror().join("go-1.0.tar.gz"),
            &[("go/bin/go", "x"), ("../../escape", "x")],
        );

        let err = fx
            .sdks
            .install_sdk("go", "1.0", &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Extract);
        assert!(!fx.sdks.is_installed("go", "1.0"));
        assert_eq!(fs::read_dir(fx.sdk_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_checksum_mismatch_fails() {
        let fx = Fixture::new();
        fx.publish("go", "1.21.5");
        let mut sdk = SdkConfig::new("go", "go{version}").with_install_url(format!(
            "{}/go-{{version}}.tar.gz",
            file_url(&fx.mirror()).trim_end_matches('/')
        ));
        sdk.checksums.insert("1.21.5".to_string(), format!("sha256:{}", "0".repeat(64)));
        fx.config.add_sdk_config(sdk).unwrap();

        let err = fx
            .sdks
            .install_sdk("go", "1.21.5", &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Download);
        assert!(err.to_string().contains("checksum mismatch"));
        assert!(!fx.sdks.is_installed("go", "1.21.5"));
    }

    #[test]
    fn test_cancelled_install_cleans_up() {
        let fx = Fixture::new();
        fx.configure("go", "go{version}");
        fx.publish("go", "1.21.5");

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = fx.sdks.install_sdk("go", "1.21.5", &cancel).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(fs::read_dir(fx.sdk_dir()).unwrap().count(), 0);
    }

    #[test]
    fn test_install_without_url_is_config_error() {
        let fx = Fixture::new();
        fx.config
            .add_sdk_config(SdkConfig::new("go", "go{version}"))
            .unwrap();
        let err = fx
            .sdks
            .install_sdk("go", "1.0", &CancelToken::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_flat_archive_moved_into_install_dir() {
        let fx = Fixture::new();
        fx.configure("go", "go{version}");
        fs::create_dir_all(fx.mirror()).unwrap();
        write_tar_gz(
            &fx.mirror().join("go-2.0.tar.gz"),
            &[("bin/go", "x"), ("VERSION", "2.0")],
        );

        let path = fx.sdks.install_sdk("go", "2.0", &CancelToken::new()).unwrap();
        assert!(path.join("bin/go").is_file());
        assert!(path.join("VERSION").is_file());
    }

    #[test]
    fn test_uninstall() {
        let fx = Fixture::new();
        fx.configure("go", "go{version}");
        fx.publish("go", "1.21.5");
        fx.sdks.install_sdk("go", "1.21.5", &CancelToken::new()).unwrap();

        fx.sdks.uninstall_sdk("go", "1.21.5").unwrap();
        assert!(!fx.sdks.is_installed("go", "1.21.5"));

        let err = fx.sdks.uninstall_sdk("go", "1.21.5").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInstalled);
    }

    #[test]
    fn test_list_versions_ignores_longer_prefix_and_hidden_dirs() {
        let fx = Fixture::new();
        fx.configure("go", "go{version}");
        fx.configure("goland", "goland{version}");

        for dir in ["go1.20", "go1.21.5", "goland2023.3", ".go-scratch", "unrelated"] {
            fs::create_dir_all(fx.sdk_dir().join(dir)).unwrap();
        }
        fs::write(fx.sdk_dir().join("go1.99"), "not a directory").unwrap();

        assert_eq!(fx.sdks.list_versions("go").unwrap(), vec!["1.20", "1.21.5"]);
        assert_eq!(fx.sdks.list_versions("goland").unwrap(), vec!["2023.3"]);
    }

    #[test]
    fn test_list_versions_skips_moved_receipts() {
        let fx = Fixture::new();
        fx.configure("node", "node-{version}");
        fx.publish("node", "18.0.0");
        fx.sdks.install_sdk("node", "18.0.0", &CancelToken::new()).unwrap();
        assert_eq!(fx.sdks.list_versions("node").unwrap(), vec!["18.0.0"]);

        // Renamed by hand: the receipt no longer matches where 18.0.0 lives.
        fs::rename(fx.sdk_dir().join("node-18.0.0"), fx.sdk_dir().join("node-lts")).unwrap();
        assert!(!fx.sdks.is_installed("node", "18.0.0"));
        assert!(fx.sdks.list_versions("node").unwrap().is_empty());
    }

    #[test]
    fn test_list_versions_nested_layout() {
        let fx = Fixture::new();
        fx.configure("java", "java/{version}/home");
        fs::create_dir_all(fx.sdk_dir().join("java/17/home")).unwrap();
        fs::create_dir_all(fx.sdk_dir().join("java/21")).unwrap();

        assert_eq!(fx.sdks.list_versions("java").unwrap(), vec!["17"]);
        assert!(fx.sdks.list_versions("missing").is_err());
    }

    #[test]
    fn test_env_vars_substitute_placeholders() {
        let fx = Fixture::new();
        let mut sdk = SdkConfig::new("go", "/sdk/go{version}");
        sdk.active_env.insert("GOROOT".to_string(), "{sdk_path}".to_string());
        sdk.active_env.insert("GO_VERSION".to_string(), "v{version}".to_string());
        fx.config.add_sdk_config(sdk).unwrap();

        let vars = fx.sdks.get_sdk_env_vars("go", "1.21.5").unwrap();
        assert_eq!(vars["GOROOT"], "/sdk/go1.21.5");
        assert_eq!(vars["GO_VERSION"], "v1.21.5");
    }

    #[test]
    fn test_validate_reports_missing_executable() {
        let fx = Fixture::new();
        fx.configure("go", "go{version}");
        fs::create_dir_all(fx.sdk_dir().join("go1.0/bin")).unwrap();

        let err = fx.sdks.validate_sdk("go", "1.0").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("main executable not found"));

        fs::remove_dir_all(fx.sdk_dir().join("go1.0/bin")).unwrap();
        let err = fx.sdks.validate_sdk("go", "1.0").unwrap_err();
        assert!(err.to_string().contains("bin directory not found"));
    }

    #[test]
    fn test_install_layout_parse() {
        let layout = InstallLayout::parse("/sdk/go{version}").unwrap();
        assert_eq!(layout.base, PathBuf::from("/sdk"));
        assert_eq!(layout.prefix, "go");
        assert_eq!(layout.match_dir("go1.21"), Some("1.21"));
        assert_eq!(layout.match_dir("go"), None);
        assert_eq!(layout.match_dir("node18"), None);

        let layout = InstallLayout::parse("/sdk/jdk-{version}-x/Contents/Home").unwrap();
        assert_eq!(layout.suffix, "-x");
        assert_eq!(layout.rest, PathBuf::from("Contents/Home"));
        assert_eq!(layout.match_dir("jdk-17-x"), Some("17"));

        assert!(InstallLayout::parse("/sdk/fixed").is_none());
    }
}
