use std::ffi::OsStr;
use std::path::Path;

use serde::Serialize;

/// Archive suffixes recognised as Python package files, in match priority order.
const ARCHIVE_SUFFIXES: &[(&str, ArchiveKind)] = &[
    (".whl", ArchiveKind::Wheel),
    (".tar.gz", ArchiveKind::TarGz),
    (".zip", ArchiveKind::Zip),
    (".tar.bz2", ArchiveKind::TarBz2),
    (".egg", ArchiveKind::Egg),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchiveKind {
    Wheel,
    TarGz,
    Zip,
    TarBz2,
    Egg,
}

impl ArchiveKind {
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            ArchiveKind::Wheel => ".whl",
            ArchiveKind::TarGz => ".tar.gz",
            ArchiveKind::Zip => ".zip",
            ArchiveKind::TarBz2 => ".tar.bz2",
            ArchiveKind::Egg => ".egg",
        }
    }

    #[must_use]
    pub fn is_wheel(self) -> bool {
        matches!(self, ArchiveKind::Wheel)
    }
}

/// Whether the name/version split came from a confident match or from the
/// whole-stem fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseOrigin {
    Matched,
    Fallback,
}

/// Package coordinates recovered from a distribution file name.
///
/// `distribution_name` is never empty. `version` is empty exactly when
/// `origin` is [`ParseOrigin::Fallback`]; the upload pipeline tolerates
/// that and lets the index decide.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParsedPackage {
    pub distribution_name: String,
    pub version: String,
    pub is_wheel: bool,
    pub archive: Option<ArchiveKind>,
    pub python_tag: Option<String>,
    pub abi_tag: Option<String>,
    pub platform_tag: Option<String>,
    pub build_tag: Option<String>,
    pub origin: ParseOrigin,
}

impl ParsedPackage {
    /// Parses a wheel or sdist file name. Never fails; see [`ParseOrigin`].
    ///
    /// Only the final path component is considered, so callers may pass a
    /// full path.
    #[must_use]
    pub fn parse(filename: &str) -> Self {
        let base = base_name(filename);
        let (stem, archive) = split_archive_suffix(base);
        let is_wheel = archive.is_some_and(ArchiveKind::is_wheel);

        if is_wheel {
            if let Some(parts) = split_wheel(stem) {
                return Self {
                    distribution_name: parts.name.to_string(),
                    version: parts.version.to_string(),
                    is_wheel,
                    archive,
                    python_tag: Some(parts.python.to_string()),
                    abi_tag: Some(parts.abi.to_string()),
                    platform_tag: Some(parts.platform.to_string()),
                    build_tag: parts.build.map(ToString::to_string),
                    origin: ParseOrigin::Matched,
                };
            }
        } else if let Some((name, version)) = split_sdist(stem) {
            return Self {
                distribution_name: name.to_string(),
                version: version.to_string(),
                is_wheel,
                archive,
                python_tag: None,
                abi_tag: None,
                platform_tag: None,
                build_tag: None,
                origin: ParseOrigin::Matched,
            };
        }

        Self::fallback(stem, base, archive)
    }

    fn fallback(stem: &str, base: &str, archive: Option<ArchiveKind>) -> Self {
        let name = [stem, base]
            .into_iter()
            .find(|candidate| !candidate.is_empty())
            .unwrap_or("unknown");
        Self {
            distribution_name: name.to_string(),
            version: String::new(),
            is_wheel: archive.is_some_and(ArchiveKind::is_wheel),
            archive,
            python_tag: None,
            abi_tag: None,
            platform_tag: None,
            build_tag: None,
            origin: ParseOrigin::Fallback,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.origin == ParseOrigin::Fallback
    }

    /// Upload protocol `filetype` value.
    #[must_use]
    pub fn filetype(&self) -> &'static str {
        if self.is_wheel {
            "bdist_wheel"
        } else {
            "sdist"
        }
    }

    /// Upload protocol `pyversion` value: the python tag for wheels (when
    /// known) and `source` for everything else.
    #[must_use]
    pub fn pyversion(&self) -> Option<&str> {
        if self.is_wheel {
            self.python_tag.as_deref()
        } else {
            Some("source")
        }
    }
}

struct WheelParts<'a> {
    name: &'a str,
    version: &'a str,
    build: Option<&'a str>,
    python: &'a str,
    abi: &'a str,
    platform: &'a str,
}

fn split_wheel(stem: &str) -> Option<WheelParts<'_>> {
    let fields: Vec<&str> = stem.split('-').collect();
    if fields.iter().any(|field| field.is_empty()) {
        return None;
    }
    match fields[..] {
        [name, version, python, abi, platform] => Some(WheelParts {
            name,
            version,
            build: None,
            python,
            abi,
            platform,
        }),
        [name, version, build, python, abi, platform] => Some(WheelParts {
            name,
            version,
            build: Some(build),
            python,
            abi,
            platform,
        }),
        _ => None,
    }
}

/// Splits `{name}-{version}` on the last hyphen followed by a digit.
fn split_sdist(stem: &str) -> Option<(&str, &str)> {
    stem.match_indices('-').rev().find_map(|(idx, _)| {
        let name = &stem[..idx];
        let version = &stem[idx + 1..];
        let digit_led = version.as_bytes().first().is_some_and(u8::is_ascii_digit);
        (digit_led && !name.is_empty()).then_some((name, version))
    })
}

fn base_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or(filename)
}

/// Strips a known archive suffix (case-insensitively). Unknown suffixes lose
/// their last extension only.
#[must_use]
pub fn split_archive_suffix(name: &str) -> (&str, Option<ArchiveKind>) {
    let lowered = name.to_ascii_lowercase();
    for (suffix, kind) in ARCHIVE_SUFFIXES {
        if lowered.ends_with(suffix) {
            return (&name[..name.len() - suffix.len()], Some(*kind));
        }
    }
    let stem = Path::new(name)
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or(name);
    (stem, None)
}

/// True when the file name carries one of the recognised package suffixes.
#[must_use]
pub fn is_package_file(path: &Path) -> bool {
    path.file_name()
        .and_then(OsStr::to_str)
        .is_some_and(|name| split_archive_suffix(name).1.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_wheel_name() {
        let parsed = ParsedPackage::parse("mypkg-1.2.3-py3-none-any.whl");
        assert_eq!(parsed.distribution_name, "mypkg");
        assert_eq!(parsed.version, "1.2.3");
        assert!(parsed.is_wheel);
        assert_eq!(parsed.python_tag.as_deref(), Some("py3"));
        assert_eq!(parsed.abi_tag.as_deref(), Some("none"));
        assert_eq!(parsed.platform_tag.as_deref(), Some("any"));
        assert_eq!(parsed.build_tag, None);
        assert_eq!(parsed.origin, ParseOrigin::Matched);
        assert_eq!(parsed.filetype(), "bdist_wheel");
        assert_eq!(parsed.pyversion(), Some("py3"));
    }

    #[test]
    fn parses_wheel_with_build_tag() {
        let parsed = ParsedPackage::parse("demo_pkg-0.4.0-2-cp311-cp311-manylinux_2_17_x86_64.whl");
        assert_eq!(parsed.distribution_name, "demo_pkg");
        assert_eq!(parsed.version, "0.4.0");
        assert_eq!(parsed.build_tag.as_deref(), Some("2"));
        assert_eq!(parsed.python_tag.as_deref(), Some("cp311"));
        assert_eq!(parsed.abi_tag.as_deref(), Some("cp311"));
        assert_eq!(
            parsed.platform_tag.as_deref(),
            Some("manylinux_2_17_x86_64")
        );
    }

    #[test]
    fn parses_compressed_platform_tags() {
        let parsed = ParsedPackage::parse(
            "ffactory_rs-0.1.2-cp313-abi3-manylinux_2_17_x86_64.manylinux2014_x86_64.whl",
        );
        assert_eq!(parsed.distribution_name, "ffactory_rs");
        assert_eq!(parsed.version, "0.1.2");
        assert_eq!(parsed.abi_tag.as_deref(), Some("abi3"));
        assert_eq!(
            parsed.platform_tag.as_deref(),
            Some("manylinux_2_17_x86_64.manylinux2014_x86_64")
        );
    }

    #[test]
    fn wheel_with_wrong_field_count_falls_back() {
        for name in [
            "mypkg-1.0-py3-any.whl",
            "a-b-c-d-e-f-g.whl",
            "mypkg-1.0--none-any.whl",
        ] {
            let parsed = ParsedPackage::parse(name);
            let stem = name.trim_end_matches(".whl");
            assert!(parsed.is_fallback(), "{name} should fall back");
            assert_eq!(parsed.distribution_name, stem);
            assert_eq!(parsed.version, "");
            assert!(parsed.is_wheel, "{name} keeps its wheel filetype");
            assert_eq!(parsed.python_tag, None);
            assert_eq!(parsed.abi_tag, None);
            assert_eq!(parsed.platform_tag, None);
            assert_eq!(parsed.build_tag, None);
            assert_eq!(parsed.pyversion(), None);
        }
    }

    #[test]
    fn parses_sdist_names_and_round_trips_stem() {
        let cases = [
            ("mypkg-1.2.3.tar.gz", "mypkg", "1.2.3", ArchiveKind::TarGz),
            ("mypkg-1.2.3.zip", "mypkg", "1.2.3", ArchiveKind::Zip),
            ("old_pkg-0.9.tar.bz2", "old_pkg", "0.9", ArchiveKind::TarBz2),
            ("legacy-2.0rc1.egg", "legacy", "2.0rc1", ArchiveKind::Egg),
            ("my-package-name-1.0.tar.gz", "my-package-name", "1.0", ArchiveKind::TarGz),
            ("py-3d-tools-10.1.post2.tar.gz", "py-3d-tools", "10.1.post2", ArchiveKind::TarGz),
        ];
        for (filename, name, version, kind) in cases {
            let parsed = ParsedPackage::parse(filename);
            assert_eq!(parsed.distribution_name, name, "{filename}");
            assert_eq!(parsed.version, version, "{filename}");
            assert!(!parsed.is_wheel);
            assert_eq!(parsed.archive, Some(kind));
            assert_eq!(parsed.origin, ParseOrigin::Matched);
            assert_eq!(parsed.filetype(), "sdist");
            assert_eq!(parsed.pyversion(), Some("source"));
            let stem = &filename[..filename.len() - kind.suffix().len()];
            assert_eq!(format!("{}-{}", parsed.distribution_name, parsed.version), stem);
        }
    }

    #[test]
    fn sdist_without_version_segment_falls_back() {
        for (filename, stem) in [
            ("mypkg.tar.gz", "mypkg"),
            ("my-package-latest.tar.gz", "my-package-latest"),
            ("1.0.zip", "1.0"),
            ("-1.0.zip", "-1.0"),
        ] {
            let parsed = ParsedPackage::parse(filename);
            assert!(parsed.is_fallback(), "{filename}");
            assert_eq!(parsed.distribution_name, stem);
            assert_eq!(parsed.version, "");
        }
    }

    #[test]
    fn unknown_suffix_is_treated_as_source_distribution() {
        let parsed = ParsedPackage::parse("checksums.txt");
        assert!(parsed.is_fallback());
        assert_eq!(parsed.distribution_name, "checksums");
        assert_eq!(parsed.archive, None);
        assert!(!parsed.is_wheel);

        let parsed = ParsedPackage::parse("tool-2.0.exe");
        assert_eq!(parsed.distribution_name, "tool");
        assert_eq!(parsed.version, "2.0");
        assert_eq!(parsed.archive, None);

        let parsed = ParsedPackage::parse("README");
        assert_eq!(parsed.distribution_name, "README");
        assert_eq!(parsed.version, "");
    }

    #[test]
    fn suffix_matching_ignores_case_and_directories() {
        let parsed = ParsedPackage::parse("artifacts/nested/MyPkg-1.0-py3-none-any.WHL");
        assert_eq!(parsed.distribution_name, "MyPkg");
        assert_eq!(parsed.version, "1.0");
        assert!(parsed.is_wheel);

        let parsed = ParsedPackage::parse("Demo-2.0.TAR.GZ");
        assert_eq!(parsed.distribution_name, "Demo");
        assert_eq!(parsed.version, "2.0");
    }

    #[test]
    fn empty_stem_keeps_a_non_empty_name() {
        let parsed = ParsedPackage::parse(".whl");
        assert!(parsed.is_fallback());
        assert_eq!(parsed.distribution_name, ".whl");
    }

    #[test]
    fn package_file_detection_uses_known_suffixes() {
        assert!(is_package_file(Path::new("dist/demo-0.1.0-py3-none-any.whl")));
        assert!(is_package_file(Path::new("demo-0.1.0.tar.gz")));
        assert!(is_package_file(Path::new("demo-0.1.0.tar.bz2")));
        assert!(is_package_file(Path::new("demo-0.1.0.egg")));
        assert!(is_package_file(Path::new("demo-0.1.0.zip")));
        assert!(!is_package_file(Path::new("demo-0.1.0.whl.sig")));
        assert!(!is_package_file(Path::new("SHA256SUMS")));
    }
}
