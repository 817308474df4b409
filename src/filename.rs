//! Filename policy: sanitization, random name generation and uniquification.

use crate::error::{Result, TempFileError};
use crate::storage::StorageBackend;

/// Length of generated random file name stems.
const RANDOM_NAME_LEN: usize = 32;

/// Upper bound on existence probes during uniquification. A backend that
/// reports every candidate as existing is broken, not busy.
const MAX_UNIQUIFY_PROBES: usize = 10_000;

fn is_separator(c: char) -> bool {
    matches!(c, '.' | '_' | '-')
}

/// Split a file name into its stem and extension.
///
/// The extension is the substring after the last `.`, when one exists and is
/// non-empty. A trailing dot is treated as part of the stem (and later trimmed
/// by [`sanitize`]); a leading dot with nothing before it yields an empty stem.
///
/// ```
/// use temp_file_manager::filename::split_name;
///
/// assert_eq!(split_name("archive.tar.gz"), ("archive.tar", Some("gz")));
/// assert_eq!(split_name("README"), ("README", None));
/// assert_eq!(split_name(".bashrc"), ("", Some("bashrc")));
/// ```
pub fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Sanitize a user-supplied file name into a safe basename.
///
/// The stem has every character outside `[A-Za-z0-9._-]` replaced with `_`,
/// runs of two or more of `.`, `_`, `-` collapsed into a single `_`, and
/// leading/trailing separators stripped. An empty stem falls back to `file`.
/// The extension, when present, is reattached verbatim - callers must not
/// trust extensions for execution semantics.
///
/// Total and idempotent; always returns a non-empty name.
pub fn sanitize(name: &str) -> String {
    let (stem, extension) = split_name(name);

    let replaced: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || is_separator(c) {
                c
            } else {
                '_'
            }
        })
        .collect();

    // Collapse separator runs into a single underscore
    let mut collapsed = String::with_capacity(replaced.len());
    let mut pending: Option<char> = None;
    let mut run_len = 0usize;
    for c in replaced.chars() {
        if is_separator(c) {
            run_len += 1;
            if run_len == 1 {
                pending = Some(c);
            }
        } else {
            match (run_len, pending.take()) {
                (1, Some(sep)) => collapsed.push(sep),
                (n, _) if n >= 2 => collapsed.push('_'),
                _ => {}
            }
            run_len = 0;
            collapsed.push(c);
        }
    }
    match (run_len, pending) {
        (1, Some(sep)) => collapsed.push(sep),
        (n, _) if n >= 2 => collapsed.push('_'),
        _ => {}
    }

    let trimmed = collapsed.trim_matches(is_separator);
    let basename = if trimmed.is_empty() { "file" } else { trimmed };

    match extension {
        Some(ext) => format!("{basename}.{ext}"),
        None => basename.to_string(),
    }
}

/// Generate an unpredictable file name: 32 alphanumeric characters, plus the
/// given extension when one is supplied.
///
/// Temp file names can leak into logs and error messages, so they must not be
/// guessable.
pub fn random_name(extension: Option<&str>) -> String {
    let stem: String = std::iter::repeat_with(fastrand::alphanumeric)
        .take(RANDOM_NAME_LEN)
        .collect();

    match extension {
        Some(ext) if !ext.is_empty() => format!("{stem}.{ext}"),
        _ => stem,
    }
}

/// Resolve `desired` to a name that does not collide with an existing entry in
/// `directory`, by probing `stem_1[.ext]`, `stem_2[.ext]`, ... until a free
/// name is found.
///
/// The check-then-use sequence is inherently racy under concurrent writers
/// sharing the directory; that window is an accepted limitation rather than an
/// error condition. A backend that keeps reporting existence past
/// [`MAX_UNIQUIFY_PROBES`] candidates is treated as unavailable.
pub async fn uniquify(
    backend: &dyn StorageBackend,
    directory: &str,
    desired: &str,
) -> Result<String> {
    let (stem, extension) = split_name(desired);
    let mut candidate = desired.to_string();
    let mut counter = 0usize;

    while backend.exists(&format!("{directory}/{candidate}")).await? {
        counter += 1;
        if counter > MAX_UNIQUIFY_PROBES {
            return Err(TempFileError::StorageUnavailable {
                directory: directory.to_string(),
                reason: format!(
                    "existence probe for {desired:?} did not terminate after {MAX_UNIQUIFY_PROBES} candidates"
                ),
            });
        }
        candidate = match extension {
            Some(ext) => format!("{stem}_{counter}.{ext}"),
            None => format!("{stem}_{counter}"),
        };
    }

    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashSet;
    use std::path::PathBuf;

    /// Backend stub exposing a fixed set of existing paths.
    struct FixedSet(HashSet<String>);

    impl FixedSet {
        fn of(paths: &[&str]) -> Self {
            Self(paths.iter().map(|p| p.to_string()).collect())
        }
    }

    #[async_trait]
    impl StorageBackend for FixedSet {
        async fn exists(&self, path: &str) -> Result<bool> {
            Ok(self.0.contains(path))
        }
        async fn make_directory(&self, _path: &str) -> Result<()> {
            Ok(())
        }
        async fn put(&self, _path: &str, _contents: &[u8]) -> Result<()> {
            unreachable!("uniquify never writes")
        }
        async fn put_file(
            &self,
            _directory: &str,
            _file: &crate::content::UploadedFile,
            _name: &str,
        ) -> Result<()> {
            unreachable!("uniquify never writes")
        }
        async fn read(&self, _path: &str) -> Result<Vec<u8>> {
            unreachable!("uniquify never reads")
        }
        async fn delete(&self, _path: &str) -> Result<()> {
            unreachable!("uniquify never deletes")
        }
        async fn files(&self, _directory: &str) -> Result<Vec<String>> {
            Ok(self.0.iter().cloned().collect())
        }
        async fn last_modified(&self, _path: &str) -> Result<DateTime<Utc>> {
            Ok(Utc::now())
        }
        fn path(&self, relative: &str) -> PathBuf {
            PathBuf::from(relative)
        }
    }

    /// Backend stub that claims every path exists.
    struct AlwaysExists;

    #[async_trait]
    impl StorageBackend for AlwaysExists {
        async fn exists(&self, _path: &str) -> Result<bool> {
            Ok(true)
        }
        async fn make_directory(&self, _path: &str) -> Result<()> {
            Ok(())
        }
        async fn put(&self, _path: &str, _contents: &[u8]) -> Result<()> {
            Ok(())
        }
        async fn put_file(
            &self,
            _directory: &str,
            _file: &crate::content::UploadedFile,
            _name: &str,
        ) -> Result<()> {
            Ok(())
        }
        async fn read(&self, _path: &str) -> Result<Vec<u8>> {
            Ok(Vec::new())
        }
        async fn delete(&self, _path: &str) -> Result<()> {
            Ok(())
        }
        async fn files(&self, _directory: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
        async fn last_modified(&self, _path: &str) -> Result<DateTime<Utc>> {
            Ok(Utc::now())
        }
        fn path(&self, relative: &str) -> PathBuf {
            PathBuf::from(relative)
        }
    }

    #[test]
    fn split_name_cases() {
        assert_eq!(split_name("a.txt"), ("a", Some("txt")));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_name("noext"), ("noext", None));
        assert_eq!(split_name(".bashrc"), ("", Some("bashrc")));
        assert_eq!(split_name("trailing."), ("trailing.", None));
        assert_eq!(split_name(""), ("", None));
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize("my file(1).txt"), "my_file_1.txt");
        assert_eq!(sanitize("héllo.txt"), "h_llo.txt");
        assert_eq!(sanitize("path/to/file.pdf"), "path_to_file.pdf");
    }

    #[test]
    fn sanitize_collapses_separator_runs() {
        assert_eq!(sanitize("a..b--c.txt"), "a_b_c.txt");
        assert_eq!(sanitize("a_-b"), "a_b");
        assert_eq!(sanitize("single.sep-kept_here.log"), "single.sep-kept_here.log");
    }

    #[test]
    fn sanitize_trims_edges() {
        assert_eq!(sanitize("---report---.pdf"), "report.pdf");
        assert_eq!(sanitize("_hidden_"), "hidden");
    }

    #[test]
    fn sanitize_empty_stem_falls_back() {
        assert_eq!(sanitize(""), "file");
        assert_eq!(sanitize("???"), "file");
        assert_eq!(sanitize("...."), "file");
        assert_eq!(sanitize(".bashrc"), "file.bashrc");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let samples = [
            "my file(1).txt",
            "a..b--c.txt",
            "---report---.pdf",
            "???",
            "héllo wörld.tar.gz",
            "normal.txt",
            "",
        ];
        for s in samples {
            let once = sanitize(s);
            assert_eq!(sanitize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn sanitize_output_charset() {
        let samples = ["my fi!le@#.txt", "  spaces  ", "a/b\\c", "Ünïcödé"];
        for s in samples {
            let out = sanitize(s);
            let (stem, _) = split_name(&out);
            assert!(!stem.is_empty());
            assert!(stem
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || is_separator(c)));
            assert!(!is_separator(stem.chars().next().unwrap()));
            assert!(!is_separator(stem.chars().last().unwrap()));
        }
    }

    #[test]
    fn random_names_are_long_and_distinct() {
        let a = random_name(None);
        let b = random_name(None);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);

        let with_ext = random_name(Some("bin"));
        assert!(with_ext.ends_with(".bin"));
        assert_eq!(with_ext.len(), 32 + 4);
    }

    #[tokio::test]
    async fn uniquify_returns_free_name_unchanged() {
        let backend = FixedSet::of(&[]);
        let name = uniquify(&backend, "temp", "a.txt").await.unwrap();
        assert_eq!(name, "a.txt");
    }

    #[tokio::test]
    async fn uniquify_counts_past_existing_entries() {
        let backend = FixedSet::of(&["temp/a.txt", "temp/a_1.txt", "temp/a_2.txt"]);
        let name = uniquify(&backend, "temp", "a.txt").await.unwrap();
        assert_eq!(name, "a_3.txt");
    }

    #[tokio::test]
    async fn uniquify_without_extension() {
        let backend = FixedSet::of(&["temp/data", "temp/data_1"]);
        let name = uniquify(&backend, "temp", "data").await.unwrap();
        assert_eq!(name, "data_2");
    }

    #[tokio::test]
    async fn uniquify_gives_up_on_pathological_backend() {
        let err = uniquify(&AlwaysExists, "temp", "a.txt").await.unwrap_err();
        assert!(matches!(
            err,
            TempFileError::StorageUnavailable { .. }
        ));
    }
}
