//! Path mappings (`baseUrl` + `paths`)
//!
//! Patterns hold at most one `*`. A specifier is matched against every
//! pattern; an exact pattern beats any wildcard and among wildcards the
//! longest prefix wins. The captured text replaces the `*` of each target.

use crate::paths::{normalize, resolve};
use crate::{PackageError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Path mapping rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMappings {
    /// Directory the targets are relative to
    pub base_url: PathBuf,
    /// Pattern → target templates, in declaration order
    pub paths: Vec<(String, Vec<String>)>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TsConfig {
    #[serde(default)]
    compiler_options: Option<CompilerOptions>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompilerOptions {
    base_url: Option<String>,
    #[serde(default)]
    paths: BTreeMap<String, Vec<String>>,
}

impl PathMappings {
    /// Create mappings from a base URL and pattern rules
    pub fn new<I, S>(base_url: impl Into<PathBuf>, paths: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<String>)>,
        S: Into<String>,
    {
        Self {
            base_url: normalize(&base_url.into()),
            paths: paths.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Read `compilerOptions.baseUrl`/`paths` from a tsconfig file.
    ///
    /// Returns `None` when the file declares no `baseUrl`.
    pub fn from_tsconfig(path: &Path) -> Result<Option<Self>> {
        let content = std::fs::read_to_string(path).map_err(|e| PackageError::io(path, e))?;
        let tsconfig: TsConfig =
            serde_json::from_str(&content).map_err(|e| PackageError::InvalidTsConfig {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        let Some(options) = tsconfig.compiler_options else {
            return Ok(None);
        };
        let Some(base_url) = options.base_url else {
            return Ok(None);
        };

        let config_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(Some(Self::new(
            resolve(config_dir, &base_url),
            options.paths,
        )))
    }

    /// Candidate paths for a specifier, best match first
    pub fn candidates(&self, specifier: &str) -> Vec<PathBuf> {
        let mut best: Option<(&str, &Vec<String>, usize, bool)> = None;

        for (pattern, targets) in &self.paths {
            let Some((captured, prefix_len, exact)) = match_pattern(pattern, specifier) else {
                continue;
            };
            let better = match best {
                None => true,
                Some((_, _, best_len, best_exact)) => {
                    (exact && !best_exact) || (exact == best_exact && prefix_len > best_len)
                }
            };
            if better {
                best = Some((captured, targets, prefix_len, exact));
            }
        }

        match best {
            Some((captured, targets, _, _)) => targets
                .iter()
                .map(|target| resolve(&self.base_url, &target.replacen('*', captured, 1)))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Directories implied by the mapping targets, usable as discovery roots.
    ///
    /// A wildcard target contributes the directory before the `*`; an exact
    /// target names a package, so its parent directory is used.
    pub fn base_paths(&self) -> Vec<PathBuf> {
        let mut bases = Vec::new();
        for (_, targets) in &self.paths {
            for target in targets {
                let base = match target.find('*') {
                    Some(idx) => {
                        let fixed = &target[..idx];
                        let dir = fixed.rfind('/').map(|i| &fixed[..i]).unwrap_or("");
                        resolve(&self.base_url, dir)
                    }
                    None => {
                        let full = resolve(&self.base_url, target);
                        full.parent().map(Path::to_path_buf).unwrap_or(full)
                    }
                };
                if !bases.contains(&base) {
                    bases.push(base);
                }
            }
        }
        bases
    }
}

/// Match `specifier` against `pattern`, returning the captured wildcard text,
/// the length of the fixed prefix and whether the match was exact
fn match_pattern<'a>(pattern: &str, specifier: &'a str) -> Option<(&'a str, usize, bool)> {
    match pattern.split_once('*') {
        None => (pattern == specifier).then_some(("", pattern.len(), true)),
        Some((prefix, suffix)) => {
            if specifier.len() >= prefix.len() + suffix.len()
                && specifier.starts_with(prefix)
                && specifier.ends_with(suffix)
            {
                let captured = &specifier[prefix.len()..specifier.len() - suffix.len()];
                Some((captured, prefix.len(), false))
            } else {
                None
            }
        }
    }
}
