//! Format properties and the module formats they point at

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Manifest property holding the entry-point's type declarations
pub const TYPINGS_PROPERTY: &str = "typings";

/// Alternative spelling of [`TYPINGS_PROPERTY`] accepted when reading
pub const TYPES_PROPERTY: &str = "types";

/// A manifest property naming one compiled variant of an entry-point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatProperty {
    Fesm2015,
    Fesm5,
    Es2015,
    Esm2015,
    Esm5,
    Main,
    Module,
    Browser,
}

impl FormatProperty {
    /// Every supported property, in the default priority order
    pub const ALL: [FormatProperty; 8] = [
        FormatProperty::Fesm2015,
        FormatProperty::Fesm5,
        FormatProperty::Es2015,
        FormatProperty::Esm2015,
        FormatProperty::Esm5,
        FormatProperty::Main,
        FormatProperty::Module,
        FormatProperty::Browser,
    ];

    /// Manifest key for this property
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fesm2015 => "fesm2015",
            Self::Fesm5 => "fesm5",
            Self::Es2015 => "es2015",
            Self::Esm2015 => "esm2015",
            Self::Esm5 => "esm5",
            Self::Main => "main",
            Self::Module => "module",
            Self::Browser => "browser",
        }
    }

    /// Look up a property by manifest key
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Names of every supported property
    pub fn supported_names() -> Vec<&'static str> {
        Self::ALL.iter().map(|p| p.name()).collect()
    }

    /// Determine the module format of the file this property points at.
    ///
    /// `main` and `browser` are ambiguous and need the file contents.
    pub fn format(&self, contents: impl FnOnce() -> Option<String>) -> Option<EntryPointFormat> {
        match self {
            Self::Fesm2015 | Self::Es2015 | Self::Esm2015 => Some(EntryPointFormat::Esm2015),
            Self::Fesm5 | Self::Esm5 | Self::Module => Some(EntryPointFormat::Esm5),
            Self::Main | Self::Browser => contents().map(|source| sniff_format(&source)),
        }
    }
}

impl fmt::Display for FormatProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FormatProperty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown format property '{}'", s))
    }
}

/// Module system and language level of a compiled variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryPointFormat {
    Esm2015,
    Esm5,
    Umd,
    #[serde(rename = "commonjs")]
    CommonJs,
}

impl fmt::Display for EntryPointFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Esm2015 => "esm2015",
            Self::Esm5 => "esm5",
            Self::Umd => "umd",
            Self::CommonJs => "commonjs",
        };
        f.write_str(name)
    }
}

/// Tell UMD, CommonJS and plain ES module sources apart
pub fn sniff_format(source: &str) -> EntryPointFormat {
    static UMD: OnceLock<Regex> = OnceLock::new();
    static COMMONJS: OnceLock<Regex> = OnceLock::new();

    let umd = UMD.get_or_init(|| {
        Regex::new(r"typeof\s+define\s*===?\s*['\x22]function['\x22]|define\.amd")
            .expect("valid UMD pattern")
    });
    let commonjs = COMMONJS.get_or_init(|| {
        Regex::new(r"\brequire\s*\(|\bexports\.|\bmodule\.exports\b").expect("valid CommonJS pattern")
    });

    if umd.is_match(source) {
        EntryPointFormat::Umd
    } else if commonjs.is_match(source) {
        EntryPointFormat::CommonJs
    } else {
        EntryPointFormat::Esm5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_names() {
        for property in FormatProperty::ALL {
            assert_eq!(FormatProperty::from_name(property.name()), Some(property));
        }
        assert_eq!(FormatProperty::from_name("typings"), None);
        assert!("x1".parse::<FormatProperty>().is_err());
    }

    #[test]
    fn test_static_formats() {
        let no_contents = || None;
        assert_eq!(
            FormatProperty::Fesm2015.format(no_contents),
            Some(EntryPointFormat::Esm2015)
        );
        assert_eq!(
            FormatProperty::Module.format(no_contents),
            Some(EntryPointFormat::Esm5)
        );
        assert_eq!(FormatProperty::Main.format(no_contents), None);
    }

    #[test]
    fn test_sniff_umd() {
        let source = "(function (global, factory) {\n  typeof exports === 'object' ? factory(exports, require('dep')) :\n  typeof define === 'function' && define.amd ? define(['exports', 'dep'], factory) : factory();\n}(this, function (exports, dep) {}));";
        assert_eq!(sniff_format(source), EntryPointFormat::Umd);
    }

    #[test]
    fn test_sniff_commonjs() {
        let source = "var dep = require('dep');\nexports.value = dep.value;";
        assert_eq!(sniff_format(source), EntryPointFormat::CommonJs);
    }

    #[test]
    fn test_sniff_esm_fallback() {
        assert_eq!(
            sniff_format("import { x } from 'dep';\nexport { x };"),
            EntryPointFormat::Esm5
        );
    }
}
