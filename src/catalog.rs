use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Broad kind of a module in the version catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VersionCategory {
    Bible,
    Commentary,
    Other(String),
}

impl From<String> for VersionCategory {
    fn from(value: String) -> Self {
        match value.to_ascii_uppercase().as_str() {
            "BIBLE" => VersionCategory::Bible,
            "COMMENTARY" => VersionCategory::Commentary,
            _ => VersionCategory::Other(value),
        }
    }
}

impl From<VersionCategory> for String {
    fn from(value: VersionCategory) -> Self {
        value.to_string()
    }
}

impl fmt::Display for VersionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionCategory::Bible => write!(f, "BIBLE"),
            VersionCategory::Commentary => write!(f, "COMMENTARY"),
            VersionCategory::Other(other) => write!(f, "{other}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    #[serde(alias = "initials")]
    pub code: String,
    pub has_strongs: bool,
    pub language_code: String,
    pub category: VersionCategory,
}

impl VersionInfo {
    pub fn bible(code: &str, has_strongs: bool, language_code: &str) -> Self {
        Self {
            code: code.to_string(),
            has_strongs,
            language_code: language_code.to_string(),
            category: VersionCategory::Bible,
        }
    }

    pub fn commentary(code: &str, language_code: &str) -> Self {
        Self {
            code: code.to_string(),
            has_strongs: false,
            language_code: language_code.to_string(),
            category: VersionCategory::Commentary,
        }
    }

    pub fn is_bible(&self) -> bool {
        self.category == VersionCategory::Bible
    }
}

/// Read-only lookup of version metadata, keyed by uppercase version code.
#[derive(Debug, Clone, Default)]
pub struct VersionCatalog {
    versions: HashMap<String, VersionInfo>,
}

static BUILTIN: Lazy<VersionCatalog> = Lazy::new(|| {
    VersionCatalog::from_entries([
        VersionInfo::bible("KJV", true, "en"),
        VersionInfo::bible("ESV", true, "en"),
        VersionInfo::bible("NIV", false, "en"),
        VersionInfo::bible("NETfree", false, "en"),
        VersionInfo::bible("ASV", true, "en"),
        VersionInfo::bible("OSMHB", true, "he"),
        VersionInfo::bible("WLC", false, "he"),
        VersionInfo::bible("SBLG", true, "grc"),
        VersionInfo::bible("LXX", true, "grc"),
        VersionInfo::bible("Vulgate", false, "la"),
        VersionInfo::bible("LSG", false, "fr"),
        VersionInfo::commentary("MHCC", "en"),
        VersionInfo::commentary("Barnes", "en"),
    ])
});

impl VersionCatalog {
    pub fn from_entries(entries: impl IntoIterator<Item = VersionInfo>) -> Self {
        let versions = entries
            .into_iter()
            .map(|info| (info.code.to_uppercase(), info))
            .collect();
        Self { versions }
    }

    /// Parses a JSON array of version records.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<VersionInfo> = serde_json::from_str(json)?;
        Ok(Self::from_entries(entries))
    }

    /// A small catalog of commonly used modules, used when no catalog is configured.
    pub fn builtin() -> &'static VersionCatalog {
        &BUILTIN
    }

    pub fn get(&self, code: &str) -> Option<&VersionInfo> {
        self.versions.get(&code.to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
