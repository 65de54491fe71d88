use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Arrangement used when a passage is shown alongside comparison versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InterlinearMode {
    #[default]
    None,
    Interlinear,
    Interleaved,
    InterleavedCompare,
    Column,
    ColumnCompare,
}

impl InterlinearMode {
    pub const ALL: [InterlinearMode; 6] = [
        InterlinearMode::None,
        InterlinearMode::Interlinear,
        InterlinearMode::Interleaved,
        InterlinearMode::InterleavedCompare,
        InterlinearMode::Column,
        InterlinearMode::ColumnCompare,
    ];

    pub fn code(self) -> &'static str {
        match self {
            InterlinearMode::None => "NONE",
            InterlinearMode::Interlinear => "INTERLINEAR",
            InterlinearMode::Interleaved => "INTERLEAVED",
            InterlinearMode::InterleavedCompare => "INTERLEAVED_COMPARE",
            InterlinearMode::Column => "COLUMN",
            InterlinearMode::ColumnCompare => "COLUMN_COMPARE",
        }
    }

    /// Looks up a mode by its internal code only.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.code() == code)
    }

    /// Looks up a mode by display label first, then by internal code.
    pub fn resolve(candidate: &str) -> Option<Self> {
        INTERLINEAR_OPTIONS
            .iter()
            .find(|option| option.label == candidate)
            .map(|option| option.mode)
            .or_else(|| Self::from_code(candidate))
    }

    /// Whether the mode highlights differences between versions, which only
    /// makes sense when every version shares a language.
    pub fn is_compare(self) -> bool {
        matches!(
            self,
            InterlinearMode::InterleavedCompare | InterlinearMode::ColumnCompare
        )
    }

    pub fn label(self) -> Option<&'static str> {
        INTERLINEAR_OPTIONS
            .iter()
            .find(|option| option.mode == self)
            .map(|option| option.label)
    }
}

impl fmt::Display for InterlinearMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for InterlinearMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s).ok_or_else(|| format!("unknown interlinear mode {s:?}"))
    }
}

/// A selectable display mode together with its user-facing label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InterlinearOption {
    pub mode: InterlinearMode,
    pub label: &'static str,
}

/// Every mode that can be chosen once comparison versions are selected.
pub static INTERLINEAR_OPTIONS: [InterlinearOption; 5] = [
    InterlinearOption {
        mode: InterlinearMode::Interlinear,
        label: "Interlinear",
    },
    InterlinearOption {
        mode: InterlinearMode::Interleaved,
        label: "Interleaved",
    },
    InterlinearOption {
        mode: InterlinearMode::InterleavedCompare,
        label: "Interleaved with differences",
    },
    InterlinearOption {
        mode: InterlinearMode::Column,
        label: "Column",
    },
    InterlinearOption {
        mode: InterlinearMode::ColumnCompare,
        label: "Column with differences",
    },
];

/// The options offered when a version without Strong's numbers is involved.
pub fn no_interlinear_options() -> &'static [InterlinearOption] {
    &INTERLINEAR_OPTIONS[1..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_codes_and_labels() {
        assert_eq!(
            InterlinearMode::resolve("COLUMN_COMPARE"),
            Some(InterlinearMode::ColumnCompare)
        );
        assert_eq!(
            InterlinearMode::resolve("Interleaved with differences"),
            Some(InterlinearMode::InterleavedCompare)
        );
        assert_eq!(InterlinearMode::resolve("interlinear"), None);
        assert_eq!(InterlinearMode::from_code("Column"), None);
    }

    #[test]
    fn no_interlinear_subset_omits_interlinear() {
        let subset = no_interlinear_options();
        assert_eq!(subset.len(), 4);
        assert!(
            subset
                .iter()
                .all(|option| option.mode != InterlinearMode::Interlinear)
        );
    }

    #[test]
    fn serializes_as_code() {
        let json = serde_json::to_string(&InterlinearMode::InterleavedCompare).unwrap();
        assert_eq!(json, "\"INTERLEAVED_COMPARE\"");
        let mode: InterlinearMode = serde_json::from_str("\"COLUMN\"").unwrap();
        assert_eq!(mode, InterlinearMode::Column);
    }
}
