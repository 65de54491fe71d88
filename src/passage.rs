use crate::interlinear::InterlinearMode;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const DEFAULT_VERSION: &str = "KJV";
pub const DEFAULT_REFERENCE: &str = "Mat 1";

/// Comparison versions shown next to the primary version, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ExtraVersions(Vec<String>);

impl ExtraVersions {
    /// Splits a comma-joined list, dropping empty entries.
    pub fn parse(joined: &str) -> Self {
        Self(
            joined
                .split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl fmt::Display for ExtraVersions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl<'de> Deserialize<'de> for ExtraVersions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Stored {
            Joined(String),
            List(Vec<String>),
        }

        Ok(match Stored::deserialize(deserializer)? {
            Stored::Joined(joined) => ExtraVersions::parse(&joined),
            Stored::List(list) => ExtraVersions(list),
        })
    }
}

/// Single-letter toggles offered by the passage display options menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayOption {
    Headings,
    VerseNumbers,
    SeparateLines,
    RedLetter,
    Notes,
    EnglishVocab,
    GreekVocab,
    DivideHebrew,
    GreekAccents,
    HebrewVowels,
    HebrewPointing,
    Transliteration,
    Grammar,
    GrammarColor,
}

impl DisplayOption {
    pub const ALL: [DisplayOption; 14] = [
        DisplayOption::Headings,
        DisplayOption::VerseNumbers,
        DisplayOption::SeparateLines,
        DisplayOption::RedLetter,
        DisplayOption::Notes,
        DisplayOption::EnglishVocab,
        DisplayOption::GreekVocab,
        DisplayOption::DivideHebrew,
        DisplayOption::GreekAccents,
        DisplayOption::HebrewVowels,
        DisplayOption::HebrewPointing,
        DisplayOption::Transliteration,
        DisplayOption::Grammar,
        DisplayOption::GrammarColor,
    ];

    pub fn initial(self) -> char {
        match self {
            DisplayOption::Headings => 'H',
            DisplayOption::VerseNumbers => 'V',
            DisplayOption::SeparateLines => 'L',
            DisplayOption::RedLetter => 'R',
            DisplayOption::Notes => 'N',
            DisplayOption::EnglishVocab => 'E',
            DisplayOption::GreekVocab => 'A',
            DisplayOption::DivideHebrew => 'D',
            DisplayOption::GreekAccents => 'G',
            DisplayOption::HebrewVowels => 'U',
            DisplayOption::HebrewPointing => 'P',
            DisplayOption::Transliteration => 'T',
            DisplayOption::Grammar => 'M',
            DisplayOption::GrammarColor => 'C',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DisplayOption::Headings => "Headings",
            DisplayOption::VerseNumbers => "Verse numbers",
            DisplayOption::SeparateLines => "Each verse on a new line",
            DisplayOption::RedLetter => "Words of Jesus in red",
            DisplayOption::Notes => "Notes and cross-references",
            DisplayOption::EnglishVocab => "English vocabulary",
            DisplayOption::GreekVocab => "Greek/Hebrew vocabulary",
            DisplayOption::DivideHebrew => "Divide Hebrew words",
            DisplayOption::GreekAccents => "Greek accents",
            DisplayOption::HebrewVowels => "Hebrew vowels",
            DisplayOption::HebrewPointing => "Hebrew pointing",
            DisplayOption::Transliteration => "Transliteration",
            DisplayOption::Grammar => "Grammar",
            DisplayOption::GrammarColor => "Colour-coded grammar",
        }
    }

    pub fn from_initial(initial: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|option| option.initial() == initial.to_ascii_uppercase())
    }
}

/// Filters the option catalog down to the letters advertised by a passage response.
pub fn available_display_options(advertised: &str) -> Vec<DisplayOption> {
    DisplayOption::ALL
        .into_iter()
        .filter(|option| advertised.contains(option.initial()))
        .collect()
}

/// Configuration and navigation state of one passage column.
///
/// `interlinear_mode` and `extra_versions` are the stored values; the
/// presentation values depend on `detail_level` and are computed by
/// [`crate::resolver::PassageResolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PassageState {
    pub passage_id: u32,
    pub version: String,
    pub reference: String,
    pub extra_versions: ExtraVersions,
    pub interlinear_mode: InterlinearMode,
    pub detail_level: u8,
    pub options: Vec<char>,

    pub args: String,
    pub url_fragment: String,
    pub search_type: Option<String>,
    pub page_number: Option<u32>,
    pub context: u32,
    pub strong_highlights: Option<String>,
    pub order: Option<String>,
    pub search_tokens: Vec<serde_json::Value>,
    pub time_took_total: Option<u64>,
}

impl Default for PassageState {
    fn default() -> Self {
        Self {
            passage_id: 0,
            version: DEFAULT_VERSION.to_string(),
            reference: DEFAULT_REFERENCE.to_string(),
            extra_versions: ExtraVersions::default(),
            interlinear_mode: InterlinearMode::None,
            detail_level: 0,
            options: Vec::new(),
            args: String::new(),
            url_fragment: String::new(),
            search_type: None,
            page_number: None,
            context: 0,
            strong_highlights: None,
            order: None,
            search_tokens: Vec::new(),
            time_took_total: None,
        }
    }
}

impl PassageState {
    pub fn new(passage_id: u32) -> Self {
        Self {
            passage_id,
            ..Self::default()
        }
    }

    pub fn options_code(&self) -> String {
        self.options.iter().collect()
    }
}

/// A partial save request. Absent fields are left untouched.
///
/// `interlinear_mode` stays a raw string because callers may send either the
/// internal code or a display label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PassageUpdate {
    pub version: Option<String>,
    pub reference: Option<String>,
    pub extra_versions: Option<ExtraVersions>,
    pub interlinear_mode: Option<String>,
    pub detail_level: Option<u8>,
    pub options: Option<Vec<char>>,
    pub args: Option<String>,
    pub url_fragment: Option<String>,
    pub search_type: Option<String>,
    pub page_number: Option<u32>,
    pub context: Option<u32>,
    pub strong_highlights: Option<String>,
    pub order: Option<String>,
    pub search_tokens: Option<Vec<serde_json::Value>>,
    pub time_took_total: Option<u64>,
}

impl PassageUpdate {
    pub fn touches_interlinear(&self) -> bool {
        self.version.is_some() || self.interlinear_mode.is_some() || self.extra_versions.is_some()
    }
}
