use crate::error::SearchError;
use crate::passage::{DisplayOption, ExtraVersions, PassageUpdate, available_display_options};
use crate::url::{decode_component, parse_query_into_state, strip_debug};
use serde::{Deserialize, Serialize};

/// Kind of search the server ran, as reported in its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchType {
    Passage,
    Text,
    RelatedVerses,
    SubjectSimple,
    SubjectExtended,
    SubjectFull,
    SubjectRelated,
    OriginalMeaning,
    ExactForm,
    OriginalGreekForms,
    OriginalGreekRelated,
    OriginalHebrewExact,
    OriginalHebrewForms,
    OriginalHebrewRelated,
    #[serde(other)]
    Unknown,
}

/// Which display renders the results of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Passage,
    Text,
    Subject,
    Word,
}

impl SearchType {
    pub fn view_kind(self) -> Option<ViewKind> {
        match self {
            SearchType::Passage => Some(ViewKind::Passage),
            SearchType::Text | SearchType::RelatedVerses => Some(ViewKind::Text),
            SearchType::SubjectSimple
            | SearchType::SubjectExtended
            | SearchType::SubjectFull
            | SearchType::SubjectRelated => Some(ViewKind::Subject),
            SearchType::OriginalMeaning
            | SearchType::ExactForm
            | SearchType::OriginalGreekForms
            | SearchType::OriginalGreekRelated
            | SearchType::OriginalHebrewExact
            | SearchType::OriginalHebrewForms
            | SearchType::OriginalHebrewRelated => Some(ViewKind::Word),
            SearchType::Unknown => None,
        }
    }

    pub fn code(self) -> String {
        serde_json::to_value(self)
            .ok()
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| "UNKNOWN".to_string())
    }
}

/// Parameters sent to the search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub options: Option<String>,
    pub display: Option<String>,
    pub page: Option<String>,
    pub filter: Option<String>,
    pub sort: Option<String>,
    pub context: Option<String>,
}

impl SearchRequest {
    /// Turns a raw query string into a request. Recognised `key=value` tokens
    /// are extracted; without a `q` token the whole string is the query.
    pub fn from_query(raw: &str) -> Self {
        let fields = parse_query_into_state(raw);
        let query = fields.query.unwrap_or_else(|| raw.to_string());
        Self {
            query: decode_component(&strip_debug(&query)),
            options: fields.options,
            display: fields.display,
            page: fields.page,
            filter: fields.filter,
            sort: fields.sort,
            context: fields.context,
        }
    }

    /// Arguments in the positional order the endpoint expects.
    pub fn args(&self) -> [Option<&str>; 7] {
        [
            Some(self.query.as_str()),
            self.options.as_deref(),
            self.display.as_deref(),
            self.page.as_deref(),
            self.filter.as_deref(),
            self.sort.as_deref(),
            self.context.as_deref(),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchResponse {
    pub search_type: Option<SearchType>,
    pub time_took_total: Option<u64>,
    pub search_tokens: Vec<serde_json::Value>,
    pub master_version: Option<String>,
    pub extra_versions: Option<ExtraVersions>,
    pub reference: Option<String>,
    pub interlinear_mode: Option<String>,
    pub options: Option<String>,
    pub page_number: Option<u32>,
    pub value: Option<String>,
}

impl SearchResponse {
    pub fn from_json(json: &str) -> Result<Self, SearchError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Fields of the response that are merged into the passage column.
    pub fn to_update(&self) -> PassageUpdate {
        PassageUpdate {
            version: self.master_version.clone(),
            reference: self.reference.clone(),
            extra_versions: self.extra_versions.clone(),
            interlinear_mode: self.interlinear_mode.clone(),
            options: self.options.as_deref().map(|advertised| {
                available_display_options(advertised)
                    .into_iter()
                    .map(DisplayOption::initial)
                    .collect()
            }),
            search_type: self.search_type.map(SearchType::code),
            page_number: self.page_number,
            search_tokens: Some(self.search_tokens.clone()),
            time_took_total: self.time_took_total,
            ..PassageUpdate::default()
        }
    }
}

/// The remote search endpoint.
pub trait SearchClient {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_search_types() {
        assert_eq!(SearchType::Passage.view_kind(), Some(ViewKind::Passage));
        assert_eq!(SearchType::RelatedVerses.view_kind(), Some(ViewKind::Text));
        assert_eq!(SearchType::SubjectFull.view_kind(), Some(ViewKind::Subject));
        assert_eq!(SearchType::OriginalHebrewForms.view_kind(), Some(ViewKind::Word));
        assert_eq!(SearchType::Unknown.view_kind(), None);
        assert_eq!(SearchType::RelatedVerses.code(), "RELATED_VERSES");
    }

    #[test]
    fn decodes_response_and_builds_update() {
        let response = SearchResponse::from_json(
            r#"{
                "searchType": "PASSAGE",
                "timeTookTotal": 42,
                "searchTokens": [{"tokenType": "reference", "token": "Rom.1"}],
                "masterVersion": "ESV",
                "extraVersions": "KJV,NIV",
                "reference": "Rom 1",
                "interlinearMode": "INTERLEAVED",
                "options": "HVN",
                "value": "<div>...</div>"
            }"#,
        )
        .unwrap();
        assert_eq!(response.search_type, Some(SearchType::Passage));

        let update = response.to_update();
        assert_eq!(update.version.as_deref(), Some("ESV"));
        assert_eq!(update.extra_versions.unwrap().as_slice(), ["KJV", "NIV"]);
        assert_eq!(update.options, Some(vec!['H', 'V', 'N']));
        assert_eq!(update.search_type.as_deref(), Some("PASSAGE"));
        assert_eq!(update.time_took_total, Some(42));
    }

    #[test]
    fn unknown_search_type_is_tolerated() {
        let response = SearchResponse::from_json(r#"{"searchType": "MEANINGS"}"#).unwrap();
        assert_eq!(response.search_type, Some(SearchType::Unknown));
    }

    #[test]
    fn request_from_query_falls_back_to_whole_string() {
        let request = SearchRequest::from_query("q=text%3Dlove&sort=VOCABULARY&page=2");
        assert_eq!(request.query, "text=love");
        assert_eq!(request.sort.as_deref(), Some("VOCABULARY"));
        assert_eq!(request.page.as_deref(), Some("2"));

        let request = SearchRequest::from_query("reference=Gen.1|version=KJV&debug");
        assert_eq!(request.query, "reference=Gen.1|version=KJV");
        assert_eq!(request.options, None);
    }

    #[test]
    fn request_args_keep_positional_order() {
        let request = SearchRequest {
            query: "text=love".to_string(),
            display: Some("COLUMN".to_string()),
            context: Some("2".to_string()),
            ..SearchRequest::default()
        };
        assert_eq!(
            request.args(),
            [Some("text=love"), None, Some("COLUMN"), None, None, None, Some("2")]
        );
    }
}
