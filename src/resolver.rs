//! Interlinear mode resolution for a passage column.
//!
//! Interlinear display needs Strong's numbers in every version involved;
//! the compare modes need every version in the same language. The resolver
//! keeps the stored state consistent with those rules when it is saved, and
//! projects the values the view should use from the column's detail level.

use crate::catalog::{VersionCatalog, VersionInfo};
use crate::error::PassageError;
use crate::interlinear::{INTERLINEAR_OPTIONS, InterlinearMode, InterlinearOption, no_interlinear_options};
use crate::passage::{ExtraVersions, PassageState, PassageUpdate};
use serde::Serialize;
use tracing::{debug, warn};

const PATH_ROOT: &str = "passage";

/// Which display-mode choices the options menu should offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DisplayModeAvailability {
    pub visible: bool,
    pub interlinear: bool,
    pub compare: bool,
}

impl DisplayModeAvailability {
    pub fn allows(&self, mode: InterlinearMode) -> bool {
        match mode {
            InterlinearMode::None => true,
            _ if !self.visible => false,
            InterlinearMode::Interlinear => self.interlinear,
            mode if mode.is_compare() => self.compare,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PassageResolver<'a> {
    catalog: &'a VersionCatalog,
}

impl<'a> PassageResolver<'a> {
    pub fn new(catalog: &'a VersionCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &'a VersionCatalog {
        self.catalog
    }

    fn lookup(&self, code: &str) -> Option<&'a VersionInfo> {
        let info = self.catalog.get(code);
        if info.is_none() {
            warn!(version = code, "missing version metadata, excluded from comparison");
        }
        info
    }

    /// True when the primary version or any comparison version lacks Strong's
    /// numbers. Versions missing from the catalog are not counted.
    pub fn has_strongless_version(&self, primary: &str, extra: &[String]) -> bool {
        std::iter::once(primary)
            .chain(extra.iter().map(String::as_str))
            .filter_map(|code| self.lookup(code))
            .any(|info| !info.has_strongs)
    }

    fn default_mode(has_strongless: bool) -> InterlinearMode {
        if has_strongless {
            InterlinearMode::Interleaved
        } else {
            InterlinearMode::Interlinear
        }
    }

    /// Resolves the interlinear mode and comparison versions to persist.
    ///
    /// `candidate_mode` may be an internal code or a display label; anything
    /// unrecognised falls back to the best default for the versions chosen.
    pub fn normalize_for_save(
        &self,
        primary: &str,
        candidate_mode: Option<&str>,
        candidate_extra: &ExtraVersions,
    ) -> (InterlinearMode, ExtraVersions) {
        if candidate_extra.is_empty() {
            return (InterlinearMode::None, ExtraVersions::default());
        }

        let has_strongless = self.has_strongless_version(primary, candidate_extra.as_slice());
        let default = Self::default_mode(has_strongless);

        let candidate = match candidate_mode.map(str::trim) {
            None | Some("") | Some("NONE") => return (default, candidate_extra.clone()),
            Some(candidate) => candidate,
        };

        let resolved = match InterlinearMode::resolve(candidate) {
            Some(mode) => mode,
            None => {
                debug!(candidate, fallback = %default, "unrecognised interlinear mode");
                default
            }
        };

        let resolved = if resolved == InterlinearMode::Interlinear && has_strongless {
            InterlinearMode::Interleaved
        } else {
            resolved
        };
        (resolved, candidate_extra.clone())
    }

    /// The mode the view should use, which depends on the detail level.
    pub fn effective_interlinear_mode(&self, state: &PassageState) -> InterlinearMode {
        let candidate = match state.detail_level {
            0 => return InterlinearMode::None,
            1 => InterlinearMode::Interlinear,
            _ => state.interlinear_mode,
        };
        self.normalize_for_save(&state.version, Some(candidate.code()), &state.extra_versions)
            .0
    }

    pub fn effective_extra_versions<'s>(&self, state: &'s PassageState) -> &'s [String] {
        if state.detail_level == 0 {
            return &[];
        }
        state.extra_versions.as_slice()
    }

    pub fn available_interlinear_options(
        &self,
        state: &PassageState,
    ) -> &'static [InterlinearOption] {
        let extra = self.effective_extra_versions(state);
        if extra.is_empty() {
            return &[];
        }
        if self.has_strongless_version(&state.version, extra) {
            no_interlinear_options()
        } else {
            &INTERLINEAR_OPTIONS
        }
    }

    pub fn display_mode_availability(&self, state: &PassageState) -> DisplayModeAvailability {
        let extra = self.effective_extra_versions(state);
        if extra.is_empty() {
            return DisplayModeAvailability::default();
        }

        let primary = self.lookup(&state.version);
        let extras: Vec<&VersionInfo> = extra.iter().filter_map(|code| self.lookup(code)).collect();
        let interlinear = primary.is_none_or(|info| info.has_strongs)
            && extras.iter().all(|info| info.has_strongs);
        let compare = primary.is_some_and(|primary| {
            extras
                .iter()
                .all(|info| info.language_code == primary.language_code)
        });

        DisplayModeAvailability {
            visible: true,
            interlinear,
            compare,
        }
    }

    /// Display label of the effective mode, or an empty string when none applies.
    pub fn localized_interlinear_mode(&self, state: &PassageState) -> &'static str {
        self.effective_interlinear_mode(state)
            .label()
            .unwrap_or_default()
    }

    /// Builds the `passage/...` location for a column from its effective values.
    ///
    /// A trailing `NONE` mode is dropped only from the last position, then any
    /// trailing empty segments are dropped.
    pub fn navigation_path(&self, state: &PassageState) -> String {
        let options = state
            .options
            .iter()
            .map(char::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let mut tokens = vec![
            PATH_ROOT.to_string(),
            state.passage_id.to_string(),
            state.detail_level.to_string(),
            state.version.clone(),
            state.reference.clone(),
            options,
            self.effective_extra_versions(state).join(","),
            self.effective_interlinear_mode(state).code().to_string(),
        ];

        let last = tokens.len() - 1;
        for index in (1..tokens.len()).rev() {
            let token = &tokens[index];
            if token.is_empty() || (index == last && token == InterlinearMode::None.code()) {
                tokens.pop();
            } else {
                break;
            }
        }
        tokens.join("/")
    }

    /// Rejects a mode that is present but is not one of the internal codes.
    pub fn validate(interlinear_mode: Option<&str>) -> Result<(), PassageError> {
        match interlinear_mode.map(str::trim) {
            None | Some("") => Ok(()),
            Some(code) if InterlinearMode::from_code(code).is_some() => Ok(()),
            Some(other) => Err(PassageError::invalid_option(other)),
        }
    }

    /// Applies a save request to `state`.
    ///
    /// Display labels are mapped to their codes before validation. The
    /// interlinear fields are renormalized only when the update carries one
    /// of them; an update without a mode reuses the stored one.
    pub fn apply_update(
        &self,
        state: &mut PassageState,
        update: PassageUpdate,
    ) -> Result<(), PassageError> {
        let candidate_mode = update.interlinear_mode.as_deref().map(|raw| {
            InterlinearMode::resolve(raw.trim())
                .map(|mode| mode.code().to_string())
                .unwrap_or_else(|| raw.to_string())
        });
        if let Err(err) = Self::validate(candidate_mode.as_deref()) {
            warn!(passage_id = state.passage_id, error = %err, "rejected passage save");
            return Err(err);
        }

        let touches_interlinear = update.touches_interlinear();
        let PassageUpdate {
            version,
            reference,
            extra_versions,
            interlinear_mode: _,
            detail_level,
            options,
            args,
            url_fragment,
            search_type,
            page_number,
            context,
            strong_highlights,
            order,
            search_tokens,
            time_took_total,
        } = update;

        if let Some(version) = version {
            state.version = version;
        }
        if let Some(reference) = reference {
            state.reference = reference;
        }
        if let Some(detail_level) = detail_level {
            state.detail_level = detail_level;
        }
        if let Some(options) = options {
            state.options = options;
        }
        if let Some(args) = args {
            state.args = args;
        }
        if let Some(url_fragment) = url_fragment {
            state.url_fragment = url_fragment;
        }
        if search_type.is_some() {
            state.search_type = search_type;
        }
        if page_number.is_some() {
            state.page_number = page_number;
        }
        if let Some(context) = context {
            state.context = context;
        }
        if strong_highlights.is_some() {
            state.strong_highlights = strong_highlights;
        }
        if order.is_some() {
            state.order = order;
        }
        if let Some(search_tokens) = search_tokens {
            state.search_tokens = search_tokens;
        }
        if time_took_total.is_some() {
            state.time_took_total = time_took_total;
        }

        if touches_interlinear {
            let extra = extra_versions.unwrap_or_else(|| state.extra_versions.clone());
            let candidate = match candidate_mode.as_deref() {
                Some(mode) if !mode.is_empty() && mode != InterlinearMode::None.code() => {
                    mode.to_string()
                }
                _ => state.interlinear_mode.code().to_string(),
            };
            let (mode, extra) = self.normalize_for_save(&state.version, Some(&candidate), &extra);
            state.interlinear_mode = mode;
            state.extra_versions = extra;
        }

        debug!(
            passage_id = state.passage_id,
            version = %state.version,
            reference = %state.reference,
            extra = %state.extra_versions,
            mode = %state.interlinear_mode,
            "saved passage"
        );
        Ok(())
    }
}
