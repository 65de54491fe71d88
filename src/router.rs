//! Routing between the browser URL, the passage columns and the search endpoint.

use crate::catalog::VersionCatalog;
use crate::config::StepConfig;
use crate::error::{PassageError, SearchError};
use crate::history::{BookmarkHistory, BookmarkOutcome};
use crate::passage::{PassageState, PassageUpdate};
use crate::resolver::PassageResolver;
use crate::search::{SearchClient, SearchRequest, SearchResponse, ViewKind};
use crate::store::PassageStore;
use crate::url::{
    SearchUrlState, build_search_url, decode_component, preserve_versions, shareable_column_url,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Identifies one issued search so late responses can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket {
    pub passage_id: u32,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Applied {
        state: PassageState,
        view: Option<ViewKind>,
        bookmark: BookmarkOutcome,
    },
    /// A newer search for the same column was issued before this one completed.
    Discarded,
}

pub struct StepRouter<S> {
    catalog: Arc<VersionCatalog>,
    store: S,
    history: Mutex<BookmarkHistory>,
    generations: Mutex<HashMap<u32, u64>>,
    share_base_url: String,
    debug: bool,
}

impl<S: PassageStore> StepRouter<S> {
    pub fn new(catalog: Arc<VersionCatalog>, store: S, config: &StepConfig) -> Self {
        Self {
            catalog,
            store,
            history: Mutex::new(BookmarkHistory::new(config.history_capacity)),
            generations: Mutex::new(HashMap::new()),
            share_base_url: config.share_base_url.clone(),
            debug: config.debug,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &VersionCatalog {
        &self.catalog
    }

    pub fn resolver(&self) -> PassageResolver<'_> {
        PassageResolver::new(&self.catalog)
    }

    pub fn history(&self) -> &Mutex<BookmarkHistory> {
        &self.history
    }

    fn passage(&self, passage_id: u32) -> Result<PassageState, PassageError> {
        self.store
            .fetch(passage_id)
            .ok_or(PassageError::UnknownPassage(passage_id))
    }

    /// URL state for a column, using the presentation values of its display mode.
    pub fn url_state(&self, state: &PassageState, query: String) -> SearchUrlState {
        SearchUrlState {
            query,
            options: state.options_code(),
            display: self.resolver().effective_interlinear_mode(state).code().to_string(),
            page: state.page_number.map(|page| page.to_string()).unwrap_or_default(),
            context: state.context,
            filter: state.strong_highlights.clone().unwrap_or_default(),
            sort: state.order.clone().unwrap_or_default(),
            position: state.passage_id,
        }
    }

    /// Builds the URL for searching `args` in a column. Without `args` the
    /// column's last query is reused; given `args` are remembered, decoded.
    pub fn navigate_search(&self, passage_id: u32, args: Option<&str>) -> Result<String, PassageError> {
        let mut state = self.passage(passage_id)?;
        let query = match args {
            Some(args) if !args.trim().is_empty() => {
                state = self.store.save(
                    passage_id,
                    PassageUpdate {
                        args: Some(decode_component(args)),
                        ..PassageUpdate::default()
                    },
                )?;
                args.to_string()
            }
            _ => state.args.clone(),
        };
        let url = build_search_url(&self.url_state(&state, query), self.debug);
        debug!(passage_id, %url, "navigating");
        Ok(url)
    }

    /// Adds the column's versions to `partial` before navigating, so a new
    /// search keeps the versions currently on screen.
    pub fn navigate_preserve_versions(
        &self,
        passage_id: u32,
        partial: &str,
        strip_commentaries: bool,
    ) -> Result<String, PassageError> {
        let state = self.passage(passage_id)?;
        let resolver = self.resolver();
        let versions = std::iter::once(state.version.as_str()).chain(
            resolver
                .effective_extra_versions(&state)
                .iter()
                .map(String::as_str),
        );
        let args = preserve_versions(partial, versions, &self.catalog, strip_commentaries);
        self.navigate_search(passage_id, Some(&args))
    }

    pub fn shareable_url(&self, passage_id: Option<u32>) -> String {
        let fragment = passage_id
            .and_then(|id| self.store.fetch(id))
            .map(|state| state.url_fragment)
            .filter(|fragment| !fragment.is_empty());
        shareable_column_url(&self.share_base_url, fragment.as_deref())
    }

    /// Records a new search for a column, superseding any in flight.
    pub fn begin_search(&self, passage_id: u32) -> SearchTicket {
        let mut guard = self.generations.lock();
        let generation = guard.entry(passage_id).or_insert(0);
        *generation += 1;
        SearchTicket {
            passage_id,
            generation: *generation,
        }
    }

    /// Applies a search response to the column that issued it.
    ///
    /// The generation lock is held until the column is saved; `begin_search`
    /// waits on it.
    pub fn complete_search(
        &self,
        ticket: SearchTicket,
        args: &str,
        response: SearchResponse,
    ) -> Result<SearchOutcome, SearchError> {
        let generations = self.generations.lock();
        if generations.get(&ticket.passage_id) != Some(&ticket.generation) {
            drop(generations);
            warn!(
                passage_id = ticket.passage_id,
                generation = ticket.generation,
                "discarding stale search response"
            );
            return Ok(SearchOutcome::Discarded);
        }

        let mut update = response.to_update();
        update.args = Some(args.to_string());
        let state = self.store.save(ticket.passage_id, update)?;

        let fragment = build_search_url(&self.url_state(&state, args.to_string()), false);
        let state = self.store.save(
            ticket.passage_id,
            PassageUpdate {
                url_fragment: Some(fragment),
                ..PassageUpdate::default()
            },
        )?;
        drop(generations);

        let bookmark = self.history.lock().record(args, response.search_tokens);
        let view = response.search_type.and_then(|search_type| search_type.view_kind());
        info!(
            passage_id = ticket.passage_id,
            search_type = ?response.search_type,
            server_ms = response.time_took_total.unwrap_or(0),
            "search completed"
        );
        Ok(SearchOutcome::Applied {
            state,
            view,
            bookmark,
        })
    }

    /// Runs a search for a column and applies its result.
    pub fn do_master_search<C: SearchClient>(
        &self,
        client: &C,
        passage_id: u32,
        raw: &str,
    ) -> Result<SearchOutcome, SearchError> {
        self.passage(passage_id)?;
        let request = SearchRequest::from_query(raw);
        let ticket = self.begin_search(passage_id);
        debug!(passage_id, args = ?request.args(), "issuing search");
        let response = client.search(&request)?;
        let args = request.query.clone();
        self.complete_search(ticket, &args, response)
    }
}
