//! Per-site source modules.
//!
//! Each module owns one aggregator site's selector tables, slug conventions
//! and paths; the shared fetch/decode/rank layers do everything else. One
//! deployment serves one primary source (picked by config), so dispatch is a
//! plain name match with kuramanime as the default. The manga reader routes
//! always go to komiku regardless of the primary source.

pub mod anichin;
pub mod komiku;
pub mod kuramanime;

use crate::core::types::*;
use crate::core::AppState;
use crate::fetch::FetchError;

/// Static description of one upstream site.
#[derive(Debug, Clone, Copy)]
pub struct SourceProfile {
    pub name: &'static str,
    /// Ordered mirror list, tried first to last. Overridable per deployment
    /// via the `mirrors` map in animein.json.
    pub mirrors: &'static [&'static str],
    /// A fetched body must contain at least one of these substrings to count
    /// as real content; a block page served with HTTP 200 fails the check.
    pub markers: &'static [&'static str],
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no streaming servers on the episode page")]
    NoServers,
    #[error("source `{source}` does not serve {operation}")]
    Unsupported {
        source: String,
        operation: &'static str,
    },
}

/// Profile lookup by configured source name.
pub fn by_name(name: &str) -> Option<&'static SourceProfile> {
    match name {
        "kuramanime" => Some(&kuramanime::PROFILE),
        "anichin" => Some(&anichin::PROFILE),
        "komiku" => Some(&komiku::PROFILE),
        _ => None,
    }
}

pub async fn home(state: &AppState) -> Result<HomeResponse, SourceError> {
    match state.source.as_str() {
        "anichin" => anichin::home(state).await,
        "komiku" => komiku::home(state).await,
        _ => kuramanime::home(state).await,
    }
}

pub async fn search(
    state: &AppState,
    query: &str,
    page: u32,
) -> Result<SearchResponse, SourceError> {
    match state.source.as_str() {
        "anichin" => anichin::search(state, query, page).await,
        "komiku" => komiku::search(state, query, page).await,
        _ => kuramanime::search(state, query, page).await,
    }
}

pub async fn genres(state: &AppState) -> Result<GenresResponse, SourceError> {
    match state.source.as_str() {
        "anichin" => anichin::genres(state).await,
        "komiku" => Err(unsupported(state, "a genre index")),
        _ => kuramanime::genres(state).await,
    }
}

pub async fn detail(state: &AppState, slug: &str) -> Result<DetailResponse, SourceError> {
    match state.source.as_str() {
        "anichin" => anichin::detail(state, slug).await,
        "komiku" => Err(unsupported(state, "anime detail pages")),
        _ => kuramanime::detail(state, slug).await,
    }
}

pub async fn stream(state: &AppState, slug: &str) -> Result<StreamResponse, SourceError> {
    match state.source.as_str() {
        "anichin" => anichin::stream(state, slug).await,
        "komiku" => Err(unsupported(state, "streaming pages")),
        _ => kuramanime::stream(state, slug).await,
    }
}

pub async fn schedule(state: &AppState) -> Result<ScheduleResponse, SourceError> {
    match state.source.as_str() {
        "anichin" => anichin::schedule(state).await,
        "komiku" => Err(unsupported(state, "a release schedule")),
        _ => kuramanime::schedule(state).await,
    }
}

/// Manga reader. Always komiku, whatever the primary source.
pub async fn read(state: &AppState, slug: &str) -> Result<ReadResponse, SourceError> {
    komiku::read(state, slug).await
}

fn unsupported(state: &AppState, operation: &'static str) -> SourceError {
    SourceError::Unsupported {
        source: state.source.clone(),
        operation,
    }
}
