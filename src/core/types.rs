use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One card in a listing grid (home sections, search results, schedule).
///
/// Field names are part of the public JSON contract consumed by the
/// frontends; do not rename without bumping the clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListingItem {
    pub title: String,
    pub slug: String,
    pub image: String,
    pub episode: String,
}

/// Hero-slider entry on the home page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SliderItem {
    pub title: String,
    pub image: String,
    pub slug: String,
    pub desc: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeResponse {
    pub status: String,
    pub slider: Vec<SliderItem>,
    pub popular_today: Vec<ListingItem>,
    pub latest_release: Vec<ListingItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub status: String,
    pub results: Vec<ListingItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub title: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenresResponse {
    pub status: String,
    pub data: Vec<Genre>,
}

/// Episode row recovered from a series detail page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeRef {
    /// Display label, e.g. "Episode 12" or "Chapter 45".
    pub episode: String,
    pub episode_number: u32,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailData {
    pub title: String,
    pub japanese_title: String,
    pub image: String,
    pub synopsis: String,
    pub genres: Vec<String>,
    /// Free-form key/value rows from the site's info widget
    /// (status, type, studio, score, ...). Keys are lowercased snake_case.
    pub metadata: BTreeMap<String, String>,
    pub episodes: Vec<EpisodeRef>,
    pub related_anime: Vec<ListingItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailResponse {
    pub status: String,
    pub data: DetailData,
}

/// One playable server option. The qualities list is ordered best-first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamQuality {
    pub quality: String,
    pub url: String,
}

/// Prev/next episode navigation. `null` means "no such episode".
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeNav {
    pub prev_slug: Option<String>,
    pub next_slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamData {
    pub title: String,
    pub streaming_url: String,
    pub server_used: String,
    /// True when `streaming_url` is an embed/iframe page rather than a
    /// direct media file; the player must sandbox it accordingly.
    pub is_embed: bool,
    pub qualities: Vec<StreamQuality>,
    pub nav: EpisodeNav,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamResponse {
    pub status: String,
    pub data: StreamData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDay {
    pub day: String,
    pub animes: Vec<ListingItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub status: String,
    pub data: Vec<ScheduleDay>,
}

/// Manga chapter reader payload. `prev_chapter`/`next_chapter` are `null`
/// at the ends of a series; the reader disables its nav buttons on `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterData {
    pub title: String,
    pub images: Vec<String>,
    pub prev_chapter: Option<String>,
    pub next_chapter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadResponse {
    pub status: String,
    pub data: ChapterData,
}

/// Uniform error body. Every failure, regardless of layer, is reported as
/// `{"status":"error","message":"..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: String,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

pub const STATUS_SUCCESS: &str = "success";
