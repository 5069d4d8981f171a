//! Kuramanime source module (the default primary).
//!
//! Classic server-rendered portal: listing cards under `.product__item`,
//! series pages under `/anime/{id}/{name}`, episode pages carrying a base64
//! `select#changeServer` dropdown. The episode list on a detail page is
//! rendered by inline JS on some mirrors, so it is recovered by regexing
//! episode hrefs out of the raw document instead of selector-walking.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashSet};

use super::{SourceError, SourceProfile};
use crate::core::types::*;
use crate::core::AppState;
use crate::extract::{
    clean_title, decode_slug, encode_slug, first_text, image_of, text_of,
};
use crate::fetch::fetch_source_page;
use crate::rank::ServerCandidate;

pub const PROFILE: SourceProfile = SourceProfile {
    name: "kuramanime",
    mirrors: &[
        "https://v13.kuramanime.tel",
        "https://v12.kuramanime.tel",
        "https://kuramanime.boo",
    ],
    markers: &["product__item", "anime__details", "changeServer"],
};

/// Series and episode pages live under this prefix; slugs strip it.
const SECTION: &str = "/anime/";

pub async fn home(state: &AppState) -> Result<HomeResponse, SourceError> {
    let page = fetch_source_page(state, &PROFILE, "/").await?;
    let (slider, mut popular, latest) = parse_home(&page.html);

    // Some builds drop the filter gallery; fall back to the head of the
    // latest grid so the section is never empty.
    if popular.is_empty() {
        popular = latest.iter().take(5).cloned().collect();
    }

    Ok(HomeResponse {
        status: STATUS_SUCCESS.to_string(),
        slider,
        popular_today: popular,
        latest_release: latest,
    })
}

pub async fn search(
    state: &AppState,
    query: &str,
    page: u32,
) -> Result<SearchResponse, SourceError> {
    let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC).to_string();
    let path = format!(
        "/anime?search={}&order_by=latest&page={}",
        encoded,
        page.max(1)
    );
    let fetched = fetch_source_page(state, &PROFILE, &path).await?;
    Ok(SearchResponse {
        status: STATUS_SUCCESS.to_string(),
        results: parse_listing(&fetched.html),
    })
}

pub async fn genres(state: &AppState) -> Result<GenresResponse, SourceError> {
    let page = fetch_source_page(state, &PROFILE, "/properties/genre").await?;
    Ok(GenresResponse {
        status: STATUS_SUCCESS.to_string(),
        data: parse_genres(&page.html),
    })
}

pub async fn detail(state: &AppState, slug: &str) -> Result<DetailResponse, SourceError> {
    let real_path = decode_slug(slug);
    // Slugs look like "{id}/{name}"; the id anchors the episode-href hunt.
    let anime_id = real_path
        .split('/')
        .next()
        .unwrap_or(&real_path)
        .to_string();
    let page = fetch_source_page(state, &PROFILE, &format!("/anime/{}", real_path)).await?;
    Ok(DetailResponse {
        status: STATUS_SUCCESS.to_string(),
        data: parse_detail(&page.html, &anime_id),
    })
}

pub async fn stream(state: &AppState, slug: &str) -> Result<StreamResponse, SourceError> {
    let real_path = decode_slug(slug);
    let page = fetch_source_page(state, &PROFILE, &format!("/anime/{}", real_path)).await?;

    let (title, candidates, nav) = parse_stream(&page.html);
    let resolved = state
        .ranker
        .resolve(candidates)
        .ok_or(SourceError::NoServers)?;

    Ok(StreamResponse {
        status: STATUS_SUCCESS.to_string(),
        data: StreamData {
            title,
            streaming_url: resolved.streaming_url,
            server_used: resolved.server_used,
            is_embed: resolved.is_embed,
            qualities: resolved.qualities,
            nav,
        },
    })
}

pub async fn schedule(state: &AppState) -> Result<ScheduleResponse, SourceError> {
    let page = fetch_source_page(state, &PROFILE, "/quick/ongoing").await?;
    let animes: Vec<ListingItem> = parse_listing(&page.html).into_iter().take(15).collect();
    // The site has no per-day grid, just one ongoing block.
    Ok(ScheduleResponse {
        status: STATUS_SUCCESS.to_string(),
        data: vec![ScheduleDay {
            day: "Update Terbaru".to_string(),
            animes,
        }],
    })
}

// ---------------------------------------------------------------------------
// Parsers. Pure (&str in, data out) so fixtures exercise them directly.
// ---------------------------------------------------------------------------

/// One `.product__item` card.
fn parse_anime_card(card: ElementRef<'_>) -> Option<ListingItem> {
    let link_sel = Selector::parse("h5 a").unwrap();
    let pic_sel = Selector::parse(".product__item__pic").unwrap();
    let ep_sel = Selector::parse(".ep").unwrap();
    let li_sel = Selector::parse("ul li").unwrap();

    let link = card.select(&link_sel).next()?;
    let href = link.value().attr("href").unwrap_or("");

    let title = clean_title(&text_of(link));
    Some(ListingItem {
        title: if title.is_empty() {
            "No Title".to_string()
        } else {
            title
        },
        slug: encode_slug(href, SECTION),
        image: card.select(&pic_sel).next().and_then(image_of).unwrap_or_default(),
        episode: first_text(card, &ep_sel)
            .or_else(|| first_text(card, &li_sel))
            .unwrap_or_else(|| "N/A".to_string()),
    })
}

pub fn parse_home(html: &str) -> (Vec<SliderItem>, Vec<ListingItem>, Vec<ListingItem>) {
    let doc = Html::parse_document(html);
    let hero_sel = Selector::parse(".hero__items").unwrap();
    let h2_sel = Selector::parse("h2").unwrap();
    let p_sel = Selector::parse("p").unwrap();
    let a_sel = Selector::parse("a").unwrap();
    let popular_sel = Selector::parse(".filter__gallery .product__item").unwrap();
    let card_sel = Selector::parse(".product__item").unwrap();

    let mut slider = Vec::new();
    for item in doc.select(&hero_sel) {
        let Some(link) = item.select(&a_sel).next() else {
            continue;
        };
        slider.push(SliderItem {
            title: first_text(item, &h2_sel)
                .map(|t| clean_title(&t))
                .unwrap_or_default(),
            image: item.value().attr("data-setbg").unwrap_or("").to_string(),
            slug: link
                .value()
                .attr("href")
                .map(|h| encode_slug(h, SECTION))
                .unwrap_or_default(),
            desc: first_text(item, &p_sel).unwrap_or_default(),
        });
    }

    let popular: Vec<ListingItem> = doc
        .select(&popular_sel)
        .filter_map(parse_anime_card)
        .take(6)
        .collect();
    let latest: Vec<ListingItem> = doc
        .select(&card_sel)
        .filter_map(parse_anime_card)
        .take(12)
        .collect();

    (slider, popular, latest)
}

pub fn parse_listing(html: &str) -> Vec<ListingItem> {
    let doc = Html::parse_document(html);
    let card_sel = Selector::parse(".product__item").unwrap();
    doc.select(&card_sel).filter_map(parse_anime_card).collect()
}

pub fn parse_genres(html: &str) -> Vec<Genre> {
    let doc = Html::parse_document(html);
    let a_sel = Selector::parse(".genre__list a").unwrap();
    doc.select(&a_sel)
        .filter_map(|a| {
            let title = text_of(a);
            let href = a.value().attr("href")?.trim_end_matches('/');
            let slug = href.rsplit('/').next().unwrap_or_default().to_string();
            (!title.is_empty() && !slug.is_empty()).then_some(Genre { title, slug })
        })
        .collect()
}

pub fn parse_detail(html: &str, anime_id: &str) -> DetailData {
    let doc = Html::parse_document(html);
    let title_sel = Selector::parse(".anime__details__title h3").unwrap();
    let jp_sel = Selector::parse(".anime__details__title span").unwrap();
    let pic_sel = Selector::parse(".anime__details__pic").unwrap();
    let syn_sel = Selector::parse(".anime__details__text p").unwrap();
    let row_sel = Selector::parse(".anime__details__widget ul li").unwrap();
    let a_sel = Selector::parse("a").unwrap();
    let related_sel = Selector::parse(".anime__details__sidebar .product__item").unwrap();

    let root = doc.root_element();

    let mut genres = Vec::new();
    let mut metadata = BTreeMap::new();
    for row in doc.select(&row_sel) {
        let text = text_of(row);
        if text.to_lowercase().contains("genre") {
            genres = row
                .select(&a_sel)
                .map(text_of)
                .filter(|t| !t.is_empty())
                .collect();
        } else if let Some((key, value)) = text.split_once(':') {
            let key = key.trim().to_lowercase().replace(' ', "_");
            let value = value.trim().to_string();
            if !key.is_empty() && !value.is_empty() {
                metadata.insert(key, value);
            }
        }
    }

    DetailData {
        title: first_text(root, &title_sel)
            .map(|t| clean_title(&t))
            .unwrap_or_else(|| "No Title".to_string()),
        japanese_title: first_text(root, &jp_sel).unwrap_or_default(),
        image: doc.select(&pic_sel).next().and_then(image_of).unwrap_or_default(),
        synopsis: first_text(root, &syn_sel).unwrap_or_default(),
        genres,
        metadata,
        episodes: hunt_episodes(html, anime_id),
        related_anime: doc
            .select(&related_sel)
            .filter_map(parse_anime_card)
            .collect(),
    }
}

/// Recover the episode list by scanning raw hrefs for
/// `.../{anime_id}/{name}/episode/{n}`. Duplicates collapse (the page links
/// each episode several times); order is newest-first.
fn hunt_episodes(html: &str, anime_id: &str) -> Vec<EpisodeRef> {
    let pattern = format!(
        r#"href=["']([^"']*/{}/[^"']+/episode/(\d+))["']"#,
        regex::escape(anime_id)
    );
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut episodes: Vec<EpisodeRef> = Vec::new();
    for cap in re.captures_iter(html) {
        let link = cap[1].to_string();
        let Ok(number) = cap[2].parse::<u32>() else {
            continue;
        };
        if !seen.insert(link.clone()) {
            continue;
        }
        episodes.push(EpisodeRef {
            episode: format!("Episode {}", number),
            episode_number: number,
            slug: encode_slug(&link, SECTION),
        });
    }

    episodes.sort_by(|a, b| b.episode_number.cmp(&a.episode_number));
    episodes
}

pub fn parse_stream(html: &str) -> (String, Vec<ServerCandidate>, EpisodeNav) {
    let doc = Html::parse_document(html);
    let title_sel = Selector::parse(".anime__details__title h3").unwrap();
    let option_sel = Selector::parse("select#changeServer option").unwrap();
    let nav_sel = Selector::parse(r#"a[href*="/episode/"]"#).unwrap();

    let title = first_text(doc.root_element(), &title_sel)
        .map(|t| clean_title(&t))
        .unwrap_or_else(|| "Playing Video".to_string());

    let candidates = doc
        .select(&option_sel)
        .filter_map(|opt| {
            let raw = opt.value().attr("value")?.trim().to_string();
            if raw.is_empty() {
                return None;
            }
            Some(ServerCandidate {
                label: text_of(opt),
                raw,
            })
        })
        .collect();

    // Prev/next are plain episode links labeled in Indonesian.
    let mut nav = EpisodeNav::default();
    for a in doc.select(&nav_sel) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let label = text_of(a).to_lowercase();
        if nav.prev_slug.is_none() && (label.contains("sebelumnya") || label.contains("prev")) {
            nav.prev_slug = Some(encode_slug(href, SECTION));
        } else if nav.next_slug.is_none()
            && (label.contains("selanjutnya") || label.contains("next"))
        {
            nav.next_slug = Some(encode_slug(href, SECTION));
        }
    }

    (title, candidates, nav)
}
