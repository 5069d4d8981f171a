//! Anichin source module (donghua portal, selectable alternate).
//!
//! WordPress anime theme: card grids are `article.bs` under `.listupd`,
//! series pages live under `/anime/{slug}/`, episode pages sit at the site
//! root with an `.eplister` episode list and a base64 `select.mirror` server
//! dropdown. Every title carries "Subtitle Indonesia" boilerplate.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use scraper::{ElementRef, Html, Selector};
use std::collections::{BTreeMap, HashSet};

use super::{SourceError, SourceProfile};
use crate::core::types::*;
use crate::core::AppState;
use crate::extract::{
    clean_title, decode_slug, encode_slug, first_attr, first_number, first_text, image_of,
    text_of,
};
use crate::fetch::fetch_source_page;
use crate::rank::ServerCandidate;

pub const PROFILE: SourceProfile = SourceProfile {
    name: "anichin",
    mirrors: &[
        "https://anichin.cafe",
        "https://anichin.top",
        "https://anichin.vip",
    ],
    markers: &["listupd", "bixbox", "eplister"],
};

/// Series pages live under this prefix; episode pages are root-level.
const SECTION: &str = "/anime/";

pub async fn home(state: &AppState) -> Result<HomeResponse, SourceError> {
    let page = fetch_source_page(state, &PROFILE, "/").await?;
    let (slider, popular, latest) = parse_home(&page.html);
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
    // WordPress paginates search under /page/{n}/.
    let path = if page > 1 {
        format!("/page/{}/?s={}", page, encoded)
    } else {
        format!("/?s={}", encoded)
    };
    let fetched = fetch_source_page(state, &PROFILE, &path).await?;
    Ok(SearchResponse {
        status: STATUS_SUCCESS.to_string(),
        results: parse_listing(&fetched.html),
    })
}

pub async fn genres(state: &AppState) -> Result<GenresResponse, SourceError> {
    let page = fetch_source_page(state, &PROFILE, "/genres/").await?;
    Ok(GenresResponse {
        status: STATUS_SUCCESS.to_string(),
        data: parse_genres(&page.html),
    })
}

pub async fn detail(state: &AppState, slug: &str) -> Result<DetailResponse, SourceError> {
    let real_path = decode_slug(slug);
    let page = fetch_source_page(state, &PROFILE, &format!("/anime/{}/", real_path)).await?;
    Ok(DetailResponse {
        status: STATUS_SUCCESS.to_string(),
        data: parse_detail(&page.html),
    })
}

pub async fn stream(state: &AppState, slug: &str) -> Result<StreamResponse, SourceError> {
    let real_path = decode_slug(slug);
    let page = fetch_source_page(state, &PROFILE, &format!("/{}/", real_path)).await?;

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
    let page =
        fetch_source_page(state, &PROFILE, "/anime/?status=ongoing&order=update").await?;
    let animes: Vec<ListingItem> = parse_listing(&page.html).into_iter().take(15).collect();
    Ok(ScheduleResponse {
        status: STATUS_SUCCESS.to_string(),
        data: vec![ScheduleDay {
            day: "Ongoing".to_string(),
            animes,
        }],
    })
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// One `article.bs` card.
fn parse_bs_card(card: ElementRef<'_>) -> Option<ListingItem> {
    let a_sel = Selector::parse("a").unwrap();
    let h2_sel = Selector::parse(".tt h2").unwrap();
    let tt_sel = Selector::parse(".tt").unwrap();
    let img_sel = Selector::parse("img").unwrap();
    let ep_sel = Selector::parse(".epx").unwrap();

    let link = card.select(&a_sel).next()?;
    let href = link.value().attr("href")?;

    let title = first_text(card, &h2_sel)
        .or_else(|| first_text(card, &tt_sel))
        .map(|t| clean_title(&t))
        .unwrap_or_default();

    Some(ListingItem {
        title: if title.is_empty() {
            "No Title".to_string()
        } else {
            title
        },
        slug: encode_slug(href, SECTION),
        image: card.select(&img_sel).next().and_then(image_of).unwrap_or_default(),
        episode: first_text(card, &ep_sel).unwrap_or_else(|| "N/A".to_string()),
    })
}

pub fn parse_home(html: &str) -> (Vec<SliderItem>, Vec<ListingItem>, Vec<ListingItem>) {
    let doc = Html::parse_document(html);
    let section_sel = Selector::parse(".bixbox").unwrap();
    let head_sel = Selector::parse(".releases h3, .releases h2").unwrap();
    let card_sel = Selector::parse(".listupd article.bs").unwrap();

    let mut popular: Vec<ListingItem> = Vec::new();
    let mut latest: Vec<ListingItem> = Vec::new();

    for section in doc.select(&section_sel) {
        let heading = section
            .select(&head_sel)
            .next()
            .map(text_of)
            .unwrap_or_default()
            .to_lowercase();
        let cards: Vec<ListingItem> =
            section.select(&card_sel).filter_map(parse_bs_card).collect();
        if cards.is_empty() {
            continue;
        }
        if popular.is_empty() && (heading.contains("popular") || heading.contains("populer")) {
            popular = cards;
        } else if latest.is_empty()
            && (heading.contains("terbaru")
                || heading.contains("latest")
                || heading.contains("update")
                || heading.contains("rilis"))
        {
            latest = cards;
        }
    }

    // Builds without labeled sections: the first grid on the page is the
    // latest-episode grid, and popular falls back to its head.
    if latest.is_empty() {
        latest = doc
            .select(&card_sel)
            .filter_map(parse_bs_card)
            .take(12)
            .collect();
    }
    if popular.is_empty() {
        popular = latest.iter().take(6).cloned().collect();
    }

    // No hero carousel on this theme; the slider is fed from the top
    // popular cards.
    let slider = popular
        .iter()
        .take(5)
        .map(|item| SliderItem {
            title: item.title.clone(),
            image: item.image.clone(),
            slug: item.slug.clone(),
            desc: String::new(),
        })
        .collect();

    (slider, popular, latest)
}

pub fn parse_listing(html: &str) -> Vec<ListingItem> {
    let doc = Html::parse_document(html);
    let card_sel = Selector::parse(".listupd article.bs").unwrap();
    doc.select(&card_sel).filter_map(parse_bs_card).collect()
}

pub fn parse_genres(html: &str) -> Vec<Genre> {
    let doc = Html::parse_document(html);
    let a_sel = Selector::parse("ul.genre li a").unwrap();
    doc.select(&a_sel)
        .filter_map(|a| {
            let href = a.value().attr("href")?.trim_end_matches('/');
            let slug = href.rsplit('/').next()?.to_string();
            // Labels carry a series count ("Action (132)"); drop it.
            let mut title = text_of(a);
            if let Some(idx) = title.rfind('(') {
                title.truncate(idx);
            }
            let title = title.trim().to_string();
            (!title.is_empty() && !slug.is_empty()).then_some(Genre { title, slug })
        })
        .collect()
}

pub fn parse_detail(html: &str) -> DetailData {
    let doc = Html::parse_document(html);
    let title_sel = Selector::parse("h1.entry-title").unwrap();
    let alter_sel = Selector::parse(".alter").unwrap();
    let thumb_sel = Selector::parse(".thumb img, .thumbook img").unwrap();
    let syn_sel = Selector::parse(".synp .entry-content p, .entry-content p").unwrap();
    let row_sel = Selector::parse(".info-content .spe span, .spe span").unwrap();
    let genre_sel = Selector::parse(".genxed a").unwrap();
    let ep_li_sel = Selector::parse(".eplister ul li").unwrap();
    let a_sel = Selector::parse("a").unwrap();
    let num_sel = Selector::parse(".epl-num").unwrap();
    let related_sel = Selector::parse(".listupd article.bs").unwrap();

    let root = doc.root_element();

    let mut metadata = BTreeMap::new();
    for row in doc.select(&row_sel) {
        let text = text_of(row);
        if let Some((key, value)) = text.split_once(':') {
            let key = key.trim().to_lowercase().replace(' ', "_");
            let value = value.trim().to_string();
            if !key.is_empty() && !value.is_empty() {
                metadata.entry(key).or_insert(value);
            }
        }
    }

    let genres: Vec<String> = doc
        .select(&genre_sel)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect();

    let mut seen = HashSet::new();
    let mut episodes: Vec<EpisodeRef> = Vec::new();
    for li in doc.select(&ep_li_sel) {
        let Some(a) = li.select(&a_sel).next() else {
            continue;
        };
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let Some(number) = first_text(li, &num_sel).and_then(|t| first_number(&t)) else {
            continue;
        };
        let slug = encode_slug(href, SECTION);
        if !seen.insert(slug.clone()) {
            continue;
        }
        episodes.push(EpisodeRef {
            episode: format!("Episode {}", number),
            episode_number: number,
            slug,
        });
    }
    episodes.sort_by(|a, b| b.episode_number.cmp(&a.episode_number));

    DetailData {
        title: first_text(root, &title_sel)
            .map(|t| clean_title(&t))
            .unwrap_or_else(|| "No Title".to_string()),
        japanese_title: first_text(root, &alter_sel).unwrap_or_default(),
        image: doc.select(&thumb_sel).next().and_then(image_of).unwrap_or_default(),
        synopsis: first_text(root, &syn_sel).unwrap_or_default(),
        genres,
        metadata,
        episodes,
        related_anime: doc
            .select(&related_sel)
            .filter_map(parse_bs_card)
            .collect(),
    }
}

pub fn parse_stream(html: &str) -> (String, Vec<ServerCandidate>, EpisodeNav) {
    let doc = Html::parse_document(html);
    let title_sel = Selector::parse("h1.entry-title").unwrap();
    let option_sel = Selector::parse("select.mirror option").unwrap();
    let prev_sel = Selector::parse(r#"a[rel="prev"]"#).unwrap();
    let next_sel = Selector::parse(r#"a[rel="next"]"#).unwrap();

    let root = doc.root_element();
    let title = first_text(root, &title_sel)
        .map(|t| clean_title(&t))
        .unwrap_or_else(|| "Playing Video".to_string());

    // The first option is a "Select server" placeholder with no value.
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

    let nav = EpisodeNav {
        prev_slug: first_attr(root, &prev_sel, "href").map(|h| encode_slug(&h, SECTION)),
        next_slug: first_attr(root, &next_sel, "href").map(|h| encode_slug(&h, SECTION)),
    };

    (title, candidates, nav)
}
