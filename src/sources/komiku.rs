//! Komiku source module (manga).
//!
//! Serves the manga reader routes for every deployment and can be selected
//! as the primary source for a manga frontend. Listing cards are `.bge`
//! blocks, series pages live under `/manga/{slug}/`, chapter pages sit at
//! the site root with reader images inside `#Baca_Komik`.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use scraper::{ElementRef, Html, Selector};

use super::{SourceError, SourceProfile};
use crate::core::types::*;
use crate::core::AppState;
use crate::extract::{absolute_url, decode_slug, encode_slug, first_text, image_of, text_of};
use crate::fetch::fetch_source_page;

pub const PROFILE: SourceProfile = SourceProfile {
    name: "komiku",
    mirrors: &["https://komiku.org", "https://komiku.id"],
    markers: &["bge", "Baca_Komik", "daftarChapter"],
};

/// Series pages live under this prefix; chapter pages are root-level.
const SECTION: &str = "/manga/";

pub async fn home(state: &AppState) -> Result<HomeResponse, SourceError> {
    let page = fetch_source_page(state, &PROFILE, "/").await?;
    let (slider, mut popular, latest) = parse_home(&page.html);
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
    let path = if page > 1 {
        format!("/page/{}/?post_type=manga&s={}", page, encoded)
    } else {
        format!("/?post_type=manga&s={}", encoded)
    };
    let fetched = fetch_source_page(state, &PROFILE, &path).await?;
    Ok(SearchResponse {
        status: STATUS_SUCCESS.to_string(),
        results: parse_listing(&fetched.html),
    })
}

/// Chapter reader. The slug is the chapter page's root-level path.
pub async fn read(state: &AppState, slug: &str) -> Result<ReadResponse, SourceError> {
    let real_path = decode_slug(slug);
    let page =
        fetch_source_page(state, &PROFILE, &format!("/{}/", real_path.trim_matches('/'))).await?;
    Ok(ReadResponse {
        status: STATUS_SUCCESS.to_string(),
        data: parse_chapter(&page.html, &page.base),
    })
}

// ---------------------------------------------------------------------------
// Parsers
// ---------------------------------------------------------------------------

/// One `.bge` card: cover in `.bgei`, text block in `.kan`.
fn parse_manga_card(card: ElementRef<'_>) -> Option<ListingItem> {
    let link_sel = Selector::parse(".kan a").unwrap();
    let h3_sel = Selector::parse("h3").unwrap();
    let img_sel = Selector::parse(".bgei img, img").unwrap();
    let chapter_sel = Selector::parse(".new1 span:last-child").unwrap();
    let new1_sel = Selector::parse(".new1").unwrap();

    let link = card.select(&link_sel).next()?;
    let href = link.value().attr("href")?;

    let title = first_text(card, &h3_sel).unwrap_or_default();
    Some(ListingItem {
        title: if title.is_empty() {
            "No Title".to_string()
        } else {
            title
        },
        slug: encode_slug(href, SECTION),
        image: card.select(&img_sel).next().and_then(image_of).unwrap_or_default(),
        episode: first_text(card, &chapter_sel)
            .or_else(|| first_text(card, &new1_sel))
            .unwrap_or_else(|| "N/A".to_string()),
    })
}

/// Same card, kept with its blurb for the hero slider.
fn parse_slider_card(card: ElementRef<'_>) -> Option<SliderItem> {
    let p_sel = Selector::parse(".kan p").unwrap();
    let item = parse_manga_card(card)?;
    Some(SliderItem {
        title: item.title,
        image: item.image,
        slug: item.slug,
        desc: first_text(card, &p_sel).unwrap_or_default(),
    })
}

pub fn parse_home(html: &str) -> (Vec<SliderItem>, Vec<ListingItem>, Vec<ListingItem>) {
    let doc = Html::parse_document(html);
    let hot_sel = Selector::parse("#Komik_Hot_Manga .bge, #Komik_Hot .bge").unwrap();
    let new_sel = Selector::parse("#Terbaru .bge, #Rilisan_Terbaru .bge").unwrap();
    let card_sel = Selector::parse(".bge").unwrap();

    let hot: Vec<ElementRef> = doc.select(&hot_sel).collect();

    let popular: Vec<ListingItem> = hot
        .iter()
        .copied()
        .filter_map(parse_manga_card)
        .take(6)
        .collect();
    let slider: Vec<SliderItem> = hot
        .iter()
        .copied()
        .filter_map(parse_slider_card)
        .take(5)
        .collect();

    let mut latest: Vec<ListingItem> = doc
        .select(&new_sel)
        .filter_map(parse_manga_card)
        .take(12)
        .collect();
    if latest.is_empty() {
        latest = doc
            .select(&card_sel)
            .filter_map(parse_manga_card)
            .take(12)
            .collect();
    }

    (slider, popular, latest)
}

pub fn parse_listing(html: &str) -> Vec<ListingItem> {
    let doc = Html::parse_document(html);
    let card_sel = Selector::parse(".bge").unwrap();
    doc.select(&card_sel).filter_map(parse_manga_card).collect()
}

pub fn parse_chapter(html: &str, base: &str) -> ChapterData {
    let doc = Html::parse_document(html);
    let title_sel = Selector::parse("#Judul h1, h1").unwrap();
    let img_sel = Selector::parse("#Baca_Komik img").unwrap();
    let nav_sel = Selector::parse(".nxpr a").unwrap();

    let title = first_text(doc.root_element(), &title_sel)
        .unwrap_or_else(|| "No Title".to_string());

    // Reader pages lazy-load; the CDN URL may be relative on some mirrors.
    let images: Vec<String> = doc
        .select(&img_sel)
        .filter_map(image_of)
        .map(|src| absolute_url(base, &src))
        .collect();

    let nav_links: Vec<(String, String)> = doc
        .select(&nav_sel)
        .filter_map(|a| {
            let href = a.value().attr("href")?;
            Some((href.to_string(), text_of(a).to_lowercase()))
        })
        .collect();

    let mut prev_chapter = None;
    let mut next_chapter = None;
    for (href, label) in &nav_links {
        if prev_chapter.is_none()
            && (label.contains('❮') || label.contains("sebelum") || label.contains("prev"))
        {
            prev_chapter = Some(encode_slug(href, SECTION));
        } else if next_chapter.is_none()
            && (label.contains('❯') || label.contains("berikut") || label.contains("next"))
        {
            next_chapter = Some(encode_slug(href, SECTION));
        }
    }
    // Builds that render bare arrows as images: first link points back,
    // last points forward.
    if prev_chapter.is_none() && next_chapter.is_none() && nav_links.len() == 2 {
        prev_chapter = Some(encode_slug(&nav_links[0].0, SECTION));
        next_chapter = Some(encode_slug(&nav_links[1].0, SECTION));
    }

    ChapterData {
        title,
        images,
        prev_chapter,
        next_chapter,
    }
}
