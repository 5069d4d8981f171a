//! Shared HTML extraction helpers.
//!
//! Source modules own their selector tables; what lives here is the plumbing
//! every parse needs: whitespace-normalized text, lazy-image attribute
//! resolution, URL absolutization, the slug codec and title cleanup.

pub mod decode;

use scraper::{ElementRef, Selector};

/// Whitespace-normalized text content of an element (all descendants).
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match under `scope`, if any and non-empty.
pub fn first_text(scope: ElementRef<'_>, sel: &Selector) -> Option<String> {
    scope
        .select(sel)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty())
}

/// Attribute of the first match under `scope`, if any and non-empty.
pub fn first_attr(scope: ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    scope
        .select(sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Image URL carried by an element, looking through the lazy-load attribute
/// variants the sites use (`data-setbg` hero divs, `data-src` lazy imgs).
pub fn image_of(el: ElementRef<'_>) -> Option<String> {
    for attr in ["data-setbg", "data-src", "data-lazy-src", "src"] {
        if let Some(v) = el.value().attr(attr) {
            let v = v.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }
    None
}

/// Resolve `href` against the mirror the page came from. Protocol-relative
/// and root-relative links both occur in the sites' markup.
pub fn absolute_url(base: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() {
        return String::new();
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    if let Some(rest) = href.strip_prefix("//") {
        return format!("https://{}", rest);
    }
    match url::Url::parse(base).and_then(|b| b.join(href)) {
        Ok(u) => u.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Derive a URL-safe slug from an href: take the URL path, strip the site's
/// section prefix once, then fold `/` into `__` so multi-segment paths
/// survive a single axum path parameter. [`decode_slug`] is the inverse.
///
/// Works on absolute hrefs from *any* mirror (only the path matters) and on
/// already-relative hrefs.
pub fn encode_slug(href: &str, section: &str) -> String {
    let href = href.trim();
    let path = match url::Url::parse(href) {
        Ok(u) => u.path().to_string(),
        // Relative href: drop any query/fragment by hand.
        Err(_) => href.split(['?', '#']).next().unwrap_or(href).to_string(),
    };
    let path = path.strip_prefix(section).unwrap_or(&path);
    path.trim_matches('/').replace('/', "__")
}

/// Unfold a slug produced by [`encode_slug`] back into a URL path (without
/// the section prefix).
pub fn decode_slug(slug: &str) -> String {
    slug.trim_matches('/').replace("__", "/")
}

/// First run of digits in `text`, parsed. Episode labels bury the number in
/// prose ("Episode 130 END").
pub fn first_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Marketing boilerplate the sites bolt onto titles. Checked as prefix and
/// suffix, ASCII case-insensitive, repeatedly until nothing more strips.
const TITLE_BOILERPLATE: &[&str] = &[
    "subtitle indonesia",
    "sub indo",
    "nonton anime",
    "streaming anime",
];

/// Strip site boilerplate from a scraped title and normalize whitespace.
pub fn clean_title(raw: &str) -> String {
    let mut title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    loop {
        let mut changed = false;
        for phrase in TITLE_BOILERPLATE {
            if let Some(head) = strip_suffix_ignore_case(&title, phrase) {
                title = head.trim_end_matches([' ', '-', ':', '|', '(']).to_string();
                changed = true;
                break;
            }
            if let Some(tail) = strip_prefix_ignore_case(&title, phrase) {
                title = tail.trim_start_matches([' ', '-', ':', '|']).to_string();
                changed = true;
                break;
            }
        }
        if !changed {
            return title;
        }
    }
}

// Byte-indexed strip with ASCII-case-insensitive compare. `to_lowercase()`
// can change byte length on non-ASCII titles, which breaks index math; this
// never re-encodes.
fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    if s.len() < suffix.len() {
        return None;
    }
    let split = s.len() - suffix.len();
    if !s.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = s.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() < prefix.len() || !s.is_char_boundary(prefix.len()) {
        return None;
    }
    let (head, tail) = s.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix).then_some(tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_text_of_normalizes_whitespace() {
        let doc = Html::parse_fragment("<div>  One\n  Piece   <b>1101</b>\t</div>");
        let sel = Selector::parse("div").unwrap();
        let el = doc.select(&sel).next().unwrap();
        assert_eq!(text_of(el), "One Piece 1101");
    }

    #[test]
    fn test_image_of_prefers_lazy_attributes() {
        let doc = Html::parse_fragment(
            r#"<img src="placeholder.gif" data-src="https://cdn.example/cover.jpg">"#,
        );
        let sel = Selector::parse("img").unwrap();
        let el = doc.select(&sel).next().unwrap();
        assert_eq!(image_of(el).unwrap(), "https://cdn.example/cover.jpg");
    }

    #[test]
    fn test_slug_round_trip() {
        let slug = encode_slug("https://v13.example.tel/anime/2710/one-piece", "/anime/");
        assert_eq!(slug, "2710__one-piece");
        assert_eq!(decode_slug(&slug), "2710/one-piece");
    }

    #[test]
    fn test_slug_handles_relative_hrefs_and_queries() {
        assert_eq!(
            encode_slug("/anime/2710/one-piece/episode/1101?theater=on", "/anime/"),
            "2710__one-piece__episode__1101"
        );
        assert_eq!(encode_slug("/renegade-immortal-episode-130/", "/anime/"), "renegade-immortal-episode-130");
    }

    #[test]
    fn test_slug_strips_path_from_any_mirror() {
        // The section prefix strips no matter which mirror served the href.
        assert_eq!(
            encode_slug("https://kuramanime.boo/anime/99/frieren", "/anime/"),
            "99__frieren"
        );
    }

    #[test]
    fn test_absolute_url_variants() {
        let base = "https://komiku.example";
        assert_eq!(
            absolute_url(base, "/manga/one-piece/"),
            "https://komiku.example/manga/one-piece/"
        );
        assert_eq!(
            absolute_url(base, "//img.komiku.example/p/1.jpg"),
            "https://img.komiku.example/p/1.jpg"
        );
        assert_eq!(
            absolute_url(base, "https://cdn.example/p/2.jpg"),
            "https://cdn.example/p/2.jpg"
        );
    }

    #[test]
    fn test_clean_title_strips_suffix_boilerplate() {
        assert_eq!(
            clean_title("Renegade Immortal Episode 130 Subtitle Indonesia"),
            "Renegade Immortal Episode 130"
        );
        assert_eq!(clean_title("One Piece Sub Indo"), "One Piece");
    }

    #[test]
    fn test_clean_title_strips_prefix_and_repeats() {
        assert_eq!(
            clean_title("Nonton Anime Frieren Sub Indo"),
            "Frieren"
        );
    }

    #[test]
    fn test_clean_title_leaves_clean_titles_alone() {
        assert_eq!(clean_title("Sousou no Frieren"), "Sousou no Frieren");
        // Non-ASCII survives untouched.
        assert_eq!(clean_title("葬送のフリーレン"), "葬送のフリーレン");
    }

    #[test]
    fn test_first_number_finds_embedded_digits() {
        assert_eq!(first_number("Episode 130 END"), Some(130));
        assert_eq!(first_number("1101"), Some(1101));
        assert_eq!(first_number("Movie"), None);
    }
}
