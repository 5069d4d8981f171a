//! Parser tests against embedded page fixtures, one block per source.
//!
//! Fixtures are trimmed-down copies of the real page structures: same
//! classes, same nesting, fake hosts.

use animein_api::rank::Ranker;
use animein_api::sources::{anichin, komiku, kuramanime};
use base64::Engine;

fn b64(text: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(text)
}

// ---------------------------------------------------------------------------
// kuramanime
// ---------------------------------------------------------------------------

const KURAMA_HOME: &str = r#"
<html><body>
<section class="hero">
  <div class="hero__items set-bg" data-setbg="https://cdn.kurama.example/slide/frieren.jpg">
    <div class="hero__text">
      <h2>Sousou no Frieren</h2>
      <p>Penyihir Frieren memulai perjalanan untuk mengenal manusia.</p>
      <a href="https://v13.kurama.example/anime/2510/sousou-no-frieren">Tonton</a>
    </div>
  </div>
</section>
<div class="filter__gallery">
  <div class="product__item">
    <div class="product__item__pic set-bg" data-setbg="https://cdn.kurama.example/cover/one-piece.jpg">
      <div class="ep">Ep 1101</div>
    </div>
    <div class="product__item__text">
      <h5><a href="/anime/2710/one-piece">One Piece</a></h5>
    </div>
  </div>
  <div class="product__item">
    <div class="product__item__pic set-bg" data-setbg="https://cdn.kurama.example/cover/frieren.jpg">
      <div class="ep">Ep 28</div>
    </div>
    <div class="product__item__text">
      <h5><a href="/anime/2510/sousou-no-frieren">Sousou no Frieren</a></h5>
    </div>
  </div>
</div>
<div class="product__page">
  <div class="product__item">
    <div class="product__item__pic set-bg" data-setbg="https://cdn.kurama.example/cover/kaiju.jpg">
      <div class="ep">Ep 10</div>
    </div>
    <div class="product__item__text">
      <h5><a href="/anime/2890/kaijuu-8-gou">Kaijuu 8-gou</a></h5>
    </div>
  </div>
</div>
</body></html>
"#;

#[test]
fn kuramanime_home_sections() {
    let (slider, popular, latest) = kuramanime::parse_home(KURAMA_HOME);

    assert_eq!(slider.len(), 1);
    assert_eq!(slider[0].title, "Sousou no Frieren");
    assert_eq!(slider[0].slug, "2510__sousou-no-frieren");
    assert!(slider[0].image.ends_with("frieren.jpg"));
    assert!(slider[0].desc.contains("Penyihir"));

    // The filter gallery feeds "popular"; the global card scan feeds
    // "latest" and includes the gallery cards too.
    assert_eq!(popular.len(), 2);
    assert_eq!(popular[0].title, "One Piece");
    assert_eq!(popular[0].slug, "2710__one-piece");
    assert_eq!(popular[0].episode, "Ep 1101");

    assert_eq!(latest.len(), 3);
    assert_eq!(latest[2].title, "Kaijuu 8-gou");
}

#[test]
fn kuramanime_listing_card_defaults() {
    // A card with no episode badge and no image degrades to placeholders.
    let html = r#"
    <div class="product__item">
      <div class="product__item__text">
        <h5><a href="/anime/3001/yofukashi-no-uta">Yofukashi no Uta</a></h5>
      </div>
    </div>"#;
    let items = kuramanime::parse_listing(html);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].episode, "N/A");
    assert_eq!(items[0].image, "");
}

#[test]
fn kuramanime_genres() {
    let html = r#"
    <div class="genre__list">
      <a href="https://v13.kurama.example/properties/genre/action">Action</a>
      <a href="https://v13.kurama.example/properties/genre/slice-of-life">Slice of Life</a>
    </div>"#;
    let genres = kuramanime::parse_genres(html);
    assert_eq!(genres.len(), 2);
    assert_eq!(genres[0].title, "Action");
    assert_eq!(genres[0].slug, "action");
    assert_eq!(genres[1].slug, "slice-of-life");
}

const KURAMA_DETAIL: &str = r#"
<html><body>
<div class="anime__details__pic set-bg" data-setbg="https://cdn.kurama.example/poster/one-piece.jpg"></div>
<div class="anime__details__title">
  <h3>One Piece</h3>
  <span>ワンピース</span>
</div>
<div class="anime__details__text">
  <p>Monkey D. Luffy berlayar mencari harta karun legendaris.</p>
</div>
<div class="anime__details__widget">
  <ul>
    <li><span>Tipe:</span> TV</li>
    <li><span>Status:</span> Sedang Tayang</li>
    <li><span>Skor:</span> 8.7</li>
    <li><span>Genre:</span> <a href="/properties/genre/action">Action</a>, <a href="/properties/genre/adventure">Adventure</a></li>
  </ul>
</div>
<div class="anime__details__episodes">
  <a href="https://v13.kurama.example/anime/2710/one-piece/episode/1101">Ep 1101</a>
  <a href="https://v13.kurama.example/anime/2710/one-piece/episode/1100">Ep 1100</a>
  <a href="/anime/2710/one-piece/episode/1101">Ep 1101 (mirror link)</a>
</div>
<div class="anime__details__sidebar">
  <div class="product__item">
    <div class="product__item__pic set-bg" data-setbg="https://cdn.kurama.example/cover/frieren.jpg">
      <div class="ep">Ep 28</div>
    </div>
    <h5><a href="/anime/2510/sousou-no-frieren">Sousou no Frieren</a></h5>
  </div>
</div>
</body></html>
"#;

#[test]
fn kuramanime_detail_fields() {
    let data = kuramanime::parse_detail(KURAMA_DETAIL, "2710");

    assert_eq!(data.title, "One Piece");
    assert_eq!(data.japanese_title, "ワンピース");
    assert!(data.image.ends_with("one-piece.jpg"));
    assert!(data.synopsis.starts_with("Monkey D. Luffy"));

    assert_eq!(data.genres, vec!["Action", "Adventure"]);
    assert_eq!(data.metadata.get("tipe").map(String::as_str), Some("TV"));
    assert_eq!(
        data.metadata.get("status").map(String::as_str),
        Some("Sedang Tayang")
    );
    assert_eq!(data.metadata.get("skor").map(String::as_str), Some("8.7"));
    // The genre row lands in `genres`, not `metadata`.
    assert!(!data.metadata.contains_key("genre"));

    assert_eq!(data.related_anime.len(), 1);
    assert_eq!(data.related_anime[0].slug, "2510__sousou-no-frieren");
}

#[test]
fn kuramanime_detail_episode_hunt_dedupes_and_sorts() {
    let data = kuramanime::parse_detail(KURAMA_DETAIL, "2710");

    // Dedupe is by href: the absolute and relative 1101 links are distinct
    // hrefs, so both survive, normalized to the same slug.
    let numbers: Vec<u32> = data.episodes.iter().map(|e| e.episode_number).collect();
    assert_eq!(numbers, vec![1101, 1101, 1100]);

    let slugs: Vec<&str> = data.episodes.iter().map(|e| e.slug.as_str()).collect();
    assert!(slugs.contains(&"2710__one-piece__episode__1100"));
    assert_eq!(data.episodes[0].episode, "Episode 1101");
}

#[test]
fn kuramanime_stream_servers_and_nav() {
    let vip = b64(r#"<iframe src="https://kuramadrive.example/embed/op1101" allowfullscreen></iframe>"#);
    let cdn = b64("https://cdn.kurama.example/op/1101/720.mp4");
    let html = format!(
        r#"
    <div class="anime__details__title">
      <h3>One Piece Episode 1101 Subtitle Indonesia</h3>
    </div>
    <select id="changeServer" class="form-select">
      <option value="">Pilih Server</option>
      <option value="{vip}">Kuramadrive 1080p</option>
      <option value="{cdn}">Mirror 720p</option>
      <option value="https://dood.example/e/op1101">dood 480p</option>
    </select>
    <div class="anime__navigation">
      <a href="/anime/2710/one-piece/episode/1100">Episode Sebelumnya</a>
      <a href="/anime/2710/one-piece/episode/1102">Episode Selanjutnya</a>
    </div>"#
    );

    let (title, candidates, nav) = kuramanime::parse_stream(&html);

    assert_eq!(title, "One Piece Episode 1101");
    // The empty placeholder option is skipped.
    assert_eq!(candidates.len(), 3);
    assert_eq!(candidates[0].label, "Kuramadrive 1080p");

    assert_eq!(
        nav.prev_slug.as_deref(),
        Some("2710__one-piece__episode__1100")
    );
    assert_eq!(
        nav.next_slug.as_deref(),
        Some("2710__one-piece__episode__1102")
    );

    // End to end through the ranker: the .mp4 mirror plays natively even
    // though the 1080p embed ranks first; dood is dropped from qualities.
    let resolved = Ranker::default().resolve(candidates).expect("servers");
    assert!(!resolved.is_embed);
    assert_eq!(resolved.server_used, "Mirror 720p");
    assert!(resolved.streaming_url.ends_with("720.mp4"));
    assert_eq!(resolved.qualities[0].quality, "Kuramadrive 1080p");
    assert!(resolved
        .qualities
        .iter()
        .all(|q| !q.quality.contains("dood")));
}

#[test]
fn kuramanime_stream_empty_dropdown_means_no_servers() {
    let html = r#"
    <div class="anime__details__title"><h3>Movie Special</h3></div>
    <select id="changeServer"><option value="">Pilih Server</option></select>"#;
    let (_, candidates, _) = kuramanime::parse_stream(html);
    assert!(candidates.is_empty());
    assert!(Ranker::default().resolve(candidates).is_none());
}

// ---------------------------------------------------------------------------
// anichin
// ---------------------------------------------------------------------------

const ANICHIN_HOME: &str = r#"
<html><body>
<div class="bixbox">
  <div class="releases"><h3>Popular Today</h3></div>
  <div class="listupd">
    <article class="bs">
      <div class="bsx">
        <a href="https://anichin.example/anime/renegade-immortal/" title="Renegade Immortal">
          <div class="limit"><img src="https://cdn.anichin.example/ri.jpg" alt="Renegade Immortal"></div>
          <div class="tt">Renegade Immortal Subtitle Indonesia<h2>Renegade Immortal</h2></div>
        </a>
        <div class="bt"><span class="epx">Episode 130</span></div>
      </div>
    </article>
  </div>
</div>
<div class="bixbox">
  <div class="releases"><h3>Rilisan Terbaru</h3></div>
  <div class="listupd">
    <article class="bs">
      <div class="bsx">
        <a href="https://anichin.example/soul-land-2-episode-48-subtitle-indonesia/">
          <div class="limit"><img data-src="https://cdn.anichin.example/sl2.jpg" src="data:image/gif;base64,R0lGOD"></div>
          <div class="tt">Soul Land 2 Episode 48 Subtitle Indonesia<h2>Soul Land 2 Episode 48 Subtitle Indonesia</h2></div>
        </a>
        <div class="bt"><span class="epx">Episode 48</span></div>
      </div>
    </article>
    <article class="bs">
      <div class="bsx">
        <a href="https://anichin.example/perfect-world-episode-160-subtitle-indonesia/">
          <div class="limit"><img src="https://cdn.anichin.example/pw.jpg"></div>
          <div class="tt">Perfect World Episode 160 Subtitle Indonesia<h2>Perfect World Episode 160 Subtitle Indonesia</h2></div>
        </a>
        <div class="bt"><span class="epx">Episode 160</span></div>
      </div>
    </article>
  </div>
</div>
</body></html>
"#;

#[test]
fn anichin_home_sections_and_title_cleanup() {
    let (slider, popular, latest) = anichin::parse_home(ANICHIN_HOME);

    assert_eq!(popular.len(), 1);
    assert_eq!(popular[0].title, "Renegade Immortal");
    assert_eq!(popular[0].slug, "renegade-immortal");
    assert_eq!(popular[0].episode, "Episode 130");

    assert_eq!(latest.len(), 2);
    // Boilerplate suffix stripped from episode cards.
    assert_eq!(latest[0].title, "Soul Land 2 Episode 48");
    assert_eq!(latest[0].slug, "soul-land-2-episode-48-subtitle-indonesia");
    // Lazy-loaded image resolved through data-src.
    assert!(latest[0].image.ends_with("sl2.jpg"));

    // No hero carousel on this theme; slider mirrors top popular cards.
    assert_eq!(slider.len(), 1);
    assert_eq!(slider[0].title, "Renegade Immortal");
}

#[test]
fn anichin_genres_strip_series_counts() {
    let html = r#"
    <ul class="genre">
      <li><a href="https://anichin.example/genres/action/">Action (214)</a></li>
      <li><a href="https://anichin.example/genres/martial-arts/">Martial Arts (96)</a></li>
    </ul>"#;
    let genres = anichin::parse_genres(html);
    assert_eq!(genres.len(), 2);
    assert_eq!(genres[0].title, "Action");
    assert_eq!(genres[1].title, "Martial Arts");
    assert_eq!(genres[1].slug, "martial-arts");
}

const ANICHIN_DETAIL: &str = r#"
<html><body>
<h1 class="entry-title">Renegade Immortal</h1>
<div class="thumbook"><div class="thumb"><img src="https://cdn.anichin.example/ri-poster.jpg"></div></div>
<span class="alter">仙逆</span>
<div class="info-content">
  <div class="spe">
    <span><b>Status:</b> Ongoing</span>
    <span><b>Type:</b> ONA</span>
    <span><b>Released:</b> 2023</span>
  </div>
</div>
<div class="genxed"><a href="/genres/action/">Action</a><a href="/genres/cultivation/">Cultivation</a></div>
<div class="synp"><div class="entry-content"><p>Wang Lin menolak takdir dan menempuh jalan kultivasi.</p></div></div>
<div class="eplister">
  <ul>
    <li><a href="https://anichin.example/renegade-immortal-episode-130/"><div class="epl-num">130</div><div class="epl-title">Episode 130</div></a></li>
    <li><a href="https://anichin.example/renegade-immortal-episode-129/"><div class="epl-num">129</div><div class="epl-title">Episode 129</div></a></li>
  </ul>
</div>
<div class="bixbox"><div class="listupd">
  <article class="bs">
    <div class="bsx">
      <a href="https://anichin.example/anime/perfect-world/">
        <div class="limit"><img src="https://cdn.anichin.example/pw-poster.jpg"></div>
        <div class="tt"><h2>Perfect World</h2></div>
      </a>
      <div class="bt"><span class="epx">Episode 160</span></div>
    </div>
  </article>
</div></div>
</body></html>
"#;

#[test]
fn anichin_detail_fields_and_episode_list() {
    let data = anichin::parse_detail(ANICHIN_DETAIL);

    assert_eq!(data.title, "Renegade Immortal");
    assert_eq!(data.japanese_title, "仙逆");
    assert!(data.image.ends_with("ri-poster.jpg"));
    assert!(data.synopsis.starts_with("Wang Lin"));
    assert_eq!(data.genres, vec!["Action", "Cultivation"]);
    assert_eq!(data.metadata.get("status").map(String::as_str), Some("Ongoing"));
    assert_eq!(data.metadata.get("type").map(String::as_str), Some("ONA"));

    let numbers: Vec<u32> = data.episodes.iter().map(|e| e.episode_number).collect();
    assert_eq!(numbers, vec![130, 129]);
    assert_eq!(data.episodes[0].slug, "renegade-immortal-episode-130");

    assert_eq!(data.related_anime.len(), 1);
    assert_eq!(data.related_anime[0].slug, "perfect-world");
}

#[test]
fn anichin_stream_servers_and_rel_nav() {
    let dm = b64(r#"<iframe src="https://dailymotion.example/embed/video/x9abc"></iframe>"#);
    let ok = b64(r#"<iframe src="https://ok.example/videoembed/456"></iframe>"#);
    let html = format!(
        r#"
    <h1 class="entry-title">Renegade Immortal Episode 130 Subtitle Indonesia</h1>
    <div class="naveps">
      <a rel="prev" href="https://anichin.example/renegade-immortal-episode-129/">Sebelumnya</a>
      <a rel="next" href="https://anichin.example/renegade-immortal-episode-131/">Berikutnya</a>
    </div>
    <select class="mirror">
      <option value="">Pilih Server</option>
      <option value="{dm}">Dailymotion 1080p</option>
      <option value="{ok}">Server 720p</option>
    </select>"#
    );

    let (title, candidates, nav) = anichin::parse_stream(&html);

    assert_eq!(title, "Renegade Immortal Episode 130");
    assert_eq!(candidates.len(), 2);
    assert_eq!(nav.prev_slug.as_deref(), Some("renegade-immortal-episode-129"));
    assert_eq!(nav.next_slug.as_deref(), Some("renegade-immortal-episode-131"));

    let resolved = Ranker::default().resolve(candidates).expect("servers");
    assert!(resolved.is_embed);
    assert_eq!(resolved.server_used, "Dailymotion 1080p");
    assert_eq!(
        resolved.streaming_url,
        "https://dailymotion.example/embed/video/x9abc"
    );
}

// ---------------------------------------------------------------------------
// komiku
// ---------------------------------------------------------------------------

const KOMIKU_HOME: &str = r#"
<html><body>
<section id="Komik_Hot">
  <div class="perapih">
    <div class="bge">
      <div class="bgei"><a href="https://komiku.example/manga/one-piece/"><img src="https://img.komiku.example/op-cover.jpg" alt="One Piece"></a></div>
      <div class="kan">
        <a href="https://komiku.example/manga/one-piece/"><h3>One Piece</h3></a>
        <p>Luffy mengumpulkan kru menuju Laugh Tale.</p>
        <div class="new1"><a href="https://komiku.example/one-piece-chapter-1101/"><span>Terbaru:</span> <span>Chapter 1101</span></a></div>
      </div>
    </div>
  </div>
</section>
<section id="Terbaru">
  <div class="perapih">
    <div class="bge">
      <div class="bgei"><a href="https://komiku.example/manga/kagurabachi/"><img src="https://img.komiku.example/kb-cover.jpg" alt="Kagurabachi"></a></div>
      <div class="kan">
        <a href="https://komiku.example/manga/kagurabachi/"><h3>Kagurabachi</h3></a>
        <p>Chihiro dan pedang sihir peninggalan ayahnya.</p>
        <div class="new1"><a href="https://komiku.example/kagurabachi-chapter-88/"><span>Terbaru:</span> <span>Chapter 88</span></a></div>
      </div>
    </div>
  </div>
</section>
</body></html>
"#;

#[test]
fn komiku_home_sections_and_slider_blurbs() {
    let (slider, popular, latest) = komiku::parse_home(KOMIKU_HOME);

    assert_eq!(popular.len(), 1);
    assert_eq!(popular[0].title, "One Piece");
    assert_eq!(popular[0].slug, "one-piece");
    assert_eq!(popular[0].episode, "Chapter 1101");

    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].title, "Kagurabachi");

    assert_eq!(slider.len(), 1);
    assert!(slider[0].desc.contains("Laugh Tale"));
}

#[test]
fn komiku_listing_parses_search_grid() {
    let items = komiku::parse_listing(KOMIKU_HOME);
    assert_eq!(items.len(), 2);
}

const KOMIKU_CHAPTER: &str = r#"
<html><body>
<div id="Judul"><h1>One Piece Chapter 1101</h1></div>
<div class="nxpr">
  <a class="rl" href="https://komiku.example/one-piece-chapter-1100/">❮ Sebelumnya</a>
  <a class="rl" href="https://komiku.example/one-piece-chapter-1102/">Berikutnya ❯</a>
</div>
<div id="Baca_Komik">
  <img src="https://img.komiku.example/op/1101/01.jpg" alt="page 1">
  <img data-src="/op/1101/02.jpg" src="" alt="page 2">
  <img src="https://img.komiku.example/op/1101/03.jpg" alt="page 3">
</div>
</body></html>
"#;

#[test]
fn komiku_chapter_reader_payload() {
    let data = komiku::parse_chapter(KOMIKU_CHAPTER, "https://komiku.example");

    assert_eq!(data.title, "One Piece Chapter 1101");
    assert_eq!(data.images.len(), 3);
    // Relative lazy-load src resolves against the serving mirror.
    assert_eq!(data.images[1], "https://komiku.example/op/1101/02.jpg");
    assert_eq!(data.prev_chapter.as_deref(), Some("one-piece-chapter-1100"));
    assert_eq!(data.next_chapter.as_deref(), Some("one-piece-chapter-1102"));
}

#[test]
fn komiku_chapter_nav_falls_back_to_link_order() {
    // Some mirrors render the arrows as images with no text.
    let html = r#"
    <h1>Kagurabachi Chapter 88</h1>
    <div class="nxpr">
      <a class="rl" href="https://komiku.example/kagurabachi-chapter-87/"><img src="/arrow-left.png"></a>
      <a class="rl" href="https://komiku.example/kagurabachi-chapter-89/"><img src="/arrow-right.png"></a>
    </div>
    <div id="Baca_Komik"><img src="https://img.komiku.example/kb/88/01.jpg"></div>"#;
    let data = komiku::parse_chapter(html, "https://komiku.example");
    assert_eq!(data.prev_chapter.as_deref(), Some("kagurabachi-chapter-87"));
    assert_eq!(data.next_chapter.as_deref(), Some("kagurabachi-chapter-89"));
}

#[test]
fn komiku_chapter_at_series_end_has_no_next() {
    let html = r#"
    <h1>Kagurabachi Chapter 88</h1>
    <div class="nxpr">
      <a class="rl" href="https://komiku.example/kagurabachi-chapter-87/">❮ Sebelumnya</a>
    </div>
    <div id="Baca_Komik"><img src="https://img.komiku.example/kb/88/01.jpg"></div>"#;
    let data = komiku::parse_chapter(html, "https://komiku.example");
    assert_eq!(data.prev_chapter.as_deref(), Some("kagurabachi-chapter-87"));
    assert_eq!(data.next_chapter, None);
}
