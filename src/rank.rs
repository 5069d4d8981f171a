//! Streaming-server ranking.
//!
//! Episode pages offer a dropdown of candidate servers as (label, raw value)
//! pairs. Labels are scored by substring: resolution tokens move a candidate
//! up or down, known-reliable hosts get a bonus, ad-wall hosts a penalty deep
//! enough that they only surface when nothing else is left. The sort is
//! stable, so candidates the weights cannot separate keep their page order.
//!
//! The weight table is configuration (`rank` key in animein.json), not code:
//! hosters rot and site builds swap them out faster than releases ship.

use aho_corasick::AhoCorasick;
use serde::Deserialize;

use crate::core::types::StreamQuality;
use crate::extract::decode::{self, Decoded};

/// How many ranked candidates to probe for a direct media URL before
/// settling for the best embed.
const PROBE_LIMIT: usize = 4;

/// Label-scoring weights. Every field can be overridden from animein.json;
/// omitted fields keep these defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankWeights {
    pub quality_1080: i32,
    pub quality_720: i32,
    pub quality_480: i32,
    pub quality_360: i32,
    pub trusted_bonus: i32,
    pub blacklist_penalty: i32,
    /// Host substrings that historically play without fuss.
    pub trusted_hosts: Vec<String>,
    /// Host substrings to avoid (ad-walled or dead embeds). Never chosen
    /// while any other candidate exists.
    pub blacklisted_hosts: Vec<String>,
}

impl Default for RankWeights {
    fn default() -> Self {
        Self {
            quality_1080: 100,
            quality_720: 60,
            quality_480: -20,
            quality_360: -40,
            trusted_bonus: 30,
            blacklist_penalty: -1000,
            trusted_hosts: [
                "kuramadrive",
                "blogger",
                "filedon",
                "mega",
                "dailymotion",
                "rumble",
                "ok.ru",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            blacklisted_hosts: ["dood", "mixdrop"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// One candidate server as scraped off an episode page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCandidate {
    /// Visible option label, e.g. "VIP 1080p".
    pub label: String,
    /// Raw option value: a base64 blob, an inline iframe tag or a bare URL.
    pub raw: String,
}

/// A candidate after decoding and scoring.
#[derive(Debug, Clone)]
pub struct RankedServer {
    pub label: String,
    pub decoded: Decoded,
    pub score: i32,
    pub blacklisted: bool,
}

/// The outcome of ranking a candidate list: one URL to play now plus the
/// full ordered quality list for manual switching.
#[derive(Debug, Clone)]
pub struct ResolvedStream {
    pub streaming_url: String,
    pub server_used: String,
    pub is_embed: bool,
    pub qualities: Vec<StreamQuality>,
}

/// Weights plus prebuilt substring matchers. Built once per process from
/// config; label scans are linear-time after that.
#[derive(Debug, Clone)]
pub struct Ranker {
    weights: RankWeights,
    trusted: AhoCorasick,
    blacklisted: AhoCorasick,
}

impl Ranker {
    pub fn new(weights: RankWeights) -> Self {
        let trusted =
            AhoCorasick::new(&weights.trusted_hosts).expect("valid trusted-host patterns");
        let blacklisted =
            AhoCorasick::new(&weights.blacklisted_hosts).expect("valid blacklist patterns");
        Self {
            weights,
            trusted,
            blacklisted,
        }
    }

    /// Score a server label. Pure: same label, same score.
    ///
    /// Resolution tokens are mutually exclusive (first match wins, best
    /// first) so "1080p + 720p backup" labels don't double-count.
    pub fn score_label(&self, label: &str) -> i32 {
        let lower = label.to_lowercase();
        let w = &self.weights;

        let mut score = if lower.contains("1080") {
            w.quality_1080
        } else if lower.contains("720") {
            w.quality_720
        } else if lower.contains("480") {
            w.quality_480
        } else if lower.contains("360") {
            w.quality_360
        } else {
            0
        };

        if self.trusted.is_match(&lower) {
            score += w.trusted_bonus;
        }
        if self.blacklisted.is_match(&lower) {
            score += w.blacklist_penalty;
        }
        score
    }

    pub fn is_blacklisted(&self, label: &str) -> bool {
        self.blacklisted.is_match(&label.to_lowercase())
    }

    /// Decode, score and order candidates best-first.
    ///
    /// The sort is stable and keyed on (blacklisted, -score): blacklisted
    /// entries land below every clean one no matter how their scores
    /// compare, and ties keep the page's original order.
    pub fn rank(&self, candidates: Vec<ServerCandidate>) -> Vec<RankedServer> {
        let mut ranked: Vec<RankedServer> = candidates
            .into_iter()
            .map(|c| RankedServer {
                score: self.score_label(&c.label),
                blacklisted: self.is_blacklisted(&c.label),
                decoded: decode::smart_decode(&c.raw),
                label: c.label,
            })
            .collect();

        ranked.sort_by_key(|s| (s.blacklisted, std::cmp::Reverse(s.score)));
        ranked
    }

    /// Pick the URL to play. `None` means the page offered no servers at all.
    ///
    /// Selection order:
    /// 1. a direct media file (.mp4/.m3u8/...) within the top few ranked
    ///    candidates — the player handles those natively;
    /// 2. otherwise the best-ranked embed;
    /// 3. otherwise (nothing decoded to a URL) the top-ranked raw value,
    ///    served verbatim so the client can still show *something*.
    ///
    /// Blacklisted hosts are dropped from the quality list entirely while a
    /// clean alternative exists; a blacklist-only page still plays.
    pub fn resolve(&self, candidates: Vec<ServerCandidate>) -> Option<ResolvedStream> {
        let ranked = self.rank(candidates);
        if ranked.is_empty() {
            return None;
        }

        let has_clean = ranked.iter().any(|s| !s.blacklisted);
        let usable: Vec<&RankedServer> = ranked
            .iter()
            .filter(|s| !s.decoded.is_raw())
            .filter(|s| !s.blacklisted || !has_clean)
            .collect();

        let qualities: Vec<StreamQuality> = usable
            .iter()
            .map(|s| StreamQuality {
                quality: s.label.clone(),
                url: s.decoded.url().to_string(),
            })
            .collect();

        if let Some(direct) = usable
            .iter()
            .take(PROBE_LIMIT)
            .find(|s| decode::is_direct_media(s.decoded.url()))
        {
            return Some(ResolvedStream {
                streaming_url: direct.decoded.url().to_string(),
                server_used: direct.label.clone(),
                is_embed: false,
                qualities,
            });
        }

        if let Some(best) = usable.first() {
            return Some(ResolvedStream {
                streaming_url: best.decoded.url().to_string(),
                server_used: best.label.clone(),
                is_embed: true,
                qualities,
            });
        }

        // Every value decoded to junk; hand the top-ranked raw value back
        // rather than nothing.
        let top = &ranked[0];
        Some(ResolvedStream {
            streaming_url: top.decoded.url().to_string(),
            server_used: top.label.clone(),
            is_embed: true,
            qualities,
        })
    }
}

impl Default for Ranker {
    fn default() -> Self {
        Self::new(RankWeights::default())
    }
}
