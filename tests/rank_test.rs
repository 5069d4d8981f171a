//! Behavior tests for streaming-server ranking through the public API.

use animein_api::rank::{RankWeights, Ranker, ServerCandidate};

fn candidates(labels: &[&str]) -> Vec<ServerCandidate> {
    labels
        .iter()
        .map(|l| ServerCandidate {
            label: l.to_string(),
            raw: format!("https://embed.example/{}", l.replace(' ', "-")),
        })
        .collect()
}

#[test]
fn ranking_orders_by_non_increasing_score() {
    let ranker = Ranker::default();
    let ranked = ranker.rank(candidates(&[
        "Backup 360p",
        "VIP 1080p",
        "Server 480p",
        "Mirror 720p",
    ]));

    let scores: Vec<i32> = ranked.iter().map(|s| s.score).collect();
    for pair in scores.windows(2) {
        assert!(pair[0] >= pair[1], "scores out of order: {scores:?}");
    }
    assert_eq!(ranked[0].label, "VIP 1080p");
}

#[test]
fn ranking_is_idempotent() {
    let ranker = Ranker::default();
    let input = candidates(&["Mirror 720p", "dood 480p", "VIP 1080p"]);

    let once = ranker.rank(input.clone());
    let labels_once: Vec<String> = once.iter().map(|s| s.label.clone()).collect();

    // Re-ranking the already-ordered list changes nothing.
    let again = ranker.rank(
        labels_once
            .iter()
            .map(|l| ServerCandidate {
                label: l.clone(),
                raw: format!("https://embed.example/{}", l.replace(' ', "-")),
            })
            .collect(),
    );
    let labels_again: Vec<String> = again.iter().map(|s| s.label.clone()).collect();
    assert_eq!(labels_once, labels_again);
}

#[test]
fn vip_mirror_dood_fixture() {
    // The canonical dropdown: a premium 1080p, a plain 720p and a dood
    // host. The dood entry must never outrank the clean ones, and with
    // clean candidates present it is dropped from the quality list.
    let ranker = Ranker::default();
    let resolved = ranker
        .resolve(candidates(&["VIP 1080p", "Mirror 720p", "dood 480p"]))
        .expect("servers present");

    let labels: Vec<&str> = resolved.qualities.iter().map(|q| q.quality.as_str()).collect();
    assert_eq!(labels, ["VIP 1080p", "Mirror 720p"]);
    assert_eq!(resolved.server_used, "VIP 1080p");
}

#[test]
fn empty_server_list_is_a_defined_outcome() {
    assert!(Ranker::default().resolve(Vec::new()).is_none());
}

#[test]
fn single_blacklisted_server_still_plays_as_last_resort() {
    let resolved = Ranker::default()
        .resolve(candidates(&["dood 1080p"]))
        .expect("last resort must play");
    assert_eq!(resolved.server_used, "dood 1080p");
    assert!(resolved.is_embed);
}

#[test]
fn equal_scores_preserve_page_order() {
    let ranker = Ranker::default();
    let ranked = ranker.rank(candidates(&["First 720p", "Second 720p", "Third 720p"]));
    let labels: Vec<&str> = ranked.iter().map(|s| s.label.as_str()).collect();
    assert_eq!(labels, ["First 720p", "Second 720p", "Third 720p"]);
}

#[test]
fn direct_media_candidate_is_played_natively() {
    let ranker = Ranker::default();
    let resolved = ranker
        .resolve(vec![
            ServerCandidate {
                label: "VIP 1080p".to_string(),
                raw: "https://embed.example/vip".to_string(),
            },
            ServerCandidate {
                label: "CDN 720p".to_string(),
                raw: "https://cdn.example/ep/7/video.mp4".to_string(),
            },
        ])
        .expect("servers present");

    assert!(!resolved.is_embed);
    assert_eq!(resolved.streaming_url, "https://cdn.example/ep/7/video.mp4");
    // The better-ranked embed still heads the manual quality list.
    assert_eq!(resolved.qualities[0].quality, "VIP 1080p");
}

#[test]
fn configured_weights_override_defaults() {
    let weights = RankWeights {
        blacklisted_hosts: vec!["vip".to_string()],
        ..RankWeights::default()
    };
    let ranker = Ranker::new(weights);
    let resolved = ranker
        .resolve(candidates(&["VIP 1080p", "Mirror 720p"]))
        .expect("servers present");
    // With "vip" blacklisted by config, the 720p mirror wins.
    assert_eq!(resolved.server_used, "Mirror 720p");
}
