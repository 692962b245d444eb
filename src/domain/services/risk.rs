use regex::Regex;
use std::sync::LazyLock;

static RISK_SENTENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(risk|toxicit|contraindicat|adverse|harm|warning|black box)")
        .expect("risk sentence pattern is valid")
});

static SENTENCE_BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("sentence pattern is valid"));

/// Number of risk-bearing sentences in the synthesis, capped by the number
/// of risk-signalling studies detected upstream.
pub fn estimate_surfaced_risks(synthesis: &str, detected_conflicts: usize) -> usize {
    if synthesis.is_empty() || detected_conflicts == 0 {
        return 0;
    }

    let mut count = 0;
    let mut start = 0;
    for m in SENTENCE_BOUNDARY_RE.find_iter(synthesis) {
        if RISK_SENTENCE_RE.is_match(&synthesis[start..m.start() + 1]) {
            count += 1;
        }
        start = m.end();
    }
    if RISK_SENTENCE_RE.is_match(&synthesis[start..]) {
        count += 1;
    }

    count.min(detected_conflicts)
}
