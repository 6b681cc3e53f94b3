use switchboard_graph::TRANSITION_MARKER;

const WORD_LIMIT: usize = 50;

/// Markers that end the user-facing part of a reply.
const CUT_MARKERS: &[&str] = &[TRANSITION_MARKER, "[Global Context:", "[Transitioning to"];

/// Strip routing markers and transition notices from a turn's output and
/// limit it to 50 words.
pub fn clean_response(response: &str) -> String {
    let mut text = response;
    for marker in CUT_MARKERS {
        if let Some(idx) = text.find(marker) {
            text = text[..idx].trim();
        }
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > WORD_LIMIT {
        format!("{}...", words[..WORD_LIMIT].join(" "))
    } else {
        text.trim().to_string()
    }
}
