/// Intent name → keywords that count as evidence of that intent.
///
/// Intents absent from the table match on their own name.
pub const INTENT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "booking",
        &["booking", "book", "reserve", "schedule", "appointment", "meeting room", "conference room"],
    ),
    (
        "faq",
        &["faq", "question", "help", "info", "information", "what", "how", "why", "policy"],
    ),
    (
        "emergency",
        &["emergency", "urgent", "help", "crisis", "accident", "fire", "medical"],
    ),
    (
        "hr",
        &["hr", "human resources", "employee", "staff", "payroll", "leave", "vacation", "benefits"],
    ),
    (
        "it",
        &["it", "computer", "technical", "tech", "software", "hardware", "network", "password", "login"],
    ),
    ("visitor", &["visitor", "guest", "badge", "check-in", "visit", "entrance"]),
    (
        "feedback",
        &["feedback", "complaint", "suggestion", "review", "opinion", "rating"],
    ),
];

/// Keywords for `intent`, if it has a table entry.
pub fn keywords(intent: &str) -> Option<&'static [&'static str]> {
    INTENT_KEYWORDS
        .iter()
        .find(|(name, _)| *name == intent)
        .map(|(_, words)| *words)
}

fn mentions(intent: &str, text_lower: &str) -> bool {
    match keywords(intent) {
        Some(words) => words.iter().any(|w| text_lower.contains(w)),
        None => text_lower.contains(intent),
    }
}

/// Confidence (0..=2) that an exchange expresses `intent`: one point for
/// the user message, one for the response. Both inputs must be lowercased.
pub fn confidence(intent: &str, user_lower: &str, response_lower: &str) -> u8 {
    u8::from(mentions(intent, user_lower)) + u8::from(mentions(intent, response_lower))
}
