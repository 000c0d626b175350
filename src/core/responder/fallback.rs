//! Local keyword responder used when the completion endpoint is absent or failing.
//!
//! Matching is a case-insensitive substring check in a fixed priority order;
//! the first rule that matches wins, so "which" greets like "hi" does. Text that matches no rule gets a uniform pick from a
//! pool of generic conversational replies.

use rand::Rng;

/// Category of a fallback reply, mostly useful for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCategory {
    Greeting,
    Wellbeing,
    Gratitude,
    Farewell,
    Help,
    Weather,
    Time,
    Generic,
}

impl ReplyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Wellbeing => "wellbeing",
            Self::Gratitude => "gratitude",
            Self::Farewell => "farewell",
            Self::Help => "help",
            Self::Weather => "weather",
            Self::Time => "time",
            Self::Generic => "generic",
        }
    }
}

struct KeywordRule {
    category: ReplyCategory,
    triggers: &'static [&'static str],
    reply: &'static str,
}

/// Keyword rules in priority order.
const RULES: &[KeywordRule] = &[
    KeywordRule {
        category: ReplyCategory::Greeting,
        triggers: &["hello", "hi"],
        reply: "Hello! How are you doing today?",
    },
    KeywordRule {
        category: ReplyCategory::Wellbeing,
        triggers: &["how are you"],
        reply: "I'm doing great, thank you for asking! How are you feeling today?",
    },
    KeywordRule {
        category: ReplyCategory::Gratitude,
        triggers: &["thank you", "thanks"],
        reply: "You're very welcome! Is there anything else I can help you with?",
    },
    KeywordRule {
        category: ReplyCategory::Farewell,
        triggers: &["goodbye", "bye"],
        reply: "Goodbye! It was nice talking with you. Have a great day!",
    },
    KeywordRule {
        category: ReplyCategory::Help,
        triggers: &["help"],
        reply: "I'm here to help! What would you like to know or discuss?",
    },
    KeywordRule {
        category: ReplyCategory::Weather,
        triggers: &["weather"],
        reply: "I don't have access to current weather data, but I hope you're having a nice day!",
    },
    KeywordRule {
        category: ReplyCategory::Time,
        triggers: &["time"],
        reply: "I don't have access to the current time, but I hope you're having a good day!",
    },
];

/// Replies used when no keyword rule matches.
pub const GENERIC_REPLIES: [&str; 10] = [
    "That's interesting! Tell me more about that.",
    "I understand what you're saying. How can I help you further?",
    "That's a great point. What would you like to know?",
    "I see. Is there anything specific you'd like to discuss?",
    "Thanks for sharing that with me. What else is on your mind?",
    "That sounds fascinating! Can you elaborate on that?",
    "I'm here to help. What else would you like to talk about?",
    "That's a good question. Let me think about that for a moment.",
    "I appreciate you sharing that with me. What's your perspective on this?",
    "That's really interesting. I'd love to hear more about your thoughts on this.",
];

/// Deterministic keyword matcher with a random generic tail.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    pub fn new() -> Self {
        Self
    }

    /// Return the first matching keyword rule's category and reply, if any.
    pub fn keyword_reply(&self, user_text: &str) -> Option<(ReplyCategory, &'static str)> {
        let lowered = user_text.to_lowercase();

        RULES
            .iter()
            .find(|rule| rule.triggers.iter().any(|trigger| lowered.contains(*trigger)))
            .map(|rule| (rule.category, rule.reply))
    }

    /// Produce a reply for `user_text`, drawing from `rng` only when no rule matches.
    pub fn respond<R: Rng>(&self, user_text: &str, rng: &mut R) -> (ReplyCategory, String) {
        match self.keyword_reply(user_text) {
            Some((category, reply)) => (category, reply.to_string()),
            None => {
                let index = rng.random_range(0..GENERIC_REPLIES.len());
                (ReplyCategory::Generic, GENERIC_REPLIES[index].to_string())
            }
        }
    }
}
