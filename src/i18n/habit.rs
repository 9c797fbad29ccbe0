//! Habit phrase matching.

use habit_core::language::Language;

/// Phrases that report a habit occurrence in English.
pub const ENGLISH_HABIT_PATTERNS: &[&str] = &[
    "i did it",
    "did it",
    "slipped up",
    "had the habit",
    "relapsed",
    "fell back",
    "messed up",
    "gave in",
    "happened again",
    "went back to it",
    "did the thing",
    "broke my streak",
    "couldn't resist",
    "lost control",
];

/// Phrases that report a habit occurrence in Arabic.
pub const ARABIC_HABIT_PATTERNS: &[&str] = &[
    "فعلتها",
    "عملتها",
    "انتكست",
    "مارست العادة",
    "رجعت",
    "سقطت",
    "ضعفت",
    "لم أقاوم",
    "ما قدرت أقاوم",
    "حصلت مرة ثانية",
];

fn patterns(lang: Language) -> &'static [&'static str] {
    match lang {
        Language::English => ENGLISH_HABIT_PATTERNS,
        Language::Arabic => ARABIC_HABIT_PATTERNS,
    }
}

/// True if `text` contains one of `lang`'s habit phrases, ignoring case.
pub fn is_habit_message(text: &str, lang: Language) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    let lower = text.to_lowercase();
    patterns(lang).iter().any(|p| lower.contains(p))
}
