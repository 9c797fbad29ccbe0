use super::*;

fn bundled_locales() -> Locales {
    Locales::from_sources(&[
        (Language::English, BUNDLED_ENGLISH),
        (Language::Arabic, BUNDLED_ARABIC),
    ])
}

#[test]
fn test_bundles_parse() {
    let en: Bundle = toml::from_str(BUNDLED_ENGLISH).unwrap();
    let ar: Bundle = toml::from_str(BUNDLED_ARABIC).unwrap();
    assert!(!en.daily_messages.is_empty());
    assert!(!ar.daily_messages.is_empty());
}

#[test]
fn test_all_keys_have_english_text() {
    let locales = bundled_locales();
    let keys = [
        (Category::Commands, "welcome"),
        (Category::Status, "title"),
        (Category::Status, "last_entry"),
        (Category::Status, "today"),
        (Category::Status, "yesterday"),
        (Category::Status, "days_ago"),
        (Category::Status, "no_entries"),
        (Category::Status, "total_entries"),
        (Category::Status, "next_reminder"),
        (Category::Status, "error_getting_stats"),
        (Category::Language, "select"),
        (Category::Language, "changed_to_english"),
        (Category::Language, "changed_to_arabic"),
        (Category::Language, "invalid_choice"),
        (Category::General, "test_message"),
        (Category::General, "test_sent"),
        (Category::General, "test_failed"),
        (Category::General, "next_reminder"),
        (Category::General, "error_next_time"),
        (Category::General, "schedule_usage"),
        (Category::General, "schedule_updated"),
        (Category::General, "schedule_invalid"),
        (Category::General, "owner_only"),
        (Category::General, "export_caption"),
        (Category::General, "export_empty"),
        (Category::General, "error"),
        (Category::Tracking, "entry_recorded"),
        (Category::Tracking, "last_time"),
        (Category::Tracking, "was_today"),
        (Category::Tracking, "was_yesterday"),
        (Category::Tracking, "was_days_ago"),
        (Category::Tracking, "total_times"),
        (Category::Tracking, "awareness_message"),
        (Category::Tracking, "error_recording"),
        (Category::Awareness, "new_opportunity"),
        (Category::Awareness, "one_day"),
        (Category::Awareness, "few_days"),
        (Category::Awareness, "many_days"),
        (Category::Scheduler, "startup"),
        (Category::Scheduler, "failure"),
    ];
    for (category, key) in keys {
        let text = locales.text(Language::English, category, key, &[]);
        assert_ne!(text, TEXT_NOT_FOUND, "missing english {category:?}.{key}");
    }
    // Arabic covers everything users see.
    for (category, key) in keys.iter().filter(|(c, _)| *c != Category::Scheduler) {
        let text = locales.text(Language::Arabic, *category, key, &[]);
        assert_ne!(text, TEXT_NOT_FOUND, "missing arabic {category:?}.{key}");
    }
}

#[test]
fn test_placeholder_substitution() {
    let locales = bundled_locales();
    let text = locales.text(
        Language::English,
        Category::Status,
        "days_ago",
        &[("days", "5")],
    );
    assert_eq!(text, " (5 days ago)");

    let text = locales.text(
        Language::English,
        Category::Scheduler,
        "failure",
        &[("attempts", "3"), ("error", "timeout")],
    );
    assert!(text.contains("after 3 attempts"));
    assert!(text.ends_with("Last error: timeout"));
}

#[test]
fn test_unknown_placeholder_left_as_is() {
    assert_eq!(substitute("{a} and {b}", &[("a", "x")]), "x and {b}");
    assert_eq!(substitute("brace { alone", &[("a", "x")]), "brace { alone");
}

#[test]
fn test_values_not_reexpanded() {
    assert_eq!(
        substitute("{a}-{b}", &[("a", "{b}"), ("b", "2")]),
        "{b}-2"
    );
}

#[test]
fn test_missing_key_is_text_not_found() {
    let locales = bundled_locales();
    assert_eq!(
        locales.text(Language::English, Category::Status, "no_such_key", &[]),
        "Text not found"
    );
}

#[test]
fn test_missing_language_falls_back_to_english() {
    let locales = Locales::from_sources(&[(Language::English, BUNDLED_ENGLISH)]);
    let en = locales.text(Language::English, Category::Language, "select", &[]);
    let ar = locales.text(Language::Arabic, Category::Language, "select", &[]);
    assert_eq!(ar, en);
}

#[test]
fn test_no_bundles_is_load_error() {
    let locales = Locales::default();
    assert_eq!(
        locales.text(Language::English, Category::Commands, "welcome", &[]),
        "Error loading text"
    );
    assert_eq!(locales.daily_message(Language::Arabic), "Stay mindful today!");
}

#[test]
fn test_daily_message_from_bundle() {
    let locales = bundled_locales();
    let ar: Bundle = toml::from_str(BUNDLED_ARABIC).unwrap();
    for _ in 0..20 {
        let msg = locales.daily_message(Language::Arabic);
        assert!(ar.daily_messages.contains(&msg));
    }
}

#[test]
fn test_empty_daily_messages_fall_back() {
    let locales = Locales::from_sources(&[(Language::English, "[commands]\nwelcome = \"hi\"\n")]);
    assert_eq!(
        locales.daily_message(Language::English),
        "Stay mindful today!"
    );
}

#[test]
fn test_install_and_load_prefers_user_edits() {
    let dir = std::env::temp_dir().join(format!("__habitbot_locales_{}__", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let data_dir = dir.to_str().unwrap();

    install_bundled_locales(data_dir);
    let english = dir.join("locales/english.toml");
    assert!(english.exists());
    assert!(dir.join("locales/arabic.toml").exists());

    std::fs::write(&english, "[commands]\nwelcome = \"custom\"\n").unwrap();
    install_bundled_locales(data_dir);
    let locales = Locales::load(data_dir);
    assert_eq!(
        locales.text(Language::English, Category::Commands, "welcome", &[]),
        "custom"
    );

    // A broken file falls back to the embedded bundle.
    std::fs::write(&english, "not = [valid").unwrap();
    let locales = Locales::load(data_dir);
    assert!(locales
        .text(Language::English, Category::Commands, "welcome", &[])
        .contains("Habit Awareness Bot"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_english_habit_phrases() {
    assert!(is_habit_message("I did it again", Language::English));
    assert!(is_habit_message("ugh, SLIPPED UP today", Language::English));
    assert!(is_habit_message("I couldn't resist", Language::English));
    assert!(!is_habit_message("good morning", Language::English));
    assert!(!is_habit_message("", Language::English));
    assert!(!is_habit_message("   ", Language::English));
}

#[test]
fn test_arabic_habit_phrases() {
    assert!(is_habit_message("للأسف فعلتها", Language::Arabic));
    assert!(is_habit_message("انتكست اليوم", Language::Arabic));
    assert!(is_habit_message("مارست العادة", Language::Arabic));
    assert!(!is_habit_message("صباح الخير", Language::Arabic));
}

#[test]
fn test_phrases_are_per_language() {
    assert!(!is_habit_message("فعلتها", Language::English));
    assert!(!is_habit_message("I did it", Language::Arabic));
}
