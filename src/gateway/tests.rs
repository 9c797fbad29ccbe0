use super::daily::awareness_text;
use super::*;
use crate::i18n::Category;
use crate::scheduler::{Job, Notifier, SchedulerSettings};
use crate::testing::FakeChannel;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use habit_core::{
    config::MemoryConfig,
    error::HabitError,
    language::Language,
    message::{CallbackQuery, IncomingMessage, Update},
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const OWNER: i64 = 1000;
const USER: i64 = 42;
const CALLBACK_ERROR_TEXT: &str = "❌ Error changing language";

static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

struct NoopJob;

#[async_trait]
impl Job for NoopJob {
    fn name(&self) -> &str {
        "noop"
    }

    async fn run(&self) -> Result<(), HabitError> {
        Ok(())
    }
}

fn test_dir() -> std::path::PathBuf {
    let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join(format!(
        "__habitbot_gateway_test_{}_{id}__",
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

async fn store_in(dir: &std::path::Path) -> Store {
    let config = MemoryConfig {
        db_path: dir.join("test.db").to_string_lossy().into_owned(),
    };
    Store::new(&config, chrono_tz::UTC).await.unwrap()
}

async fn test_store() -> Store {
    store_in(&test_dir()).await
}

fn locales() -> Arc<Locales> {
    Arc::new(Locales::load("/nonexistent/__habitbot__"))
}

fn gateway(channel: Arc<FakeChannel>, store: Store) -> Gateway {
    let locales = locales();
    let settings = SchedulerSettings {
        fire_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        tz: chrono_tz::UTC,
        retry_attempts: 1,
        retry_delay: Duration::ZERO,
        poll_interval: Duration::from_secs(30),
    };
    let notifier = Notifier::new(channel.clone(), OWNER, locales.clone());
    let scheduler = Scheduler::new(settings, Arc::new(NoopJob), notifier);
    let config = TelegramConfig {
        bot_token: "test-token".to_string(),
        chat_id: OWNER,
        allowed_users: Vec::new(),
    };
    Gateway::new(channel, store, locales, scheduler, &config)
}

fn message(message_id: i64, sender_id: i64, text: &str) -> Update {
    Update::Message(IncomingMessage {
        id: uuid::Uuid::new_v4(),
        channel: "fake".to_string(),
        sender_id,
        sender_name: Some("Tester".to_string()),
        chat_id: sender_id,
        message_id,
        text: text.to_string(),
        timestamp: Utc::now(),
    })
}

fn language_button(id: &str, data: &str, message_id: Option<i64>) -> Update {
    Update::Callback(CallbackQuery {
        id: id.to_string(),
        sender_id: USER,
        chat_id: USER,
        message_id,
        data: data.to_string(),
    })
}

fn en(locales: &Locales, category: Category, key: &str) -> String {
    locales.text(Language::English, category, key, &[])
}

// --- receive loop ---

#[tokio::test]
async fn test_run_routes_updates_then_shuts_down() {
    let channel = Arc::new(FakeChannel::with_updates(vec![
        message(1, USER, "/start"),
        message(2, USER, "ugh, I did it"),
        message(3, USER, "good morning"),
    ]));
    let store = test_store().await;
    let gw = gateway(channel.clone(), store.clone());

    gw.run().await.unwrap();

    let sent = channel.sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 3, "startup notice plus two replies: {sent:?}");
    assert_eq!(sent[0].chat_id, OWNER);
    assert!(sent[0].text.starts_with("🤖 Daily Message Bot started!"));

    assert_eq!(sent[1].reply_to, Some(1));
    assert_eq!(sent[1].text, en(&gw.locales, Category::Commands, "welcome"));
    assert_eq!(sent[2].reply_to, Some(2));
    assert!(sent[2].text.contains("Total times: 1"));

    assert!(channel.stopped.load(Ordering::SeqCst));
    assert!(!gw.scheduler.is_running().await);
    assert_eq!(store.get_total_count(USER).await.unwrap(), 1);
}

#[tokio::test]
async fn test_habit_phrases_use_sender_language() {
    let channel = Arc::new(FakeChannel::new());
    let store = test_store().await;
    let gw = gateway(channel.clone(), store.clone());

    gw.handle_update(message(1, USER, "فعلتها")).await;
    assert!(channel.sent.lock().unwrap().is_empty());

    store.set_user_language(USER, Language::Arabic).await.unwrap();
    gw.handle_update(message(2, USER, "فعلتها")).await;
    assert_eq!(channel.sent.lock().unwrap().len(), 1);
    assert_eq!(store.get_total_count(USER).await.unwrap(), 1);
}

#[tokio::test]
async fn test_language_prompt_reply_carries_keyboard() {
    let channel = Arc::new(FakeChannel::new());
    let gw = gateway(channel.clone(), test_store().await);

    gw.handle_update(message(5, USER, "/lang")).await;
    let reply = channel.last_sent().unwrap();
    assert_eq!(reply.reply_to, Some(5));
    assert_eq!(reply.keyboard.unwrap().rows[0].len(), 2);
}

#[tokio::test]
async fn test_command_error_sends_generic_reply() {
    let channel = Arc::new(FakeChannel::new());
    let store = test_store().await;
    store.record_entry(USER, None).await.unwrap();
    let gw = gateway(channel.clone(), store);

    channel.fail_documents.store(true, Ordering::SeqCst);
    gw.handle_update(message(9, USER, "/export")).await;

    let reply = channel.last_sent().unwrap();
    assert_eq!(reply.text, en(&gw.locales, Category::General, "error"));
    assert_eq!(reply.reply_to, Some(9));
}

// --- callbacks ---

#[tokio::test]
async fn test_language_callback_replaces_prompt() {
    let channel = Arc::new(FakeChannel::new());
    let store = test_store().await;
    let gw = gateway(channel.clone(), store.clone());

    gw.handle_update(language_button("cb1", "lang_arabic", Some(77)))
        .await;

    assert_eq!(*channel.deleted.lock().unwrap(), vec![(USER, 77)]);
    let confirmation = channel.last_sent().unwrap();
    assert_eq!(confirmation.chat_id, USER);
    assert_eq!(
        confirmation.text,
        gw.locales
            .text(Language::Arabic, Category::Language, "changed_to_arabic", &[])
    );
    assert_eq!(
        *channel.answered.lock().unwrap(),
        vec![("cb1".to_string(), None)]
    );
    assert_eq!(
        store.get_user_language(USER).await.unwrap(),
        Language::Arabic
    );
}

#[tokio::test]
async fn test_callback_without_message_still_confirms() {
    let channel = Arc::new(FakeChannel::new());
    let gw = gateway(channel.clone(), test_store().await);

    gw.handle_update(language_button("cb2", "lang_english", None))
        .await;

    assert!(channel.deleted.lock().unwrap().is_empty());
    assert_eq!(
        channel.last_sent().unwrap().text,
        en(&gw.locales, Category::Language, "changed_to_english")
    );
    assert_eq!(channel.answered.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_callback_data_is_invalid_choice() {
    let channel = Arc::new(FakeChannel::new());
    let gw = gateway(channel.clone(), test_store().await);

    gw.handle_update(language_button("cb3", "lang_french", Some(1)))
        .await;
    assert_eq!(
        channel.last_sent().unwrap().text,
        en(&gw.locales, Category::Language, "invalid_choice")
    );
}

#[tokio::test]
async fn test_callback_confirms_when_store_is_unavailable() {
    let dir = test_dir();
    let store = store_in(&dir).await;
    store.close().await;
    std::fs::remove_dir_all(&dir).unwrap();

    let channel = Arc::new(FakeChannel::new());
    let gw = gateway(channel.clone(), store);
    gw.handle_update(language_button("cb5", "lang_arabic", Some(3)))
        .await;

    assert_eq!(*channel.deleted.lock().unwrap(), vec![(USER, 3)]);
    assert_eq!(
        channel.last_sent().unwrap().text,
        gw.locales
            .text(Language::Arabic, Category::Language, "changed_to_arabic", &[])
    );
    assert_eq!(
        *channel.answered.lock().unwrap(),
        vec![("cb5".to_string(), None)]
    );
}

#[tokio::test]
async fn test_callback_failure_answers_with_error() {
    let channel = Arc::new(FakeChannel::new());
    let gw = gateway(channel.clone(), test_store().await);

    channel.fail_next.store(1, Ordering::SeqCst);
    gw.handle_update(language_button("cb4", "lang_arabic", Some(3)))
        .await;

    assert_eq!(
        *channel.answered.lock().unwrap(),
        vec![("cb4".to_string(), Some(CALLBACK_ERROR_TEXT.to_string()))]
    );
}

// --- daily message ---

fn daily(
    channel: Arc<FakeChannel>,
    store: Store,
    tz: chrono_tz::Tz,
    include_date: bool,
) -> DailyMessage {
    DailyMessage::new(channel, store, locales(), OWNER, tz, include_date)
}

fn half_past(y: i32, m: u32, d: u32, h: u32) -> chrono::DateTime<Utc> {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 30, 0)
        .unwrap()
        .and_utc()
}

#[tokio::test]
async fn test_daily_without_date_is_plain_message() {
    let job = daily(Arc::new(FakeChannel::new()), test_store().await, chrono_tz::UTC, false);
    let text = job.compose_at(half_past(2024, 5, 1, 12)).await;
    assert!(!text.is_empty());
    assert!(!text.starts_with("📅"));
}

#[tokio::test]
async fn test_daily_with_date_and_no_entries() {
    let job = daily(Arc::new(FakeChannel::new()), test_store().await, chrono_tz::UTC, true);
    let text = job.compose_at(half_past(2024, 5, 1, 12)).await;
    assert!(text.starts_with("📅 May 01, 2024\n\n"), "{text}");
    assert!(!text.contains("of awareness"));
    assert!(!text.contains("new opportunity"));
}

#[tokio::test]
async fn test_daily_date_uses_timezone() {
    let job = daily(
        Arc::new(FakeChannel::new()),
        test_store().await,
        chrono_tz::Asia::Riyadh,
        true,
    );
    // 22:30 UTC is already the next day in Riyadh.
    let text = job.compose_at(half_past(2024, 5, 1, 22)).await;
    assert!(text.starts_with("📅 May 02, 2024\n\n"), "{text}");
}

#[tokio::test]
async fn test_daily_appends_awareness_in_owner_language() {
    let store = test_store().await;
    store.record_entry(OWNER, None).await.unwrap();
    let locales = locales();

    let job = daily(Arc::new(FakeChannel::new()), store.clone(), chrono_tz::UTC, true);
    let text = job.compose_at(Utc::now()).await;
    assert!(text.ends_with(&en(&locales, Category::Awareness, "new_opportunity")));

    store.set_user_language(OWNER, Language::Arabic).await.unwrap();
    let text = job.compose_at(Utc::now()).await;
    assert!(text.ends_with(&locales.text(
        Language::Arabic,
        Category::Awareness,
        "new_opportunity",
        &[]
    )));
}

#[test]
fn test_awareness_thresholds() {
    let locales = locales();
    let text = |days| awareness_text(&locales, Language::English, days);
    assert_eq!(text(0), en(&locales, Category::Awareness, "new_opportunity"));
    assert_eq!(text(1), en(&locales, Category::Awareness, "one_day"));
    assert_eq!(text(3), "\n\n💚 3 days of awareness. Stay mindful.");
    assert_eq!(text(6), "\n\n💚 6 days of awareness. Stay mindful.");
    assert_eq!(
        text(7),
        "\n\n🌟 7 days of awareness. You're building strong patterns!"
    );
    assert_eq!(
        text(30),
        "\n\n🌟 30 days of awareness. You're building strong patterns!"
    );
}

#[tokio::test]
async fn test_daily_job_sends_to_owner_chat() {
    let channel = Arc::new(FakeChannel::new());
    let store = test_store().await;
    let job = daily(channel.clone(), store.clone(), chrono_tz::UTC, true);

    job.run().await.unwrap();
    let sent = channel.last_sent().unwrap();
    assert_eq!(sent.chat_id, OWNER);
    assert!(sent.text.starts_with("📅 "));

    let logged = store.recent_sent_messages(10).await.unwrap();
    assert_eq!(logged.len(), 1);
    assert_eq!(logged[0].chat_id, OWNER);
}

#[tokio::test]
async fn test_daily_job_propagates_send_failure() {
    let channel = Arc::new(FakeChannel::new());
    let store = test_store().await;
    let job = daily(channel.clone(), store.clone(), chrono_tz::UTC, true);

    channel.fail_all.store(true, Ordering::SeqCst);
    assert!(job.run().await.is_err());
    assert!(store.recent_sent_messages(10).await.unwrap().is_empty());
}
