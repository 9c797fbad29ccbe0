//! Test doubles shared by the binary's unit tests.

use async_trait::async_trait;
use habit_core::{
    error::HabitError,
    message::{Document, MessageHandle, OutgoingMessage, Update},
    traits::Channel,
};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

/// In-memory channel that records everything sent through it.
#[derive(Default)]
pub struct FakeChannel {
    next_id: AtomicI64,
    pub sent: Mutex<Vec<OutgoingMessage>>,
    pub documents: Mutex<Vec<(i64, Document)>>,
    pub answered: Mutex<Vec<(String, Option<String>)>>,
    pub deleted: Mutex<Vec<(i64, i64)>>,
    /// Number of upcoming sends that fail.
    pub fail_next: AtomicU32,
    /// Every send fails while set.
    pub fail_all: AtomicBool,
    /// Document uploads fail while set.
    pub fail_documents: AtomicBool,
    updates: Mutex<Option<mpsc::Receiver<Update>>>,
    pub stopped: AtomicBool,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(100),
            ..Default::default()
        }
    }

    /// A channel whose `start()` yields `updates` and then closes.
    pub fn with_updates(updates: Vec<Update>) -> Self {
        let (tx, rx) = mpsc::channel(updates.len().max(1));
        for update in updates {
            tx.try_send(update).unwrap();
        }
        let channel = Self::new();
        *channel.updates.lock().unwrap() = Some(rx);
        channel
    }

    /// Texts of all sent messages, in order.
    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn last_sent(&self) -> Option<OutgoingMessage> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Channel for FakeChannel {
    fn name(&self) -> &str {
        "fake"
    }

    async fn start(&self) -> Result<mpsc::Receiver<Update>, HabitError> {
        match self.updates.lock().unwrap().take() {
            Some(rx) => Ok(rx),
            None => {
                let (_tx, rx) = mpsc::channel(1);
                Ok(rx)
            }
        }
    }

    async fn send(&self, message: OutgoingMessage) -> Result<MessageHandle, HabitError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(HabitError::Channel("fake send failure".into()));
        }
        let failing = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(HabitError::Channel("fake send failure".into()));
        }

        let handle = MessageHandle {
            chat_id: message.chat_id,
            message_id: self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        self.sent.lock().unwrap().push(message);
        Ok(handle)
    }

    async fn send_document(&self, chat_id: i64, document: Document) -> Result<(), HabitError> {
        if self.fail_documents.load(Ordering::SeqCst) {
            return Err(HabitError::Channel("fake upload failure".into()));
        }
        self.documents.lock().unwrap().push((chat_id, document));
        Ok(())
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
    ) -> Result<(), HabitError> {
        self.answered
            .lock()
            .unwrap()
            .push((callback_id.to_string(), text.map(str::to_string)));
        Ok(())
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), HabitError> {
        self.deleted.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }

    async fn stop(&self) -> Result<(), HabitError> {
        self.stopped.store(true, Ordering::SeqCst);
        Ok(())
    }
}
