//! In-memory user source for directory tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use userdir::{FetchGateway, NetworkError, PageRequest, PersonName, UserRecord};

pub enum Reply {
    Page(Vec<UserRecord>),
    Fail(NetworkError),
    /// Answer with the page only once the paired [`HoldHandle`] releases it.
    Held(Vec<UserRecord>, Hold),
}

pub struct Hold {
    entered: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

pub struct HoldHandle {
    entered: oneshot::Receiver<()>,
    release: oneshot::Sender<()>,
}

pub fn hold() -> (Hold, HoldHandle) {
    let (entered_tx, entered_rx) = oneshot::channel();
    let (release_tx, release_rx) = oneshot::channel();
    (
        Hold {
            entered: entered_tx,
            release: release_rx,
        },
        HoldHandle {
            entered: entered_rx,
            release: release_tx,
        },
    )
}

impl HoldHandle {
    /// Waits until the gateway is sitting on the held request.
    pub async fn entered(&mut self) {
        (&mut self.entered).await.expect("held request never arrived");
    }

    pub fn release(self) {
        let _ = self.release.send(());
    }
}

#[derive(Clone, Default)]
pub struct ScriptedGateway {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    calls: Arc<Mutex<Vec<u32>>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Reply>) -> Self {
        ScriptedGateway {
            replies: Arc::new(Mutex::new(replies.into())),
            calls: Arc::default(),
        }
    }

    /// Cursors requested so far, in call order.
    pub fn calls(&self) -> Vec<u32> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl FetchGateway for ScriptedGateway {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<UserRecord>, NetworkError> {
        self.calls.lock().push(request.cursor.get());
        let reply = self.replies.lock().pop_front();
        match reply {
            Some(Reply::Page(page)) => Ok(page),
            Some(Reply::Fail(e)) => Err(e),
            Some(Reply::Held(page, hold)) => {
                let _ = hold.entered.send(());
                let _ = hold.release.await;
                Ok(page)
            }
            None => panic!("unexpected fetch of page {}", request.cursor),
        }
    }
}

pub fn user(key: &str, first: &str, last: &str) -> UserRecord {
    UserRecord {
        email: key.to_owned(),
        name: PersonName {
            first: first.to_owned(),
            last: last.to_owned(),
        },
        phone: "555-0100".to_owned(),
        ..UserRecord::default()
    }
}

/// `n` users keyed `<prefix><i>@example.com`, i from 1.
pub fn page(prefix: &str, n: usize) -> Vec<UserRecord> {
    (1..=n)
        .map(|i| user(&format!("{}{}@example.com", prefix, i), &format!("{}{}", prefix, i), "Durand"))
        .collect()
}

pub fn keys(users: &[UserRecord]) -> Vec<String> {
    users.iter().map(|u| u.key().to_owned()).collect()
}
