//! Shared helpers for HTTP API tests.

#![allow(dead_code)]

use async_trait::async_trait;
use empire_db::Db;
use empire_mail::{EmailMessage, EmailSender, MailError, MailResult};
use empire_server::{build_router, AppState, ServerConfig};
use std::sync::{Arc, Mutex};

pub const ADMIN_TOKEN: &str = "test-admin-token";

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, EmailMessage)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, EmailMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, to: &str, message: &EmailMessage) -> MailResult<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), message.clone()));
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait]
impl EmailSender for FailingMailer {
    async fn send(&self, _to: &str, _message: &EmailMessage) -> MailResult<()> {
        Err(MailError::Rejected {
            status: 500,
            body: "down".into(),
        })
    }
}

pub struct TestServer {
    pub base: String,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn post(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client.get(self.url(path)).send().await.unwrap()
    }

    pub async fn admin_post(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn admin_get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(ADMIN_TOKEN)
            .send()
            .await
            .unwrap()
    }

    pub async fn admin_delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .header("x-admin-token", ADMIN_TOKEN)
            .send()
            .await
            .unwrap()
    }
}

/// Spin up the HTTP server on an OS-assigned port.
pub async fn spawn_test_server(mailer: Arc<dyn EmailSender>) -> TestServer {
    let db = Db::open_in_memory().unwrap();
    let state = AppState::new(db, mailer, ServerConfig::new(ADMIN_TOKEN));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
    }
}

pub async fn json(resp: reqwest::Response) -> serde_json::Value {
    resp.json().await.unwrap()
}
