//! Services shared by every request handler.

use empire_accounts::{ModerationService, ReportAggregator};
use empire_db::Db;
use empire_license::{
    Activator, KeyGenerator, LicenseIssuer, OrderBook, RandomKeyGenerator, DEFAULT_MAIL_TIMEOUT,
};
use empire_mail::EmailSender;
use empire_saves::SaveStore;
use std::sync::Arc;
use std::time::Duration;

/// Runtime settings that are not part of the store.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Shared credential for `/api/admin/*`.
    pub admin_token: String,
    /// Bound on the license email send during approval.
    pub mail_timeout: Duration,
}

impl ServerConfig {
    pub fn new(admin_token: impl Into<String>) -> Self {
        Self {
            admin_token: admin_token.into(),
            mail_timeout: DEFAULT_MAIL_TIMEOUT,
        }
    }
}

/// Axum state: one instance of every service, all backed by the same store.
#[derive(Clone)]
pub struct AppState {
    pub(crate) db: Db,
    pub(crate) orders: OrderBook,
    pub(crate) issuer: Arc<LicenseIssuer>,
    pub(crate) activator: Activator,
    pub(crate) reports: ReportAggregator,
    pub(crate) moderation: ModerationService,
    pub(crate) saves: SaveStore,
    pub(crate) admin_token: Arc<str>,
}

impl AppState {
    pub fn new(db: Db, mailer: Arc<dyn EmailSender>, config: ServerConfig) -> Self {
        Self::with_key_generator(db, mailer, Arc::new(RandomKeyGenerator), config)
    }

    pub fn with_key_generator(
        db: Db,
        mailer: Arc<dyn EmailSender>,
        keys: Arc<dyn KeyGenerator>,
        config: ServerConfig,
    ) -> Self {
        let issuer =
            LicenseIssuer::new(db.clone(), mailer, keys).with_mail_timeout(config.mail_timeout);
        Self {
            orders: OrderBook::new(db.clone()),
            issuer: Arc::new(issuer),
            activator: Activator::new(db.clone()),
            reports: ReportAggregator::new(db.clone()),
            moderation: ModerationService::new(db.clone()),
            saves: SaveStore::new(db.clone()),
            admin_token: Arc::from(config.admin_token),
            db,
        }
    }
}
