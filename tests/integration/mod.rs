// Integration tests for pricedrop-watcher
// These tests drive the router end to end with in-memory storage and fake
// external services.

pub mod api_tests;
pub mod price_check_tests;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request},
    response::Response,
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use pricedrop_watcher::{
    auth::{AuthProvider, Claims, Session, UserDirectory},
    config::{
        AppConfig, AuthConfig, CronConfig, DatabaseConfig, EmailProvider, NotificationsConfig,
        ResendConfig, SchedulerConfig, ScraperConfig, ServerConfig, SmtpConfig,
    },
    database::Database,
    plugins::traits::{
        NotificationResult, Notifier, PriceDropAlert, ProductScraper, ScrapedPrice, ScrapedProduct,
    },
    web::{create_router, AppState, Collaborators},
    AppError,
};

pub const CRON_SECRET: &str = "test-cron-secret";
pub const JWT_SECRET: &str = "test-jwt-secret-with-enough-length";
pub const GOOD_CODE: &str = "good-code";

/// Test configuration for integration tests
pub fn get_test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            request_timeout: 5,
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout: 5,
        },
        auth: AuthConfig {
            url: "http://auth.invalid".to_string(),
            service_role_key: "service-role-key".to_string(),
            jwt_secret: JWT_SECRET.to_string(),
            jwt_audience: "authenticated".to_string(),
        },
        cron: CronConfig {
            secret: CRON_SECRET.to_string(),
        },
        scraper: ScraperConfig {
            api_key: "fc-test".to_string(),
            base_url: "http://scrape.invalid".to_string(),
            request_timeout: 5,
        },
        notifications: NotificationsConfig {
            provider: EmailProvider::Resend,
            from_address: "alerts@example.com".to_string(),
            resend: ResendConfig {
                api_key: Some("re_test".to_string()),
                base_url: "http://email.invalid".to_string(),
                request_timeout: 5,
            },
            smtp: SmtpConfig {
                host: None,
                port: 587,
                username: None,
                password: None,
                use_tls: true,
            },
        },
        scheduler: SchedulerConfig {
            enabled: false,
            cron: "0 0 */6 * * *".to_string(),
        },
    }
}

/// Scraper that answers from a URL-keyed table; unknown URLs extract nothing.
#[derive(Default)]
pub struct FakeScraper {
    pages: Mutex<HashMap<String, ScrapedProduct>>,
    calls: Mutex<usize>,
    delay: Mutex<Duration>,
}

impl FakeScraper {
    pub fn set_price(&self, url: &str, name: &str, price: &str) {
        self.pages.lock().unwrap().insert(
            url.to_string(),
            ScrapedProduct {
                name: Some(name.to_string()),
                price: Some(ScrapedPrice::Amount(price.parse().unwrap())),
                currency: Some("USD".to_string()),
                image_url: None,
            },
        );
    }

    pub fn set_page(&self, url: &str, page: ScrapedProduct) {
        self.pages.lock().unwrap().insert(url.to_string(), page);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    /// Makes every scrape take at least `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }
}

#[async_trait]
impl ProductScraper for FakeScraper {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn scrape(&self, url: &str) -> pricedrop_watcher::Result<Option<ScrapedProduct>> {
        *self.calls.lock().unwrap() += 1;
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(self.pages.lock().unwrap().get(url).cloned())
    }
}

/// Accepts `GOOD_CODE` and knows a fixed set of user emails.
#[derive(Default)]
pub struct FakeAuth {
    emails: Mutex<HashMap<String, String>>,
    verifiers: Mutex<Vec<Option<String>>>,
}

impl FakeAuth {
    pub fn add_user(&self, user_id: &str, email: &str) {
        self.emails
            .lock()
            .unwrap()
            .insert(user_id.to_string(), email.to_string());
    }

    pub fn seen_verifiers(&self) -> Vec<Option<String>> {
        self.verifiers.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn exchange_code(&self, code: &str, code_verifier: Option<&str>) -> pricedrop_watcher::Result<Session> {
        self.verifiers
            .lock()
            .unwrap()
            .push(code_verifier.map(str::to_string));

        if code != GOOD_CODE {
            return Err(AppError::Auth("invalid grant".to_string()));
        }
        Ok(Session {
            access_token: token_for("user-a"),
            refresh_token: Some("refresh-token".to_string()),
            expires_in: Some(3600),
        })
    }
}

#[async_trait]
impl UserDirectory for FakeAuth {
    async fn user_email(&self, user_id: &str) -> pricedrop_watcher::Result<Option<String>> {
        Ok(self.emails.lock().unwrap().get(user_id).cloned())
    }
}

/// Records every alert instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, PriceDropAlert)>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<(String, PriceDropAlert)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send_price_drop(&self, to: &str, alert: &PriceDropAlert) -> pricedrop_watcher::Result<NotificationResult> {
        self.sent.lock().unwrap().push((to.to_string(), alert.clone()));
        Ok(NotificationResult::sent(Some(format!("msg-{}", self.sent.lock().unwrap().len()))))
    }
}

pub struct TestApp {
    pub state: AppState,
    pub db: Database,
    pub scraper: Arc<FakeScraper>,
    pub auth: Arc<FakeAuth>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }
}

/// Create test app state with in-memory storage and fake collaborators
pub async fn create_test_app() -> anyhow::Result<TestApp> {
    let config = get_test_config();
    let db = Database::open(&config.database).await?;

    let scraper = Arc::new(FakeScraper::default());
    let auth = Arc::new(FakeAuth::default());
    let notifier = Arc::new(RecordingNotifier::default());

    let collaborators = Collaborators {
        scraper: scraper.clone(),
        auth: auth.clone(),
        users: auth.clone(),
        notifier: notifier.clone(),
    };
    let state = AppState::new(config, db.clone(), collaborators);

    Ok(TestApp {
        state,
        db,
        scraper,
        auth,
        notifier,
    })
}

/// Session token the app accepts for `user_id`.
pub fn token_for(user_id: &str) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        email: Some(format!("{}@example.com", user_id)),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        aud: Some("authenticated".to_string()),
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes()))
        .expect("test token encodes")
}

/// Helper to make HTTP requests to the test app
pub async fn make_request(
    app: Router,
    method: Method,
    uri: &str,
    headers: &[(&str, String)],
    body: Option<Value>,
) -> anyhow::Result<Response> {
    let mut request = Request::builder().method(method).uri(uri);

    for (name, value) in headers {
        request = request.header(*name, value.as_str());
    }
    if body.is_some() {
        request = request.header(header::CONTENT_TYPE, "application/json");
    }

    let request = request.body(match body {
        Some(json) => Body::from(json.to_string()),
        None => Body::empty(),
    })?;

    Ok(app.oneshot(request).await?)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("authorization", format!("Bearer {}", token))
}

pub async fn read_json(response: Response) -> anyhow::Result<Value> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
