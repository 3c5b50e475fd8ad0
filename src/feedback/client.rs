use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, OnceLock};
use std::time::Duration as StdDuration;

use super::credentials::Certificate;
use super::error::FeedbackError;

/// Firestore の読み取りに必要なスコープ
pub const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";

const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// 期限切れ直前のトークンは使わない
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;
const HTTP_TIMEOUT_SECS: u64 = 30;

static APP: OnceLock<FirebaseApp> = OnceLock::new();

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// プロセスで 1 つだけ作られる認証済みクライアント
pub struct FirebaseApp {
    certificate: Certificate,
    http: Client,
    token: Mutex<Option<AccessToken>>,
}

impl FirebaseApp {
    /// 初回だけクライアントを作る。2 回目以降は既存のものを返す。
    pub fn initialize(certificate: Certificate) -> Result<&'static FirebaseApp, FeedbackError> {
        if let Some(app) = APP.get() {
            log::debug!("firebase app already initialized");
            return Ok(app);
        }

        let app = FirebaseApp::new(certificate)?;
        log::info!("firebase app initialized for project {}", app.project_id());
        Ok(APP.get_or_init(|| app))
    }

    /// シングルトンに登録しないクライアント
    pub fn new(certificate: Certificate) -> Result<Self, FeedbackError> {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| FeedbackError::Connection(e.to_string()))?;
        Ok(Self::with_client(certificate, http))
    }

    pub fn with_client(certificate: Certificate, http: Client) -> Self {
        Self {
            certificate,
            http,
            token: Mutex::new(None),
        }
    }

    /// 初期化済みならそのハンドル
    pub fn get() -> Option<&'static FirebaseApp> {
        APP.get()
    }

    pub fn project_id(&self) -> &str {
        self.certificate.project_id()
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// OAuth2 アクセストークン。キャッシュが有効ならそれを返す。
    pub fn access_token(&self) -> Result<String, FeedbackError> {
        let mut cached = self.token.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.value.clone());
        }

        let token = self.exchange_token(now)?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// JWT bearer grant でトークンを取得
    fn exchange_token(&self, now: DateTime<Utc>) -> Result<AccessToken, FeedbackError> {
        let assertion = signed_assertion(&self.certificate, now)?;
        let account = &self.certificate.account;

        let response = self
            .http
            .post(&account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .map_err(|e| FeedbackError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FeedbackError::Connection(format!("token endpoint returned {status}: {body}")));
        }

        let token: TokenResponse = response
            .json()
            .map_err(|e| FeedbackError::Connection(e.to_string()))?;
        log::debug!("obtained access token valid for {}s", token.expires_in);

        Ok(AccessToken {
            value: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

/// トークンエンドポイントに送る RS256 署名済みアサーション
pub fn signed_assertion(certificate: &Certificate, now: DateTime<Utc>) -> Result<String, FeedbackError> {
    let account = &certificate.account;
    let claims = AssertionClaims {
        iss: &account.client_email,
        scope: DATASTORE_SCOPE,
        aud: &account.token_uri,
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(account.private_key_id.clone());

    encode(&header, &claims, &certificate.key).map_err(|e| FeedbackError::Certificate(e.to_string()))
}
