use super::client::FirebaseApp;
use super::credentials::{Certificate, SecretsSource};
use super::error::FeedbackError;
use super::store::{DocumentStore, FeedbackDocument, FirestoreStore};
use crate::config::FeedbackConfig;
use crate::status::StatusBoard;

/// コレクションが空のときに表示する文言
pub const NO_FEEDBACK: &str = "Nessun feedback disponibile.";

pub const FEEDBACK_LABEL: &str = "Feedback";

/// 最新のフィードバック本文。1 件も無ければ `NO_FEEDBACK`。
pub fn fetch_latest_feedback<S: DocumentStore>(
    store: &S,
    config: &FeedbackConfig,
) -> Result<String, FeedbackError> {
    let docs = store.latest(&config.collection, &config.order_by, 1)?;
    match docs.first() {
        Some(doc) => {
            let feedback = FeedbackDocument::from_document(doc, &config.order_by)?;
            log::info!(
                "latest feedback {} ({})",
                doc.name,
                feedback
                    .timestamp
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "no timestamp".to_string())
            );
            Ok(feedback.content)
        }
        None => Ok(NO_FEEDBACK.to_string()),
    }
}

/// 資格情報の読み込みから結果の読み取りまで全ステップを実行
pub fn load_feedback(secrets: &SecretsSource, config: &FeedbackConfig) -> Result<String, FeedbackError> {
    let raw = secrets.read()?;
    let certificate = Certificate::from_value(&raw)?;
    let app = FirebaseApp::initialize(certificate)?;
    let store = FirestoreStore::new(app, &config.firestore_base_url);
    fetch_latest_feedback(&store, config)
}

/// 結果を表示する。失敗はエラーバナーのみ、成功時は読み取り専用テキストエリア。
/// 本文が空なら何も表示しない。
pub fn report_feedback<B: StatusBoard>(
    result: Result<String, FeedbackError>,
    status: &mut B,
) -> Option<String> {
    match result {
        Ok(content) if content.is_empty() => {
            log::info!("latest feedback is empty, nothing to show");
            None
        }
        Ok(content) => {
            status.text_area(FEEDBACK_LABEL, &content);
            Some(content)
        }
        Err(e) => {
            log::warn!("feedback fetch failed at {} step", e.step());
            status.error(&e.to_string());
            None
        }
    }
}

/// フィードバックの取得元
pub trait FeedbackSource {
    fn fetch(&self) -> Result<String, FeedbackError>;
}

/// secrets → Firestore の本番経路
#[derive(Debug, Clone)]
pub struct FirestoreFeedback {
    pub secrets: SecretsSource,
    pub config: FeedbackConfig,
}

impl FeedbackSource for FirestoreFeedback {
    fn fetch(&self) -> Result<String, FeedbackError> {
        load_feedback(&self.secrets, &self.config)
    }
}

/// 任意の DocumentStore から読む
pub struct StoreFeedback<'a, S: DocumentStore> {
    pub store: &'a S,
    pub config: FeedbackConfig,
}

impl<S: DocumentStore> FeedbackSource for StoreFeedback<'_, S> {
    fn fetch(&self) -> Result<String, FeedbackError> {
        fetch_latest_feedback(self.store, &self.config)
    }
}

pub fn show_feedback<F: FeedbackSource, B: StatusBoard>(source: &F, status: &mut B) -> Option<String> {
    report_feedback(source.fetch(), status)
}
