use thiserror::Error;

/// フィードバック取得の各ステップの失敗。表示文言は UI 向け（イタリア語）。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedbackError {
    /// secrets が読めない・見つからない
    #[error("Errore nella lettura delle credenziali: {0}")]
    Credentials(String),

    /// サービスアカウントの項目が欠けている・鍵が壊れている
    #[error("Errore nella conversione delle credenziali: {0}")]
    Certificate(String),

    /// クライアント初期化・トークン取得の失敗
    #[error("Errore nello stabilire una connessione: {0}")]
    Connection(String),

    /// クエリ送信の失敗
    #[error("Errore nel recupero del feedback: {0}")]
    Query(String),

    /// 結果ドキュメントの読み取り失敗
    #[error("Errore nella scrittura del feedback: {0}")]
    Read(String),
}

impl FeedbackError {
    pub fn step(&self) -> &'static str {
        match self {
            FeedbackError::Credentials(_) => "credentials",
            FeedbackError::Certificate(_) => "certificate",
            FeedbackError::Connection(_) => "connection",
            FeedbackError::Query(_) => "query",
            FeedbackError::Read(_) => "read",
        }
    }
}
