//! Latest-feedback lookup in Firestore.
//!
//! Each step (secrets, certificate, client, query, read) fails with its own
//! [`FeedbackError`] variant so the caller can tell them apart.

pub mod client;
pub mod credentials;
pub mod error;
pub mod fetch;
pub mod store;

pub use client::FirebaseApp;
pub use credentials::{Certificate, SecretsSource, ServiceAccount, SERVICE_ACCOUNT_KEY};
pub use error::FeedbackError;
pub use fetch::{
    fetch_latest_feedback, load_feedback, report_feedback, show_feedback, FeedbackSource, FirestoreFeedback,
    StoreFeedback, NO_FEEDBACK,
};
pub use store::{Document, DocumentStore, FeedbackDocument, FirestoreStore, MemoryStore};
