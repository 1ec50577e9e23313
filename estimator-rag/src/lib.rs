//! # estimator-rag
//!
//! Knowledge base of historical estimations and the embedding lookups the
//! retriever runs against it.
//!
//! Stored rows are one (template, epic, task, platform) hour figure each,
//! carrying the embedding of the epic name. A search ranks epics by cosine
//! similarity of that embedding to a query embedding and rebuilds each hit as
//! an [`Epic`](estimator_core::Epic) with historical tasks.
//!
//! ## Features
//!
//! | Feature  | What it enables                                |
//! |----------|------------------------------------------------|
//! | `openai` | `OpenAIEmbeddingProvider` via reqwest          |
//! | `sqlite` | `SqliteKnowledgeBase` via sqlx                 |
//! | `full`   | All of the above                               |

pub mod embedding;
pub mod error;
pub mod import;
pub mod inmemory;
pub mod knowledge_base;
pub mod mock;
pub mod record;
pub mod similarity;

#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use error::{RagError, Result};
pub use import::{ImportSummary, TemplateDocument, import_template};
pub use inmemory::InMemoryKnowledgeBase;
pub use knowledge_base::KnowledgeBase;
pub use mock::MockEmbeddingProvider;
pub use record::{KnowledgeBaseStats, KnowledgeRecord, ScoredEpic};
pub use similarity::cosine_similarity;

#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteKnowledgeBase;
