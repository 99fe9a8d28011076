//! Service layer for the harvester.
//!
//! This module contains the business logic for:
//! - Session establishment and re-verification (`SessionManager`)
//! - Lazy-loading pagination (`PaginatedCollector`)
//! - Container extraction (`RecordExtractor`) built from field rules

mod collector;
mod extractor;
pub mod rules;
mod session;

pub use collector::PaginatedCollector;
pub use extractor::RecordExtractor;
pub use session::{SessionManager, SessionStatus};
