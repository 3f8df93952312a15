use thiserror::Error;

use crate::model::{AnswerError, AnswerStoreError, CatalogError};
use crate::navigation::NavigationError;

/// Umbrella error for callers that do not care which layer of the domain rejected them.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    AnswerStore(#[from] AnswerStoreError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
}
