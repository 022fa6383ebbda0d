use thiserror::Error;

use crate::model::{ParseIdError, RatingError};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
    #[error(transparent)]
    Rating(#[from] RatingError),
}
