use crate::transport::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NdviError {
    #[error("No {product} band name contains '{band_contains}'")]
    NoBandMatch {
        product: String,
        band_contains: String,
    },

    #[error("Date list request failed for site '{site}'")]
    Dates {
        site: String,
        #[source]
        source: FetchError,
    },

    #[error("No acquisition dates resolved for site '{site}'")]
    NoDates { site: String },

    #[error("Subset request failed for site '{site}'")]
    Subset {
        site: String,
        #[source]
        source: FetchError,
    },
}
