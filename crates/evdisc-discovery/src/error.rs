use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid catalog: {0}")]
    Validation(String),

    #[error("event catalog unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("page must be >= 1 and page size must be > 0 (got page={page}, page_size={page_size})")]
    InvalidPage { page: usize, page_size: usize },

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}
