use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("malformed storage value: need {expected} bytes, found {actual}")]
    MalformedStorage { expected: usize, actual: usize },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("invalid key material: {0}")]
    InvalidKey(&'static str),

    #[error("invalid address encoding: {0}")]
    AddressEncoding(String),
}

impl From<hex::FromHexError> for WalletError {
    fn from(err: hex::FromHexError) -> Self {
        Self::Parse(err.to_string())
    }
}
