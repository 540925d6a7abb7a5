use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Missing {0} configuration")]
    MissingConfig(&'static str),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidConfig { key: String, value: String },
}
