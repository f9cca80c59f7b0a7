use crate::fourcc::BoxKey;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("truncated input: {needed} bytes needed at offset {offset}, {remaining} remain")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("offset {offset} past end of buffer (length {len})")]
    InvalidOffset { offset: usize, len: usize },

    #[error("malformed container: {0}")]
    MalformedContainer(String),

    #[error("box {0} is not a container")]
    NotAContainer(BoxKey),

    #[error("value {0:#x} does not fit in a 28-bit synchsafe integer")]
    EncodingRange(u32),
}

pub type Result<T> = std::result::Result<T, Error>;
