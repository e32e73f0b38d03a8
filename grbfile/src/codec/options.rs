//! Write and read configuration

/// Default producer identifier written into the ASCII header
pub const DEFAULT_USER_AGENT: &str = concat!("grbfile-", env!("CARGO_PKG_VERSION"));

/// Stream compression applied by the path helpers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    /// gzip with a level from 0 (store) to 9 (best)
    Gzip(u32),
}

impl Compression {
    /// gzip at the default level
    pub fn gzip() -> Self {
        Compression::Gzip(6)
    }
}

/// Configuration for writing a matrix file
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOptions {
    /// Free-form text for the last header line
    pub comment: Option<String>,
    /// Producer identifier on the version line
    pub user_agent: String,
    pub compression: Compression,
}

impl WriteOptions {
    /// Set the header comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set the producer identifier
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            comment: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            compression: Compression::None,
        }
    }
}

/// Configuration for reading a matrix file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOptions {
    pub compression: Compression,
}

impl ReadOptions {
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let options = WriteOptions::default()
            .with_comment("generated")
            .with_user_agent("bench")
            .with_compression(Compression::gzip());
        assert_eq!(options.comment.as_deref(), Some("generated"));
        assert_eq!(options.user_agent, "bench");
        assert_eq!(options.compression, Compression::Gzip(6));

        assert_eq!(ReadOptions::default().compression, Compression::None);
    }

    #[test]
    fn test_default_user_agent() {
        assert!(WriteOptions::default().user_agent.starts_with("grbfile-"));
    }
}
