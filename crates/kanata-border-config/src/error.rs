use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(kanata_border::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    /// A value is present but not acceptable
    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(kanata_border::config::invalid))]
    Invalid {
        message: String,
        #[source_code]
        src: String,
        #[label("this value")]
        span: miette::SourceSpan,
    },

    /// A node lacks an argument it cannot do without
    #[error("Missing required field: {field}")]
    #[diagnostic(code(kanata_border::config::missing_field))]
    MissingField {
        field: String,
        #[source_code]
        src: String,
        #[label("in this node")]
        span: miette::SourceSpan,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Byte range in the config source this error points at, if any
    pub fn span(&self) -> Option<miette::SourceSpan> {
        match self {
            Self::ParseError { span, .. }
            | Self::Invalid { span, .. }
            | Self::MissingField { span, .. } => Some(*span),
            Self::Io(_) => None,
        }
    }
}
