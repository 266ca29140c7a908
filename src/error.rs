//! Error types for the Daymare runtime.
//!
//! Every error carries a stable code so hosts can match on failures without
//! parsing messages:
//!
//! | Error | Code prefix |
//! |-------|-------------|
//! | [`ScopeError`] | `DM-ERR-SCOPE` |
//! | [`FetchError`] | `DM-ERR-FETCH` |
//! | [`SessionError`] | `DM-ERR-SESSION` |
//! | [`ComponentError`] | `DM-ERR-COMPONENT` |
//! | [`ConfigError`] | `DM-ERR-CONFIG` |

use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// RENDERING SCOPE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum ScopeError {
    /// The host already owns a rendering scope.
    #[error("rendering scope already attached to <{host}>")]
    AlreadyAttached { host: String },

    /// The host node is not an element.
    #[error("rendering scope host must be an element")]
    NotAnElement,
}

impl ScopeError {
    pub fn code(&self) -> &'static str {
        match self {
            ScopeError::AlreadyAttached { .. } => "DM-ERR-SCOPE-001",
            ScopeError::NotAnElement => "DM-ERR-SCOPE-002",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REMOTE CALLS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum FetchError {
    /// Network or HTTP-level failure before a body was read.
    #[error("transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The response body was not valid JSON.
    #[error("response from {url} is not JSON: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The URL could not be resolved against the API base.
    #[error("invalid request url: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    pub fn code(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "DM-ERR-FETCH-001",
            FetchError::Parse { .. } => "DM-ERR-FETCH-002",
            FetchError::InvalidUrl(_) => "DM-ERR-FETCH-003",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION STORE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session storage i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("session token could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

impl SessionError {
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Io(_) => "DM-ERR-SESSION-001",
            SessionError::Encode(_) => "DM-ERR-SESSION-002",
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENTS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum ComponentError {
    /// `on_mount` was requested for an instance that already ran it.
    #[error("component <{0}> is already mounted")]
    AlreadyMounted(String),

    /// A node the component relies on is missing from its scope.
    #[error("component <{tag}> has no node matching `{selector}`")]
    MissingNode { tag: String, selector: String },

    /// The page that owned this component has been dropped.
    #[error("page is no longer alive")]
    Detached,

    /// The UI executor refused a continuation.
    #[error("failed to schedule continuation: {0}")]
    Spawn(String),

    /// No variant is registered for the element's tag.
    #[error("no component registered for <{0}>")]
    Unregistered(String),

    /// A request payload could not be encoded as JSON.
    #[error("request payload could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ComponentError {
    pub fn code(&self) -> &'static str {
        match self {
            ComponentError::AlreadyMounted(_) => "DM-ERR-COMPONENT-001",
            ComponentError::MissingNode { .. } => "DM-ERR-COMPONENT-002",
            ComponentError::Detached => "DM-ERR-COMPONENT-003",
            ComponentError::Spawn(_) => "DM-ERR-COMPONENT-004",
            ComponentError::Unregistered(_) => "DM-ERR-COMPONENT-005",
            ComponentError::Encode(_) => "DM-ERR-COMPONENT-006",
            ComponentError::Scope(e) => e.code(),
            ComponentError::Fetch(e) => e.code(),
            ComponentError::Session(e) => e.code(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config i/o failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("config could not be serialised: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("no data directory available for session storage")]
    NoDataDir,
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Io(_) => "DM-ERR-CONFIG-001",
            ConfigError::Parse(_) => "DM-ERR-CONFIG-002",
            ConfigError::Serialize(_) => "DM-ERR-CONFIG-003",
            ConfigError::NoDataDir => "DM-ERR-CONFIG-004",
        }
    }
}
