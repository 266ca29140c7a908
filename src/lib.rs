//! # Daymare runtime
//!
//! A client-side component runtime for the Daymare blog. A [`Page`] mounts
//! custom-element components, each rendering into its own isolated scope,
//! and lets them talk only through a two-tier event bus. Article data comes
//! from a remote JSON API behind a pluggable [`Transport`]; a persisted
//! session token with a time-to-live decides whether the editor or the
//! login form is shown.
//!
//! ## Runtime Invariants
//!
//! 1. **Isolated scopes**: a component's template is cloned into a detached
//!    subtree. Selectors and style rules never cross its boundary in either
//!    direction (`DM-ERR-SCOPE-001` on a second attach).
//!
//! 2. **Explicit event tiers**: `emit_local` reaches only listeners on the
//!    emitting instance; `emit_global` reaches every instance through the
//!    single bus the page injects. Delivery is synchronous, in
//!    subscription order.
//!
//! 3. **Mount once**: render, connect the scope's children, then run
//!    `on_mount`, exactly once per instance (`DM-ERR-COMPONENT-001`).
//!
//! 4. **Lazy session expiry**: a token at or past `expiresAt` is purged on
//!    the read that notices it. Malformed slots read as empty.
//!
//! 5. **One UI thread**: every continuation runs on the page's local
//!    executor. Remote calls have no retry, timeout or cancellation; a
//!    failed call is a rejected future for its caller to observe.
//!
//! ## Example
//!
//! ```no_run
//! use daymare::{logging, Page, RuntimeConfig};
//!
//! let config = RuntimeConfig::load_from(std::path::Path::new("daymare.toml"))?;
//! logging::init(&config.log_filter);
//! let mut page = Page::from_config(&config)?;
//! page.mount_root("dm-root")?;
//! page.run();
//! println!("{}", page.snapshot());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod bus;
mod component;
pub mod components;
mod config;
pub mod dom;
mod error;
mod fetch;
pub mod logging;
mod markdown;
mod model;
mod page;
mod scope;
pub mod selector;
mod session;
mod style;
pub mod testing;

#[cfg(test)]
mod scenario_tests;
#[cfg(test)]
mod scope_tests;

pub use bus::{
    Event, EventBus, EventRouter, EventScope, Listener, ARTICLE_CREATED, AUTH_VERIFIED,
    INDEX_REFRESHED,
};
pub use component::{
    Component, ComponentContext, Constructor, InsertPosition, Registry, Services,
};
pub use components::{AuthState, LoginStep};
pub use config::{RuntimeConfig, DEFAULT_API_BASE};
pub use error::{ComponentError, ConfigError, FetchError, ScopeError, SessionError};
#[cfg(feature = "http")]
pub use fetch::HttpTransport;
pub use fetch::{
    request_json, resolve_url, HttpRequest, HttpResponse, Method, RequestOptions, Transport,
};
pub use markdown::{ComrakMarkdown, MarkdownRenderer, Metadata, Rendered};
pub use model::{articles_from_payload, Article, ArticleId, ArticleMetadata, NewArticle, SessionToken};
pub use page::Page;
pub use scope::{RenderScope, ShadowRoot, TemplateCache};
pub use session::{
    Clock, FileStorage, MemoryStorage, SessionStore, SlotStorage, SystemClock, DEFAULT_TTL_DAYS,
    SESSION_KEY,
};
pub use style::{ComputedStyle, Declaration, StyleRule, StyleSheet};
