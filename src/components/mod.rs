//! Component Catalog.
//!
//! The eight Daymare components. The page-level composition is a shallow
//! static tree rooted at `dm-root`; the only dynamic state lives in the
//! header (auth display) and the login form (two-step flow).
//!
//! ```text
//! dm-root
//! ├── dm-header ── dm-info, dm-login | dm-editor
//! ├── dm-body ──── dm-article*
//! └── dm-footer
//! ```

mod article;
mod body;
mod editor;
mod footer;
mod header;
mod info;
mod login;
mod root;

pub use header::AuthState;
pub use login::LoginStep;

use crate::component::Registry;

pub fn register_all(registry: &mut Registry) {
    registry.register(root::TAG, root::create);
    registry.register(header::TAG, header::create);
    registry.register(info::TAG, info::create);
    registry.register(footer::TAG, footer::create);
    registry.register(body::TAG, body::create);
    registry.register(article::TAG, article::create);
    registry.register(editor::TAG, editor::create);
    registry.register(login::TAG, login::create);
}

pub mod tags {
    pub use super::article::TAG as ARTICLE;
    pub use super::body::TAG as BODY;
    pub use super::editor::TAG as EDITOR;
    pub use super::footer::TAG as FOOTER;
    pub use super::header::TAG as HEADER;
    pub use super::info::TAG as INFO;
    pub use super::login::TAG as LOGIN;
    pub use super::root::TAG as ROOT;
}
