use serde_json::Value;
use std::cell::Cell;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

use crate::bus::AUTH_VERIFIED;
use crate::component::{Component, ComponentContext, InsertPosition};
use crate::dom;
use crate::error::ComponentError;
use crate::model::SessionToken;

use super::{editor, login};

pub const TAG: &str = "dm-header";

// `color #666` is missing its colon and is dropped as a malformed declaration.
const TEMPLATE: &str = r#"<style>:host div { color #666 }</style>
      <h1>Daymare</h1>
      <div>How Can a Daylight Know The Darkness Of Night</div>
      <dm-info></dm-info>
      <section class="auth"></section>"#;

/// What the auth section of the header shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No live session: the login form is shown.
    Anonymous,
    /// A live session exists: the editor is shown.
    Authenticated,
}

impl AuthState {
    fn label(self) -> &'static str {
        match self {
            AuthState::Anonymous => "anonymous",
            AuthState::Authenticated => "authenticated",
        }
    }
}

/// Title block plus the auth display state machine.
///
/// The initial state is read from the session store once, at mount. The
/// only transition is `Anonymous -> Authenticated`, taken when a global
/// `auth-verified` event arrives with a session token.
pub struct Header {
    state: Cell<AuthState>,
}

pub fn create() -> Rc<dyn Component> {
    Rc::new(Header {
        state: Cell::new(AuthState::Anonymous),
    })
}

impl Component for Header {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn on_mount(self: Rc<Self>, ctx: &Rc<ComponentContext>) -> Result<(), ComponentError> {
        let initial = if ctx.session().get().is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        };
        self.show(ctx, initial)?;

        let weak = Rc::downgrade(ctx);
        ctx.on_global(AUTH_VERIFIED, move |event| {
            if let Err(err) = self.verified(&weak, &event.payload) {
                warn!(code = err.code(), error = %err, "auth state change failed");
            }
        });
        Ok(())
    }
}

impl Header {
    fn show(&self, ctx: &ComponentContext, state: AuthState) -> Result<(), ComponentError> {
        let section = ctx.require("section.auth")?;
        dom::remove_children(&section);
        let tag = match state {
            AuthState::Anonymous => login::TAG,
            AuthState::Authenticated => editor::TAG,
        };
        ctx.insert_component(&section, tag, InsertPosition::Append)?;

        self.state.set(state);
        dom::set_attr(ctx.host(), "data-auth", state.label());
        debug!(state = state.label(), "auth display");
        Ok(())
    }

    fn verified(&self, weak: &Weak<ComponentContext>, payload: &Value) -> Result<(), ComponentError> {
        let Some(ctx) = weak.upgrade() else {
            return Ok(());
        };
        let token: SessionToken = match serde_json::from_value(payload.clone()) {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "auth-verified without a session token ignored");
                return Ok(());
            }
        };
        ctx.session().set(&token)?;

        if self.state.get() == AuthState::Anonymous {
            self.show(&ctx, AuthState::Authenticated)?;
        }
        Ok(())
    }
}
