use std::cell::Cell;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

use crate::component::{Component, ComponentContext};
use crate::dom;
use crate::error::ComponentError;
use crate::fetch::RequestOptions;
use crate::model::LoginRequest;

pub const TAG: &str = "dm-login";

const LOGIN_ENDPOINT: &str = "/api/login";
const VERIFY_ENDPOINT: &str = "/api/verify";

const TEMPLATE: &str = r#"<style>
  :host input { display: block; margin-bottom: 4px; }
</style>
<form action="/api/login" method="post">
  <input name="email" type="email" placeholder="email">
  <div class="actions"><button>login</button></div>
</form>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    /// Form asks for an email address and posts it to the login endpoint.
    AwaitingEmail,
    /// Email accepted; the form now shows a token field aimed at the verify endpoint.
    AwaitingToken,
}

/// Two-step sign-in form.
///
/// Only the first step is wired. A submit while [`LoginStep::AwaitingToken`]
/// is logged and otherwise ignored: no verification request is sent and no
/// `auth-verified` event is emitted from here.
pub struct Login {
    step: Cell<LoginStep>,
    /// Set while a login request is in flight.
    pending: Cell<bool>,
}

pub fn create() -> Rc<dyn Component> {
    Rc::new(Login {
        step: Cell::new(LoginStep::AwaitingEmail),
        pending: Cell::new(false),
    })
}

impl Component for Login {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn on_mount(self: Rc<Self>, ctx: &Rc<ComponentContext>) -> Result<(), ComponentError> {
        let form = ctx.require("form")?;
        dom::set_attr(ctx.host(), "data-step", "email");
        let weak = Rc::downgrade(ctx);
        ctx.listen(&form, "submit", move |_| {
            if let Err(err) = self.clone().submit(&weak) {
                warn!(code = err.code(), error = %err, "login submit failed");
            }
        })
    }
}

impl Login {
    fn submit(self: Rc<Self>, weak: &Weak<ComponentContext>) -> Result<(), ComponentError> {
        if self.step.get() == LoginStep::AwaitingToken {
            debug!("verification submit has no handler");
            return Ok(());
        }
        if self.pending.get() {
            debug!("login request already in flight");
            return Ok(());
        }

        let ctx = weak.upgrade().ok_or(ComponentError::Detached)?;
        let form = ctx.require("form")?;
        let email = dom::value(&ctx.require("input[name=\"email\"]")?);
        let action = dom::get_attr(&form, "action").unwrap_or_else(|| LOGIN_ENDPOINT.to_string());

        let options = RequestOptions::post_json(&LoginRequest { body: email })?;
        let started = ctx.request_json(&action, options);
        self.pending.set(true);
        let weak = weak.clone();
        let spawned = ctx.spawn({
            let login = self.clone();
            async move {
                let outcome = started.await;
                login.pending.set(false);
                outcome?;
                match weak.upgrade() {
                    Some(ctx) => login.await_token(&ctx),
                    None => Ok(()),
                }
            }
        });
        if spawned.is_err() {
            self.pending.set(false);
        }
        spawned
    }

    /// Locks the email field, adds the token field and retargets the form.
    fn await_token(&self, ctx: &ComponentContext) -> Result<(), ComponentError> {
        if self.step.get() == LoginStep::AwaitingToken {
            return Ok(());
        }
        let form = ctx.require("form")?;
        let email = ctx.require("input[name=\"email\"]")?;
        let actions = ctx.require("form > .actions")?;
        let button = ctx.require("button")?;

        dom::set_attr(&email, "type", "hidden");
        dom::set_attr(&email, "readonly", "");

        let token = dom::create_element("input");
        dom::set_attr(&token, "name", "token");
        dom::set_attr(&token, "placeholder", "token");
        dom::insert_before(&form, &token, &actions);

        dom::set_attr(&form, "action", VERIFY_ENDPOINT);
        dom::set_text_content(&button, "verify");

        self.step.set(LoginStep::AwaitingToken);
        dom::set_attr(ctx.host(), "data-step", "token");
        debug!("login awaiting token");
        Ok(())
    }
}
