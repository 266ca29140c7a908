use std::rc::{Rc, Weak};
use tracing::warn;

use crate::bus::AUTH_VERIFIED;
use crate::component::{Component, ComponentContext};
use crate::dom;
use crate::error::ComponentError;
use crate::model::SessionToken;

pub const TAG: &str = "dm-info";

const TEMPLATE: &str = r#"<style>:host { display: block; font-size: small; }</style>
<span class="status">anonymous</span>"#;

/// One-line session status under the header title.
pub struct Info;

pub fn create() -> Rc<dyn Component> {
    Rc::new(Info)
}

impl Component for Info {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn on_mount(self: Rc<Self>, ctx: &Rc<ComponentContext>) -> Result<(), ComponentError> {
        show(ctx, ctx.session().get().as_ref())?;

        let weak: Weak<ComponentContext> = Rc::downgrade(ctx);
        ctx.on_global(AUTH_VERIFIED, move |event| {
            let Some(ctx) = weak.upgrade() else {
                return;
            };
            if let Ok(token) = serde_json::from_value::<SessionToken>(event.payload.clone()) {
                if let Err(err) = show(&ctx, Some(&token)) {
                    warn!(code = err.code(), error = %err, "session status not updated");
                }
            }
        });
        Ok(())
    }
}

fn show(ctx: &ComponentContext, session: Option<&SessionToken>) -> Result<(), ComponentError> {
    let status = ctx.require("span.status")?;
    let text = match session {
        Some(token) => format!(
            "signed in until {}",
            token.expires_at.format("%Y-%m-%d %H:%M UTC")
        ),
        None => "anonymous".to_string(),
    };
    dom::set_text_content(&status, &text);
    Ok(())
}
