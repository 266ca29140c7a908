use serde_json::json;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

use crate::bus::ARTICLE_CREATED;
use crate::component::{Component, ComponentContext};
use crate::dom;
use crate::error::ComponentError;
use crate::fetch::RequestOptions;
use crate::model::NewArticle;

pub const TAG: &str = "dm-editor";

const TEMPLATE: &str = r#"<style>
  :host {
    --gap: 10px;
    position: fixed;
    bottom: var(--gap);
    right: var(--gap);
  }
  :host textarea { display: block; }
</style>
<div>
  <form>
  <textarea name="body" placeholder="markdown support"></textarea>
  <div><button>submit</button></div>
  </form>
</div>"#;

/// Posts a new article and announces the saved copy.
pub struct Editor;

pub fn create() -> Rc<dyn Component> {
    Rc::new(Editor)
}

impl Component for Editor {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn on_mount(self: Rc<Self>, ctx: &Rc<ComponentContext>) -> Result<(), ComponentError> {
        let form = ctx.require("form")?;
        let weak = Rc::downgrade(ctx);
        ctx.listen(&form, "submit", move |_| {
            if let Err(err) = submit(&weak) {
                warn!(code = err.code(), error = %err, "article submit failed");
            }
        })
    }
}

fn submit(weak: &Weak<ComponentContext>) -> Result<(), ComponentError> {
    let ctx = weak.upgrade().ok_or(ComponentError::Detached)?;
    let body = dom::value(&ctx.require("textarea[name=\"body\"]")?);

    let mut options = RequestOptions::post_json(&NewArticle { body })?;
    if let Some(session) = ctx.session().get() {
        options = options.with_header("Authorization", &format!("Bearer {}", session.token));
    }

    let saved = ctx.request_json("/api/save", options);
    let weak = weak.clone();
    ctx.spawn(async move {
        let article = saved.await?;
        if let Some(ctx) = weak.upgrade() {
            debug!("article saved");
            ctx.emit_global(ARTICLE_CREATED, json!([article]));
        }
        Ok(())
    })
}
