use std::rc::Rc;
use tracing::debug;

use crate::bus::INDEX_REFRESHED;
use crate::component::{Component, ComponentContext};
use crate::error::ComponentError;
use crate::fetch::RequestOptions;

pub const TAG: &str = "dm-root";

const TEMPLATE: &str = r#"
<style>
  :host {
    display: block;
    margin: 0 auto;
    width: 800px;
  }
</style>
<dm-header></dm-header>
<dm-body></dm-body>
<dm-footer></dm-footer>"#;

/// Page shell. Loads the article index once and announces it.
pub struct Root;

pub fn create() -> Rc<dyn Component> {
    Rc::new(Root)
}

impl Component for Root {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn on_mount(self: Rc<Self>, ctx: &Rc<ComponentContext>) -> Result<(), ComponentError> {
        let index = ctx.request_json("/api/index", RequestOptions::get());
        let weak = Rc::downgrade(ctx);
        ctx.spawn(async move {
            let articles = index.await?;
            if let Some(ctx) = weak.upgrade() {
                debug!(entries = articles.as_array().map_or(0, Vec::len), "index loaded");
                ctx.emit_global(INDEX_REFRESHED, articles);
            }
            Ok(())
        })
    }
}
