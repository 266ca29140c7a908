use std::rc::Rc;

use crate::component::{Component, ComponentContext};
use crate::error::ComponentError;

pub const TAG: &str = "dm-article";

// Slotted children are styled through ::slotted; plain selectors cannot reach them.
const TEMPLATE: &str = r#"<style>::slotted(h2) { margin: 1em 0 0; }</style>
<div>
  <slot name="title"></slot>
  <slot name="body"></slot>
</div>"#;

/// Frame for one article. Content arrives as light children in the
/// `title` and `body` slots.
pub struct Article;

pub fn create() -> Rc<dyn Component> {
    Rc::new(Article)
}

impl Component for Article {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn template(&self) -> &'static str {
        TEMPLATE
    }

    fn on_mount(self: Rc<Self>, _ctx: &Rc<ComponentContext>) -> Result<(), ComponentError> {
        Ok(())
    }
}
