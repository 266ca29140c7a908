use std::rc::Rc;

use crate::component::{Component, ComponentContext};
use crate::error::ComponentError;

pub const TAG: &str = "dm-footer";

const TEMPLATE: &str = r#"<style>
  :host p {
    --color: #ccc;
    text-align: right;
    color: var(--color);
    border-top: 1px solid var(--color);
  }
  :host img { width: 24px; vertical-align: bottom; }
  </style>
  <p>Power by
    <a href="http://github.com/yanyaoer/daymare" target="_blank">Project Daymare</a>
    <img src='favicon.svg' />
  </p>"#;

pub struct Footer;

pub fn create() -> Rc<dyn Component> {
    Rc::new(Footer)
}

impl Component for Footer {
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
