use serde_json::Value;
use std::rc::{Rc, Weak};
use tracing::{debug, warn};

use crate::bus::{ARTICLE_CREATED, INDEX_REFRESHED};
use crate::component::{Component, ComponentContext};
use crate::dom;
use crate::error::ComponentError;
use crate::model::{articles_from_payload, Article, ArticleMetadata};

pub const TAG: &str = "dm-body";

/// Article list. Has no template: items are rendered as its light children
/// so each `dm-article` can slot them.
///
/// Rendering is additive. Every entry of every `fresh-index` or
/// `new-article` payload is prepended, in payload order, without looking at
/// what is already on the page. The same article delivered twice shows twice.
pub struct Body;

pub fn create() -> Rc<dyn Component> {
    Rc::new(Body)
}

impl Component for Body {
    fn tag(&self) -> &'static str {
        TAG
    }

    fn on_mount(self: Rc<Self>, ctx: &Rc<ComponentContext>) -> Result<(), ComponentError> {
        for event in [INDEX_REFRESHED, ARTICLE_CREATED] {
            let weak = Rc::downgrade(ctx);
            ctx.on_global(event, move |e| render_index(&weak, &e.payload));
        }
        Ok(())
    }
}

fn render_index(ctx: &Weak<ComponentContext>, payload: &Value) {
    let Some(ctx) = ctx.upgrade() else {
        return;
    };
    let articles = articles_from_payload(payload);
    debug!(count = articles.len(), "rendering articles");

    for article in &articles {
        let item = build_item(&ctx, article);
        dom::prepend_child(ctx.host(), &item);
        if let Err(err) = ctx.connect(&item) {
            warn!(id = %article.id, code = err.code(), error = %err, "article item not connected");
        }
    }
}

/// `<dm-article><h2 slot="title">…</h2><div slot="body">post on …<br>…</div></dm-article>`
fn build_item(ctx: &ComponentContext, article: &Article) -> markup5ever_rcdom::Handle {
    let rendered = ctx.markdown().convert(&article.body);
    let meta = ArticleMetadata::resolve(&rendered.metadata, article);

    let item = dom::create_element("dm-article");

    let title = dom::create_element("h2");
    dom::set_attr(&title, "slot", "title");
    dom::append_child(&title, &dom::create_text(&meta.title));
    dom::append_child(&item, &title);

    let body = dom::create_element("div");
    dom::set_attr(&body, "slot", "body");
    dom::append_child(&body, &dom::create_text(&format!("post on {}", meta.date)));
    dom::append_child(&body, &dom::create_element("br"));
    for node in dom::parse_fragment_nodes(&rendered.html) {
        dom::append_child(&body, &node);
    }
    dom::append_child(&item, &body);

    item
}
