//! Rendering scope tests: structure, isolation, single attachment and styles.

#[cfg(test)]
mod tests {
    use crate::dom;
    use crate::scope::{RenderScope, TemplateCache};
    use crate::selector::{self, MatchContext, Selector};
    use crate::testing::Harness;
    use markup5ever_rcdom::Handle;
    use std::rc::Rc;

    const TEMPLATE: &str =
        r#"<style>:host p { color: red; }</style><p class="x">inside <b>bold</b></p><slot name="title"></slot>"#;

    /// A page-like tree: document > body > (host, p.x outside).
    fn light_tree() -> (Handle, Handle, Handle) {
        let document = dom::create_document();
        let body = dom::create_element("body");
        dom::append_child(&document, &body);
        let host = dom::create_element("dm-test");
        dom::append_child(&body, &host);
        let outside = dom::create_element("p");
        dom::set_attr(&outside, "class", "x");
        dom::append_child(&body, &outside);
        (document, host, outside)
    }

    fn page_query_all(document: &Handle, sel: &str) -> Vec<Handle> {
        selector::query_all(document, &Selector::parse(sel).unwrap(), MatchContext::unscoped())
    }

    #[test]
    fn test_scope_holds_exactly_the_parsed_template() {
        let cache = TemplateCache::new();
        let (_document, host, _) = light_tree();
        let scope = RenderScope::new();
        let shadow = scope.mount(&host, TEMPLATE, &cache).unwrap().unwrap();

        let expected = dom::parse_fragment_nodes(TEMPLATE);
        let actual: Vec<Handle> = shadow.root().children.borrow().clone();
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!(dom::structurally_equal(a, e));
        }
        // The host's light children are untouched.
        assert!(host.children.borrow().is_empty());
    }

    #[test]
    fn test_page_queries_cannot_see_scope_nodes() {
        let cache = TemplateCache::new();
        let (document, host, outside) = light_tree();
        let scope = RenderScope::new();
        scope.mount(&host, TEMPLATE, &cache).unwrap();

        let found = page_query_all(&document, "p.x");
        assert_eq!(found.len(), 1);
        assert!(Rc::ptr_eq(&found[0], &outside));
        assert!(page_query_all(&document, "b").is_empty());
    }

    #[test]
    fn test_scope_queries_cannot_see_page_nodes() {
        let cache = TemplateCache::new();
        let (_document, host, outside) = light_tree();
        let scope = RenderScope::new();
        let shadow = scope.mount(&host, TEMPLATE, &cache).unwrap().unwrap();

        let found = shadow.query_all("p.x");
        assert_eq!(found.len(), 1);
        assert!(!Rc::ptr_eq(&found[0], &outside));
        assert!(shadow.contains(&found[0]));
        assert!(!shadow.contains(&outside));
        // Ancestor walks stop at the scope root.
        assert!(shadow.query_one("body p").is_none());
        assert!(shadow.query_one("dm-test p").is_none());
    }

    #[test]
    fn test_styles_do_not_leak_out_of_or_into_scope() {
        let cache = TemplateCache::new();
        let (_document, host, outside) = light_tree();
        let scope = RenderScope::new();
        let shadow = scope.mount(&host, TEMPLATE, &cache).unwrap().unwrap();

        let inside = shadow.query_one("p").unwrap();
        assert_eq!(
            shadow.computed_style(&inside).get("color").map(String::as_str),
            Some("red")
        );
        assert!(shadow.computed_style(&outside).is_empty());
    }

    #[test]
    fn test_second_mount_is_rejected_and_content_not_doubled() {
        let cache = TemplateCache::new();
        let (_document, host, _) = light_tree();
        let scope = RenderScope::new();
        scope.mount(&host, TEMPLATE, &cache).unwrap();
        let before = scope.shadow().unwrap().root().children.borrow().len();

        let err = scope.mount(&host, TEMPLATE, &cache).unwrap_err();
        assert_eq!(err.code(), "DM-ERR-SCOPE-001");

        let shadow = scope.shadow().unwrap();
        assert_eq!(shadow.root().children.borrow().len(), before);
        assert_eq!(shadow.query_all("p").len(), 1);
    }

    #[test]
    fn test_shadow_root_debug_names_host_and_digest() {
        let cache = TemplateCache::new();
        let (_document, host, _) = light_tree();
        let scope = RenderScope::new();
        let shadow = scope.mount(&host, TEMPLATE, &cache).unwrap().unwrap();

        let printed = format!("{:?}", shadow);
        assert!(printed.starts_with("ShadowRoot"));
        assert!(printed.contains("dm-test"));
        assert!(printed.contains(shadow.template_digest()));
    }

    #[test]
    fn test_empty_template_renders_nothing() {
        let cache = TemplateCache::new();
        let (_document, host, _) = light_tree();
        let scope = RenderScope::new();
        assert!(scope.mount(&host, "   \n  ", &cache).unwrap().is_none());
        assert!(!scope.is_attached());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_non_element_host_is_rejected() {
        let cache = TemplateCache::new();
        let text = dom::create_text("not an element");
        let err = RenderScope::new().mount(&text, TEMPLATE, &cache).unwrap_err();
        assert_eq!(err.code(), "DM-ERR-SCOPE-002");
    }

    #[test]
    fn test_template_parsed_once_and_instances_independent() {
        let cache = TemplateCache::new();
        let (_d1, host_a, _) = light_tree();
        let (_d2, host_b, _) = light_tree();
        let a = RenderScope::new();
        let b = RenderScope::new();
        let shadow_a = a.mount(&host_a, TEMPLATE, &cache).unwrap().unwrap();
        let shadow_b = b.mount(&host_b, TEMPLATE, &cache).unwrap().unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(shadow_a.template_digest(), shadow_b.template_digest());

        let p_a = shadow_a.query_one("p").unwrap();
        dom::set_text_content(&p_a, "changed");
        let p_b = shadow_b.query_one("p").unwrap();
        assert_eq!(dom::text_content(&p_b), "inside bold");
    }

    #[test]
    fn test_slot_assignment_follows_slot_attribute() {
        let cache = TemplateCache::new();
        let (_document, host, _) = light_tree();
        let title = dom::create_element("h2");
        dom::set_attr(&title, "slot", "title");
        let loose = dom::create_element("span");
        dom::append_child(&host, &title);
        dom::append_child(&host, &loose);

        let scope = RenderScope::new();
        let shadow = scope.mount(&host, TEMPLATE, &cache).unwrap().unwrap();
        let titled = shadow.assigned_nodes(Some("title"));
        assert_eq!(titled.len(), 1);
        assert!(Rc::ptr_eq(&titled[0], &title));
        let default = shadow.assigned_nodes(None);
        assert_eq!(default.len(), 1);
        assert!(Rc::ptr_eq(&default[0], &loose));
        assert!(shadow.assigned_nodes(Some("body")).is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog templates
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_header_malformed_color_is_ignored() {
        let harness = Harness::new();
        let page = harness.page();
        let header = page.mount_root("dm-header").unwrap();
        let shadow = header.shadow().unwrap();

        assert_eq!(shadow.styles().malformed, vec!["color #666".to_string()]);
        let subtitle = shadow.query_one("div").unwrap();
        assert!(shadow.computed_style(&subtitle).get("color").is_none());
        assert_eq!(
            dom::text_content(&subtitle),
            "How Can a Daylight Know The Darkness Of Night"
        );
    }

    #[test]
    fn test_footer_custom_property_resolves() {
        let harness = Harness::new();
        let page = harness.page();
        let footer = page.mount_root("dm-footer").unwrap();
        let shadow = footer.shadow().unwrap();

        let p = shadow.query_one("p").unwrap();
        let style = shadow.computed_style(&p);
        assert_eq!(style.get("color").map(String::as_str), Some("#ccc"));
        assert_eq!(
            style.get("border-top").map(String::as_str),
            Some("1px solid #ccc")
        );
        let img = shadow.query_one("img").unwrap();
        assert_eq!(dom::get_attr(&img, "src").as_deref(), Some("favicon.svg"));
    }

    #[test]
    fn test_article_slotted_title_is_styled() {
        let harness = Harness::new();
        let page = harness.page();
        let item = dom::create_element("dm-article");
        let title = dom::create_element("h2");
        dom::set_attr(&title, "slot", "title");
        dom::append_child(&item, &title);
        dom::append_child(page.body(), &item);

        let article = page.mount(&item).unwrap();
        let shadow = article.shadow().unwrap();
        assert_eq!(
            shadow.computed_style(&title).get("margin").map(String::as_str),
            Some("1em 0 0")
        );
        assert_eq!(shadow.query_all("slot").len(), 2);
    }
}
