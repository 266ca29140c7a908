//! End-to-end page scenarios over the offline harness.

#[cfg(test)]
mod tests {
    use crate::bus::{Event, EventScope, ARTICLE_CREATED, AUTH_VERIFIED, INDEX_REFRESHED};
    use crate::dom;
    use crate::fetch::Method;
    use crate::page::Page;
    use crate::selector::{self, MatchContext, Selector};
    use crate::testing::{Harness, TEST_API_BASE};
    use chrono::Duration;
    use markup5ever_rcdom::Handle;
    use serde_json::{json, Value};

    fn find_all(root: &Handle, sel: &str) -> Vec<Handle> {
        selector::query_all(root, &Selector::parse(sel).unwrap(), MatchContext::unscoped())
    }

    /// Titles of the rendered article items, top to bottom.
    fn rendered_titles(page: &Page) -> Vec<String> {
        let body = page.find_component("dm-body").unwrap();
        dom::element_children(body.host())
            .iter()
            .map(|item| dom::text_content(&find_all(item, "h2")[0]))
            .collect()
    }

    fn booted(harness: &Harness, index: Value) -> Page {
        harness.transport.respond_json(Method::Get, "/api/index", index);
        let mut page = harness.page();
        page.mount_root("dm-root").unwrap();
        page.run_until_stalled();
        page
    }

    fn submit(page: &mut Page, tag: &str) {
        let form = page.find_component(tag).unwrap().shadow_query("form").unwrap();
        page.dispatch(&form, "submit", Value::Null);
        page.run_until_stalled();
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Index and rendering
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_index_renders_one_article() {
        let harness = Harness::new();
        let page = booted(
            &harness,
            json!([{"id": 1, "title": "t", "body": "# hi", "ctime": "2024-01-01"}]),
        );

        let requests = harness.transport.requests_to("/api/index");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, format!("{}/api/index", TEST_API_BASE));

        let body = page.find_component("dm-body").unwrap();
        let items = dom::element_children(body.host());
        assert_eq!(items.len(), 1);
        assert_eq!(dom::tag_name(&items[0]).as_deref(), Some("dm-article"));

        // No front-matter title, so the article's own title is shown.
        assert_eq!(rendered_titles(&page), vec!["t".to_string()]);
        let content = &find_all(&items[0], "div")[0];
        assert_eq!(dom::get_attr(content, "slot").as_deref(), Some("body"));
        assert!(dom::text_content(content).starts_with("post on 2024-01-01"));
        assert_eq!(dom::text_content(&find_all(content, "h1")[0]), "hi");

        // Items are upgraded and slot their content.
        let article = page.component_for(&items[0]).unwrap();
        assert_eq!(article.shadow().unwrap().assigned_nodes(Some("title")).len(), 1);
    }

    #[test]
    fn test_front_matter_overrides_article_fields() {
        let harness = Harness::new();
        let page = booted(
            &harness,
            json!([{"id": "a1", "title": "t", "ctime": "2024-01-01",
                    "body": "---\ntitle: Night\ndate: 2024-03-01\n---\ntext"}]),
        );
        assert_eq!(rendered_titles(&page), vec!["Night".to_string()]);
        let body = page.find_component("dm-body").unwrap();
        assert!(dom::text_content(body.host()).contains("post on 2024-03-01"));
    }

    #[test]
    fn test_titles_are_text_not_markup() {
        let harness = Harness::new();
        let page = booted(
            &harness,
            json!([{"id": 1, "title": "<b>x</b>", "body": "", "ctime": ""}]),
        );
        let body = page.find_component("dm-body").unwrap();
        assert!(find_all(body.host(), "b").is_empty());
        assert_eq!(rendered_titles(&page), vec!["<b>x</b>".to_string()]);
    }

    #[test]
    fn test_each_entry_is_prepended_in_payload_order() {
        let harness = Harness::new();
        let page = booted(
            &harness,
            json!([
                {"id": 1, "title": "a", "body": "", "ctime": ""},
                {"id": 2, "title": "b", "body": "", "ctime": ""}
            ]),
        );
        assert_eq!(rendered_titles(&page), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_overlapping_events_duplicate_items() {
        let harness = Harness::new();
        let entry = json!([{"id": 1, "title": "t", "body": "", "ctime": ""}]);
        let page = booted(&harness, entry.clone());

        page.global_bus()
            .emit(&Event::new(INDEX_REFRESHED, EventScope::Global, entry.clone()));
        page.global_bus()
            .emit(&Event::new(ARTICLE_CREATED, EventScope::Global, entry));
        assert_eq!(rendered_titles(&page).len(), 3);
    }

    #[test]
    fn test_non_array_payload_renders_nothing() {
        let harness = Harness::new();
        let page = booted(&harness, json!({"error": "Nothing"}));
        assert!(rendered_titles(&page).is_empty());
    }

    #[test]
    fn test_failed_index_fetch_leaves_page_unchanged() {
        let harness = Harness::new();
        harness.transport.fail(Method::Get, "/api/index", "connection refused");
        let mut page = harness.page();
        page.mount_root("dm-root").unwrap();
        page.run_until_stalled();

        assert!(rendered_titles(&page).is_empty());
        assert!(page.find_component("dm-header").is_some());
    }

    #[test]
    fn test_non_json_response_is_a_rejected_fetch() {
        let harness = Harness::new();
        harness
            .transport
            .respond_raw(Method::Get, "/api/index", 500, "Internal Server Error");
        let mut page = harness.page();
        page.mount_root("dm-root").unwrap();
        page.run();
        assert!(rendered_titles(&page).is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Editor
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_saved_article_is_prepended() {
        let harness = Harness::new();
        harness.session.set_token("tok").unwrap();
        harness.transport.respond_json(
            Method::Post,
            "/api/save",
            json!({"id": 2, "title": "new post", "body": "new post", "ctime": "2024-02-02"}),
        );
        let mut page = booted(
            &harness,
            json!([{"id": 1, "title": "t", "body": "# hi", "ctime": "2024-01-01"}]),
        );

        let editor = page.find_component("dm-editor").unwrap();
        dom::set_value(&editor.shadow_query("textarea").unwrap(), "new post");
        submit(&mut page, "dm-editor");

        let saves = harness.transport.requests_to("/api/save");
        assert_eq!(saves.len(), 1);
        assert_eq!(saves[0].body.as_deref(), Some(r#"{"body":"new post"}"#));
        assert!(saves[0]
            .headers
            .contains(&("Authorization".to_string(), "Bearer tok".to_string())));

        assert_eq!(
            rendered_titles(&page),
            vec!["new post".to_string(), "t".to_string()]
        );
    }

    #[test]
    fn test_failed_save_renders_nothing() {
        let harness = Harness::new();
        harness.session.set_token("tok").unwrap();
        harness.transport.fail(Method::Post, "/api/save", "timeout");
        let mut page = booted(&harness, json!([]));

        submit(&mut page, "dm-editor");
        assert_eq!(harness.transport.requests_to("/api/save").len(), 1);
        assert!(rendered_titles(&page).is_empty());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auth display and login
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_anonymous_header_shows_login() {
        let harness = Harness::new();
        let page = booted(&harness, json!([]));
        let header = page.find_component("dm-header").unwrap();

        assert_eq!(dom::get_attr(header.host(), "data-auth").as_deref(), Some("anonymous"));
        assert!(header.shadow_query("section.auth > dm-login").is_some());
        assert!(header.shadow_query("dm-editor").is_none());
        assert!(page.find_component("dm-editor").is_none());

        let info = page.find_component("dm-info").unwrap();
        assert_eq!(dom::text_content(&info.shadow_query(".status").unwrap()), "anonymous");
    }

    #[test]
    fn test_live_session_header_shows_editor() {
        let harness = Harness::new();
        harness.session.set_token("tok").unwrap();
        let page = booted(&harness, json!([]));
        let header = page.find_component("dm-header").unwrap();

        assert_eq!(
            dom::get_attr(header.host(), "data-auth").as_deref(),
            Some("authenticated")
        );
        assert!(header.shadow_query("section.auth > dm-editor").is_some());
        assert!(page.find_component("dm-login").is_none());

        let info = page.find_component("dm-info").unwrap();
        assert_eq!(
            dom::text_content(&info.shadow_query(".status").unwrap()),
            "signed in until 2024-01-08 00:00 UTC"
        );
    }

    #[test]
    fn test_expired_session_header_shows_login() {
        let harness = Harness::new();
        harness.session.set_token("tok").unwrap();
        harness.clock.advance(Duration::days(8));
        let page = booted(&harness, json!([]));
        let header = page.find_component("dm-header").unwrap();
        assert!(header.shadow_query("dm-login").is_some());
        assert!(harness.session.get().is_none());
    }

    #[test]
    fn test_login_step_one_switches_to_token_entry() {
        let harness = Harness::new();
        harness
            .transport
            .respond_json(Method::Post, "/api/login", json!({"sent": true}));
        let mut page = booted(&harness, json!([]));

        let login = page.find_component("dm-login").unwrap();
        dom::set_value(&login.shadow_query("input[name=email]").unwrap(), "a@b.com");
        submit(&mut page, "dm-login");

        let requests = harness.transport.requests_to("/api/login");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].body.as_deref(), Some(r#"{"body":"a@b.com"}"#));

        let email = login.shadow_query("input[name=email]").unwrap();
        assert_eq!(dom::get_attr(&email, "type").as_deref(), Some("hidden"));
        assert!(dom::has_attr(&email, "readonly"));
        assert_eq!(dom::value(&email), "a@b.com");

        let form = login.shadow_query("form").unwrap();
        assert_eq!(dom::get_attr(&form, "action").as_deref(), Some("/api/verify"));
        let fields: Vec<Option<String>> = dom::element_children(&form)
            .iter()
            .map(|c| dom::get_attr(c, "name").or_else(|| dom::get_attr(c, "class")))
            .collect();
        assert_eq!(
            fields,
            vec![
                Some("email".to_string()),
                Some("token".to_string()),
                Some("actions".to_string())
            ]
        );
        assert_eq!(dom::text_content(&login.shadow_query("button").unwrap()), "verify");
        assert_eq!(dom::get_attr(login.host(), "data-step").as_deref(), Some("token"));
    }

    #[test]
    fn test_token_step_submit_sends_nothing() {
        let harness = Harness::new();
        harness
            .transport
            .respond_json(Method::Post, "/api/login", json!({}));
        let mut page = booted(&harness, json!([]));
        submit(&mut page, "dm-login");
        let sent = harness.transport.requests().len();

        submit(&mut page, "dm-login");
        assert_eq!(harness.transport.requests().len(), sent);
        assert!(harness.transport.requests_to("/api/verify").is_empty());
    }

    #[test]
    fn test_repeated_submit_while_login_pending_sends_once() {
        let harness = Harness::new();
        harness
            .transport
            .respond_json(Method::Post, "/api/login", json!({}));
        let mut page = booted(&harness, json!([]));
        let login = page.find_component("dm-login").unwrap();
        let form = login.shadow_query("form").unwrap();

        page.dispatch(&form, "submit", Value::Null);
        page.dispatch(&form, "submit", Value::Null);
        page.run_until_stalled();

        assert_eq!(harness.transport.requests_to("/api/login").len(), 1);
        assert_eq!(login.shadow().unwrap().query_all("input[name=token]").len(), 1);
        assert_eq!(dom::get_attr(login.host(), "data-step").as_deref(), Some("token"));
    }

    #[test]
    fn test_failed_login_stays_on_email_step() {
        let harness = Harness::new();
        harness.transport.fail(Method::Post, "/api/login", "refused");
        let mut page = booted(&harness, json!([]));
        submit(&mut page, "dm-login");

        let login = page.find_component("dm-login").unwrap();
        assert_eq!(dom::get_attr(login.host(), "data-step").as_deref(), Some("email"));
        assert!(login.shadow_query("input[name=token]").is_none());

        // A retry still goes to the login endpoint.
        submit(&mut page, "dm-login");
        assert_eq!(harness.transport.requests_to("/api/login").len(), 2);
    }

    #[test]
    fn test_auth_verified_swaps_login_for_editor() {
        let harness = Harness::new();
        let page = booted(&harness, json!([]));
        let payload = json!({"token": "fresh", "expiresAt": "2024-01-05T00:00:00Z"});
        page.global_bus()
            .emit(&Event::new(AUTH_VERIFIED, EventScope::Global, payload));

        let header = page.find_component("dm-header").unwrap();
        assert!(header.shadow_query("dm-login").is_none());
        assert!(header.shadow_query("dm-editor").is_some());
        assert_eq!(
            dom::get_attr(header.host(), "data-auth").as_deref(),
            Some("authenticated")
        );
        assert_eq!(harness.session.get().unwrap().token, "fresh");

        let info = page.find_component("dm-info").unwrap();
        assert_eq!(
            dom::text_content(&info.shadow_query(".status").unwrap()),
            "signed in until 2024-01-05 00:00 UTC"
        );
    }

    #[test]
    fn test_auth_verified_without_token_is_ignored() {
        let harness = Harness::new();
        let page = booted(&harness, json!([]));
        page.global_bus()
            .emit(&Event::new(AUTH_VERIFIED, EventScope::Global, json!({"ok": true})));
        let header = page.find_component("dm-header").unwrap();
        assert!(header.shadow_query("dm-login").is_some());
        assert!(harness.session.get().is_none());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Page
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_page_queries_only_see_light_dom() {
        let harness = Harness::new();
        let page = booted(&harness, json!([]));
        assert!(page.query_one("dm-root").is_some());
        assert!(page.query_one("dm-header").is_none());
        assert!(page.query_all("h1").is_empty());
    }

    #[test]
    fn test_snapshot_uses_declarative_shadow_roots() {
        let harness = Harness::new();
        let page = booted(
            &harness,
            json!([{"id": 1, "title": "t", "body": "# hi", "ctime": "2024-01-01"}]),
        );
        let html = page.snapshot();
        assert!(html.starts_with("<!DOCTYPE html><html><head></head><body><dm-root>"));
        assert!(html.contains("<dm-root><template shadowrootmode=\"open\">"));
        assert!(html.contains("<h1>Daymare</h1>"));
        assert!(html.contains("<style>:host div { color #666 }</style>"));
        assert!(html.contains("<h2 slot=\"title\">t</h2>"));
        assert!(html.contains("<img src=\"favicon.svg\">"));
    }

    #[test]
    fn test_every_catalog_component_mounts_once() {
        let harness = Harness::new();
        let page = booted(
            &harness,
            json!([{"id": 1, "title": "t", "body": "", "ctime": ""}]),
        );
        for tag in ["dm-root", "dm-header", "dm-info", "dm-body", "dm-footer", "dm-login", "dm-article"] {
            let instances = page.components(tag);
            assert_eq!(instances.len(), 1, "{}", tag);
            assert!(instances[0].is_mounted());
        }
        // dm-body has no template, so no scope.
        assert!(page.find_component("dm-body").unwrap().shadow().is_none());
        assert_eq!(page.templates().len(), 6);
    }
}
