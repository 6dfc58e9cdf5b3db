use super::*;
use std::cell::Cell;

use serde_json::json;

#[test]
fn inner_html_parses_elements_and_text() {
    let container = Element::new("div");
    container.set_inner_html("<h1 class=\"title\">Hello</h1><p>${greeting} there</p>").unwrap();

    let children = container.children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].tag_name(), "h1");
    assert_eq!(children[0].attribute("class").as_deref(), Some("title"));
    assert_eq!(children[1].text_content(), "${greeting} there");
}

#[test]
fn children_are_in_document_order_and_skip_text() {
    let container = Element::new("div");
    container.set_inner_html("first<a></a> middle <b></b><c></c>last").unwrap();

    let tags: Vec<String> = container.children().iter().map(|e| e.tag_name().to_owned()).collect();
    assert_eq!(tags, vec!["a", "b", "c"]);
    assert_eq!(container.child_nodes().len(), 6);
}

#[test]
fn inner_html_replaces_previous_children() {
    let container = Element::new("div");
    container.set_inner_html("<span>old</span>").unwrap();
    container.set_inner_html("<em>new</em>").unwrap();

    assert_eq!(container.inner_html(), "<em>new</em>");
}

#[test]
fn self_closing_inputs_keep_attributes() {
    let container = Element::new("form");
    container
        .set_inner_html(r#"<input type="number" value="${age}" /><label>after</label>"#)
        .unwrap();

    let children = container.children();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].input_type(), "number");
    assert_eq!(children[0].attribute("value").as_deref(), Some("${age}"));
    assert_eq!(children[1].text_content(), "after");
}

#[test]
fn text_content_includes_descendants() {
    let container = Element::new("div");
    container.set_inner_html("<p>a<b>b</b>c</p>").unwrap();

    let p = &container.children()[0];
    assert_eq!(p.text_content(), "abc");
}

#[test]
fn set_text_content_replaces_children() {
    let p = Element::new("p");
    p.append_child(Node::Element(Element::new("b").with_text("bold")));
    p.set_text_content("plain");

    assert!(p.children().is_empty());
    assert_eq!(p.text_content(), "plain");
    assert_eq!(p.outer_html(), "<p>plain</p>");
}

#[test]
fn entities_are_decoded_and_re_escaped() {
    let container = Element::new("div");
    container.set_inner_html("<p title=\"a &amp; b\">1 &lt; 2</p>").unwrap();

    let p = &container.children()[0];
    assert_eq!(p.attribute("title").as_deref(), Some("a & b"));
    assert_eq!(p.text_content(), "1 < 2");
    assert_eq!(p.outer_html(), "<p title=\"a &amp; b\">1 &lt; 2</p>");
}

#[test]
fn numeric_character_references_are_decoded() {
    let container = Element::new("div");
    container
        .set_inner_html("<p title=\"it&#x27;s\">&#8364;5 &#65;&#X42; &apos;q&apos; &foo; &#xZZ; a&b</p>")
        .unwrap();

    let p = &container.children()[0];
    assert_eq!(p.attribute("title").as_deref(), Some("it's"));
    assert_eq!(p.text_content(), "\u{20ac}5 AB 'q' &foo; &#xZZ; a&b");
}

#[test]
fn parsed_attributes_keep_source_order() {
    let container = Element::new("div");
    container
        .set_inner_html(r#"<div id="x1" class="big" title="hello" data-a="1" data-b="2"></div>"#)
        .unwrap();

    let div = &container.children()[0];
    let names: Vec<String> = div.attributes().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["id", "class", "title", "data-a", "data-b"]);
    assert_eq!(
        container.inner_html(),
        r#"<div id="x1" class="big" title="hello" data-a="1" data-b="2"></div>"#
    );
}

#[test]
fn source_attribute_order_skips_quoted_values() {
    let order = source_attribute_order(r#"<input TYPE="text" title='a > b = c' value=${age} disabled data-x="q"/>"#);
    assert_eq!(order, vec!["type", "title", "value", "disabled", "data-x"]);

    assert!(source_attribute_order("<br>").is_empty());
    assert!(source_attribute_order("<p>text</p>").is_empty());
}

#[test]
fn void_elements_have_no_closing_tag() {
    let container = Element::new("form");
    container
        .set_inner_html(r#"<input type="number" value="30" /><br><label>age</label>"#)
        .unwrap();

    assert_eq!(container.inner_html(), r#"<input type="number" value="30"><br><label>age</label>"#);
    assert_eq!(Element::new("img").with_attribute("src", "a.png").outer_html(), r#"<img src="a.png">"#);
}

#[test]
fn set_attribute_keeps_position() {
    let el = Element::new("input").with_attribute("type", "text").with_attribute("value", "a");
    el.set_attribute("type", "number");

    assert_eq!(
        el.attributes(),
        vec![("type".to_owned(), "number".to_owned()), ("value".to_owned(), "a".to_owned())]
    );
}

#[test]
fn attribute_names_are_case_insensitive() {
    let el = Element::new("INPUT").with_attribute("Value", "x");
    assert_eq!(el.tag_name(), "input");
    assert_eq!(el.attribute("VALUE").as_deref(), Some("x"));
}

#[test]
fn input_type_defaults_to_text() {
    assert_eq!(Element::new("input").input_type(), "text");
    assert_eq!(Element::new("input").with_attribute("type", "CheckBox").input_type(), "checkbox");
}

// =========================================================================
// properties
// =========================================================================

#[test]
fn string_property_reads_attribute() {
    let el = Element::new("input");
    assert_eq!(el.property("value"), json!(""));

    el.set_property("value", &json!(45.0));
    assert_eq!(el.property("value"), json!("45"));
}

#[test]
fn boolean_property_tracks_attribute_presence() {
    let el = Element::new("input").with_attribute("type", "checkbox");
    assert_eq!(el.property("checked"), json!(false));

    el.set_property("checked", &json!(true));
    assert_eq!(el.property("checked"), json!(true));
    assert!(el.has_attribute("checked"));

    el.set_property("checked", &json!("false"));
    assert_eq!(el.property("checked"), json!(false));
    assert!(!el.has_attribute("checked"));
}

// =========================================================================
// events
// =========================================================================

#[test]
fn dispatch_runs_matching_handlers_in_order() {
    let el = Element::new("input");
    let order = Rc::new(RefCell::new(Vec::new()));
    for tag in ["one", "two"] {
        let order = Rc::clone(&order);
        el.add_event_listener(EventKind::Input, move |_| {
            order.borrow_mut().push(tag);
            Ok(())
        });
    }
    let changes = Rc::new(Cell::new(0));
    let counter = Rc::clone(&changes);
    el.add_event_listener(EventKind::Change, move |_| {
        counter.set(counter.get() + 1);
        Ok(())
    });

    el.dispatch_event(EventKind::Input).unwrap();

    assert_eq!(*order.borrow(), vec!["one", "two"]);
    assert_eq!(changes.get(), 0);
    assert_eq!(el.listener_count(EventKind::Input), 2);
    assert_eq!(el.listener_count(EventKind::Change), 1);
}

#[test]
fn handler_receives_target_element() {
    let el = Element::new("input").with_attribute("value", "typed");
    let seen = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&seen);
    el.add_event_listener(EventKind::Input, move |target| {
        *sink.borrow_mut() = target.attribute("value").unwrap_or_default();
        Ok(())
    });

    el.dispatch_event(EventKind::Input).unwrap();
    assert_eq!(*seen.borrow(), "typed");
}

#[test]
fn dispatch_stops_at_first_error() {
    let el = Element::new("select");
    el.add_event_listener(EventKind::Change, |_| {
        Err(BusError::DepthExceeded { event: "x".into(), limit: 1 })
    });
    let reached = Rc::new(Cell::new(false));
    let flag = Rc::clone(&reached);
    el.add_event_listener(EventKind::Change, move |_| {
        flag.set(true);
        Ok(())
    });

    assert!(el.dispatch_event(EventKind::Change).is_err());
    assert!(!reached.get());
}

// =========================================================================
// selectors
// =========================================================================

#[test]
fn query_selector_by_id_class_and_tag() {
    let doc = Document::parse(
        r#"<header><nav class="menu main"></nav></header><main id="app"><section></section></main>"#,
    )
    .unwrap();

    assert_eq!(doc.query_selector("#app").map(|e| e.tag_name().to_owned()).as_deref(), Some("main"));
    assert_eq!(doc.query_selector(".main").map(|e| e.tag_name().to_owned()).as_deref(), Some("nav"));
    assert_eq!(doc.query_selector("section").map(|e| e.tag_name().to_owned()).as_deref(), Some("section"));
    assert!(doc.query_selector("#missing").is_none());
    assert!(doc.query_selector("").is_none());
    assert!(doc.query_selector("#").is_none());
}

#[test]
fn query_selector_returns_live_element() {
    let doc = Document::parse(r#"<div id="app"></div>"#).unwrap();
    let found = doc.query_selector("#app").unwrap();
    found.set_text_content("changed");

    assert_eq!(doc.root().inner_html(), r#"<div id="app">changed</div>"#);
}

#[test]
fn weak_element_upgrades_while_alive() {
    let el = Element::new("p");
    let weak = el.downgrade();
    assert!(weak.upgrade().is_some_and(|e| e.ptr_eq(&el)));

    drop(el);
    assert!(weak.upgrade().is_none());
}
