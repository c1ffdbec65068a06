use hyp_dom::{
	patch::{patch, reconcile},
	response::parse_response,
	vdom, ActionError,
};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

use web_support_::{document, element, init_logging, mount};

fn content(html: &str) -> web_sys::Element {
	parse_response(&format!("<style></style>{}", html)).unwrap().content
}

#[wasm_bindgen_test]
fn identical_content_keeps_nodes() {
	init_logging();
	mount(r#"<div id="same"><p id="same-a">A</p><p id="same-b">B</p></div>"#);
	let untouched = element("same-b");
	untouched.set_attribute("data-marker", "kept").unwrap();
	js_sys::Reflect::set(&untouched, &"hypMarker".into(), &true.into()).unwrap();

	let live_html = element("same").outer_html();
	reconcile(&element("same"), &content(&live_html), &document()).unwrap();

	let after = element("same-b");
	assert_eq!(after, untouched);
	assert_eq!(after.get_attribute("data-marker").unwrap(), "kept");
	assert_eq!(js_sys::Reflect::get(&after, &"hypMarker".into()).unwrap(), true);
	assert_eq!(element("same").outer_html(), live_html);
}

#[wasm_bindgen_test]
fn attributes_follow_the_new_content() {
	init_logging();
	mount(r#"<div id="marked"><p id="marked-a">A</p></div>"#);
	let untouched = element("marked-a");
	untouched.set_attribute("data-marker", "local").unwrap();

	reconcile(&element("marked"), &content(r#"<div id="marked"><p id="marked-a">A</p></div>"#), &document()).unwrap();

	assert_eq!(element("marked-a"), untouched);
	assert_eq!(untouched.get_attribute("data-marker"), None);
}

#[wasm_bindgen_test]
fn changed_sibling_does_not_replace_untouched_node() {
	init_logging();
	mount(r#"<div id="sib"><span id="sib-a">old</span><input id="sib-input" value="x"></div>"#);
	let input = element("sib-input");

	reconcile(&element("sib"), &content(r#"<div id="sib"><span id="sib-a">new</span><input id="sib-input" value="x"></div>"#), &document()).unwrap();

	assert_eq!(element("sib-input"), input);
	assert_eq!(element("sib-a").text_content().unwrap(), "new");
}

#[wasm_bindgen_test]
fn attributes_are_diffed() {
	init_logging();
	mount(r#"<div id="attrs"><a id="attrs-link" href="/a" class="x" title="t">link</a></div>"#);
	let link = element("attrs-link");

	reconcile(&element("attrs"), &content(r#"<div id="attrs"><a id="attrs-link" href="/b" class="x">link</a></div>"#), &document()).unwrap();

	assert_eq!(element("attrs-link"), link);
	assert_eq!(link.get_attribute("href").unwrap(), "/b");
	assert_eq!(link.get_attribute("class").unwrap(), "x");
	assert!(!link.has_attribute("title"));
}

#[wasm_bindgen_test]
fn children_are_added_removed_and_moved() {
	init_logging();
	mount(r#"<ul id="list"><li id="list-1">1</li><li id="list-2">2</li><li id="list-3">3</li></ul>"#);
	let two = element("list-2");
	let three = element("list-3");

	reconcile(&element("list"), &content(r#"<div><ul id="list"><li id="list-3">3</li><li id="list-2">2</li><li id="list-4">4</li></ul></div>"#).first_element_child().unwrap(), &document()).unwrap();

	let list = element("list");
	let ids: Vec<String> = (0..list.children().length()).map(|i| list.children().item(i).unwrap().id()).collect();
	assert_eq!(ids, ["list-3", "list-2", "list-4"]);
	assert_eq!(element("list-2"), two);
	assert_eq!(element("list-3"), three);
	assert!(document().get_element_by_id("list-1").is_none());
}

#[wasm_bindgen_test]
fn removed_sibling_does_not_rebuild_later_fields() {
	init_logging();
	let wrapper = mount(r#"<div id="validated"><p class="error">Required</p><input name="first"><input name="last"></div>"#);
	let first = wrapper.query_selector("input[name=first]").unwrap().unwrap();
	let last = wrapper.query_selector("input[name=last]").unwrap().unwrap();

	reconcile(&element("validated"), &content(r#"<div id="validated"><input name="first"><input name="last"></div>"#), &document()).unwrap();

	assert_eq!(element("validated").children().length(), 2);
	assert_eq!(wrapper.query_selector("input[name=first]").unwrap().unwrap(), first);
	assert_eq!(wrapper.query_selector("input[name=last]").unwrap().unwrap(), last);
	assert!(wrapper.query_selector("p").unwrap().is_none());
}

#[wasm_bindgen_test]
fn mismatched_root_is_left_alone() {
	init_logging();
	let wrapper = mount(r#"<button id="not-a-view">go</button>"#);
	let before = wrapper.inner_html();

	let error = reconcile(&element("not-a-view"), &content(r#"<div id="not-a-view">view</div>"#), &document()).unwrap_err();

	assert!(matches!(error, ActionError::RootMismatch { .. }));
	assert!(!error.is_fatal());
	assert_eq!(wrapper.inner_html(), before);
}

#[wasm_bindgen_test]
fn patch_replaces_a_differing_root() {
	init_logging();
	let wrapper = mount(r#"<span id="swap">old</span>"#);
	let next = vdom::create(&content(r#"<div><p id="swap">new</p></div>"#).first_child().unwrap()).unwrap();
	let mut old = vdom::create(&wrapper.first_child().unwrap()).unwrap();

	patch(&next, &mut old, &document()).unwrap();

	assert_eq!(wrapper.inner_html(), r#"<p id="swap">new</p>"#);
	assert_eq!(old.tag(), Some("p"));
	assert_eq!(old.node, wrapper.first_child().unwrap());
}

#[wasm_bindgen_test]
fn text_is_updated_in_place() {
	init_logging();
	mount(r#"<div id="text">before</div>"#);
	let text_node = element("text").first_child().unwrap();

	reconcile(&element("text"), &content(r#"<div id="text">after</div>"#), &document()).unwrap();

	assert_eq!(element("text").first_child().unwrap(), text_node);
	assert_eq!(text_node.text_content().unwrap(), "after");
}

#[wasm_bindgen_test]
fn svg_is_created_in_svg_namespace() {
	init_logging();
	mount(r#"<div id="svg-host"></div>"#);

	reconcile(
		&element("svg-host"),
		&content(r##"<div id="svg-host"><svg viewBox="0 0 10 10"><use xlink:href="#icon"></use></svg></div>"##),
		&document(),
	)
	.unwrap();

	let svg = element("svg-host").first_element_child().unwrap();
	assert_eq!(svg.namespace_uri().unwrap(), "http://www.w3.org/2000/svg");
	assert_eq!(svg.get_attribute("viewBox").unwrap(), "0 0 10 10");
	let use_element = svg.first_element_child().unwrap();
	assert_eq!(use_element.namespace_uri().unwrap(), "http://www.w3.org/2000/svg");
	assert!(use_element.dyn_ref::<web_sys::SvgElement>().is_some());
	assert_eq!(use_element.get_attribute_ns(Some("http://www.w3.org/1999/xlink"), "href").unwrap(), "#icon");
}

#[wasm_bindgen_test]
fn snapshots_mirror_the_dom() {
	init_logging();
	let wrapper = mount(r#"<div id="snap" class="c"><!--note-->text<b>bold</b></div>"#);
	let snapshot = vdom::create(&wrapper.first_child().unwrap()).unwrap();
	assert_eq!(snapshot.tag(), Some("div"));
	assert_eq!(snapshot.key(), Some("snap"));
	assert_eq!(snapshot.attribute("class"), Some("c"));
	assert_eq!(snapshot.children.len(), 3);
	assert_eq!(snapshot.children[0].kind, vdom::Kind::Comment);
	assert_eq!(snapshot.children[1].content, "text");
	assert!(!snapshot.svg);
}
