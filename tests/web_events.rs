use hyp_dom::events::{bind_document, listen_load, nearest_target};
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

use web_support_::{document, element, init_logging, mount, runtime_with, sleep, StubTransport};

fn fire(target: &web_sys::Element, name: &str) -> web_sys::Event {
	let init = web_sys::EventInit::new();
	init.set_bubbles(true);
	init.set_cancelable(true);
	let event = web_sys::Event::new_with_event_init_dict(name, &init).unwrap();
	target.dispatch_event(&event).unwrap();
	event
}

fn input(id: &str) -> web_sys::HtmlInputElement {
	element(id).dyn_into().unwrap()
}

#[wasm_bindgen_test]
async fn click_dispatches_to_nearest_view() {
	init_logging();
	mount(r#"<div id="click-view"><button id="click-button" data-on-click="Increment"><b id="click-inner">+</b></button></div>"#);
	let transport = StubTransport::content(r#"<style></style><div id="click-view">clicked</div>"#);
	let sent = Rc::clone(&transport.sent);
	let runtime = runtime_with(document(), transport);
	let bindings = bind_document(&runtime, &document()).unwrap();

	element("click-inner").click();
	sleep(10).await;

	{
		let sent = sent.borrow();
		assert_eq!(sent.len(), 1);
		assert_eq!(sent[0].target_id(), "click-view");
		assert_eq!(sent[0].action(), "Increment");
	}
	assert_eq!(element("click-view").text_content().unwrap(), "clicked");
	drop(bindings);
}

#[wasm_bindgen_test]
async fn submit_sends_form_fields() {
	init_logging();
	mount(r#"<div id="submit-view"><form id="submit-form" data-on-submit="Save"><input name="email" value="a@b.c"><input name="name" value="Ada"></form></div>"#);
	let transport = StubTransport::content(r#"<style></style><div id="submit-view">saved</div>"#);
	let sent = Rc::clone(&transport.sent);
	let runtime = runtime_with(document(), transport);
	let bindings = bind_document(&runtime, &document()).unwrap();

	let submit = fire(&element("submit-form"), "submit");
	sleep(10).await;

	assert!(submit.default_prevented());
	let sent = sent.borrow();
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].target_id(), "submit-view");
	assert_eq!(sent[0].action(), "Save");
	assert_eq!(sent[0].body(), "email=a%40b.c&name=Ada");
	drop(bindings);
}

#[wasm_bindgen_test]
async fn load_actions_fire_once_bound() {
	init_logging();
	let wrapper = mount(r#"<div id="load-view" data-on-load="Init">loading</div>"#);
	let transport = StubTransport::content(r#"<style></style><div id="load-view">loaded</div>"#);
	let sent = Rc::clone(&transport.sent);
	let runtime = runtime_with(document(), transport);

	listen_load(&runtime, &wrapper);
	sleep(20).await;

	assert_eq!(sent.borrow().len(), 1);
	assert_eq!(sent.borrow()[0].action(), "Init");
	assert_eq!(element("load-view").text_content().unwrap(), "loaded");
}

#[wasm_bindgen_test]
fn data_target_overrides_nearest_view() {
	init_logging();
	mount(r#"<div id="outer-view"><div id="other-view"></div><a id="target-link" data-target="other-view">go</a></div>"#);
	let target = nearest_target(&document(), &element("target-link")).unwrap();
	assert_eq!(target.id(), "other-view");

	let plain: web_sys::Element = element("other-view").dyn_into().unwrap();
	assert_eq!(nearest_target(&document(), &plain).unwrap().id(), "other-view");
}

#[wasm_bindgen_test]
fn controls_with_ids_are_not_views() {
	init_logging();
	mount(r#"<div id="control-view"><input id="control-input" data-on-change="Pick"><button id="control-button" data-on-click="Go">go</button></div>"#);
	assert_eq!(nearest_target(&document(), &element("control-input")).unwrap().id(), "control-view");
	assert_eq!(nearest_target(&document(), &element("control-button")).unwrap().id(), "control-view");
}

#[wasm_bindgen_test]
async fn change_sends_the_field_value() {
	init_logging();
	mount(r#"<div id="change-view"><input id="change-input" name="color" data-on-change="Pick"></div>"#);
	let transport = StubTransport::content(r#"<style></style><div id="change-view"><input id="change-input" name="color" data-on-change="Pick"></div>"#);
	let sent = Rc::clone(&transport.sent);
	let runtime = runtime_with(document(), transport);
	let bindings = bind_document(&runtime, &document()).unwrap();

	input("change-input").set_value("red");
	fire(&element("change-input"), "change");
	sleep(10).await;

	let sent = sent.borrow();
	assert_eq!(sent.len(), 1);
	assert_eq!(sent[0].target_id(), "change-view");
	assert_eq!(sent[0].action(), "Pick");
	assert_eq!(sent[0].body(), "color=red");
	drop(bindings);
}

#[wasm_bindgen_test]
async fn input_is_debounced_per_field() {
	init_logging();
	let html = r#"<div id="debounce-view"><input id="debounce-a" name="a" data-on-input="A" data-delay="20"><input id="debounce-b" name="b" data-on-input="B" data-delay="20"></div>"#;
	mount(html);
	let transport = StubTransport::content(&format!("<style></style>{}", html));
	let sent = Rc::clone(&transport.sent);
	let runtime = runtime_with(document(), transport);
	let bindings = bind_document(&runtime, &document()).unwrap();

	input("debounce-a").set_value("1");
	fire(&element("debounce-a"), "input");
	input("debounce-a").set_value("12");
	fire(&element("debounce-a"), "input");
	input("debounce-b").set_value("x");
	fire(&element("debounce-b"), "input");
	sleep(60).await;

	let sent = sent.borrow();
	let mut bodies: Vec<(String, String)> = sent.iter().map(|msg| (msg.action().to_owned(), msg.body())).collect();
	bodies.sort();
	assert_eq!(bodies, [("A".to_owned(), "a=12".to_owned()), ("B".to_owned(), "b=x".to_owned())]);
	drop(bindings);
}
