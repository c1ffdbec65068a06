//! Delegated listeners for the framework's `data-on-*` attributes.
//!
//! The source of an event is the closest element carrying the event's attribute. The action's target view is the element
//! named by the source's `data-target`, or otherwise the closest ancestor-or-self view (a `<div>` with an `id`).
//! Controls that merely carry an `id` are never views.

use crate::{action::form_pairs, browser, runtime::Runtime};
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

const ON_LOAD: &str = "data-on-load";
const DELAY: &str = "data-delay";
const TARGET: &str = "data-target";
const VIEW: &str = "div[id]";

struct Listener {
	name: &'static str,
	closure: Closure<dyn FnMut(web_sys::Event)>,
}

/// Document-level listeners. Removed again on drop.
pub struct EventBindings {
	target: web_sys::EventTarget,
	listeners: Vec<Listener>,
}
impl Drop for EventBindings {
	fn drop(&mut self) {
		for Listener { name, closure } in self.listeners.drain(..) {
			if let Err(error) = self.target.remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref()) {
				error!("Failed to remove event listener {:?}: {:?}", name, error);
			}
		}
	}
}

/// Binds click, double-click, submit, change, input and key listeners on `document`.
///
/// The closures hold the runtime weakly, so dropping the runtime disables them.
#[instrument(skip(runtime, document))]
pub fn bind_document(runtime: &Rc<Runtime>, document: &web_sys::Document) -> Result<EventBindings, JsValue> {
	let mut bindings = EventBindings {
		target: document.clone().into(),
		listeners: Vec::new(),
	};

	for &(name, attribute) in &[("click", "data-on-click"), ("dblclick", "data-on-dblclick")] {
		bindings.listen(name, on_simple(Rc::downgrade(runtime), attribute))?;
	}
	bindings.listen("change", on_change(Rc::downgrade(runtime)))?;
	bindings.listen("submit", on_submit(Rc::downgrade(runtime)))?;
	bindings.listen("input", on_input(Rc::downgrade(runtime)))?;
	bindings.listen("keydown", on_key(Rc::downgrade(runtime), "data-on-keydown-"))?;
	bindings.listen("keyup", on_key(Rc::downgrade(runtime), "data-on-keyup-"))?;
	Ok(bindings)
}

impl EventBindings {
	fn listen(&mut self, name: &'static str, handler: Box<dyn FnMut(web_sys::Event)>) -> Result<(), JsValue> {
		let closure = Closure::wrap(handler);
		self.target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
		self.listeners.push(Listener { name, closure });
		Ok(())
	}
}

fn on_simple(runtime: Weak<Runtime>, attribute: &'static str) -> Box<dyn FnMut(web_sys::Event)> {
	Box::new(move |event: web_sys::Event| {
		if let Some((source, action)) = event_source(&event, attribute) {
			trace!(attribute, "Delegated event.");
			dispatch(&runtime, &source, action, None);
		}
	})
}

/// Sends the changed field's value along.
fn on_change(runtime: Weak<Runtime>) -> Box<dyn FnMut(web_sys::Event)> {
	Box::new(move |event: web_sys::Event| {
		if let Some((source, action)) = event_source(&event, "data-on-change") {
			let field = field_pairs(&source);
			dispatch(&runtime, &source, action, field);
		}
	})
}

fn on_submit(runtime: Weak<Runtime>) -> Box<dyn FnMut(web_sys::Event)> {
	Box::new(move |event: web_sys::Event| {
		let (source, action) = match event_source(&event, "data-on-submit") {
			Some(found) => found,
			None => return,
		};
		event.prevent_default();
		let form = match source.dyn_ref::<web_sys::HtmlFormElement>().map(web_sys::FormData::new_with_form) {
			Some(Ok(form)) => Some(form_pairs(&form)),
			Some(Err(error)) => {
				error!("Failed to read form data: {:?}", error);
				None
			}
			None => {
				warn!("`data-on-submit` on a non-form element.");
				None
			}
		};
		dispatch(&runtime, &source, action, form);
	})
}

/// Input is debounced per field by `data-delay` (or the configured default) milliseconds.
///
/// The field's value is read when the action fires, so the latest input is sent.
fn on_input(runtime: Weak<Runtime>) -> Box<dyn FnMut(web_sys::Event)> {
	let pending: Rc<RefCell<Vec<(web_sys::Element, i32)>>> = Rc::default();
	Box::new(move |event: web_sys::Event| {
		let (source, action) = match event_source(&event, "data-on-input") {
			Some(found) => found,
			None => return,
		};
		let default_delay = match runtime.upgrade() {
			Some(runtime) => runtime.config().input_delay_ms,
			None => return,
		};
		let delay = delay_of(&source, default_delay);

		let window = match browser::window() {
			Ok(window) => window,
			Err(error) => return error!("{}", error),
		};
		if let Some(handle) = take_pending(&pending, &source) {
			window.clear_timeout_with_handle(handle);
		}
		let fire = {
			let runtime = runtime.clone();
			let pending = Rc::clone(&pending);
			let source = source.clone();
			Closure::once_into_js(move || {
				take_pending(&pending, &source);
				let field = field_pairs(&source);
				dispatch(&runtime, &source, action, field);
			})
		};
		match window.set_timeout_with_callback_and_timeout_and_arguments_0(fire.unchecked_ref(), delay) {
			Ok(handle) => pending.borrow_mut().push((source, handle)),
			Err(error) => error!("Failed to schedule input action: {:?}", error),
		}
	})
}

/// Removes and returns the debounce timer of `source`, if any.
fn take_pending(pending: &RefCell<Vec<(web_sys::Element, i32)>>, source: &web_sys::Element) -> Option<i32> {
	let mut pending = pending.borrow_mut();
	let position = pending.iter().position(|(element, _)| element == source)?;
	Some(pending.swap_remove(position).1)
}

/// The source field's current value as a single form pair, named after its `name` attribute (or `value`).
///
/// [`None`] for elements without a string `value` property.
fn field_pairs(source: &web_sys::Element) -> Option<Vec<(String, String)>> {
	let value = js_sys::Reflect::get(source.as_ref(), &JsValue::from_str("value")).ok()?.as_string()?;
	Some(vec![(field_name(source.get_attribute("name")), value)])
}

fn field_name(name: Option<String>) -> String {
	name.filter(|name| !name.is_empty()).unwrap_or_else(|| "value".to_owned())
}

/// `data-on-keydown-<Key>`/`data-on-keyup-<Key>`, where `<Key>` is the `KeyboardEvent.key` value.
fn on_key(runtime: Weak<Runtime>, prefix: &'static str) -> Box<dyn FnMut(web_sys::Event)> {
	Box::new(move |event: web_sys::Event| {
		let key = match event.dyn_ref::<web_sys::KeyboardEvent>() {
			Some(keyboard) => keyboard.key(),
			None => return,
		};
		let attribute = format!("{}{}", prefix, key);
		if let Some((source, action)) = event_source(&event, &attribute) {
			dispatch(&runtime, &source, action, None);
		}
	})
}

/// Fires each `data-on-load` action in `root` (inclusive) once, after its `data-delay`.
///
/// `load` doesn't bubble, so this has to be called again for each newly patched subtree.
#[instrument(skip(runtime, root))]
pub fn listen_load(runtime: &Rc<Runtime>, root: &web_sys::Element) {
	let mut sources = Vec::new();
	if root.has_attribute(ON_LOAD) {
		sources.push(root.clone());
	}
	match root.query_selector_all(&format!("[{}]", ON_LOAD)) {
		Ok(found) => sources.extend((0..found.length()).filter_map(|i| found.get(i)).filter_map(|node| node.dyn_into::<web_sys::Element>().ok())),
		Err(error) => return error!("Failed to query load actions: {:?}", error),
	}
	if sources.is_empty() {
		return;
	}

	let window = match browser::window() {
		Ok(window) => window,
		Err(error) => return error!("{}", error),
	};
	trace!("Scheduling {} load action(s).", sources.len());
	for source in sources {
		let action = source.get_attribute(ON_LOAD);
		let delay = delay_of(&source, 0);
		let runtime = Rc::downgrade(runtime);
		let fire = Closure::once_into_js(move || {
			if let Some(action) = action {
				dispatch(&runtime, &source, action, None);
			}
		});
		if let Err(error) = window.set_timeout_with_callback_and_timeout_and_arguments_0(fire.unchecked_ref(), delay) {
			error!("Failed to schedule load action: {:?}", error);
		}
	}
}

fn dispatch(runtime: &Weak<Runtime>, source: &web_sys::Element, action: String, form: Option<Vec<(String, String)>>) {
	let runtime = match runtime.upgrade() {
		Some(runtime) => runtime,
		None => return trace!("Runtime is gone. Ignoring event."),
	};
	match nearest_target(runtime.document(), source) {
		Some(target) => runtime.dispatch(target, Some(action), form),
		None => warn!("No target view for {:?}.", action),
	}
}

/// The closest ancestor-or-self of the event target carrying `attribute`, and that attribute's value.
fn event_source(event: &web_sys::Event, attribute: &str) -> Option<(web_sys::Element, String)> {
	let mut current = event.target()?.dyn_into::<web_sys::Element>().ok();
	while let Some(element) = current {
		if let Some(action) = element.get_attribute(attribute) {
			return Some((element, action));
		}
		current = element.parent_element();
	}
	None
}

/// `data-target` if present, otherwise the closest ancestor-or-self view.
pub fn nearest_target(document: &web_sys::Document, source: &web_sys::Element) -> Option<web_sys::HtmlElement> {
	let target = match source.get_attribute(TARGET) {
		Some(id) => {
			let target = document.get_element_by_id(&id);
			if target.is_none() {
				warn!("`data-target` {:?} not found.", id);
			}
			target
		}
		None => source.closest(VIEW).ok().flatten(),
	};
	target?.dyn_into::<web_sys::HtmlElement>().ok()
}

fn delay_of(source: &web_sys::Element, default: i32) -> i32 {
	parse_delay(source.get_attribute(DELAY).as_deref(), default)
}

fn parse_delay(value: Option<&str>, default: i32) -> i32 {
	value.and_then(|value| value.trim().parse().ok()).filter(|delay| *delay >= 0).unwrap_or(default)
}
