#![doc(html_root_url = "https://docs.rs/hyp-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod action;
pub mod browser;
pub mod config;
pub mod error;
pub mod events;
pub mod in_flight;
pub mod patch;
mod redact;
pub mod response;
pub mod runtime;
pub mod socket;
pub mod stylesheet;
pub mod transport;
pub mod vdom;

pub use action::ActionMessage;
pub use config::RuntimeConfig;
pub use error::{ActionError, TransportError};
pub use runtime::{ActionOutcome, Runtime};
pub use transport::{Delivery, Transport};

use std::{cell::RefCell, rc::Rc};
use tracing::{error, info};

/// A running page: the runtime plus the document listeners feeding it.
pub struct Page {
	pub runtime: Rc<Runtime>,
	_bindings: events::EventBindings,
}
impl Page {
	/// Initializes the runtime for `document`, binds its listeners and fires the initial `data-on-load` actions.
	pub fn init(document: &web_sys::Document, config: RuntimeConfig) -> Result<Self, ActionError> {
		let runtime = Runtime::init(document.clone(), config)?;
		let bindings = events::bind_document(&runtime, document)?;
		if let Some(body) = document.body() {
			events::listen_load(&runtime, &body);
		}
		Ok(Self { runtime, _bindings: bindings })
	}
}

thread_local! {
	static PAGE: RefCell<Option<Page>> = RefCell::new(None);
}

/// Starts the runtime once the document is parsed.
#[cfg(all(target_arch = "wasm32", feature = "start"))]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
	use wasm_bindgen::{closure::Closure, JsCast, UnwrapThrowExt};

	console_error_panic_hook::set_once();
	tracing_wasm::set_as_global_default();
	info!("hyp-dom {}", env!("CARGO_PKG_VERSION"));

	let window = web_sys::window().expect_throw("hyp-dom: No `window`.");
	let on_hide = Closure::once_into_js(teardown);
	window
		.add_event_listener_with_callback("pagehide", on_hide.unchecked_ref())
		.expect_throw("hyp-dom: Failed to listen for `pagehide`.");

	let document = window.document().expect_throw("hyp-dom: No `document`.");
	if document.ready_state() == "loading" {
		let on_ready = Closure::once_into_js(boot);
		document
			.add_event_listener_with_callback("DOMContentLoaded", on_ready.unchecked_ref())
			.expect_throw("hyp-dom: Failed to wait for `DOMContentLoaded`.");
	} else {
		boot();
	}
}

/// Initializes the page-wide [`Page`] from the current document, replacing any previous one.
pub fn boot() {
	let document = match web_sys::window().and_then(|window| window.document()) {
		Some(document) => document,
		None => return error!("No document to boot into."),
	};
	let config = RuntimeConfig::from_document(&document);
	match Page::init(&document, config) {
		Ok(page) => PAGE.with(|current| *current.borrow_mut() = Some(page)),
		Err(error) => error!("Failed to start: {}", error),
	}
}

/// Drops the page-wide [`Page`], which closes the socket and removes the document listeners.
pub fn teardown() {
	let page = PAGE.with(|current| current.borrow_mut().take());
	if page.is_some() {
		info!("Tearing down.");
	}
}
