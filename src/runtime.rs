//! The action control loop and the page-lifetime state it owns.

use crate::{
	action::ActionMessage,
	browser,
	config::{socket_url_for, RuntimeConfig, SocketSetting},
	error::{error_html, ActionError},
	events,
	in_flight::InFlight,
	patch, response,
	socket::SocketConnection,
	stylesheet::{self, StyleRuleIndex},
	transport::{ActionTransport, Delivery, HttpTransport, Transport},
};
use hashbrown::HashSet;
use std::{cell::RefCell, rc::Rc};
use tracing::{error, info, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast};

/// Terminal state of one dispatched action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
	/// Refused before any network call (undefined action or unresolvable target).
	Rejected,
	/// Styles merged, DOM patched.
	Resolved,
	/// The page is navigating away. Nothing was applied.
	Redirected(String),
	/// Logged and dropped. The page is left as it was.
	Skipped(ActionError),
	/// The page body was replaced by the error view.
	Failed(ActionError),
}

/// Everything that lives for the page's lifetime: the live stylesheet and its rule index, the transport (and with it the
/// connection state) and per-target loading counters.
///
/// Created on page load by [`Runtime::init`]. Dropping it tears down the socket.
pub struct Runtime {
	config: RuntimeConfig,
	document: web_sys::Document,
	root_style: web_sys::HtmlStyleElement,
	rule_index: RefCell<StyleRuleIndex>,
	in_flight: RefCell<InFlight<String>>,
	/// Target ids currently showing the loading class.
	loading: Rc<RefCell<HashSet<String>>>,
	transport: Box<dyn Transport>,
	navigate: Box<dyn Fn(&str)>,
}
impl Runtime {
	/// Sets up the default transport (socket if configured, HTTP fallback) for `document`.
	#[instrument(skip(document))]
	pub fn init(document: web_sys::Document, config: RuntimeConfig) -> Result<Rc<Self>, ActionError> {
		let socket_url = match &config.socket {
			SocketSetting::Off => None,
			SocketSetting::Url(url) => Some(url.clone()),
			SocketSetting::FromPage => {
				let location = browser::window()?.location();
				Some(socket_url_for(&location.protocol()?, &location.host()?, &location.pathname()?))
			}
		};
		let socket = socket_url.and_then(|url| match SocketConnection::connect(&url) {
			Ok(socket) => Some(socket),
			Err(error) => {
				warn!("Could not open socket to {:?}: {:?}. Using HTTP only.", url, error);
				None
			}
		});

		let transport = ActionTransport::new(socket, HttpTransport::new());
		Ok(Rc::new(Self::with_transport(document, config, transport)?))
	}

	pub fn with_transport(document: web_sys::Document, config: RuntimeConfig, transport: impl Transport + 'static) -> Result<Self, ActionError> {
		let root_style = stylesheet::live_style_element(&document)?;
		Ok(Self {
			config,
			document,
			root_style,
			rule_index: RefCell::new(StyleRuleIndex::new()),
			in_flight: RefCell::new(InFlight::new()),
			loading: Rc::default(),
			transport: Box::new(transport),
			navigate: Box::new(browser::navigate),
		})
	}

	/// Replaces how redirects navigate. Defaults to `location.assign`.
	#[must_use]
	pub fn on_redirect(mut self, navigate: impl Fn(&str) + 'static) -> Self {
		self.navigate = Box::new(navigate);
		self
	}

	#[must_use]
	pub fn config(&self) -> &RuntimeConfig {
		&self.config
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	/// Number of distinct style rules merged so far.
	#[must_use]
	pub fn merged_rule_count(&self) -> usize {
		self.rule_index.borrow().len()
	}

	/// Runs an action in the background.
	pub fn dispatch(self: &Rc<Self>, target: web_sys::HtmlElement, action: Option<String>, form: Option<Vec<(String, String)>>) {
		let runtime = Rc::clone(self);
		wasm_bindgen_futures::spawn_local(async move {
			let outcome = runtime.run_action(target, action, form).await;
			trace!(?outcome, "Action finished.");
		});
	}

	/// Sends one action and applies its response.
	///
	/// Concurrent actions aren't sequenced: Responses apply in completion order.
	#[instrument(skip(self, target, form), fields(target_id = %target.id()))]
	pub async fn run_action(self: Rc<Self>, target: web_sys::HtmlElement, action: Option<String>, form: Option<Vec<(String, String)>>) -> ActionOutcome {
		let target_id = target.id();

		let page_url = match browser::document_url(&self.document) {
			Ok(url) => url,
			Err(error) => return self.escalate(error),
		};
		let msg = match ActionMessage::encode(&target_id, action.as_deref(), form, &page_url) {
			Some(msg) => msg,
			None => return ActionOutcome::Rejected,
		};
		if target_id.is_empty() || self.document.get_element_by_id(&target_id).is_none() {
			warn!("Target Missing: {:?}. Not sending {:?}.", target_id, msg.action());
			return ActionOutcome::Rejected;
		}

		let marker = LoadingMarker::arm(&self, &target);
		let outcome = match self.transport.send_action(&msg).await {
			Ok(Delivery::Redirect(url)) => {
				(self.navigate)(&url);
				ActionOutcome::Redirected(url)
			}
			Ok(Delivery::Content(html)) => match self.apply(&target, msg.target_id(), &html) {
				Ok(new_target) => {
					match new_target {
						Some(new_target) => events::listen_load(&self, &new_target),
						None => warn!("Target Missing: {:?}", msg.target_id()),
					}
					ActionOutcome::Resolved
				}
				Err(error) => self.escalate(error),
			},
			Err(error) => self.escalate(error.into()),
		};
		drop(marker);
		outcome
	}

	/// Merges styles, patches `target` and re-resolves it by id.
	fn apply(&self, target: &web_sys::HtmlElement, target_id: &str, html: &str) -> Result<Option<web_sys::HtmlElement>, ActionError> {
		let parsed = response::parse_response(html)?;
		stylesheet::merge(&self.root_style, &parsed.stylesheet, &mut self.rule_index.borrow_mut(), &self.document)?;
		patch::reconcile(target, &parsed.content, &self.document)?;
		Ok(self.document.get_element_by_id(target_id).and_then(|element| element.dyn_into::<web_sys::HtmlElement>().ok()))
	}

	fn escalate(&self, error: ActionError) -> ActionOutcome {
		if !error.is_fatal() {
			error!("{}", error);
			return ActionOutcome::Skipped(error);
		}

		error!("Action failed: {}", error);
		let (name, message) = error.view_parts();
		match self.document.body() {
			Some(body) => body.set_inner_html(&error_html(&name, &message)),
			None => error!("No body to render the error into."),
		}
		ActionOutcome::Failed(error)
	}
}
impl Drop for Runtime {
	fn drop(&mut self) {
		info!("Runtime torn down after merging {} style rule(s).", self.rule_index.borrow().len());
	}
}

/// Adds the loading class to the target after the configured delay, unless dropped first.
///
/// The class is removed once the last pending action for the same target id completes.
/// Until then, it's restored after each patch (which may have overwritten `class`).
struct LoadingMarker<'a> {
	runtime: &'a Runtime,
	target: web_sys::HtmlElement,
	target_id: String,
	timer: Option<(i32, Closure<dyn FnMut()>)>,
}
impl<'a> LoadingMarker<'a> {
	fn arm(runtime: &'a Runtime, target: &web_sys::HtmlElement) -> Self {
		let target_id = target.id();
		if let Err(error) = runtime.in_flight.borrow_mut().increment(target_id.clone()) {
			error!("Too many pending actions for {:?}: {:?}", target_id, error);
		}

		let callback = {
			let target = target.clone();
			let target_id = target_id.clone();
			let class = runtime.config.loading_class.clone();
			let loading = Rc::clone(&runtime.loading);
			Closure::wrap(Box::new(move || {
				trace!("Marking target as loading.");
				loading.borrow_mut().insert(target_id.clone());
				add_class(&target, &class);
			}) as Box<dyn FnMut()>)
		};
		let timer = browser::window()
			.ok()
			.and_then(|window| window.set_timeout_with_callback_and_timeout_and_arguments_0(callback.as_ref().unchecked_ref(), runtime.config.loading_delay_ms).ok());
		if timer.is_none() {
			warn!("Could not schedule the loading marker.");
		}

		Self {
			runtime,
			target: target.clone(),
			target_id,
			timer: timer.map(|handle| (handle, callback)),
		}
	}
}
impl Drop for LoadingMarker<'_> {
	fn drop(&mut self) {
		if let Some((handle, _callback)) = self.timer.take() {
			if let Ok(window) = browser::window() {
				window.clear_timeout_with_handle(handle);
			}
		}

		let remaining = self.runtime.in_flight.borrow_mut().decrement(self.target_id.as_str());
		let class = &self.runtime.config.loading_class;
		let live_target = self.runtime.document.get_element_by_id(&self.target_id);
		if remaining == 0 {
			self.runtime.loading.borrow_mut().remove(&self.target_id);
			for element in iter_targets(&self.target, live_target.as_ref()) {
				if let Err(error) = element.class_list().remove_1(class) {
					error!("Failed to remove loading class: {:?}", error);
				}
			}
		} else if self.runtime.loading.borrow().contains(&self.target_id) {
			trace!(remaining, "Restoring loading class.");
			if let Some(live_target) = live_target {
				add_class(&live_target, class);
			}
		}
	}
}

fn add_class(element: &web_sys::Element, class: &str) {
	if let Err(error) = element.class_list().add_1(class) {
		error!("Failed to add loading class: {:?}", error);
	}
}

/// The dispatch-time target plus its post-patch replacement, if that's a different node.
fn iter_targets<'a>(original: &'a web_sys::Element, live: Option<&'a web_sys::Element>) -> impl Iterator<Item = &'a web_sys::Element> {
	core::iter::once(original).chain(live.filter(|live| *live != original))
}
