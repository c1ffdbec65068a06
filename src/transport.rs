use crate::{action::ActionMessage, browser, error::TransportError};
use async_trait::async_trait;
use tracing::{error, info, instrument, trace};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

/// What a successful round-trip produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
	/// The HTML fragment to apply.
	Content(String),
	/// The server asked for a full navigation. No content is applied for this action.
	Redirect(String),
}

/// "Send an action, get HTML back."
///
/// Implementations must resolve identically regardless of the channel used, so that callers stay transport-agnostic.
#[async_trait(?Send)]
pub trait Transport {
	async fn send_action(&self, msg: &ActionMessage) -> Result<Delivery, TransportError>;

	/// Whether [`Transport::send_action`] can currently be attempted. Connection-based transports report their state here.
	fn is_available(&self) -> bool {
		true
	}
}

/// Prefers the persistent connection while it is established and falls back to one-shot HTTP otherwise.
pub struct ActionTransport {
	primary: Option<Box<dyn Transport>>,
	fallback: Box<dyn Transport>,
}
impl ActionTransport {
	/// Usually a [`SocketConnection`](`crate::socket::SocketConnection`) and an [`HttpTransport`].
	#[must_use]
	pub fn new(primary: Option<impl Transport + 'static>, fallback: impl Transport + 'static) -> Self {
		Self {
			primary: primary.map(|primary| Box::new(primary) as Box<dyn Transport>),
			fallback: Box::new(fallback),
		}
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.primary.as_ref().map_or(false, |primary| primary.is_available())
	}
}
#[async_trait(?Send)]
impl Transport for ActionTransport {
	async fn send_action(&self, msg: &ActionMessage) -> Result<Delivery, TransportError> {
		match &self.primary {
			Some(primary) if primary.is_available() => {
				trace!("Sending over the persistent connection.");
				primary.send_action(msg).await
			}
			_ => {
				trace!("Sending over HTTP.");
				self.fallback.send_action(msg).await
			}
		}
	}
}

/// `POST` with a form-encoded body and manual redirect handling.
///
/// Redirects are signalled by a `location` header on an otherwise regular response, never by following a 3xx.
#[derive(Debug, Default)]
pub struct HttpTransport;
impl HttpTransport {
	#[must_use]
	pub fn new() -> Self {
		Self
	}

	fn request(msg: &ActionMessage) -> Result<web_sys::Request, JsValue> {
		let headers = web_sys::Headers::new()?;
		headers.set("Accept", "text/html")?;
		headers.set("Content-Type", "application/x-www-form-urlencoded")?;

		let init = web_sys::RequestInit::new();
		init.set_method("POST");
		init.set_headers(&headers);
		init.set_body(&JsValue::from_str(&msg.body()));
		init.set_redirect(web_sys::RequestRedirect::Manual);

		web_sys::Request::new_with_str_and_init(msg.destination().as_str(), &init)
	}
}
#[async_trait(?Send)]
impl Transport for HttpTransport {
	#[instrument(skip(self, msg), fields(target_id = msg.target_id(), action = msg.action()))]
	async fn send_action(&self, msg: &ActionMessage) -> Result<Delivery, TransportError> {
		let request = Self::request(msg).map_err(|error| TransportError::from_js("Fetch Error", &error))?;
		let window = browser::window().map_err(|error| TransportError::new("Fetch Error", error.to_string()))?;
		let response = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(|error| TransportError::from_js("Fetch Error", &error))?
			.dyn_into::<web_sys::Response>()
			.map_err(|value| TransportError::from_js("Fetch Error", &value))?;

		let headers = response.headers();
		let location = header(&headers, "location");
		let set_query = match headers.get("set-query") {
			Ok(set_query) => set_query,
			Err(error) => {
				error!("Failed to read header \"set-query\": {:?}", error);
				None
			}
		};

		let body = match &location {
			Some(_) => String::new(),
			None => {
				let text = response.text().map_err(|error| TransportError::from_js("Fetch Error", &error))?;
				JsFuture::from(text)
					.await
					.map_err(|error| TransportError::from_js("Fetch Error", &error))?
					.as_string()
					.unwrap_or_default()
			}
		};

		let reply = interpret_response(response.status(), response.ok(), location, set_query, body);
		if let Some(query) = &reply.set_query {
			if let Err(error) = browser::set_query(query) {
				error!("Failed to set query {:?}: {:?}", query, error);
			}
		}
		if let Ok(Delivery::Redirect(location)) = &reply.outcome {
			info!("Found Redirect {:?}", location);
		}
		reply.outcome
	}
}

/// A present, non-empty header value.
fn header(headers: &web_sys::Headers, name: &str) -> Option<String> {
	match headers.get(name) {
		Ok(Some(value)) if !value.is_empty() => Some(value),
		Ok(_) => None,
		Err(error) => {
			error!("Failed to read header {:?}: {:?}", name, error);
			None
		}
	}
}

/// What an HTTP response means for the action, before any side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
	/// Query string to apply to the address bar. An empty string removes the query.
	pub set_query: Option<String>,
	pub outcome: Result<Delivery, TransportError>,
}

/// Interprets a response's status, its `location` and `set-query` headers and its body text.
///
/// A `location` header wins over everything else, including a failure status. The body is ignored in that case.
#[must_use]
pub fn interpret_response(status: u16, ok: bool, location: Option<String>, set_query: Option<String>, body: String) -> HttpReply {
	if let Some(location) = location {
		return HttpReply {
			set_query: None,
			outcome: Ok(Delivery::Redirect(location)),
		};
	}

	HttpReply {
		set_query,
		outcome: if ok { Ok(Delivery::Content(body)) } else { Err(TransportError::status(status, body)) },
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use core::cell::Cell;
	use futures::executor::block_on;
	use std::rc::Rc;
	use url::Url;

	#[test]
	fn success_yields_content() {
		let reply = interpret_response(200, true, None, None, "<style></style><div></div>".into());
		assert_eq!(reply.outcome, Ok(Delivery::Content("<style></style><div></div>".into())));
		assert_eq!(reply.set_query, None);
	}

	#[test]
	fn failure_embeds_status_and_body() {
		let error = interpret_response(422, false, None, None, "Invalid input".into()).outcome.unwrap_err();
		assert_eq!(error.name, "Fetch Error 422");
		assert_eq!(error.message, "Invalid input");
	}

	#[test]
	fn location_wins_over_status_and_body() {
		let reply = interpret_response(500, false, Some("/new-path".into()), Some("a=1".into()), "ignored".into());
		assert_eq!(reply.outcome, Ok(Delivery::Redirect("/new-path".into())));
		assert_eq!(reply.set_query, None);
	}

	#[test]
	fn set_query_is_kept_for_content_and_failures() {
		assert_eq!(interpret_response(200, true, None, Some("page=3".into()), String::new()).set_query.as_deref(), Some("page=3"));
		assert_eq!(interpret_response(422, false, None, Some(String::new()), String::new()).set_query.as_deref(), Some(""));
	}

	#[test]
	fn opaque_redirects_are_failures() {
		// A protocol-level 3xx under `redirect: manual` surfaces as status 0.
		assert_eq!(interpret_response(0, false, None, None, String::new()).outcome.unwrap_err().name, "Fetch Error 0");
	}

	struct Channel {
		available: bool,
		reply: &'static str,
		calls: Rc<Cell<usize>>,
	}
	#[async_trait(?Send)]
	impl Transport for Channel {
		async fn send_action(&self, _msg: &ActionMessage) -> Result<Delivery, TransportError> {
			self.calls.set(self.calls.get() + 1);
			Ok(Delivery::Content(self.reply.to_owned()))
		}

		fn is_available(&self) -> bool {
			self.available
		}
	}

	fn channel(available: bool, reply: &'static str) -> (Channel, Rc<Cell<usize>>) {
		let calls = Rc::new(Cell::new(0));
		(
			Channel {
				available,
				reply,
				calls: Rc::clone(&calls),
			},
			calls,
		)
	}

	fn message() -> ActionMessage {
		ActionMessage::encode("main", Some("Go"), None, &Url::parse("http://localhost/").unwrap()).unwrap()
	}

	#[test]
	fn connected_primary_is_preferred() {
		let (primary, primary_calls) = channel(true, "socket");
		let (fallback, fallback_calls) = channel(true, "http");
		let transport = ActionTransport::new(Some(primary), fallback);

		assert!(transport.is_connected());
		assert_eq!(block_on(transport.send_action(&message())), Ok(Delivery::Content("socket".into())));
		assert_eq!((primary_calls.get(), fallback_calls.get()), (1, 0));
	}

	#[test]
	fn disconnected_primary_falls_back() {
		let (primary, primary_calls) = channel(false, "socket");
		let (fallback, fallback_calls) = channel(true, "http");
		let transport = ActionTransport::new(Some(primary), fallback);

		assert!(!transport.is_connected());
		assert_eq!(block_on(transport.send_action(&message())), Ok(Delivery::Content("http".into())));
		assert_eq!((primary_calls.get(), fallback_calls.get()), (0, 1));
	}

	#[test]
	fn missing_primary_falls_back() {
		let (fallback, fallback_calls) = channel(true, "http");
		let transport = ActionTransport::new(None::<Channel>, fallback);

		assert!(!transport.is_connected());
		assert_eq!(block_on(transport.send_action(&message())), Ok(Delivery::Content("http".into())));
		assert_eq!(fallback_calls.get(), 1);
	}
}
