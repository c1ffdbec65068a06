use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

/// A failed round-trip, either from a non-success HTTP status, a network failure or a socket-level failure.
///
/// `name` is the short headline shown in the error view (for example `"Fetch Error 422"`),
/// `message` is the (unescaped) response body or JS error text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name}: {message}")]
pub struct TransportError {
	pub name: String,
	pub message: String,
}
impl TransportError {
	#[must_use]
	pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			message: message.into(),
		}
	}

	/// Error for a non-success HTTP response.
	#[must_use]
	pub fn status(status: u16, body: impl Into<String>) -> Self {
		Self::new(format!("Fetch Error {}", status), body)
	}

	#[must_use]
	pub fn from_js(name: &str, error: &JsValue) -> Self {
		Self::new(name, describe_js(error))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The response lacked its `<style>` or content `<div>`.
	#[error("Empty Response")]
	EmptyResponse,

	#[error("Target Missing: {0:?}")]
	MissingTarget(String),

	/// The target's tag differs from the response's content root, so it isn't the view the response is for.
	#[error("Target {target} doesn't match response content {content}")]
	RootMismatch { target: String, content: String },

	/// A DOM call threw.
	#[error("DOM error: {0}")]
	Dom(String),
}
impl ActionError {
	/// Headline and details for the full-page error view.
	#[must_use]
	pub fn view_parts(&self) -> (String, String) {
		match self {
			ActionError::Transport(TransportError { name, message }) => (name.clone(), message.clone()),
			other => ("Client Error".to_owned(), other.to_string()),
		}
	}

	/// Whether this error replaces the page, as opposed to being logged and dropped.
	#[must_use]
	pub fn is_fatal(&self) -> bool {
		match self {
			ActionError::Transport(_) | ActionError::Dom(_) => true,
			ActionError::EmptyResponse | ActionError::MissingTarget(_) | ActionError::RootMismatch { .. } => false,
		}
	}
}
impl From<JsValue> for ActionError {
	fn from(error: JsValue) -> Self {
		Self::Dom(describe_js(&error))
	}
}

pub(crate) fn describe_js(value: &JsValue) -> String {
	if let Some(string) = value.as_string() {
		return string;
	}
	if let Some(error) = value.dyn_ref::<js_sys::Error>() {
		return String::from(error.message());
	}
	format!("{:?}", value)
}

const ERROR_STYLE: &[&str] = &[
	".hyp-error {background-color:#DB3524; color:white; padding: 10px}",
	".hyp-details {padding: 10px}",
];

/// Renders the full-page error view that replaces `document.body`'s markup.
///
/// The message is inserted verbatim, as servers commonly answer failures with an HTML body.
#[must_use]
pub fn error_html(name: &str, message: &str) -> String {
	[
		format!("<style>{}</style>", ERROR_STYLE.join("\n")),
		format!("<div class='hyp-error'>{}</div>", name),
		format!("<div class='hyp-details'>{}</div>", message),
	]
	.join("\n")
}
