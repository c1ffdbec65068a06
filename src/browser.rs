//! Address-bar and navigation helpers.

use crate::error::ActionError;
use tracing::{info, trace};
use url::Url;
use wasm_bindgen::JsValue;

pub fn window() -> Result<web_sys::Window, ActionError> {
	web_sys::window().ok_or_else(|| ActionError::Dom("No `window` available.".to_owned()))
}

/// The document's URL, which actions are addressed relative to.
pub fn document_url(document: &web_sys::Document) -> Result<Url, ActionError> {
	let url = document.url()?;
	Url::parse(&url).map_err(|error| ActionError::Dom(format!("Unparseable document URL {:?}: {}", url, error)))
}

/// Full (imperative) navigation, used for server-issued redirects.
pub fn navigate(url: &str) {
	info!("Redirecting to {:?}", url);
	let result = window().and_then(|window| window.location().assign(url).map_err(ActionError::from));
	if let Err(error) = result {
		tracing::error!("Failed to navigate to {:?}: {}", url, error);
	}
}

/// Replaces the address bar's query string without navigating.
///
/// Does nothing if `query` (without leading `?`) is already current.
pub fn set_query(query: &str) -> Result<(), JsValue> {
	let window = web_sys::window().ok_or_else(|| JsValue::from_str("No `window` available."))?;
	let location = window.location();
	let search = location.search()?;
	if current_query(&search) == query {
		trace!("Query unchanged.");
		return Ok(());
	}
	let url = query_path(&location.pathname()?, query);
	window.history()?.replace_state_with_url(&JsValue::NULL, "", Some(&url))
}

fn current_query(search: &str) -> &str {
	search.strip_prefix('?').unwrap_or(search)
}

fn query_path(pathname: &str, query: &str) -> String {
	if query.is_empty() {
		pathname.to_owned()
	} else {
		format!("{}?{}", pathname, query)
	}
}
