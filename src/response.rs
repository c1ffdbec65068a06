use crate::error::ActionError;
use tracing::{error, instrument, trace};
use wasm_bindgen::JsCast;

/// A server fragment, split into its parts.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
	pub content: web_sys::Element,
	pub stylesheet: web_sys::HtmlStyleElement,
}

/// Parses `html` as a standalone document and picks its first `<style>` and first `<div>`.
///
/// # Errors
///
/// [`ActionError::EmptyResponse`] if either part is missing, [`ActionError::Dom`] if the document couldn't be parsed at all.
#[instrument(skip(html), fields(len = html.len()))]
pub fn parse_response(html: &str) -> Result<ParsedResponse, ActionError> {
	let document = web_sys::DomParser::new()?.parse_from_string(html, web_sys::SupportedType::TextHtml)?;

	let stylesheet = document.query_selector("style")?.and_then(|style| style.dyn_into::<web_sys::HtmlStyleElement>().ok());
	let content = document.query_selector("div")?;

	match (content, stylesheet) {
		(Some(content), Some(stylesheet)) => {
			trace!("Parsed response.");
			Ok(ParsedResponse { content, stylesheet })
		}
		(content, stylesheet) => {
			error!(has_content = content.is_some(), has_stylesheet = stylesheet.is_some(), "Empty Response");
			Err(ActionError::EmptyResponse)
		}
	}
}
