//! Incremental merging of response styles into the page's single live stylesheet.
//!
//! Rules are compared by their serialized `cssText` and never removed again.

use crate::{error::ActionError, redact::Redacted};
use hashbrown::HashSet;
use tracing::{error, instrument, trace, warn};
use wasm_bindgen::JsCast;

/// Rule texts already present in the live stylesheet. Grows for the page's lifetime.
#[derive(Debug, Default)]
pub struct StyleRuleIndex(HashSet<String>);
impl StyleRuleIndex {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn contains(&self, rule: &str) -> bool {
		self.0.contains(rule)
	}

	/// Records `rule`, returning whether it was new.
	pub fn admit(&mut self, rule: &str) -> bool {
		if self.0.contains(rule) {
			false
		} else {
			self.0.insert(rule.to_owned())
		}
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// The page's first `<style>` element, which is created in `<head>` if there is none.
pub fn live_style_element(document: &web_sys::Document) -> Result<web_sys::HtmlStyleElement, ActionError> {
	if let Some(existing) = document.query_selector("style")? {
		if let Ok(style) = existing.dyn_into::<web_sys::HtmlStyleElement>() {
			return Ok(style);
		}
	}

	warn!("No page stylesheet found. Creating one.");
	let style = document
		.create_element("style")?
		.dyn_into::<web_sys::HtmlStyleElement>()
		.map_err(|element| ActionError::Dom(format!("Expected `HtmlStyleElement` but created {:?}", element)))?;
	match document.head() {
		Some(head) => head.append_child(&style)?,
		None => document
			.document_element()
			.ok_or_else(|| ActionError::Dom("Document has no root element.".to_owned()))?
			.append_child(&style)?,
	};
	Ok(style)
}

/// Inserts each not yet merged rule of `parsed` at the end of `live`, in source order.
///
/// Returns the number of inserted rules. Rules the browser refuses are logged and skipped (and not recorded).
#[instrument(skip(live, parsed, index, document))]
pub fn merge(live: &web_sys::HtmlStyleElement, parsed: &web_sys::HtmlStyleElement, index: &mut StyleRuleIndex, document: &web_sys::Document) -> Result<usize, ActionError> {
	let live_sheet = css_style_sheet(live).ok_or_else(|| ActionError::Dom("The page stylesheet has no CSSOM sheet.".to_owned()))?;

	let mut inserted = 0;
	for rule in rule_texts(parsed, document)? {
		if index.contains(&rule) {
			continue;
		}
		let end = live_sheet.css_rules()?.length();
		match live_sheet.insert_rule_with_index(&rule, end) {
			Ok(_) => {
				index.admit(&rule);
				inserted += 1;
			}
			Err(error) => error!("Failed to insert rule {:?}: {:?}", Redacted(&rule), error),
		}
	}
	trace!(inserted, total = index.len(), "Merged styles.");
	Ok(inserted)
}

fn css_style_sheet(style: &web_sys::HtmlStyleElement) -> Option<web_sys::CssStyleSheet> {
	style.sheet().and_then(|sheet| sheet.dyn_into::<web_sys::CssStyleSheet>().ok())
}

/// Serialized rules of a (possibly detached or foreign) `<style>`.
///
/// Parsed documents without a browsing context may not build a CSSOM, in which case a copy is briefly adopted into `document`.
fn rule_texts(style: &web_sys::HtmlStyleElement, document: &web_sys::Document) -> Result<Vec<String>, ActionError> {
	if let Some(sheet) = css_style_sheet(style) {
		return collect(&sheet);
	}

	trace!("Adopting stylesheet to read its rules.");
	let adopted = document.import_node_with_deep(style, true)?;
	let parent = match document.head() {
		Some(head) => web_sys::Node::from(head),
		None => document.document_element().ok_or_else(|| ActionError::Dom("Document has no root element.".to_owned()))?.into(),
	};
	parent.append_child(&adopted)?;
	let rules = match adopted.dyn_ref::<web_sys::HtmlStyleElement>().and_then(css_style_sheet) {
		Some(sheet) => collect(&sheet),
		None => Err(ActionError::Dom("Response stylesheet could not be read.".to_owned())),
	};
	parent.remove_child(&adopted)?;
	rules
}

fn collect(sheet: &web_sys::CssStyleSheet) -> Result<Vec<String>, ActionError> {
	let rules = sheet.css_rules()?;
	Ok((0..rules.length()).filter_map(|i| rules.item(i)).map(|rule| rule.css_text()).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn admitting_is_idempotent() {
		let mut index = StyleRuleIndex::new();
		assert!(index.admit(".a { color: red; }"));
		assert!(index.admit(".b { color: blue; }"));
		assert!(!index.admit(".a { color: red; }"));
		assert_eq!(index.len(), 2);
		assert!(index.contains(".b { color: blue; }"));
	}
}
