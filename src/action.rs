use tracing::{error, trace};
use url::{form_urlencoded, Url};
use wasm_bindgen::JsCast;

pub const ID_PARAM: &str = "hyp-id";
pub const ACTION_PARAM: &str = "hyp-action";

/// One user interaction, addressed to the view `target_id`.
///
/// Built once per dispatch by [`ActionMessage::encode`] and consumed by a single [`Transport`](`crate::transport::Transport`) call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionMessage {
	target_id: String,
	action: String,
	form: Option<Vec<(String, String)>>,
	destination: Url,
}
impl ActionMessage {
	/// Encodes an action against the current page URL.
	///
	/// An undefined `action` is a framework usage bug: It's logged and [`None`] is returned instead of failing the page.
	#[must_use]
	pub fn encode(target_id: &str, action: Option<&str>, form: Option<Vec<(String, String)>>, page_url: &Url) -> Option<Self> {
		let action = match action {
			Some(action) => action,
			None => {
				error!("Undefined Action! Target: {:?}. This is a bug, please report it.", target_id);
				return None;
			}
		};

		let mut destination = page_url.clone();
		destination.set_fragment(None);
		let retained: Vec<(String, String)> = page_url
			.query_pairs()
			.filter(|(key, _)| key != ID_PARAM && key != ACTION_PARAM)
			.map(|(key, value)| (key.into_owned(), value.into_owned()))
			.collect();
		destination
			.query_pairs_mut()
			.clear()
			.extend_pairs(retained)
			.append_pair(ID_PARAM, target_id)
			.append_pair(ACTION_PARAM, action);

		trace!(target_id, action, %destination, "Encoded action.");
		Some(Self {
			target_id: target_id.to_owned(),
			action: action.to_owned(),
			form,
			destination,
		})
	}

	#[must_use]
	pub fn target_id(&self) -> &str {
		&self.target_id
	}

	#[must_use]
	pub fn action(&self) -> &str {
		&self.action
	}

	#[must_use]
	pub fn form(&self) -> Option<&[(String, String)]> {
		self.form.as_deref()
	}

	#[must_use]
	pub fn destination(&self) -> &Url {
		&self.destination
	}

	/// `application/x-www-form-urlencoded` request body. Empty without form data.
	#[must_use]
	pub fn body(&self) -> String {
		match &self.form {
			Some(pairs) => form_urlencoded::Serializer::new(String::new()).extend_pairs(pairs).finish(),
			None => String::new(),
		}
	}

	/// Destination path and query, as addressed over the socket.
	#[must_use]
	pub fn path_and_query(&self) -> String {
		match self.destination.query() {
			Some(query) => format!("{}?{}", self.destination.path(), query),
			None => self.destination.path().to_owned(),
		}
	}
}

/// String fields of a form, in document order. File entries are skipped.
#[must_use]
pub fn form_pairs(form: &web_sys::FormData) -> Vec<(String, String)> {
	let entries = match js_sys::try_iter(form.as_ref()) {
		Ok(Some(entries)) => entries,
		Ok(None) | Err(_) => {
			error!("`FormData` is not iterable.");
			return Vec::new();
		}
	};

	entries
		.filter_map(|entry| {
			let entry = entry.ok()?.dyn_into::<js_sys::Array>().ok()?;
			let key = entry.get(0).as_string()?;
			match entry.get(1).as_string() {
				Some(value) => Some((key, value)),
				None => {
					trace!(key = key.as_str(), "Skipping non-string form entry.");
					None
				}
			}
		})
		.collect()
}
