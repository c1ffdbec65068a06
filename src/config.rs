//! Runtime settings, with page-level overrides read from `<meta name="hyp-…">` tags.

use tracing::warn;

pub const DEFAULT_LOADING_DELAY_MS: i32 = 100;
pub const DEFAULT_INPUT_DELAY_MS: i32 = 250;
pub const DEFAULT_LOADING_CLASS: &str = "hyp-loading";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketSetting {
	/// Derive `ws(s)://<host><path>` from the page location.
	FromPage,
	Url(String),
	Off,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
	/// Delay before a pending action's target is marked as loading.
	pub loading_delay_ms: i32,
	pub loading_class: String,
	/// Default debounce for `data-on-input` when no `data-delay` is present.
	pub input_delay_ms: i32,
	pub socket: SocketSetting,
}
impl Default for RuntimeConfig {
	fn default() -> Self {
		Self {
			loading_delay_ms: DEFAULT_LOADING_DELAY_MS,
			loading_class: DEFAULT_LOADING_CLASS.to_owned(),
			input_delay_ms: DEFAULT_INPUT_DELAY_MS,
			socket: SocketSetting::FromPage,
		}
	}
}
impl RuntimeConfig {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn loading_delay_ms(mut self, delay: i32) -> Self {
		self.loading_delay_ms = delay;
		self
	}

	#[must_use]
	pub fn loading_class(mut self, class: impl Into<String>) -> Self {
		self.loading_class = class.into();
		self
	}

	#[must_use]
	pub fn input_delay_ms(mut self, delay: i32) -> Self {
		self.input_delay_ms = delay;
		self
	}

	#[must_use]
	pub fn socket(mut self, socket: SocketSetting) -> Self {
		self.socket = socket;
		self
	}

	/// Defaults overridden by the document's `hyp-*` meta tags.
	#[must_use]
	pub fn from_document(document: &web_sys::Document) -> Self {
		let mut config = Self::default();
		if let Ok(metas) = document.query_selector_all("meta[name^='hyp-']") {
			for i in 0..metas.length() {
				let meta = match metas.get(i).and_then(|node| wasm_bindgen::JsCast::dyn_into::<web_sys::HtmlMetaElement>(node).ok()) {
					Some(meta) => meta,
					None => continue,
				};
				config.apply_meta(&meta.name(), &meta.content());
			}
		}
		config
	}

	/// Applies a single `<meta name content>` pair. Unknown or malformed entries are ignored with a warning.
	pub fn apply_meta(&mut self, name: &str, content: &str) {
		let content = content.trim();
		match name {
			"hyp-socket" => {
				self.socket = match content {
					"" | "off" | "false" => SocketSetting::Off,
					"auto" => SocketSetting::FromPage,
					url => SocketSetting::Url(url.to_owned()),
				}
			}
			"hyp-loading-delay" => match content.parse() {
				Ok(delay) if delay >= 0 => self.loading_delay_ms = delay,
				_ => warn!("Ignoring invalid hyp-loading-delay {:?}", content),
			},
			"hyp-input-delay" => match content.parse() {
				Ok(delay) if delay >= 0 => self.input_delay_ms = delay,
				_ => warn!("Ignoring invalid hyp-input-delay {:?}", content),
			},
			"hyp-loading-class" if !content.is_empty() => self.loading_class = content.to_owned(),
			other => warn!("Unknown runtime setting {:?}", other),
		}
	}
}

/// `ws://` or `wss://` (following the page scheme) plus host and path.
#[must_use]
pub fn socket_url_for(protocol: &str, host: &str, pathname: &str) -> String {
	let scheme = if protocol == "https:" { "wss" } else { "ws" };
	format!("{}://{}{}", scheme, host, pathname)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults() {
		let config = RuntimeConfig::new();
		assert_eq!(config.loading_delay_ms, 100);
		assert_eq!(config.loading_class, "hyp-loading");
		assert_eq!(config.socket, SocketSetting::FromPage);
	}

	#[test]
	fn meta_overrides() {
		let mut config = RuntimeConfig::new();
		config.apply_meta("hyp-socket", "off");
		config.apply_meta("hyp-loading-delay", " 40 ");
		config.apply_meta("hyp-input-delay", "-3");
		assert_eq!(config.socket, SocketSetting::Off);
		assert_eq!(config.loading_delay_ms, 40);
		assert_eq!(config.input_delay_ms, DEFAULT_INPUT_DELAY_MS);

		config.apply_meta("hyp-socket", "wss://example.com/live");
		assert_eq!(config.socket, SocketSetting::Url("wss://example.com/live".into()));
	}

	#[test]
	fn builder() {
		let config = RuntimeConfig::new().loading_delay_ms(0).loading_class("busy").socket(SocketSetting::Off);
		assert_eq!(config.loading_delay_ms, 0);
		assert_eq!(config.loading_class, "busy");
		assert_eq!(config.socket, SocketSetting::Off);
	}

	#[test]
	fn socket_scheme_follows_page() {
		assert_eq!(socket_url_for("https:", "example.com", "/app"), "wss://example.com/app");
		assert_eq!(socket_url_for("http:", "localhost:3000", "/"), "ws://localhost:3000/");
	}
}
