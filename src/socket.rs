//! The persistent connection.
//!
//! Frames are plain text. A request is
//!
//! ```text
//! |ACTION|<request id>
//! <path and query>
//! <form-urlencoded body>
//! ```
//!
//! and each reply starts with `|UPDATE|<request id>`, `|REDIRECT|<request id>` or `|ERROR|<request id>`,
//! followed by a newline and the HTML, redirect URL or error message respectively.

use crate::{
	action::ActionMessage,
	error::TransportError,
	transport::{Delivery, Transport},
};
use async_trait::async_trait;
use core::{cell::Cell, mem};
use futures::channel::oneshot;
use hashbrown::HashMap;
use std::{cell::RefCell, rc::Rc};
use tracing::{error, info, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

pub type Reply = Result<Delivery, TransportError>;

#[derive(Default)]
struct Shared {
	/// The process-wide transport state. Written only by the socket's own handlers.
	connected: Cell<bool>,
	pending: RefCell<HashMap<u32, oneshot::Sender<Reply>>>,
	next_id: Cell<u32>,
}
impl Shared {
	fn on_close(&self, reason: &str) {
		self.connected.set(false);
		self.fail_pending(reason);
	}

	fn fail_pending(&self, reason: &str) {
		let pending = mem::take(&mut *self.pending.borrow_mut());
		if !pending.is_empty() {
			warn!("Failing {} pending action(s): {}", pending.len(), reason);
		}
		for (_, sender) in pending {
			// The receiving action may already be gone.
			let _ = sender.send(Err(TransportError::new("Socket Closed", reason)));
		}
	}
}

struct Handlers {
	_open: Closure<dyn FnMut(web_sys::Event)>,
	_close: Closure<dyn FnMut(web_sys::CloseEvent)>,
	_error: Closure<dyn FnMut(web_sys::Event)>,
	_message: Closure<dyn FnMut(web_sys::MessageEvent)>,
}

/// A WebSocket carrying actions and their replies.
///
/// Dropping it closes the socket and fails all pending actions.
pub struct SocketConnection {
	socket: web_sys::WebSocket,
	shared: Rc<Shared>,
	_handlers: Handlers,
}
impl SocketConnection {
	#[instrument]
	pub fn connect(url: &str) -> Result<Self, JsValue> {
		let socket = web_sys::WebSocket::new(url)?;
		let shared = Rc::new(Shared::default());

		let open = {
			let shared = Rc::clone(&shared);
			Closure::wrap(Box::new(move |_: web_sys::Event| {
				info!("Socket connected.");
				shared.connected.set(true);
			}) as Box<dyn FnMut(web_sys::Event)>)
		};
		let close = {
			let shared = Rc::clone(&shared);
			Closure::wrap(Box::new(move |event: web_sys::CloseEvent| {
				info!(code = event.code(), "Socket closed.");
				shared.on_close(&event.reason());
			}) as Box<dyn FnMut(web_sys::CloseEvent)>)
		};
		let error = {
			let shared = Rc::clone(&shared);
			Closure::wrap(Box::new(move |_: web_sys::Event| {
				warn!("Socket error. Falling back to HTTP.");
				shared.connected.set(false);
			}) as Box<dyn FnMut(web_sys::Event)>)
		};
		let message = {
			let shared = Rc::clone(&shared);
			Closure::wrap(Box::new(move |event: web_sys::MessageEvent| {
				let frame = match event.data().as_string() {
					Some(frame) => frame,
					None => return warn!("Ignoring non-text socket frame."),
				};
				let (id, reply) = match decode_reply(&frame) {
					Some(decoded) => decoded,
					None => return error!("Malformed socket frame ({} bytes).", frame.len()),
				};
				let sender = shared.pending.borrow_mut().remove(&id);
				match sender {
					Some(sender) => {
						trace!(id, "Reply received.");
						let _ = sender.send(reply);
					}
					None => warn!(id, "Reply for unknown request."),
				}
			}) as Box<dyn FnMut(web_sys::MessageEvent)>)
		};

		socket.set_onopen(Some(open.as_ref().unchecked_ref()));
		socket.set_onclose(Some(close.as_ref().unchecked_ref()));
		socket.set_onerror(Some(error.as_ref().unchecked_ref()));
		socket.set_onmessage(Some(message.as_ref().unchecked_ref()));

		Ok(Self {
			socket,
			shared,
			_handlers: Handlers {
				_open: open,
				_close: close,
				_error: error,
				_message: message,
			},
		})
	}

	#[must_use]
	pub fn is_connected(&self) -> bool {
		self.shared.connected.get()
	}
}
#[async_trait(?Send)]
impl Transport for SocketConnection {
	#[instrument(skip(self, msg), fields(target_id = msg.target_id(), action = msg.action()))]
	async fn send_action(&self, msg: &ActionMessage) -> Result<Delivery, TransportError> {
		let id = self.shared.next_id.get();
		self.shared.next_id.set(id.wrapping_add(1));

		let (sender, receiver) = oneshot::channel();
		self.shared.pending.borrow_mut().insert(id, sender);
		if let Err(error) = self.socket.send_with_str(&encode_request(id, msg)) {
			self.shared.pending.borrow_mut().remove(&id);
			return Err(TransportError::from_js("Socket Error", &error));
		}

		match receiver.await {
			Ok(reply) => reply,
			Err(oneshot::Canceled) => Err(TransportError::new("Socket Closed", "The connection was dropped.")),
		}
	}

	fn is_available(&self) -> bool {
		self.is_connected()
	}
}
impl Drop for SocketConnection {
	fn drop(&mut self) {
		self.socket.set_onopen(None);
		self.socket.set_onclose(None);
		self.socket.set_onerror(None);
		self.socket.set_onmessage(None);
		if let Err(error) = self.socket.close() {
			error!("Failed to close socket: {:?}", error);
		}
		self.shared.on_close("The runtime was torn down.");
	}
}

#[must_use]
pub fn encode_request(id: u32, msg: &ActionMessage) -> String {
	format!("|ACTION|{}\n{}\n{}", id, msg.path_and_query(), msg.body())
}

/// Splits a reply frame into its request id and outcome.
#[must_use]
pub fn decode_reply(frame: &str) -> Option<(u32, Reply)> {
	let (head, rest) = match frame.split_once('\n') {
		Some(split) => split,
		None => (frame, ""),
	};
	let (tag, id) = head.strip_prefix('|')?.split_once('|')?;
	let id = id.trim().parse().ok()?;
	let reply = match tag {
		"UPDATE" => Ok(Delivery::Content(rest.to_owned())),
		"REDIRECT" => Ok(Delivery::Redirect(rest.trim().to_owned())),
		"ERROR" => Err(TransportError::new("Socket Error", rest)),
		_ => return None,
	};
	Some((id, reply))
}
