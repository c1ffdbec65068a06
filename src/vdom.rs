//! Disposable VDOM snapshots of live (or parsed) DOM trees.

use tracing::trace;
use wasm_bindgen::JsCast;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Kind {
	/// Local name, case-preserved for SVG.
	Element(String),
	Text,
	Comment,
}

/// A node snapshot that still refers to the DOM node it was taken from.
#[derive(Debug, Clone)]
pub struct VNode {
	pub kind: Kind,
	/// Qualified attribute names and values, in DOM order.
	pub attributes: Vec<(String, String)>,
	/// Whether the node lives in an SVG subtree (excluding `<foreignObject>` content).
	pub svg: bool,
	/// Text or comment data. Empty for elements.
	pub content: String,
	pub children: Vec<VNode>,
	pub node: web_sys::Node,
}
impl VNode {
	#[must_use]
	pub fn tag(&self) -> Option<&str> {
		match &self.kind {
			Kind::Element(tag) => Some(tag),
			Kind::Text | Kind::Comment => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<&str> {
		self.attributes.iter().find(|(n, _)| n == name).map(|(_, value)| value.as_str())
	}

	/// The identifying `id`, if any.
	#[must_use]
	pub fn key(&self) -> Option<&str> {
		self.attribute("id")
	}
}

/// Snapshots `node` and its descendants.
///
/// Returns [`None`] for node types that aren't reconciled (doctypes, processing instructions and the like).
/// Such children are skipped.
#[must_use]
pub fn create(node: &web_sys::Node) -> Option<VNode> {
	let svg_context = node
		.parent_element()
		.map_or(false, |parent| parent.namespace_uri().as_deref() == Some(SVG_NAMESPACE) && parent.local_name() != "foreignObject");
	load_node(node, svg_context)
}

fn load_node(node: &web_sys::Node, svg_context: bool) -> Option<VNode> {
	match node.node_type() {
		web_sys::Node::ELEMENT_NODE => {
			let element = node.dyn_ref::<web_sys::Element>()?;
			Some(load_element(element, svg_context))
		}
		web_sys::Node::TEXT_NODE => Some(load_character_data(node, Kind::Text, svg_context)),
		web_sys::Node::COMMENT_NODE => Some(load_character_data(node, Kind::Comment, svg_context)),
		other => {
			trace!(node_type = other, "Skipping unreconciled node.");
			None
		}
	}
}

fn load_character_data(node: &web_sys::Node, kind: Kind, svg: bool) -> VNode {
	VNode {
		kind,
		attributes: Vec::new(),
		svg,
		content: node.text_content().unwrap_or_default(),
		children: Vec::new(),
		node: node.clone(),
	}
}

fn load_element(element: &web_sys::Element, svg_context: bool) -> VNode {
	let local_name = element.local_name();
	let svg = svg_context || local_name == "svg";
	let children_svg = svg && local_name != "foreignObject";
	let node: &web_sys::Node = element.as_ref();
	VNode {
		attributes: load_attributes(&element.attributes()),
		kind: Kind::Element(local_name),
		svg,
		content: String::new(),
		children: load_child_nodes(&node.child_nodes(), children_svg),
		node: node.clone(),
	}
}

fn load_child_nodes(child_nodes: &web_sys::NodeList, svg_context: bool) -> Vec<VNode> {
	(0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).filter_map(|child| load_node(&child, svg_context)).collect()
}

fn load_attributes(attributes: &web_sys::NamedNodeMap) -> Vec<(String, String)> {
	(0..attributes.length()).filter_map(|i| attributes.item(i)).map(|attribute| load_attribute(&attribute)).collect()
}

fn load_attribute(attribute: &web_sys::Attr) -> (String, String) {
	(attribute.name(), attribute.value())
}
