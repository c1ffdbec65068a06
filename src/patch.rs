//! In-place patching of a live DOM subtree towards a [`VNode`] snapshot.
//!
//! Live nodes are kept wherever their kind, tag and `id` still match, so focus, scroll position and input state survive.
//! New nodes are always created in the live document. Nothing is ever moved out of the snapshot's source tree.

use crate::{
	error::ActionError,
	redact::Redacted,
	vdom::{self, Kind, VNode, SVG_NAMESPACE},
};
use tracing::{error, instrument, level_filters::STATIC_MAX_LEVEL, trace, trace_span, warn, Level};
use wasm_bindgen::{JsCast, JsValue};

const XLINK_NAMESPACE: &str = "http://www.w3.org/1999/xlink";
const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Snapshots both sides and patches `target` to match `content`.
///
/// A target whose tag differs from the content root is left alone ([`ActionError::RootMismatch`]).
#[instrument(skip(target, content, document), fields(target_id = %target.id()))]
pub fn reconcile(target: &web_sys::Element, content: &web_sys::Element, document: &web_sys::Document) -> Result<(), ActionError> {
	let next = vdom::create(content.as_ref()).ok_or_else(|| ActionError::Dom("Content root could not be read.".to_owned()))?;
	let mut old = vdom::create(target.as_ref()).ok_or_else(|| ActionError::Dom("Target could not be read.".to_owned()))?;
	if next.kind != old.kind {
		return Err(ActionError::RootMismatch {
			target: format!("{:?}", old.kind),
			content: format!("{:?}", next.kind),
		});
	}
	patch(&next, &mut old, document)
}

/// Mutates `old`'s live nodes towards `next`'s shape, and updates `old` to mirror the result.
///
/// The roots are matched by kind and tag only. If they differ, `old`'s node is replaced (if it has a parent).
#[instrument(skip(next, old, document))]
pub fn patch(next: &VNode, old: &mut VNode, document: &web_sys::Document) -> Result<(), ActionError> {
	if next.kind == old.kind {
		update(next, old, document)
	} else {
		let span = trace_span!("Replacing root", old = ?old.kind, next = ?next.kind);
		let _enter = span.enter();
		let parent = match old.node.parent_node() {
			Some(parent) => parent,
			None => {
				warn!("Root to replace is detached. Leaving it as is.");
				return Ok(());
			}
		};
		let created = build(next, old.svg, document)?;
		parent.replace_child(&created.node, &old.node)?;
		*old = created;
		Ok(())
	}
}

/// Children are matched in place first, then by `id`.
fn same_node(next: &VNode, old: &VNode) -> bool {
	next.kind == old.kind && next.key() == old.key()
}

fn update(next: &VNode, old: &mut VNode, document: &web_sys::Document) -> Result<(), ActionError> {
	debug_assert_eq!(next.kind, old.kind);
	match &next.kind {
		Kind::Text | Kind::Comment => {
			let span = trace_span!("Diffing character data", kind = ?next.kind);
			let _enter = span.enter();
			if next.content != old.content {
				let data = old
					.node
					.dyn_ref::<web_sys::CharacterData>()
					.ok_or_else(|| ActionError::Dom(format!("Expected `CharacterData` but found {:?}", old.node)))?;
				trace!("Updating {:?} -> {:?}", Redacted(&old.content), Redacted(&next.content));
				data.set_data(&next.content);
				old.content = next.content.clone();
			}
			Ok(())
		}
		Kind::Element(tag) => {
			let span = trace_span!("Diffing element", tag = tag.as_str());
			let _enter = span.enter();
			let element = old
				.node
				.dyn_ref::<web_sys::Element>()
				.ok_or_else(|| ActionError::Dom(format!("Expected `Element` but found {:?}", old.node)))?
				.clone();
			update_attributes(&element, &old.attributes, &next.attributes, old.svg);
			old.attributes = next.attributes.clone();
			patch_children(element.as_ref(), &next.children, &mut old.children, document)
		}
	}
}

#[allow(clippy::similar_names)]
fn update_attributes(element: &web_sys::Element, a_1: &[(String, String)], a_2: &[(String, String)], svg: bool) {
	if a_1 == a_2 {
		return;
	}

	for (name, value) in a_1 {
		if !a_2.iter().any(|(n, _)| n == name) {
			if let Err(error) = remove_attribute(element, name, svg) {
				warn!("Could not remove attribute with name {:?}, value {:?}: {:?}", name, Redacted(value), error);
			}
		}
	}

	for (name, value) in a_2 {
		let previous = a_1.iter().find(|(n, _)| n == name).map(|(_, value)| value);
		if previous != Some(value) {
			if let Err(error) = set_attribute(element, name, value, svg) {
				error!("Could not set attribute {:?}={:?}: {:?}", name, Redacted(value), error);
			}
		}
	}
}

/// Namespace for prefixed attributes inside SVG.
fn attribute_namespace(name: &str) -> Option<(&'static str, &str)> {
	if let Some(local) = name.strip_prefix("xlink:") {
		Some((XLINK_NAMESPACE, local))
	} else if let Some(local) = name.strip_prefix("xml:") {
		Some((XML_NAMESPACE, local))
	} else {
		None
	}
}

fn set_attribute(element: &web_sys::Element, name: &str, value: &str, svg: bool) -> Result<(), JsValue> {
	match attribute_namespace(name) {
		Some((namespace, _)) if svg => element.set_attribute_ns(Some(namespace), name, value),
		_ => element.set_attribute(name, value),
	}
}

fn remove_attribute(element: &web_sys::Element, name: &str, svg: bool) -> Result<(), JsValue> {
	match attribute_namespace(name) {
		Some((namespace, local)) if svg => element.remove_attribute_ns(Some(namespace), local),
		_ => element.remove_attribute(name),
	}
}

/// Splices `old`'s live children into `next`'s order: matched nodes are patched (and moved if matched by `id`),
/// unmatched ones created, and leftovers removed.
fn patch_children(parent: &web_sys::Node, next: &[VNode], old: &mut Vec<VNode>, document: &web_sys::Document) -> Result<(), ActionError> {
	if next.is_empty() && old.is_empty() {
		return Ok(());
	}

	let mut remaining: Vec<Option<VNode>> = old.drain(..).map(Some).collect();
	let mut patched = Vec::with_capacity(next.len());
	let mut cursor = 0;

	for (index, next_child) in next.iter().enumerate() {
		// Old children that no later new child could match only block in-place matches.
		while let Some(slot) = remaining.get_mut(cursor) {
			let candidate = match slot.as_ref() {
				Some(candidate) => candidate,
				None => {
					cursor += 1;
					continue;
				}
			};
			if next[index..].iter().any(|next_child| same_node(next_child, candidate)) {
				break;
			}
			if let Some(unmatched) = slot.take() {
				if STATIC_MAX_LEVEL >= Level::TRACE {
					trace!("Removing unmatched {:?}", unmatched.kind);
				}
				if let Err(error) = parent.remove_child(&unmatched.node) {
					error!("Failed to remove the node: {:?}", error);
				}
			}
			cursor += 1;
		}

		let in_place = remaining.get(cursor).and_then(Option::as_ref).map_or(false, |candidate| same_node(next_child, candidate));
		let matched = if in_place {
			cursor += 1;
			remaining[cursor - 1].take()
		} else {
			next_child.key().and_then(|key| {
				let position = remaining
					.iter()
					.skip(cursor)
					.position(|candidate| candidate.as_ref().map_or(false, |candidate| candidate.key() == Some(key) && same_node(next_child, candidate)))?;
				remaining[cursor + position].take()
			})
		};

		let reference = remaining.iter().skip(cursor).flatten().next().map(|vnode| vnode.node.clone());
		match matched {
			Some(mut vnode) => {
				if !in_place {
					trace!(key = next_child.key(), "Moving keyed node.");
					parent.insert_before(&vnode.node, reference.as_ref())?;
				}
				update(next_child, &mut vnode, document)?;
				patched.push(vnode);
			}
			None => {
				let created = build(next_child, next_child.svg, document)?;
				parent.insert_before(&created.node, reference.as_ref())?;
				patched.push(created);
			}
		}
	}

	for leftover in remaining.into_iter().flatten() {
		if STATIC_MAX_LEVEL >= Level::TRACE {
			trace!("Removing {:?}", leftover.kind);
		}
		if let Err(error) = parent.remove_child(&leftover.node) {
			error!("Failed to remove the node: {:?}", error);
		}
	}

	*old = patched;
	Ok(())
}

/// Creates live nodes for `vnode` in `document` and returns the mirroring snapshot.
fn build(vnode: &VNode, svg: bool, document: &web_sys::Document) -> Result<VNode, ActionError> {
	let svg = svg || vnode.svg;
	let node: web_sys::Node = match &vnode.kind {
		Kind::Text => document.create_text_node(&vnode.content).into(),
		Kind::Comment => document.create_comment(&vnode.content).into(),
		Kind::Element(tag) => {
			let element = if svg || tag == "svg" {
				document.create_element_ns(Some(SVG_NAMESPACE), tag)?
			} else {
				document.create_element(tag)?
			};
			for (name, value) in &vnode.attributes {
				if let Err(error) = set_attribute(&element, name, value, svg) {
					error!("Could not add attribute {:?}={:?}: {:?}", name, Redacted(value), error);
				}
			}
			element.into()
		}
	};

	let children_svg = svg && vnode.tag() != Some("foreignObject");
	let mut children = Vec::with_capacity(vnode.children.len());
	for child in &vnode.children {
		let child = build(child, children_svg, document)?;
		node.append_child(&child.node)?;
		children.push(child);
	}

	Ok(VNode {
		kind: vnode.kind.clone(),
		attributes: vnode.attributes.clone(),
		svg,
		content: vnode.content.clone(),
		children,
		node,
	})
}
