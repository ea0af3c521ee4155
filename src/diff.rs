use crate::{
	host::Host,
	node::{Node, Props},
};
use core::fmt;
use hashbrown::{hash_map::Entry, HashMap};
use tracing::{instrument, trace, trace_span, warn};

/// Errors surfaced by [`Differ::render`] and [`Differ::patch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError<E> {
	/// `patch` was invoked with an old node that never received a host
	/// reference. This is a caller bug (the old tree was not rendered, or a
	/// tree was patched twice as "old"), reported here explicitly instead of
	/// letting some later host call fail with an unrelated symptom.
	Unmounted,
	/// A host-API failure, propagated unchanged. The patch may have partially
	/// applied its mutations by the time this surfaces.
	Host(E),
}
impl<E> From<E> for PatchError<E> {
	fn from(error: E) -> Self {
		Self::Host(error)
	}
}
impl<E: fmt::Display> fmt::Display for PatchError<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Unmounted => f.write_str("old node has no host reference (was its tree rendered?)"),
			Self::Host(error) => write!(f, "host API failure: {}", error),
		}
	}
}
impl<E: std::error::Error + 'static> std::error::Error for PatchError<E> {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Unmounted => None,
			Self::Host(error) => Some(error),
		}
	}
}

/// `a` and `b` describe the same logical entity iff their keys and tags agree.
/// Unkeyed nodes compare as `None == None`, so they match by tag and position.
fn same_node<R>(a: &Node<R>, b: &Node<R>) -> bool {
	a.key() == b.key() && a.tag() == b.tag()
}

/// Reconciles [`Node`] trees against a [`Host`] tree.
///
/// [`render`](`Differ::render`) materializes a tree for first paint;
/// [`patch`](`Differ::patch`) then applies the minimal host mutations to move
/// from an old tree to a new one. Both run synchronously to completion with no
/// suspension points, so an entire diff is atomic with respect to the host from
/// the caller's perspective. Callers must serialize patches: fully apply patch
/// N and adopt its new tree before diffing against tree N+1.
///
/// # Correct use
///
/// After a patch, host handles have been redistributed onto the new tree
/// (matched nodes) or discarded (removed nodes); drop the old tree entirely
/// and never pass it as "old" again.
pub struct Differ<H> {
	host: H,
}
impl<H: Host> Differ<H> {
	pub fn new(host: H) -> Self {
		Self { host }
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn host_mut(&mut self) -> &mut H {
		&mut self.host
	}

	#[must_use]
	pub fn into_host(self) -> H {
		self.host
	}

	/// Materializes `node` and appends it to `container`. First paint only; a
	/// node is never materialized twice.
	///
	/// # Errors
	///
	/// Host-API failures, propagated unchanged.
	#[instrument(skip(self, node, container))]
	pub fn render(&mut self, node: &Node<H::Handle>, container: &H::Handle) -> Result<(), PatchError<H::Error>> {
		let handle = self.materialize(node)?;
		self.host.append_child(container, &handle)?;
		Ok(())
	}

	/// Applies the minimal host mutations so the subtree `old` speaks for comes
	/// to match `new`, transferring host references from matched old nodes onto
	/// their new counterparts.
	///
	/// # Errors
	///
	/// [`PatchError::Unmounted`] if `old` carries no host reference, else any
	/// host-API failure.
	#[instrument(skip(self, old, new))]
	pub fn patch(&mut self, old: &Node<H::Handle>, new: &Node<H::Handle>) -> Result<(), PatchError<H::Error>> {
		if old.host().is_none() {
			return Err(PatchError::Unmounted);
		}
		self.patch_node(old, new)
	}

	/// First-time construction of host nodes from a node tree, depth-first.
	/// Properties go through the property reconciler in initial mode (empty
	/// old mapping).
	fn materialize(&mut self, node: &Node<H::Handle>) -> Result<H::Handle, PatchError<H::Error>> {
		debug_assert!(node.host().is_none(), "node materialized twice");
		let handle = if let Some(tag) = node.tag() {
			let span = trace_span!("materialize", tag);
			let _enter = span.enter();
			let handle = self.host.create_element(tag)?;
			self.reconcile_props(&handle, node.props(), &Props::new())?;
			for child in node.children() {
				let child_handle = self.materialize(child)?;
				self.host.append_child(&handle, &child_handle)?;
			}
			handle
		} else {
			self.host.create_text(node.text_content().unwrap_or(""))?
		};
		node.set_host(handle.clone());
		Ok(handle)
	}

	/// Diffs two property mappings and applies the difference to `handle`.
	///
	/// Removal is decided by key *presence* in `new_props`, not truthiness of
	/// the value: a present-but-falsy value (`0`, `""`, `false`) keeps its
	/// property. Style sub-keys are cleared under the same rule against the new
	/// style mapping. Reapplying with identical mappings is a no-op apart from
	/// redundant sets.
	fn reconcile_props(&mut self, handle: &H::Handle, new_props: &Props, old_props: &Props) -> Result<(), PatchError<H::Error>> {
		for (name, _) in old_props.entries() {
			if !new_props.has(name) {
				trace!(name, "removing property");
				self.host.remove_property(handle, name)?;
			}
		}
		for (name, _) in old_props.style_entries() {
			if !new_props.has_style(name) {
				trace!(name, "clearing style property");
				self.host.clear_style_property(handle, name)?;
			}
		}
		for (name, value) in new_props.entries() {
			self.host.set_property(handle, name, value)?;
		}
		for (name, value) in new_props.style_entries() {
			self.host.set_style_property(handle, name, value)?;
		}
		Ok(())
	}

	/// Decides replace-vs-update-vs-recurse for one node pair. Exactly one
	/// branch applies; no pair is revisited once resolved.
	///
	/// Callers guarantee `old` carries a host reference (the public
	/// [`patch`](`Differ::patch`) checks; recursion only descends through
	/// materialized subtrees).
	fn patch_node(&mut self, old: &Node<H::Handle>, new: &Node<H::Handle>) -> Result<(), PatchError<H::Error>> {
		let span = trace_span!("patch_node", old_tag = ?old.tag(), new_tag = ?new.tag());
		let _enter = span.enter();

		let old_handle = old.host().ok_or(PatchError::Unmounted)?;

		if old.tag() != new.tag() {
			// Covers element-vs-text as well: `tag` presence differs.
			trace!("tag changed, replacing subtree");
			let parent = self.host.parent(&old_handle)?;
			let new_handle = self.materialize(new)?;
			self.host.replace_child(&parent, &new_handle, &old_handle)?;
			return Ok(());
		}

		if new.is_text() {
			// The handle transfers even for identical text, so the new tree
			// ends fully linked.
			new.set_host(old.take_host().ok_or(PatchError::Unmounted)?);
			if old.text_content() != new.text_content() {
				trace!("updating text content");
				self.host.set_text_content(&old_handle, new.text_content().unwrap_or(""))?;
			}
			return Ok(());
		}

		new.set_host(old.take_host().ok_or(PatchError::Unmounted)?);
		self.reconcile_props(&old_handle, new.props(), old.props())?;

		if new.children().is_empty() {
			trace!("new node is childless, clearing host children");
			self.host.clear_children(&old_handle)?;
		} else if old.children().is_empty() {
			trace!(count = new.children().len(), "appending children to childless element");
			for child in new.children() {
				let child_handle = self.materialize(child)?;
				self.host.append_child(&old_handle, &child_handle)?;
			}
		} else {
			self.reconcile_children(&old_handle, old.children(), new.children())?;
		}
		Ok(())
	}

	/// The core keyed, two-ended diff over sibling sequences, O(n) amortized.
	/// Minimizes host mutations for the common append, prepend, single-item
	/// reorder and swap patterns.
	///
	/// `old_end`/`new_end` are exclusive. Matched-out-of-order old entries are
	/// marked consumed in a side table rather than removed, so indices stay
	/// stable across the loop; cursors skip consumed entries and cleanup
	/// ignores them, which keeps every old host node matched, moved or removed
	/// exactly once.
	///
	/// The host surface has no next-sibling query, so "just after the old tail"
	/// positions are expressed by inserting before the handle of
	/// `new[new_end]`: that entry was resolved when the end cursor moved past
	/// it, and its handle marks the boundary of the unresolved region. `None`
	/// means append.
	#[allow(clippy::too_many_lines)]
	#[instrument(skip(self, parent, old, new), fields(old_len = old.len(), new_len = new.len()))]
	fn reconcile_children(&mut self, parent: &H::Handle, old: &[Node<H::Handle>], new: &[Node<H::Handle>]) -> Result<(), PatchError<H::Error>> {
		let mut old_start = 0;
		let mut old_end = old.len();
		let mut new_start = 0;
		let mut new_end = new.len();
		let mut consumed = vec![false; old.len()];

		let mut key_index = HashMap::<&str, usize>::new();
		for (index, child) in old.iter().enumerate() {
			if let Some(key) = child.key() {
				match key_index.entry(key) {
					Entry::Occupied(_) => warn!(key, "duplicate sibling key; first occurrence wins"),
					Entry::Vacant(vacant) => {
						vacant.insert(index);
					}
				}
			}
		}

		while old_start < old_end && new_start < new_end {
			if consumed[old_start] {
				old_start += 1;
				continue;
			}
			if consumed[old_end - 1] {
				old_end -= 1;
				continue;
			}

			let old_head = &old[old_start];
			let old_tail = &old[old_end - 1];
			let new_head = &new[new_start];
			let new_tail = &new[new_end - 1];

			if same_node(old_head, new_head) {
				trace!(key = ?new_head.key(), "head/head match");
				self.patch_node(old_head, new_head)?;
				old_start += 1;
				new_start += 1;
			} else if same_node(old_tail, new_tail) {
				trace!(key = ?new_tail.key(), "tail/tail match");
				self.patch_node(old_tail, new_tail)?;
				old_end -= 1;
				new_end -= 1;
			} else if same_node(old_head, new_tail) {
				// Moved toward the back: patch, then reinsert past the old tail.
				trace!(key = ?new_tail.key(), "head/tail match, moving toward back");
				self.patch_node(old_head, new_tail)?;
				let handle = new_tail.host().ok_or(PatchError::Unmounted)?;
				let reference = new.get(new_end).and_then(Node::host);
				self.host.insert_before(parent, &handle, reference.as_ref())?;
				old_start += 1;
				new_end -= 1;
			} else if same_node(old_tail, new_head) {
				// Moved toward the front: patch, then reinsert before the old head.
				trace!(key = ?new_head.key(), "tail/head match, moving toward front");
				self.patch_node(old_tail, new_head)?;
				let handle = new_head.host().ok_or(PatchError::Unmounted)?;
				let reference = old[old_start].host();
				self.host.insert_before(parent, &handle, reference.as_ref())?;
				old_end -= 1;
				new_start += 1;
			} else {
				let matched = new_head
					.key()
					.and_then(|key| key_index.get(key).copied())
					.filter(|&index| !consumed[index]);
				match matched {
					None => {
						trace!(key = ?new_head.key(), "no match in old children, materializing");
						let handle = self.materialize(new_head)?;
						self.host.insert_before(parent, &handle, old[old_start].host().as_ref())?;
					}
					Some(index) => {
						trace!(key = ?new_head.key(), index, "keyed match out of order, moving to front");
						self.patch_node(&old[index], new_head)?;
						// `patch_node` left a valid handle on `new_head` whether
						// it transferred the old one or replaced the subtree.
						// A key-map hit on the old head itself means its tag
						// changed (rules 1-4 missed); the replacement already
						// sits at the head position and the head's former
						// handle is detached, so there is nothing to move.
						if index != old_start {
							let handle = new_head.host().ok_or(PatchError::Unmounted)?;
							self.host.insert_before(parent, &handle, old[old_start].host().as_ref())?;
						}
						consumed[index] = true;
					}
				}
				new_start += 1;
			}
		}

		if new_start < new_end {
			// The new list is longer: insert the remainder before the host node
			// of the next resolved new position, or append if none remains.
			let reference = new.get(new_end).and_then(Node::host);
			trace!(count = new_end - new_start, "inserting remaining new children");
			for child in &new[new_start..new_end] {
				let handle = self.materialize(child)?;
				self.host.insert_before(parent, &handle, reference.as_ref())?;
			}
		} else if old_start < old_end {
			trace!(count = old_end - old_start, "removing remaining old children");
			for (index, child) in old.iter().enumerate().take(old_end).skip(old_start) {
				if consumed[index] {
					continue;
				}
				let handle = child.host().ok_or(PatchError::Unmounted)?;
				self.host.remove_child(parent, &handle)?;
			}
		}
		Ok(())
	}
}
