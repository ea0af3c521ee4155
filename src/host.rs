use crate::node::Value;
use core::fmt;

/// The host tree's primitive mutation surface, injected into the differ.
///
/// The host tree owns every handle's lifetime; this crate only keeps handles as
/// transferable back-references on [`Node`](`crate::Node`)s. Expressing the
/// surface as a trait (rather than binding a fixed global tree) lets tests
/// substitute an in-memory tree and assert on the exact sequence of mutation
/// calls.
///
/// Failures are never caught or retried by the differ: they propagate out of
/// [`render`](`crate::Differ::render`)/[`patch`](`crate::Differ::patch`)
/// unchanged, and a failed patch may have partially applied its mutations.
pub trait Host {
	/// An opaque, cheaply cloneable reference to one host node.
	type Handle: Clone + PartialEq + fmt::Debug;
	type Error;

	/// Creates a detached element node for `tag`.
	fn create_element(&mut self, tag: &str) -> Result<Self::Handle, Self::Error>;

	/// Creates a detached text node.
	fn create_text(&mut self, text: &str) -> Result<Self::Handle, Self::Error>;

	fn set_property(&mut self, handle: &Self::Handle, name: &str, value: &Value) -> Result<(), Self::Error>;

	fn remove_property(&mut self, handle: &Self::Handle, name: &str) -> Result<(), Self::Error>;

	/// Sets one entry on the element's style surface.
	fn set_style_property(&mut self, handle: &Self::Handle, name: &str, value: &str) -> Result<(), Self::Error>;

	/// Clears one entry from the element's style surface.
	fn clear_style_property(&mut self, handle: &Self::Handle, name: &str) -> Result<(), Self::Error>;

	fn set_text_content(&mut self, handle: &Self::Handle, text: &str) -> Result<(), Self::Error>;

	fn append_child(&mut self, parent: &Self::Handle, child: &Self::Handle) -> Result<(), Self::Error>;

	/// Inserts `child` before `reference` under `parent`; `None` appends.
	///
	/// A `child` that is already attached somewhere moves rather than
	/// duplicates, matching the usual document-tree semantics.
	fn insert_before(&mut self, parent: &Self::Handle, child: &Self::Handle, reference: Option<&Self::Handle>) -> Result<(), Self::Error>;

	fn remove_child(&mut self, parent: &Self::Handle, child: &Self::Handle) -> Result<(), Self::Error>;

	fn replace_child(&mut self, parent: &Self::Handle, new: &Self::Handle, old: &Self::Handle) -> Result<(), Self::Error>;

	/// Detaches every child of `handle`.
	fn clear_children(&mut self, handle: &Self::Handle) -> Result<(), Self::Error>;

	/// The parent of an attached node. Detached nodes are a host error.
	fn parent(&self, handle: &Self::Handle) -> Result<Self::Handle, Self::Error>;
}
