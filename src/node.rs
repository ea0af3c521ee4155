use core::fmt;
use hashbrown::HashMap;
use std::cell::RefCell;

/// A property value as carried in [`Props`].
///
/// Falsy values (`0`, `""`, `false`) are ordinary values here: whether a property
/// survives a patch is decided by key *presence* in the new mapping, never by
/// truthiness of its value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
	Str(String),
	Num(f64),
	Bool(bool),
}
impl From<&str> for Value {
	fn from(value: &str) -> Self {
		Self::Str(value.to_owned())
	}
}
impl From<String> for Value {
	fn from(value: String) -> Self {
		Self::Str(value)
	}
}
impl From<f64> for Value {
	fn from(value: f64) -> Self {
		Self::Num(value)
	}
}
impl From<i32> for Value {
	fn from(value: i32) -> Self {
		Self::Num(f64::from(value))
	}
}
impl From<bool> for Value {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}
impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Str(value) => f.write_str(value),
			Self::Num(value) => write!(f, "{}", value),
			Self::Bool(value) => write!(f, "{}", value),
		}
	}
}

/// An element's property mapping: flat attribute entries plus the nested style
/// mapping, along with the optional sibling `key`.
///
/// The `key` rides along with the properties during construction (mirroring how
/// callers tend to write it inline with the rest) and is extracted into the
/// [`Node`] by [`Node::element`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
	entries: HashMap<String, Value>,
	style: HashMap<String, String>,
	key: Option<Box<str>>,
}
impl Props {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets a flat property entry.
	#[must_use]
	pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.entries.insert(name.into(), value.into());
		self
	}

	/// Sets an entry in the nested style mapping.
	#[must_use]
	pub fn style(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
		self.style.insert(name.into(), value.into());
		self
	}

	/// Sets the sibling key. Keys are assumed unique among siblings.
	#[must_use]
	pub fn key(mut self, key: impl Into<Box<str>>) -> Self {
		self.key = Some(key.into());
		self
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&Value> {
		self.entries.get(name)
	}

	#[must_use]
	pub fn has(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	#[must_use]
	pub fn has_style(&self, name: &str) -> bool {
		self.style.contains_key(name)
	}

	pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.entries.iter().map(|(name, value)| (name.as_str(), value))
	}

	pub fn style_entries(&self) -> impl Iterator<Item = (&str, &str)> {
		self.style.iter().map(|(name, value)| (name.as_str(), value.as_str()))
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty() && self.style.is_empty() && self.key.is_none()
	}

	pub(crate) fn take_key(&mut self) -> Option<Box<str>> {
		self.key.take()
	}
}

/// Rejected node shapes, caught at construction rather than left to surface as
/// an unrelated host-API failure mid-patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionError {
	/// Both a tag and text were supplied.
	ElementWithText,
	/// Neither a tag nor text was supplied.
	Empty,
	/// The tag is the empty string.
	EmptyTag,
	/// A text node may not carry properties or a key.
	TextWithProps,
	/// A text node may not have children.
	TextWithChildren,
}
impl fmt::Display for ConstructionError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::ElementWithText => "a node may be an element or text, not both",
			Self::Empty => "a node needs either a tag or text",
			Self::EmptyTag => "element tag must be non-empty",
			Self::TextWithProps => "a text node may not carry properties or a key",
			Self::TextWithChildren => "a text node may not have children",
		})
	}
}
impl std::error::Error for ConstructionError {}

/// A lightweight description of one tree node, prior to materialization:
/// an element (`tag` plus [`Props`] and children) or a text leaf.
///
/// `R` is the host tree's handle type (see [`Host`](`crate::Host`)).
///
/// A `Node` tree is logically immutable once built; the only mutable part is the
/// host back-reference, which is assigned exactly once by materialization or
/// inherited from the matched old node during a patch. `Node` is deliberately
/// not [`Clone`]: cloning would duplicate the host back-reference, and a handle
/// must never be spoken for by two live nodes.
#[derive(Debug)]
pub struct Node<R> {
	tag: Option<Box<str>>,
	props: Props,
	key: Option<Box<str>>,
	children: Vec<Node<R>>,
	text: Option<Box<str>>,
	host: RefCell<Option<R>>,
}
impl<R> Node<R> {
	/// Checked record constructor mirroring the full node shape.
	///
	/// Prefer [`Node::element`] and [`Node::text`], which cannot express most of
	/// the invalid shapes in the first place. This form exists for callers that
	/// assemble nodes from untrusted or dynamic parts.
	///
	/// # Errors
	///
	/// See [`ConstructionError`] for the rejected shapes.
	pub fn new(tag: Option<&str>, mut props: Props, children: Vec<Self>, text: Option<&str>) -> Result<Self, ConstructionError> {
		match (tag, text) {
			(Some(_), Some(_)) => Err(ConstructionError::ElementWithText),
			(None, None) => Err(ConstructionError::Empty),
			(Some(""), None) => Err(ConstructionError::EmptyTag),
			(None, Some(text)) => {
				if !props.is_empty() {
					Err(ConstructionError::TextWithProps)
				} else if !children.is_empty() {
					Err(ConstructionError::TextWithChildren)
				} else {
					Ok(Self::text(text))
				}
			}
			(Some(tag), None) => {
				let key = props.take_key();
				Ok(Self {
					tag: Some(tag.into()),
					props,
					key,
					children,
					text: None,
					host: RefCell::new(None),
				})
			}
		}
	}

	/// Builds an element node, extracting the sibling key out of `props`.
	///
	/// Children convert via [`Into`], so plain strings become text nodes.
	///
	/// # Panics
	///
	/// Panics if `tag` is empty. Use [`Node::new`] for checked construction.
	pub fn element(tag: impl Into<Box<str>>, mut props: Props, children: impl IntoIterator<Item = impl Into<Self>>) -> Self {
		let tag = tag.into();
		assert!(!tag.is_empty(), "element tag must be non-empty");
		let key = props.take_key();
		Self {
			tag: Some(tag),
			props,
			key,
			children: children.into_iter().map(Into::into).collect(),
			text: None,
			host: RefCell::new(None),
		}
	}

	/// Builds a text leaf.
	pub fn text(text: impl Into<Box<str>>) -> Self {
		Self {
			tag: None,
			props: Props::new(),
			key: None,
			children: Vec::new(),
			text: Some(text.into()),
			host: RefCell::new(None),
		}
	}

	#[must_use]
	pub fn tag(&self) -> Option<&str> {
		self.tag.as_deref()
	}

	#[must_use]
	pub fn key(&self) -> Option<&str> {
		self.key.as_deref()
	}

	#[must_use]
	pub fn props(&self) -> &Props {
		&self.props
	}

	#[must_use]
	pub fn children(&self) -> &[Self] {
		&self.children
	}

	#[must_use]
	pub fn text_content(&self) -> Option<&str> {
		self.text.as_deref()
	}

	#[must_use]
	pub fn is_text(&self) -> bool {
		self.tag.is_none()
	}
}
impl<R: Clone> Node<R> {
	/// The host handle this node currently speaks for, if materialized.
	#[must_use]
	pub fn host(&self) -> Option<R> {
		self.host.borrow().clone()
	}

	pub(crate) fn set_host(&self, handle: R) {
		let mut host = self.host.borrow_mut();
		debug_assert!(host.is_none(), "node materialized twice");
		*host = Some(handle);
	}

	pub(crate) fn take_host(&self) -> Option<R> {
		self.host.borrow_mut().take()
	}
}
impl<R> From<&str> for Node<R> {
	fn from(text: &str) -> Self {
		Self::text(text)
	}
}
impl<R> From<String> for Node<R> {
	fn from(text: String) -> Self {
		Self::text(text)
	}
}
