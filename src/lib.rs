#![doc(html_root_url = "https://docs.rs/vtree-patch/0.1.0")]
#![warn(clippy::pedantic)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod diff;
pub mod host;
pub mod node;

pub use diff::{Differ, PatchError};
pub use host::Host;
pub use node::{ConstructionError, Node, Props, Value};
