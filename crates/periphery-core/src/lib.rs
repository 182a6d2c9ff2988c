//! Parameter registry for auditory-periphery modules.
//!
//! Every configurable block (a filterbank, a neuron model, a stimulus
//! generator) exposes its parameters as a [`FieldList`]: an ordered,
//! fixed-size set of typed field descriptors bound to the block's storage.
//! The registry then gives every block the same four operations:
//!
//! - **Dispatch**: parse text and write it through the right typed accessor
//!   ([`set_by_index`], [`set_param`])
//! - **Resolve**: find a field by (optionally dotted or abbreviated) name,
//!   descending into nested modules and collection aggregates ([`find`])
//! - **Regenerate**: rebuild derived state of aggregates marked dirty by
//!   earlier writes ([`validate`])
//! - **Render**: write the lists back out as parameter-file text ([`render`])
//!
//! # Example
//!
//! ```rust
//! use periphery_core::{
//!     FieldKind, FieldList, OwnerKind, ParamOwner, ParamResult, Setter, Storage,
//!     find, render_to_string, shared,
//! };
//!
//! #[derive(Default)]
//! struct Amp {
//!     gain: f64,
//! }
//!
//! impl ParamOwner for Amp {
//!     const KIND: OwnerKind = OwnerKind::Module;
//! }
//!
//! fn set_gain(amp: &mut Amp, db: f64) -> ParamResult<()> {
//!     amp.gain = db;
//!     Ok(())
//! }
//!
//! let amp = shared(Amp::default());
//! let mut list = FieldList::create(amp.clone(), 1)?.expect("one field");
//! list.define(0, "GAIN", "Gain (dB).", FieldKind::Float, Storage::Float(|a| a.gain), Setter::Float(set_gain))?;
//! let list = list.into_ref();
//!
//! find(&list, "gain")?.expect("resolves").set("6.5")?;
//! assert_eq!(amp.borrow().gain, 6.5);
//! assert_eq!(render_to_string(&list)?, "GAIN\t6.5\t# Gain (dB).\n");
//! # Ok::<(), periphery_core::ParamError>(())
//! ```
//!
//! # Ownership
//!
//! Aggregates live in `Rc<RefCell<_>>` handles ([`Shared`]); a list holds a
//! handle to its owner, never the other way round. Everything is
//! single-threaded. Re-entrant access to a list or owner that is already
//! borrowed is reported as [`ParamError::Busy`].
//!
//! # Logging
//!
//! With the `tracing` feature enabled, writes and regenerations are logged at
//! `debug` level.

pub mod accessor;
pub mod dispatch;
pub mod error;
pub mod field;
pub mod kind;
pub mod list;
pub mod provider;
pub mod render;
pub mod resize;
pub mod resolve;
pub mod text;
pub mod validate;

pub use accessor::{Setter, Storage};
pub use dispatch::{set_by_index, set_param};
pub use error::{ErrorClass, ParamError, ParamResult};
pub use field::{FieldDescriptor, FieldMeta};
pub use kind::{AccessorShape, Companion, ElementKind, FieldKind, NameSpec, OwnerKind, expected_shape};
pub use list::{FieldList, ListRef, ParList, ParamOwner, Shared, destroy, shared};
pub use provider::{Child, ListProvider, SubList};
pub use render::{INDENT, Rendered, render, render_to_string};
pub use resize::{MAX_ELEMENTS, resize_preserving, resize_with_preserving};
pub use resolve::{FieldRef, NameMatch, find, find_for_value, find_with};
pub use text::{LineError, apply_text, parse_line};
pub use validate::validate;
