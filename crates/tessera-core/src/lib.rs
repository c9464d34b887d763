//! # Tessera Core
//!
//! Foundation types of the Tessera page-composition runtime.
//!
//! ## Contents
//!
//! - **Document model**: a shared element tree ([`Document`], [`Element`])
//!   standing in for the page's DOM.
//! - **Unit status**: the monotonic `uninitialized → initialized → loading →
//!   loaded` state machine attached to blocks and sections ([`status`]).
//! - **Metadata and naming**: `<meta>` lookup ([`get_metadata`]) and the
//!   class-name / camel-case normalisers.
//! - **Host abstractions**: [`ResourceHost`] and [`BeaconSink`], implemented
//!   by whatever embeds the runtime.
//! - **Telemetry**: page sampling, the deferred-call [`TopicBus`] and the
//!   enhancement hook ([`Telemetry`]).
//!
//! Higher layers (loaders, plugin registry, bootstrap) live in
//! `tessera-framework` and `tessera-runtime`.

pub mod dom;
pub mod error;
pub mod host;
pub mod metadata;
pub mod naming;
pub mod status;
pub mod telemetry;
pub mod topic;

pub use dom::{Document, Element};
pub use error::{BoxError, LoadError, LoadResult};
pub use host::{BeaconSink, PageLocation, ResourceHost};
pub use metadata::get_metadata;
pub use naming::{to_camel_case, to_class_name};
pub use status::{UnitKind, UnitStatus};
pub use telemetry::{SamplingSettings, Telemetry};
pub use topic::{TopicBus, TopicHandler};
