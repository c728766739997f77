//! Immutable shape & trait registry for the runtime core (spec §3, §4.1).
//!
//! A [`Registry`] holds [`ShapeKind`]-tagged shape descriptions keyed by
//! [`ShapeId`], addressed internally by arena index ([`SchemaRef`]). Traits
//! are interned once per [`traits::TraitInterner`] and stored in a dense,
//! per-shape [`traits::TraitMap`] so lookups never hash the trait name twice.

mod id;
mod operation;
mod registry;
mod shape;
mod traits;
mod well_known;

pub use id::{SchemaRef, ShapeId};
pub use operation::{AuthSchemeId, ErrorBuilder, ErrorRegistry, HttpTrait, OperationSchema, ProtocolKind};
pub use registry::{Error, Registry};
pub use shape::{Member, MemberIndex, MemberTarget, Scalar, ShapeKind};
pub use traits::{TraitInterner, TraitKey, TraitMap};
pub use well_known::{well_known, CorsConfig, ErrorFault, WellKnown};
