//! Source tracking for brine
//!
//! This crate provides the position vocabulary shared by the whole
//! compiler ([`Offset`], [`Span`], [`FileId`]) together with the source
//! arena ([`SourceContext`]) that owns loaded files, and the source-map
//! recorder ([`SourceMapBuilder`]) that turns emission-time mapping
//! records into a VLQ `mappings` string.
//!
//! # Overview
//!
//! Offsets are zero-based (line, column) pairs counted in code points.
//! Spans store a start offset plus a *length delta*, never an absolute end
//! point, so they stay valid when output fragments are shifted, prefixed,
//! or repeated. The map builder exposes the matching composition algebra:
//! `append` advances the generated cursor, `prepend` renumbers existing
//! records when a fragment is spliced in ahead of them.

pub mod context;
pub mod file_info;
pub mod mapping;
pub mod types;

pub use context::{EncodingError, Source, SourceContext};
pub use file_info::FileInformation;
pub use mapping::{Mapping, SourceMapBuilder, SourceMapPayload};
pub use types::{FileId, Offset, Span};
