//! # Introduction
//! `ddspipe` converts directory trees of PNG textures into block-compressed
//! DDS files (BC1/BC3/BC7), or re-serializes them as PNG when no
//! compression is wanted. It exists to make texture baking for games and
//! renderers a batch operation: point it at a directory, get back a
//! matching tree of `.dds` files with mipmaps generated and GPU block
//! compression applied.
//!
//! A conversion runs through [`pipeline::run`], fed by a [`Configuration`]
//! describing inputs, output format, filters, and resize options. Progress
//! and per-file errors are delivered on a caller-supplied callback as
//! [`Report`] events rather than logged directly, so a CLI, GUI, or test
//! harness can all consume the same pipeline.
//!
//! # Stages
//! Each source file flows through resolve -> load -> decode -> scale ->
//! mipmap -> encode -> save. Load runs on a single dedicated thread (one
//! `fs::read` in flight at a time, since concurrent reads thrash spinning
//! storage); decode/scale/mipmap/encode/save then run per-task on
//! [`Configuration::threads`] workers via [`pipeline::run`] — save is
//! serial only within a single file, not across the run, and destination
//! collisions between in-flight tasks are rejected rather than raced.
//!
//! # Limitations
//! 3D textures, cube maps, and array layers are not supported. BC2, BC4,
//! BC5, and BC6H are not exposed as output formats; the `alpha_black`
//! punch-through override only applies to BC1.

pub mod config;
pub mod dds;
pub mod decode;
pub mod encode;
pub mod error;
pub mod load;
pub mod mipmap;
pub mod model;
pub mod pipeline;
pub mod resolve;
pub mod scale;

pub use config::{Configuration, ConfigError, Format, OverwritePolicy, ResampleFilter, UiPreferences};
pub use model::{FileTask, Report};
pub use pipeline::{run, Summary};
