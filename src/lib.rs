//! # ImageForge
//!
//! A local image toolkit: resize, convert, compress, crop, merge and
//! bulk-process images, plus a few AI-backed suggestions (print DPI, related
//! images, model-chosen compression).
//!
//! # Architecture: One Pipeline, Many Tools
//!
//! Every tool is the same short pipeline with a different middle step:
//!
//! ```text
//! bytes + MIME  →  decode  →  Surface  →  transform  →  encode  →  NamedOutput
//!                  (backend)              (resize,      (backend)
//!                                          crop, merge)
//! ```
//!
//! Bulk runs that pipeline per input on a rayon pool and packs the results
//! into one ZIP. The AI tools wrap the pipeline: the model never produces
//! pixels for compression, it only picks the quality.
//!
//! Nothing in the library touches the filesystem except [`upload`] (reading
//! inputs) and [`config`]/[`context`] (reading settings). Writing outputs is
//! the binary's job, and it only happens after an operation fully succeeded.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Value types, codecs behind [`ImageBackend`](imaging::ImageBackend), pixel transforms, PDF first-page rendering, tool operations |
//! | [`batch`] | Bulk runner: parallel, ordered, fail-fast or best-effort, cancellable |
//! | [`archive`] | ZIP packing of named outputs |
//! | [`naming`] | Output file names: stems, extensions, sanitizing, de-duplication |
//! | [`presets`] | Named resize targets (social media, web, standard ratios) |
//! | [`upload`] | Which files each tool accepts; loading and size limits |
//! | [`ai`] | Suggestion service trait, OpenAI-compatible HTTP client, data URIs |
//! | [`config`] | `imageforge.toml` loading, validation, merging over stock defaults |
//! | [`context`] | Loaded config plus saved preferences |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Backend Trait at the Codec Seam
//!
//! Decoding and encoding sit behind [`ImageBackend`](imaging::ImageBackend).
//! The real [`RustBackend`](imaging::RustBackend) uses the `image` crate (plus
//! `webp` for lossy WebP and `lopdf` for PDF); tests use a mock that records
//! calls and fabricates images from their byte content, so tool and batch
//! logic is tested without encoding anything.
//!
//! ## Pure-Rust PDF Handling
//!
//! PDF input is limited to what a small renderer can do honestly: page 1 is
//! rendered at 1.5x onto white, and the raster images it paints are drawn at
//! their placed positions. Vector paths and text are not rasterized. PDF
//! output is a single page with the image embedded as JPEG.
//!
//! ## Fail-Fast by Default
//!
//! A bulk job that hits a broken image stops and writes nothing, matching
//! what users expect from a single "download all" button. `--best-effort`
//! trades that for a partial ZIP plus a failure list.

pub mod ai;
pub mod archive;
pub mod batch;
pub mod config;
pub mod context;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod presets;
pub mod upload;
