//! # shrinkray
//!
//! Lossless image optimization by brute force: every PNG, JPEG and GIF is
//! pushed through a chain of external compressors and the smallest file
//! that still decodes to the same pixels wins. Originals are never touched;
//! winners are copied into a separate results tree.
//!
//! # Architecture
//!
//! ```text
//! files ──▶ batch ──▶ rayon pool ──▶ work item ──▶ pipeline ──▶ placement ──▶ final/
//!             ▲                          │
//!             └──── mpsc completions ────┘
//! ```
//!
//! - A **work item** is one file and one goal: optimize in place of format,
//!   or produce a WebP alternative. It owns a private scratch directory.
//! - A **pipeline** is an ordered list of tools run by a single driver that
//!   keeps a stage's output only when it is no larger.
//! - The **batch** coordinator collects results in completion order under
//!   an optional deadline; a missing tool or a missed deadline fails the
//!   whole call, anything else only drops the affected item.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`batch`] | Worker pool, completion queue, batch deadline, cancellation |
//! | [`pipeline`] | Stage driver and the PNG, JPEG, GIF and WebP chains |
//! | [`tools`] | Tool catalog, argument templates, exit codes, child-process runner |
//! | [`policy`] | GIF → PNG conversion decision |
//! | [`imaging`] | Pixel comparison, alpha and animation probes, PNG re-encode |
//! | [`placement`] | Mirrored results tree, refuse-if-exists conflict rule |
//! | [`config`] | `config.toml` loading, merging and validation |
//! | [`scan`] | Input discovery and content sniffing |
//! | [`output`] | CLI result formatting |
//! | [`types`] | `ImageKind`, `ConversionPolicy`, `OptimizationResult` |
//!
//! # Design Decisions
//!
//! ## External Tools, Not Codecs
//!
//! Compression is delegated to the established command-line optimizers
//! (`advpng`, `pngout`, `optipng`, `pngquant`, `gifsicle`, `jpegtran`,
//! `jfifremove`, `cwebp`, `gif2webp`). The crate only decodes pixels, to
//! verify results and to probe GIFs. Tool behavior is described as data in
//! [`tools::catalog`], so a chain is a list of [`tools::Tool`] values.
//!
//! ## Advisory Validation
//!
//! Every same-format result is decoded and compared with its original.
//! A mismatch does not discard the result; it sets
//! `failed_automated_test` so a human can take a look.
//!
//! ## Two Timeout Layers
//!
//! Every child process has its own timeout. The batch deadline is separate
//! and cooperative: a shared [`tools::CancelToken`] is checked between
//! stages and inside the process wait loop, which kills the child.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod output;
pub mod pipeline;
pub mod placement;
pub mod policy;
pub mod scan;
pub mod tools;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
