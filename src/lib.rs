//! The library code for the `scriven` static site generator. A build is
//! broken down into two distinct steps:
//!
//! 1. Loading posts from source files on disk ([`crate::loader`]). Each file
//!    is split into front matter ([`crate::frontmatter`]) and a Markdown body
//!    which is rendered to sanitized HTML ([`crate::markdown`]).
//! 2. Converting the posts into output files on disk ([`crate::write`]): the
//!    index page, one page per post, one page per tag and the RSS feed
//!    ([`crate::feed`]).
//!
//! All input is validated before the first output file is written, and the
//! output only depends on the input, so rebuilding unchanged posts yields
//! byte-identical files.
//!
//! For local development, [`crate::watch`] rebuilds the site whenever the
//! posts directory changes and [`crate::serve`] serves the output directory
//! over HTTP.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]

pub mod build;
pub mod config;
pub mod feed;
pub mod frontmatter;
pub mod htmlrenderer;
pub mod loader;
pub mod markdown;
pub mod post;
pub mod serve;
pub mod tag;
pub mod theme;
pub mod value;
pub mod watch;
pub mod write;
