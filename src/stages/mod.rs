//! Concrete pipeline stages.
//!
//! - [`command`]: linters, compilers and the deploy program as external processes
//! - [`fs`]: writing and removing files
//! - [`css`]: vendor prefixing
//! - [`image`]: resizing and optimization

pub mod command;
pub mod css;
pub mod fs;
pub mod image;

pub use command::{render_arg, render_args, CommandCheck, CommandTransform, Exec};
pub use css::Autoprefix;
pub use fs::{Remove, WriteTo};
pub use image::{Optimize, Resize, ResizeSpec};
