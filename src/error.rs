use std::{ffi, io};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
	#[error("{0}")]
	Sys(#[from] nix::Error),

	#[error("{0}")]
	Io(#[from] io::Error),

	#[error("{path}: {source}")]
	Redirect {
		path: String,
		#[source]
		source: io::Error,
	},

	#[error("missing file name after \"{0}\"")]
	MissingTarget(&'static str),

	#[error("{0}")]
	Nul(#[from] ffi::NulError),
}

impl ShellError {
	/// Fatal errors mean the interpreter itself can no longer run commands
	/// (pipe, fork or descriptor juggling failed); everything else only
	/// aborts the command that caused it.
	pub fn is_fatal(&self) -> bool {
		match *self {
			ShellError::Sys(_) | ShellError::Io(_) => true,
			ShellError::Redirect { .. } | ShellError::MissingTarget(_) | ShellError::Nul(_) => false,
		}
	}
}

pub type ShellResult<T> = Result<T, ShellError>;
