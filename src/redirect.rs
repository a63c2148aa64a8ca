use std::fs;
use std::io;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};

use log::{debug, error};
use nix::unistd;

use crate::error::{ShellError, ShellResult};
use crate::types::{Redirect, RedirectType};

/// Mode for files created by `>` and `>>`.
pub const CREATE_MODE: u32 = 0o700;

/// Files opened for a command's redirections, not yet installed.
#[derive(Debug, Default)]
pub struct Streams {
	pub input: Option<fs::File>,
	pub output: Option<fs::File>,
}

fn open_one(redirect: &Redirect) -> io::Result<fs::File> {
	let mut oopt = fs::OpenOptions::new();
	let _ = match redirect.typ {
		RedirectType::Input => oopt.read(true),
		RedirectType::Output => oopt.write(true).create(true).truncate(true).mode(CREATE_MODE),
		RedirectType::Append => oopt.append(true).create(true).mode(CREATE_MODE),
	};
	oopt.open(redirect.target)
}

/// Opens every redirection target in word order. When both `>` and `>>`
/// are present both files are opened and the later one keeps stdout.
pub fn open(redirects: &[Redirect]) -> ShellResult<Streams> {
	let mut ordered: Vec<&Redirect> = redirects.iter().collect();
	ordered.sort_by_key(|r| r.position);

	let mut streams = Streams::default();
	for redirect in ordered {
		let file = open_one(redirect).map_err(|e| ShellError::Redirect {
			path: redirect.target.to_string(),
			source: e,
		})?;
		debug!("opened {} {}", redirect.typ.operator(), redirect.target);
		match redirect.typ {
			RedirectType::Input => streams.input = Some(file),
			RedirectType::Output | RedirectType::Append => streams.output = Some(file),
		}
	}
	Ok(streams)
}

impl Streams {
	pub fn is_empty(&self) -> bool {
		self.input.is_none() && self.output.is_none()
	}

	fn targets(self) -> Vec<(fs::File, RawFd)> {
		let mut v = vec![];
		if let Some(f) = self.input {
			v.push((f, libc::STDIN_FILENO));
		}
		if let Some(f) = self.output {
			v.push((f, libc::STDOUT_FILENO));
		}
		v
	}

	/// Replaces stdin/stdout for good. Used in forked children; the files
	/// are closed once duplicated.
	pub fn install(self) -> nix::Result<()> {
		let _ = io::stdout().flush();
		for (file, to) in self.targets() {
			unistd::dup2(file.as_raw_fd(), to)?;
		}
		Ok(())
	}

	/// Replaces stdin/stdout until the returned guard is dropped. Used for
	/// builtins running inside the interpreter itself.
	pub fn install_saved(self) -> nix::Result<SavedStdio> {
		let _ = io::stdout().flush();
		let mut saved = SavedStdio { saved: vec![] };
		for (file, to) in self.targets() {
			let copy = unistd::dup(to)?;
			saved.saved.push((copy, to));
			unistd::dup2(file.as_raw_fd(), to)?;
		}
		Ok(saved)
	}
}

/// Original stdin/stdout descriptors. `restore` puts them back; dropping
/// the guard without it restores too, but can only log a failure.
#[derive(Debug)]
pub struct SavedStdio {
	saved: Vec<(RawFd, RawFd)>,
}

impl SavedStdio {
	fn restore_all(&mut self) -> nix::Result<()> {
		let _ = io::stdout().flush();
		let mut r = Ok(());
		while let Some((copy, to)) = self.saved.pop() {
			if let Err(e) = unistd::dup2(copy, to) {
				if r.is_ok() {
					r = Err(e);
				}
			}
			let _ = unistd::close(copy);
		}
		r
	}

	pub fn restore(mut self) -> nix::Result<()> {
		self.restore_all()
	}
}

impl Drop for SavedStdio {
	fn drop(&mut self) {
		if let Err(e) = self.restore_all() {
			error!("cannot restore standard streams: {}", e);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Read;
	use std::os::unix::fs::PermissionsExt;

	fn redirect(target: &str, typ: RedirectType, position: usize) -> Redirect {
		Redirect { target: target, typ: typ, position: position }
	}

	#[test]
	fn no_redirects_opens_nothing() {
		assert!(open(&[]).unwrap().is_empty());
	}

	#[test]
	fn output_truncates_and_append_appends() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("out.txt");
		let target = path.to_str().unwrap();

		fs::write(&path, "old contents").unwrap();
		let mut s = open(&[redirect(target, RedirectType::Output, 1)]).unwrap();
		s.output.take().unwrap().write_all(b"hi").unwrap();
		assert_eq!(fs::read_to_string(&path).unwrap(), "hi");

		let mut s = open(&[redirect(target, RedirectType::Append, 1)]).unwrap();
		s.output.take().unwrap().write_all(b"hi").unwrap();
		assert_eq!(fs::read_to_string(&path).unwrap(), "hihi");
	}

	#[test]
	fn created_files_are_owner_only() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("new.txt");
		open(&[redirect(path.to_str().unwrap(), RedirectType::Output, 1)]).unwrap();
		let mode = fs::metadata(&path).unwrap().permissions().mode();
		assert_eq!(mode & 0o777, 0o700);
	}

	#[test]
	fn input_must_exist() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("missing.txt");
		match open(&[redirect(path.to_str().unwrap(), RedirectType::Input, 1)]) {
			Err(ShellError::Redirect { ref source, .. }) => assert_eq!(source.kind(), io::ErrorKind::NotFound),
			r => panic!("unexpected {:?}", r),
		}
	}

	#[test]
	fn input_is_read_only() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("in.txt");
		fs::write(&path, "data").unwrap();
		let mut s = open(&[redirect(path.to_str().unwrap(), RedirectType::Input, 1)]).unwrap();
		let mut f = s.input.take().unwrap();
		let mut buf = String::new();
		f.read_to_string(&mut buf).unwrap();
		assert_eq!(buf, "data");
		assert!(f.write_all(b"x").is_err());
	}

	#[test]
	fn later_output_operator_wins() {
		let dir = tempfile::tempdir().unwrap();
		let a = dir.path().join("a");
		let b = dir.path().join("b");
		let mut s = open(&[
			redirect(b.to_str().unwrap(), RedirectType::Append, 4),
			redirect(a.to_str().unwrap(), RedirectType::Output, 2),
		]).unwrap();
		s.output.take().unwrap().write_all(b"x").unwrap();
		assert_eq!(fs::read_to_string(&a).unwrap(), "");
		assert_eq!(fs::read_to_string(&b).unwrap(), "x");
	}

	#[test]
	fn restore_puts_stdout_back() {
		use crate::job;
		use nix::sys::stat::fstat;
		use nix::sys::wait::WaitStatus;
		use nix::unistd::ForkResult;

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("saved.txt");
		let target = path.to_str().unwrap();
		match job::fork().unwrap() {
			ForkResult::Child => {
				let before = fstat(libc::STDOUT_FILENO);
				let ok = open(&[redirect(target, RedirectType::Output, 1)])
					.and_then(|s| Ok(s.install_saved()?))
					.and_then(|saved| {
						let _ = io::stdout().write_all(b"x");
						Ok(saved.restore()?)
					})
					.is_ok();
				let after = fstat(libc::STDOUT_FILENO);
				let same = match (before, after) {
					(Ok(b), Ok(a)) => b.st_dev == a.st_dev && b.st_ino == a.st_ino,
					_ => false,
				};
				job::exit_child(if ok && same { 0 } else { 1 });
			},
			ForkResult::Parent { child } => {
				assert_eq!(job::wait_terminated(child).unwrap(), WaitStatus::Exited(child, 0));
				assert_eq!(fs::read_to_string(&path).unwrap(), "x");
			},
		}
	}

	#[test]
	fn restore_reports_failure() {
		let (read, write) = unistd::pipe().unwrap();
		let saved = SavedStdio { saved: vec![(-1, write)] };
		assert!(saved.restore().is_err());
		let _ = unistd::close(read);
		let _ = unistd::close(write);
	}
}
