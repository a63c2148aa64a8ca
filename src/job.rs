use std::io;
use std::io::Write;
use std::os::unix::io::RawFd;

use log::debug;
use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};

use crate::types::Status;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub enum State { Active, Stopped, Terminated }

pub trait WaitStatusExt {
	fn state(self) -> State;
}

impl WaitStatusExt for WaitStatus {
	fn state(self) -> State {
		match self {
			WaitStatus::Exited(..) => State::Terminated,
			WaitStatus::Signaled(..) => State::Terminated,
			WaitStatus::Stopped(..) => State::Stopped,
			#[cfg(any(target_os = "linux", target_os = "android"))]
			WaitStatus::PtraceEvent(..) => State::Stopped,
			#[cfg(any(target_os = "linux", target_os = "android"))]
			WaitStatus::PtraceSyscall(..) => State::Stopped,
			WaitStatus::Continued(..) => State::Active,
			WaitStatus::StillAlive => State::Active,
		}
	}
}

/// Forks after flushing stdout, so buffered output is not written twice.
pub fn fork() -> nix::Result<ForkResult> {
	let _ = io::stdout().flush();
	let r = unsafe { unistd::fork() }?;
	if let ForkResult::Parent { child } = r {
		debug!("forked child {}", child);
	}
	Ok(r)
}

/// Blocks until `pid` exits or is killed. Stops are reported with
/// WUNTRACED but do not end the wait.
pub fn wait_terminated(pid: Pid) -> nix::Result<WaitStatus> {
	loop {
		match wait::waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
			Ok(status) => {
				if status.state() == State::Terminated {
					debug!("child {} finished: {:?}", pid, status);
					return Ok(status);
				}
				debug!("child {} not terminated yet: {:?}", pid, status);
			},
			Err(Errno::EINTR) => {},
			Err(e) => { return Err(e); },
		}
	}
}

/// Leaves a forked child without running atexit handlers or destructors
/// inherited from the interpreter.
pub fn exit_child(code: i32) -> ! {
	let _ = io::stdout().flush();
	let _ = io::stderr().flush();
	unsafe { libc::_exit(code) }
}

/// One-shot pipe carrying a stage's `Status` from a forked child back to
/// the interpreter. Both ends are close-on-exec, so a child that execs an
/// external program closes its end without writing and the interpreter
/// reads end-of-file.
#[derive(Debug)]
pub struct StatusChannel {
	read: RawFd,
	write: RawFd,
}

#[derive(Debug)]
pub struct StatusSender {
	write: RawFd,
}

#[derive(Debug)]
pub struct StatusReceiver {
	read: RawFd,
}

impl StatusChannel {
	pub fn new() -> nix::Result<StatusChannel> {
		let (read, write) = unistd::pipe2(OFlag::O_CLOEXEC)?;
		Ok(StatusChannel { read: read, write: write })
	}

	pub fn into_sender(self) -> StatusSender {
		let _ = unistd::close(self.read);
		StatusSender { write: self.write }
	}

	pub fn into_receiver(self) -> StatusReceiver {
		let _ = unistd::close(self.write);
		StatusReceiver { read: self.read }
	}
}

impl StatusSender {
	pub fn send(self, status: Status) {
		let _ = unistd::write(self.write, &[status.to_byte()]);
		let _ = unistd::close(self.write);
	}
}

impl StatusReceiver {
	/// Reads the reported status; a child that never reported counts as
	/// `Continue`.
	pub fn receive(self) -> Status {
		let mut buf = [0u8; 1];
		let r = loop {
			match unistd::read(self.read, &mut buf) {
				Err(Errno::EINTR) => {},
				r => break r,
			}
		};
		let _ = unistd::close(self.read);
		match r {
			Ok(1) => Status::from_byte(buf[0]),
			_ => Status::Continue,
		}
	}
}
