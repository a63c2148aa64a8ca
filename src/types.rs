#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RedirectType { Input, Output, Append }

impl RedirectType {
	pub const ALL: [RedirectType; 3] = [RedirectType::Input, RedirectType::Output, RedirectType::Append];

	pub fn operator(self) -> &'static str {
		match self {
			RedirectType::Input => "<",
			RedirectType::Output => ">",
			RedirectType::Append => ">>",
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirect<'a> {
	pub target: &'a str,
	pub typ: RedirectType,
	/// Word index of the operator; the later of `>` and `>>` wins stdout.
	pub position: usize,
}

/// The words of one pipeline stage, exactly as typed.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Command<'a> {
	pub words: Vec<&'a str>,
}

/// A stage with its redirection operators split off from the argument vector.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Resolved<'a> {
	pub argv: Vec<&'a str>,
	pub redirects: Vec<Redirect<'a>>,
}

impl<'a> Resolved<'a> {
	pub fn name(&self) -> Option<&'a str> {
		self.argv.first().copied()
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Pipeline<'a> {
	pub commands: Vec<Command<'a>>,
}

/// What the read loop should do after a statement has run.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Status { Continue, Terminate }

impl Status {
	pub fn is_terminate(self) -> bool {
		self == Status::Terminate
	}

	pub fn to_byte(self) -> u8 {
		match self {
			Status::Continue => 1,
			Status::Terminate => 0,
		}
	}

	pub fn from_byte(b: u8) -> Status {
		match b {
			0 => Status::Terminate,
			_ => Status::Continue,
		}
	}
}
