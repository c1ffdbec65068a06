use core::fmt::{self, Debug, Formatter};

/// Page content in log output. Shown verbatim only with the `"dangerous-logging"` feature.
pub(crate) struct Redacted<'a>(pub &'a str);
impl Debug for Redacted<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		if cfg!(feature = "dangerous-logging") {
			Debug::fmt(self.0, f)
		} else {
			write!(f, "<{} bytes>", self.0.len())
		}
	}
}
