use std::fmt::{self, Debug, Display};

/// Wraps a sensitive value (Stripe keys, webhook signing secrets) so that no formatted representation can leak
/// it. Both `Debug` and `Display` print a redaction marker; the wrapped value only comes out through an explicit
/// [`Secret::reveal`] call, which makes accidental logging grep-ably impossible.
#[derive(Clone, Default)]
pub struct Secret<T> {
    inner: T,
}

impl<T> Secret<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// The one and only way to get at the wrapped value.
    pub fn reveal(&self) -> &T {
        &self.inner
    }
}

impl<T> From<T> for Secret<T> {
    fn from(inner: T) -> Self {
        Self::new(inner)
    }
}

impl<T> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

impl<T> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}
