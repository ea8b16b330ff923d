use std::any::Any;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Conditions raised by the library itself.
///
/// A rejected `Promise` carries a `Reason`, which may wrap one of these or any other error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A plain, non-error value was used as a rejection reason.
    #[error("{0}")]
    Rejected(String),

    /// An operation was handed input it cannot work with.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A handler or a piece of deferred work panicked.
    #[error("panicked: {0}")]
    Panicked(String),

    /// A promise was resolved with itself, so it could never settle.
    #[error("promise resolved with itself")]
    Cycle,

    /// Every input of `any` was rejected.
    #[error("all {0} promises were rejected")]
    AllRejected(usize),
}

/// Why a `Promise` was rejected.
///
/// A `Reason` wraps an arbitrary error and is cheap to clone, so that every reaction registered on
/// a rejected promise can receive it. Values which are not errors are coerced into
/// `Error::Rejected` by `Reason::msg` and by the `From<&str>`/`From<String>` conversions.
///
/// ```
/// # use pledge::{Error, Reason};
/// let reason = Reason::from("out of coffee");
/// assert_eq!(reason.to_string(), "out of coffee");
/// assert_eq!(reason.downcast_ref::<Error>(), Some(&Error::Rejected("out of coffee".into())));
/// ```
#[derive(Clone)]
pub struct Reason(Arc<dyn StdError + Send + Sync + 'static>);

impl Reason {
    /// Wrap an error value.
    pub fn new<E>(err: E) -> Reason
        where E: StdError + Send + Sync + 'static
    {
        Reason(Arc::new(err))
    }

    /// Coerce anything displayable into a `Reason`.
    pub fn msg<M: Display>(msg: M) -> Reason {
        Reason::new(Error::Rejected(msg.to_string()))
    }

    // Panic payloads are almost always a &str or a String.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Reason {
        let msg = match payload.downcast_ref::<&'static str>() {
            Some(s) => s.to_string(),
            None => match payload.downcast_ref::<String>() {
                Some(s) => s.clone(),
                None => String::from("opaque panic payload"),
            },
        };
        Reason::new(Error::Panicked(msg))
    }

    /// Borrow the wrapped error as a concrete type, if it is one.
    pub fn downcast_ref<E>(&self) -> Option<&E>
        where E: StdError + 'static
    {
        self.0.downcast_ref::<E>()
    }

    /// Test whether the wrapped error is of type `E`.
    pub fn is<E>(&self) -> bool
        where E: StdError + 'static
    {
        self.0.is::<E>()
    }

    /// Borrow the wrapped error.
    pub fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        &*self.0
    }
}

impl Display for Reason {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        Display::fmt(&*self.0, f)
    }
}

impl Debug for Reason {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Reason({:?})", &*self.0)
    }
}

impl StdError for Reason {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

impl From<Error> for Reason {
    fn from(err: Error) -> Reason {
        Reason::new(err)
    }
}

impl From<io::Error> for Reason {
    fn from(err: io::Error) -> Reason {
        Reason::new(err)
    }
}

impl From<Box<dyn StdError + Send + Sync + 'static>> for Reason {
    fn from(err: Box<dyn StdError + Send + Sync + 'static>) -> Reason {
        Reason(Arc::from(err))
    }
}

impl From<String> for Reason {
    fn from(msg: String) -> Reason {
        Reason::new(Error::Rejected(msg))
    }
}

impl<'a> From<&'a str> for Reason {
    fn from(msg: &'a str) -> Reason {
        Reason::msg(msg)
    }
}
