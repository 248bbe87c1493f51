//! Engine status codes.

use std::fmt;

/// A status code returned by the native engine.
///
/// The marshaling layer never interprets or rewrites these codes; it hands
/// them back to the host exactly as the engine produced them. The named
/// constants exist for callers and tests.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Status(pub i32);

impl Status {
    /// Successful result.
    pub const SUCCESS: Status = Status(0);
    /// Key/data pair already exists.
    pub const KEYEXIST: Status = Status(-30799);
    /// Key/data pair not found.
    pub const NOTFOUND: Status = Status(-30798);
    /// Transaction is not valid for the requested operation.
    pub const BAD_TXN: Status = Status(-30782);
    /// Unsupported size of key/DB name/data, or wrong DUPFIXED size.
    pub const BAD_VALSIZE: Status = Status(-30781);
    /// Unexpected internal problem.
    pub const PROBLEM: Status = Status(-30779);
    /// Invalid argument (`EINVAL`).
    pub const EINVAL: Status = Status(22);

    /// Returns the raw integer code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Returns true if the engine reported success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Status(code)
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status.0
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Status::SUCCESS => f.write_str("success"),
            Status::KEYEXIST => f.write_str("key exists"),
            Status::NOTFOUND => f.write_str("not found"),
            Status::BAD_TXN => f.write_str("bad transaction"),
            Status::BAD_VALSIZE => f.write_str("bad value size"),
            Status::PROBLEM => f.write_str("internal problem"),
            Status(code) => write!(f, "engine status {code}"),
        }
    }
}
