use snafu::Snafu;

pub type Result<T, E = Error> = ::std::result::Result<T, E>;

/// Error types
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("invalid input"))]
    InvalidInput,
    #[snafu(display("invalid armor wrappers"))]
    InvalidArmorWrappers,
    #[snafu(display("invalid crc24 checksum"))]
    InvalidChecksum,
    #[snafu(transparent)]
    Base64Decode { source: base64::DecodeError },
    #[snafu(display("malformed MPI: {message}"))]
    MpiFormat { message: String },
    #[snafu(display("not enough data: {needed} bytes exceed the region"))]
    NotEnoughData { needed: usize },
    #[snafu(display("read failed: wanted {wanted} bytes, got {got}"))]
    ReadFailed { wanted: usize, got: usize },
    #[snafu(display("packet not fully consumed: {remaining} bytes left in region"))]
    PacketNotConsumed { remaining: usize },
    #[snafu(display("unsupported public key algorithm {alg}"))]
    UnsupportedPublicKeyAlgorithm { alg: u8 },
    #[snafu(display("critical but unrecognized signature subpacket {typ}"))]
    CriticalSubpacketIgnored { typ: u8 },
    #[snafu(display("Modification Detection Code mismatch"))]
    MdcError,
    #[snafu(display("session key checksum mismatch"))]
    SessionKeyChecksum,
    #[snafu(transparent)]
    IO { source: std::io::Error },
    #[snafu(display("invalid key length"))]
    InvalidKeyLength,
    #[snafu(display("missing key"))]
    MissingKey,
    #[snafu(display("Not yet implemented: {message}"))]
    Unimplemented { message: String },
    /// Signals packet versions and parameters we don't support, but can safely ignore
    #[snafu(display("Unsupported: {message}"))]
    Unsupported { message: String },
    #[snafu(display("{message}"))]
    Message { message: String },
    #[snafu(display("Unpadding failed"))]
    UnpadError,
    #[snafu(transparent)]
    Utf8Error { source: std::str::Utf8Error },
    #[snafu(transparent)]
    ParseIntError { source: std::num::ParseIntError },
    #[snafu(transparent)]
    TryFromInt { source: std::num::TryFromIntError },
    #[snafu(display("Invalid Packet Content {source:?}"))]
    InvalidPacketContent { source: Box<Error> },
    #[snafu(display("packet is incomplete"))]
    PacketIncomplete,
}

impl Error {
    /// Integrity failures must never be downgraded or skipped over.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::MdcError | Error::SessionKeyChecksum | Error::InvalidChecksum
        )
    }
}

impl From<String> for Error {
    fn from(err: String) -> Error {
        Error::Message { message: err }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Error {
        Error::Message {
            message: err.to_string(),
        }
    }
}

#[macro_export]
macro_rules! unimplemented_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Unimplemented { message: $e.to_string() })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Unimplemented { message: format!($fmt, $($arg)+)})
    };
}

#[macro_export]
macro_rules! unsupported_err {
    ($e:expr) => {
        return Err($crate::errors::Error::Unsupported { message: $e.to_string()})
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Unsupported { message: format!($fmt, $($arg)+) })
    };
}

#[macro_export]
macro_rules! bail {
    ($e:expr) => {
        return Err($crate::errors::Error::Message { message: $e.to_string() })
    };
    ($fmt:expr, $($arg:tt)+) => {
        return Err($crate::errors::Error::Message { message: format!($fmt, $($arg)+) })
    };
}

#[macro_export]
macro_rules! format_err {
    ($e:expr) => {
        $crate::errors::Error::Message { message: $e.to_string() }
    };
    ($fmt:expr, $($arg:tt)+) => {
        $crate::errors::Error::Message { message: format!($fmt, $($arg)+) }
    };
}

#[macro_export(local_inner_macros)]
macro_rules! ensure {
    ($cond:expr, $e:expr) => {
        if !($cond) {
            bail!($e);
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)+) => {
        if !($cond) {
            bail!($fmt, $($arg)+);
        }
    };
}

#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => ({
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`"#, left_val, right_val)
                }
            }
        }
    });
    ($left:expr, $right:expr,) => ({
        ensure_eq!($left, $right)
    });
    ($left:expr, $right:expr, $($arg:tt)+) => ({
        match (&($left), &($right)) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    bail!(r#"assertion failed: `(left == right)`
  left: `{:?}`,
 right: `{:?}`: {}"#, left_val, right_val,
                           format_args!($($arg)+))
                }
            }
        }
    });
}
