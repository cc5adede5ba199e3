/// Attaches error context (file, line, debug-printed args) and converts into the local error type.
///
/// Forms:
///  - `ectx!(err e, ctx1, ctx2 => arg1, arg2)` - wraps `e` with contexts, returns `.into()`
///  - `ectx!(try err e, ...)` - same, but pinned to the `Error` type in scope (useful with `?`)
///  - `ectx!(convert err e => args)` - uses `e.kind()` converted into the local `ErrorKind` as context
///  - `ectx!(ctx1, ctx2 => args)`, `ectx!(try ...)`, `ectx!(convert => args)`, `ectx!(try convert => args)` -
///    closure versions of the above, suitable for `map_err`
macro_rules! ectx {
    (err_contexts $e:expr $(,$context:expr)* $(=> $($arg:expr),*)*) => {{
        let mut msg = "at ".to_string();
        msg.push_str(&format!("{}:{}", file!(), line!()));
        $(
            $(
                let arg = format!("\nwith args - {}: {:#?}", stringify!($arg), $arg);
                msg.push_str(&arg);
            )*
        )*
        let err = $e.context(msg);
        $(
            let err = err.context($context);
        )*
        err
    }};

    (err $e:expr $(,$context:expr)* $(=> $($arg:expr),*)*) => {{
        let err = ectx!(err_contexts $e $(,$context)* $(=> $($arg),*)*);
        err.into()
    }};

    (try err $e:expr $(,$context:expr)* $(=> $($arg:expr),*)*) => {{
        let e: Error = ectx!(err $e $(,$context)* $(=> $($arg),*)*);
        e
    }};

    (convert err $e:expr $(=> $($arg:expr),*)*) => {{
        let kind = $e.kind().into();
        ectx!(err $e, kind $(=> $($arg),*)*)
    }};

    (try convert err $e:expr $(=> $($arg:expr),*)*) => {{
        let kind = $e.kind().into();
        ectx!(try err $e, kind $(=> $($arg),*)*)
    }};

    (convert $(=> $($arg:expr),*)*) => {{
        move |e| {
            ectx!(convert err e $(=> $($arg),*)*)
        }
    }};

    (try convert $(=> $($arg:expr),*)*) => {{
        move |e| {
            ectx!(try convert err e $(=> $($arg),*)*)
        }
    }};

    (try $($context:expr),* $(=> $($arg:expr),*)*) => {{
        move |e| {
            ectx!(try err e $(,$context)* $(=> $($arg),*)*)
        }
    }};

    ($($context:expr),* $(=> $($arg:expr),*)*) => {{
        move |e| {
            ectx!(err e $(,$context)* $(=> $($arg),*)*)
        }
    }};
}

/// Implements `Fail`, `Display`, `From<ErrorKind>`, `From<Context<ErrorKind>>` and `kind()`
/// for an `Error { inner: Context<ErrorKind> }` struct declared in the calling module.
macro_rules! derive_error_impls {
    () => {
        impl Fail for Error {
            fn cause(&self) -> Option<&Fail> {
                self.inner.cause()
            }

            fn backtrace(&self) -> Option<&Backtrace> {
                self.inner.backtrace()
            }
        }

        impl Display for Error {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                Display::fmt(&self.inner, f)
            }
        }

        impl From<ErrorKind> for Error {
            fn from(kind: ErrorKind) -> Error {
                Error { inner: Context::new(kind) }
            }
        }

        impl From<Context<ErrorKind>> for Error {
            fn from(inner: Context<ErrorKind>) -> Error {
                Error { inner: inner }
            }
        }

        #[allow(dead_code)]
        impl Error {
            pub fn kind(&self) -> ErrorKind {
                self.inner.get_context().clone()
            }
        }
    };
}

/// Postgres (de)serialization for newtypes over a type that already has it,
/// e.g. `struct WalletId(Uuid)` stored as `uuid`.
macro_rules! derive_newtype_sql {
    ($mod_name:ident, $sql_type:ty, $type:ty, $constructor:expr) => {
        mod $mod_name {
            use super::*;
            use diesel::deserialize::{self, FromSql};
            use diesel::pg::Pg;
            use diesel::serialize::{self, Output, ToSql};
            use std::io::Write;

            impl FromSql<$sql_type, Pg> for $type {
                fn from_sql(data: Option<&[u8]>) -> deserialize::Result<Self> {
                    FromSql::<$sql_type, Pg>::from_sql(data).map($constructor)
                }
            }

            impl ToSql<$sql_type, Pg> for $type {
                fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
                    ToSql::<$sql_type, Pg>::to_sql(&self.0, out)
                }
            }
        }
    };
}
