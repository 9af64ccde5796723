//! `.context()` for crate-local error types.

/// Error types that can be built from a plain message.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Define a crate-local `Context` trait for `Result` and `Option`.
///
/// The invoking module must have `Error: FromMessage` and a
/// `Result<T>` alias in scope:
///
/// ```ignore
/// onika_common::impl_context!();
///
/// let bytes = response.bytes().await.context("reading voice file")?;
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            /// Replace the failure with `"{what}: {cause}"`.
            fn context(self, what: &str) -> Result<T>;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, what: &str) -> Result<T> {
                self.map_err(|cause| {
                    <Error as $crate::FromMessage>::from_message(format!("{what}: {cause}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, what: &str) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(what.to_string()))
            }
        }
    };
}
