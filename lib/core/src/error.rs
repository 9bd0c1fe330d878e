//! Error handling foundation for Jupiter.
//!
//! Only the `Result` alias lives here. Each crate defines its own domain
//! error enums and lifts them into a `Report` at its public boundary.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    fn fails() -> Result<(), Boom> {
        Err(Boom.into())
    }

    #[test]
    fn result_alias_carries_context() {
        let ok: Result<i32> = Ok(42);
        assert_eq!(ok.expect("should be ok"), 42);

        let err = fails().unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
