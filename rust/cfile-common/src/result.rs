use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Returns `InvalidArgument` from the enclosing function unless `$cond` holds.
#[macro_export]
macro_rules! verify_arg {
    ($arg:expr, $cond:expr) => {
        if !$cond {
            return Err($crate::result::check_failed(
                $crate::result::Check::Argument,
                stringify!($arg),
                stringify!($cond),
            ));
        }
    };
}

/// Returns `InvalidFormat` from the enclosing function unless `$cond` holds.
#[macro_export]
macro_rules! verify_data {
    ($element:expr, $cond:expr) => {
        if !$cond {
            return Err($crate::result::check_failed(
                $crate::result::Check::Data,
                stringify!($element),
                stringify!($cond),
            ));
        }
    };
}

/// What a failed `verify_*` check was guarding.
#[doc(hidden)]
#[derive(Debug, Clone, Copy)]
pub enum Check {
    Argument,
    Data,
}

#[doc(hidden)]
#[cold]
pub fn check_failed(check: Check, subject: &str, condition: &str) -> Error {
    let message = format!("{condition} does not hold");
    match check {
        Check::Argument => Error::invalid_arg(subject, message),
        Check::Data => Error::invalid_format(subject, message),
    }
}

#[cfg(test)]
mod tests {
    use crate::Result;

    fn check_len(data: &[u8]) -> Result<usize> {
        verify_data!(data, data.len() >= 4);
        Ok(data.len())
    }

    fn check_count(count: usize) -> Result<usize> {
        verify_arg!(count, count > 0);
        Ok(count)
    }

    #[test]
    fn test_verify_macros() {
        assert_eq!(check_len(b"abcd").unwrap(), 4);
        let err = check_len(b"ab").unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("data.len() >= 4"));

        assert_eq!(check_count(3).unwrap(), 3);
        assert!(matches!(
            check_count(0).unwrap_err().kind(),
            crate::error::ErrorKind::InvalidArgument { .. }
        ));
    }
}
