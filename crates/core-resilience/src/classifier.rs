//! Failure classification: transient unavailability vs. everything else
//!
//! A failure is treated as "the database is unavailable right now" when it
//! carries one of a fixed set of connectivity codes, or when its message is
//! the driver's abrupt-disconnect message. Anything else is unexpected and
//! is never retried.

/// No database cluster is listening on the host/port
pub const CONNECTION_REFUSED: &str = "ECONNREFUSED";

/// The operation timed out
pub const TIMED_OUT: &str = "ETIMEDOUT";

/// The target database does not exist in the cluster (SQLSTATE `3D000`)
pub const DATABASE_MISSING: &str = "3D000";

/// The database system is starting up (SQLSTATE `57P03`)
pub const DATABASE_STARTING_UP: &str = "57P03";

/// Codes that mark a failure as transient
pub const UNAVAILABLE_CODES: [&str; 4] = [
    CONNECTION_REFUSED,
    TIMED_OUT,
    DATABASE_MISSING,
    DATABASE_STARTING_UP,
];

/// Message reported when the server closes the connection mid-session
pub const CONNECTION_TERMINATED: &str = "connection terminated unexpectedly";

/// What the retry engine needs to know about a driver failure
pub trait DatabaseFailure: std::error::Error + Send + Sync + 'static {
    /// Connectivity code (`errno` or SQLSTATE), if the driver reported one
    fn code(&self) -> Option<&str>;

    /// The failure's own message, without any wrapping context
    fn message(&self) -> &str;

    /// Address of the database the failed call was sent to
    fn address(&self) -> Option<&str> {
        None
    }

    /// Port of the database the failed call was sent to
    fn port(&self) -> Option<u16> {
        None
    }
}

/// Returns `true` when the failure indicates transient unavailability
pub fn is_unavailable<E: DatabaseFailure + ?Sized>(err: &E) -> bool {
    let by_code = err
        .code()
        .is_some_and(|code| UNAVAILABLE_CODES.contains(&code));

    by_code || err.message().eq_ignore_ascii_case(CONNECTION_TERMINATED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Failure {
        code: Option<&'static str>,
        message: &'static str,
    }

    impl std::fmt::Display for Failure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.message)
        }
    }

    impl std::error::Error for Failure {}

    impl DatabaseFailure for Failure {
        fn code(&self) -> Option<&str> {
            self.code
        }

        fn message(&self) -> &str {
            self.message
        }
    }

    fn with_code(code: &'static str) -> Failure {
        Failure {
            code: Some(code),
            message: "some message",
        }
    }

    #[test]
    fn test_known_codes_are_unavailable() {
        for code in ["ECONNREFUSED", "ETIMEDOUT", "3D000", "57P03"] {
            assert!(is_unavailable(&with_code(code)), "code {code}");
        }
    }

    #[test]
    fn test_other_codes_are_unexpected() {
        for code in ["42P01", "23505", "ECONNRESET", "econnrefused", ""] {
            assert!(!is_unavailable(&with_code(code)), "code {code}");
        }
    }

    #[test]
    fn test_terminated_message_any_case() {
        for message in [
            "Connection terminated unexpectedly",
            "connection terminated unexpectedly",
            "CONNECTION TERMINATED UNEXPECTEDLY",
        ] {
            let err = Failure {
                code: None,
                message,
            };
            assert!(is_unavailable(&err), "message {message}");
        }
    }

    #[test]
    fn test_message_must_match_exactly() {
        let err = Failure {
            code: None,
            message: "connection terminated unexpectedly during query",
        };
        assert!(!is_unavailable(&err));

        let err = Failure {
            code: None,
            message: "relation \"users\" does not exist",
        };
        assert!(!is_unavailable(&err));
    }

    #[test]
    fn test_default_location_is_none() {
        let err = with_code("ECONNREFUSED");
        assert!(err.address().is_none());
        assert!(err.port().is_none());
    }
}
