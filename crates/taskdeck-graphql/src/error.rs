//! Error mapping for GraphQL responses.
//!
//! Auth errors carry a stable machine-readable code; it is surfaced in the
//! GraphQL error's `extensions.code` so clients can branch on the failure
//! class without parsing messages.

use async_graphql::ErrorExtensions;

use taskdeck_auth::AuthError;

/// Converts an auth error into a GraphQL error with a `code` extension.
pub fn graphql_error(err: &AuthError) -> async_graphql::Error {
    async_graphql::Error::new(err.to_string()).extend_with(|_, e| e.set("code", err.code()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_extension_set() {
        let err = graphql_error(&AuthError::InvalidCredentials);
        assert_eq!(err.message, "Invalid email or password");

        let extensions = err.extensions.expect("extensions set");
        assert_eq!(
            extensions.get("code"),
            Some(&async_graphql::Value::from("INVALID_CREDENTIALS"))
        );
    }
}
