//! Access tokens issued by the identity provider.

// self
use crate::{_prelude::*, auth::Secret};

/// Access token returned by a successful client-credentials exchange.
#[derive(Clone)]
pub struct AccessToken {
	/// Bearer token value; callers must avoid logging it.
	pub secret: Secret,
	/// Instant the broker received the token.
	pub issued_at: OffsetDateTime,
	/// Expiry derived from the provider's `expires_in`, when supplied.
	pub expires_at: Option<OffsetDateTime>,
}
impl AccessToken {
	/// Wraps a token value issued now, with no known expiry.
	pub fn new(secret: impl Into<Secret>) -> Self {
		Self { secret: secret.into(), issued_at: OffsetDateTime::now_utc(), expires_at: None }
	}

	/// Overrides the issued-at instant, shifting a known expiry along with it.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		if let Some(expires_at) = self.expires_at {
			self.expires_at = Some(instant + (expires_at - self.issued_at));
		}

		self.issued_at = instant;

		self
	}

	/// Sets a relative expiry from the issued-at instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_at = Some(self.issued_at + duration);

		self
	}

	/// Returns the bearer token value.
	pub fn expose(&self) -> &str {
		self.secret.expose()
	}

	/// Returns `true` if the token has a known expiry at or before `instant`.
	pub fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn relative_expiry_follows_issued_at() {
		let token = AccessToken::new("token")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(60));

		assert_eq!(token.expires_at, Some(macros::datetime!(2025-01-01 01:00 UTC)));
		assert!(!token.is_expired_at(macros::datetime!(2025-01-01 00:59 UTC)));
		assert!(token.is_expired_at(macros::datetime!(2025-01-01 01:00 UTC)));

		let shifted = token.issued_at(macros::datetime!(2025-01-02 00:00 UTC));

		assert_eq!(shifted.expires_at, Some(macros::datetime!(2025-01-02 01:00 UTC)));
	}

	#[test]
	fn debug_redacts_token_value() {
		let token = AccessToken::new("eyJ0eXAi");

		assert!(!format!("{token:?}").contains("eyJ0eXAi"));
		assert!(!token.is_expired_at(OffsetDateTime::now_utc()));
	}
}
