//! Client-credentials acquisition with bounded retries and token write-back.
//!
//! Each attempt posts the grant to the tenant's token endpoint. Failed attempts are classified
//! by the broker's strategy, logged, and retried until the budget runs out; only the last
//! classification reaches the caller. A token obtained with an incomplete credential triple is
//! saved back to the store, and a failure there is the only error this flow returns.

// self
use crate::{
	_prelude::*,
	flows::{TokenBroker, TokenFailure, TokenOutcome, TokenRequest},
	http::{ResponseMetadataSlot, TokenHttpClient},
	oauth::AadFacade,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::Classification,
	store::CredentialUpdate,
};

impl<C> TokenBroker<C>
where
	C: ?Sized + TokenHttpClient,
{
	/// Requests an access token for `request`, retrying up to its attempt budget.
	///
	/// Provider and network failures come back as [`TokenOutcome::Rejected`]. `Err` is reserved
	/// for local configuration problems and for failing to persist a refreshed token.
	pub async fn acquire_token(&self, request: &TokenRequest) -> Result<TokenOutcome> {
		const KIND: FlowKind = FlowKind::ClientCredentials;

		let span = FlowSpan::new(KIND, "acquire_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span.instrument(self.acquire_token_inner(request)).await;

		match &result {
			Ok(TokenOutcome::Granted(_)) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Ok(TokenOutcome::Rejected(_)) | Err(_) =>
				obs::record_flow_outcome(KIND, FlowOutcome::Failure),
		}

		result
	}

	async fn acquire_token_inner(&self, request: &TokenRequest) -> Result<TokenOutcome> {
		trace_event!(info, "Requesting AAD access token for account {}.", request.account);

		let endpoint = self.settings.token_endpoint(&request.tenant_id)?;
		let slot = ResponseMetadataSlot::default();
		let handle = match self.http_client.with_metadata(slot.clone(), request.proxy.as_ref()) {
			Ok(handle) => handle,
			Err(err) => {
				trace_event!(error, "Unable to prepare the token request transport: {}", err);

				return Ok(TokenOutcome::Rejected(TokenFailure::new(
					Classification::connectivity(),
					0,
				)));
			},
		};
		let facade = AadFacade::new(
			endpoint,
			&request.client_id,
			&request.client_secret,
			self.settings.scope.clone(),
		);
		let mut form = BTreeMap::new();

		self.strategy.augment_token_request(&mut form);

		let budget = request.attempt_budget();
		let mut failure = TokenFailure::new(Classification::connectivity(), 0);

		for attempt in 1..=budget {
			self.attempt_metrics.record_attempt();

			let error = match facade.exchange_client_credentials::<C>(&handle, &slot, &form).await {
				Ok(token) => {
					self.attempt_metrics.record_success();
					obs::record_token_request(FlowOutcome::Success);
					trace_event!(
						info,
						"Obtained AAD access token for account {} on attempt {}.",
						request.account,
						attempt
					);

					if !request.has_complete_credentials() {
						let update = CredentialUpdate::refreshed_token(
							token.secret.clone(),
							request.client_secret.clone(),
						);

						self.store.put(&request.account, update).await.map_err(|err| {
							trace_event!(error, "Failed to save AAD access token: {}", err);

							Error::from(err)
						})?;
					}

					return Ok(TokenOutcome::Granted(token));
				},
				Err(error) => error,
			};

			self.attempt_metrics.record_failure();
			obs::record_token_request(FlowOutcome::Failure);

			let classification = self.strategy.classify_failure(&error.context());

			trace_event!(
				error,
				"Unable to generate AAD access token for account {} (attempt {}/{}): {}",
				request.account,
				attempt,
				budget,
				classification.message
			);
			trace_event!(debug, "Token endpoint failure detail: {}", error.detail());

			failure = TokenFailure::new(classification, attempt);

			if attempt < budget {
				let delay = self.retry_policy.delay_for(error.retry_after());

				if delay.is_positive() {
					tokio::time::sleep(delay.unsigned_abs()).await;
				}
			}
		}

		Ok(TokenOutcome::Rejected(failure))
	}
}
