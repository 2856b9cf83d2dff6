//! HTTP client for a Cognito-style user-pool identity provider.
//!
//! The user-pool API is JSON over POST to a single endpoint, with the
//! operation named in the `x-amz-target` header and faults reported as a
//! `__type` field in the body. This client maps those faults onto the
//! platform's identity-error taxonomy so the session store never sees
//! provider-specific shapes.

use async_trait::async_trait;
use cloudledger_access::{
    Attribute, IdentityError, IdentityProvider, Principal, SessionTokens, SignInResponse,
    UserPoolConfig,
};
use cloudledger_core::{Handle, SubjectId};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";

/// Identity provider backed by a user-pool HTTP API.
pub struct UserPoolClient {
    http: reqwest::Client,
    config: UserPoolConfig,
}

impl UserPoolClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(config: UserPoolConfig) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds()))
            .build()
            .map_err(|e| IdentityError::Other {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { http, config })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &UserPoolConfig {
        &self.config
    }

    async fn call(&self, action: &str, body: Value) -> Result<Value, IdentityError> {
        debug!(action, "user pool request");

        let response = self
            .http
            .post(self.config.endpoint())
            .header("content-type", "application/x-amz-json-1.1")
            .header("x-amz-target", format!("{TARGET_PREFIX}.{action}"))
            .json(&body)
            .send()
            .await
            .map_err(|e| IdentityError::ProviderUnavailable {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let payload: Value =
            response
                .json()
                .await
                .map_err(|e| IdentityError::ProviderUnavailable {
                    reason: format!("unreadable response: {e}"),
                })?;

        if status.is_success() {
            Ok(payload)
        } else {
            Err(map_fault(status.as_u16(), &payload))
        }
    }
}

/// Maps a user-pool fault onto the platform's error taxonomy.
///
/// Unknown handles map to `InvalidCredentials` rather than their own kind
/// so sign-in responses do not reveal which handles exist.
fn map_fault(status: u16, payload: &Value) -> IdentityError {
    let fault = payload
        .get("__type")
        .and_then(Value::as_str)
        .map(|t| t.rsplit('#').next().unwrap_or(t))
        .unwrap_or("");
    let message = payload
        .get("message")
        .or_else(|| payload.get("Message"))
        .and_then(Value::as_str)
        .unwrap_or("no details provided")
        .to_string();

    match fault {
        // Disabled accounts are confirmed users awaiting administrative
        // activation, reported by the pool as a NotAuthorized fault.
        "NotAuthorizedException" if message.to_ascii_lowercase().contains("disabled") => {
            IdentityError::PendingApproval
        }
        "NotAuthorizedException" | "UserNotFoundException" => IdentityError::InvalidCredentials,
        "UserNotConfirmedException" => IdentityError::UnconfirmedAccount,
        "TooManyRequestsException" | "InternalErrorException" | "ServiceUnavailableException" => {
            IdentityError::ProviderUnavailable { reason: message }
        }
        _ if status >= 500 => IdentityError::ProviderUnavailable { reason: message },
        "" => IdentityError::Other { message },
        _ => IdentityError::Other {
            message: format!("{fault}: {message}"),
        },
    }
}

fn tokens_from_auth_result(payload: &Value) -> Result<SessionTokens, IdentityError> {
    let result = payload
        .get("AuthenticationResult")
        .ok_or_else(|| IdentityError::Other {
            message: "response carried neither tokens nor a challenge".to_string(),
        })?;

    let access_token = result
        .get("AccessToken")
        .and_then(Value::as_str)
        .ok_or_else(|| IdentityError::Other {
            message: "authentication result is missing the access token".to_string(),
        })?
        .to_string();
    let id_token = result
        .get("IdToken")
        .and_then(Value::as_str)
        .map(str::to_string);
    let refresh_token = result
        .get("RefreshToken")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(SessionTokens::new(access_token, id_token, refresh_token))
}

fn attributes_json(attributes: &[Attribute]) -> Value {
    Value::Array(
        attributes
            .iter()
            .map(|a| json!({ "Name": a.name, "Value": a.value }))
            .collect(),
    )
}

#[async_trait]
impl IdentityProvider for UserPoolClient {
    /// Gateway sessions do not persist credentials, so there is never a
    /// provider-side principal to resume; resumption is satisfied by the
    /// session registry keeping stores alive across requests.
    async fn resume_session(&self) -> Result<Option<Principal>, IdentityError> {
        Ok(None)
    }

    async fn validate(&self, principal: &Principal) -> Result<bool, IdentityError> {
        let result = self
            .call(
                "GetUser",
                json!({ "AccessToken": principal.tokens().access_token() }),
            )
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(IdentityError::InvalidCredentials) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn sign_in(
        &self,
        handle: &Handle,
        secret: &str,
    ) -> Result<SignInResponse, IdentityError> {
        let payload = self
            .call(
                "InitiateAuth",
                json!({
                    "AuthFlow": "USER_PASSWORD_AUTH",
                    "ClientId": self.config.client_id(),
                    "AuthParameters": {
                        "USERNAME": handle.as_str(),
                        "PASSWORD": secret,
                    },
                }),
            )
            .await?;

        if payload.get("ChallengeName").and_then(Value::as_str) == Some("NEW_PASSWORD_REQUIRED") {
            return Ok(SignInResponse::NewCredentialRequired);
        }

        Ok(SignInResponse::Tokens(tokens_from_auth_result(&payload)?))
    }

    async fn register(
        &self,
        handle: &Handle,
        secret: &str,
        attributes: &[Attribute],
    ) -> Result<SubjectId, IdentityError> {
        let payload = self
            .call(
                "SignUp",
                json!({
                    "ClientId": self.config.client_id(),
                    "Username": handle.as_str(),
                    "Password": secret,
                    "UserAttributes": attributes_json(attributes),
                }),
            )
            .await?;

        let subject = payload
            .get("UserSub")
            .and_then(Value::as_str)
            .ok_or_else(|| IdentityError::Other {
                message: "registration response is missing the subject".to_string(),
            })?;

        Ok(SubjectId::from(subject))
    }

    async fn confirm_registration(
        &self,
        handle: &Handle,
        code: &str,
    ) -> Result<(), IdentityError> {
        self.call(
            "ConfirmSignUp",
            json!({
                "ClientId": self.config.client_id(),
                "Username": handle.as_str(),
                "ConfirmationCode": code,
            }),
        )
        .await?;
        Ok(())
    }

    async fn resend_code(&self, handle: &Handle) -> Result<(), IdentityError> {
        self.call(
            "ResendConfirmationCode",
            json!({
                "ClientId": self.config.client_id(),
                "Username": handle.as_str(),
            }),
        )
        .await?;
        Ok(())
    }

    async fn update_attributes(
        &self,
        principal: &Principal,
        attributes: &[Attribute],
    ) -> Result<(), IdentityError> {
        self.call(
            "UpdateUserAttributes",
            json!({
                "AccessToken": principal.tokens().access_token(),
                "UserAttributes": attributes_json(attributes),
            }),
        )
        .await?;
        Ok(())
    }

    async fn sign_out(&self, principal: &Principal) -> Result<(), IdentityError> {
        self.call(
            "GlobalSignOut",
            json!({ "AccessToken": principal.tokens().access_token() }),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_authorized_maps_to_invalid_credentials() {
        let payload = json!({
            "__type": "NotAuthorizedException",
            "message": "Incorrect username or password.",
        });
        assert_eq!(map_fault(400, &payload), IdentityError::InvalidCredentials);
    }

    #[test]
    fn unknown_handle_is_indistinguishable_from_wrong_secret() {
        let payload = json!({
            "__type": "UserNotFoundException",
            "message": "User does not exist.",
        });
        assert_eq!(map_fault(400, &payload), IdentityError::InvalidCredentials);
    }

    #[test]
    fn disabled_user_maps_to_pending_approval() {
        let payload = json!({
            "__type": "NotAuthorizedException",
            "message": "User is disabled.",
        });
        assert_eq!(map_fault(400, &payload), IdentityError::PendingApproval);
    }

    #[test]
    fn unconfirmed_user_maps_to_unconfirmed_account() {
        let payload = json!({
            "__type": "UserNotConfirmedException",
            "message": "User is not confirmed.",
        });
        assert_eq!(map_fault(400, &payload), IdentityError::UnconfirmedAccount);
    }

    #[test]
    fn throttling_and_server_faults_are_retryable() {
        let payload = json!({
            "__type": "TooManyRequestsException",
            "message": "Rate exceeded",
        });
        assert!(matches!(
            map_fault(400, &payload),
            IdentityError::ProviderUnavailable { .. }
        ));

        let payload = json!({ "__type": "SomethingOdd", "message": "boom" });
        assert!(matches!(
            map_fault(502, &payload),
            IdentityError::ProviderUnavailable { .. }
        ));
    }

    #[test]
    fn namespaced_fault_types_are_recognized() {
        let payload = json!({
            "__type": "com.amazonaws.cognito#UserNotConfirmedException",
            "message": "User is not confirmed.",
        });
        assert_eq!(map_fault(400, &payload), IdentityError::UnconfirmedAccount);
    }

    #[test]
    fn unrecognized_fault_passes_message_through() {
        let payload = json!({
            "__type": "InvalidPasswordException",
            "message": "Password did not conform with policy",
        });
        let err = map_fault(400, &payload);
        let IdentityError::Other { message } = err else {
            panic!("expected Other");
        };
        assert!(message.contains("InvalidPasswordException"));
        assert!(message.contains("conform with policy"));
    }

    #[test]
    fn auth_result_parses_all_tokens() {
        let payload = json!({
            "AuthenticationResult": {
                "AccessToken": "at",
                "IdToken": "it",
                "RefreshToken": "rt",
            },
        });
        let tokens = tokens_from_auth_result(&payload).expect("tokens");
        assert_eq!(tokens.access_token(), "at");
        assert_eq!(tokens.id_token(), Some("it"));
        assert_eq!(tokens.refresh_token(), Some("rt"));
    }

    #[test]
    fn missing_auth_result_is_an_error() {
        let payload = json!({ "Session": "opaque" });
        assert!(tokens_from_auth_result(&payload).is_err());
    }

    #[test]
    fn attributes_serialize_to_name_value_pairs() {
        let attributes = [
            Attribute::new("email", "ana@x.com"),
            Attribute::new("custom:company", "Acme"),
        ];
        let value = attributes_json(&attributes);
        assert_eq!(
            value,
            json!([
                { "Name": "email", "Value": "ana@x.com" },
                { "Name": "custom:company", "Value": "Acme" },
            ])
        );
    }
}
