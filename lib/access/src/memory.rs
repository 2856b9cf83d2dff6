//! In-memory identity provider for tests and demo mode.
//!
//! Simulates the credential half of the platform: seeded accounts with
//! secrets, confirmation codes, activation flags, token issuance and
//! revocation, and an optionally resumable principal. No timing simulation;
//! every call resolves immediately.

use async_trait::async_trait;
use cloudledger_core::{Handle, SubjectId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::error::IdentityError;
use crate::principal::{Principal, SessionTokens};
use crate::provider::{Attribute, IdentityProvider, SignInResponse};

struct Account {
    secret: String,
    subject: SubjectId,
    attributes: Vec<Attribute>,
    confirmed: bool,
    approved: bool,
    requires_new_secret: bool,
    confirmation_code: Option<String>,
}

/// Seed data for one provider account.
#[derive(Debug, Clone)]
pub struct AccountFixture {
    handle: Handle,
    secret: String,
    confirmed: bool,
    approved: bool,
    requires_new_secret: bool,
    attributes: Vec<Attribute>,
}

impl AccountFixture {
    /// Creates a confirmed, approved account fixture.
    #[must_use]
    pub fn new(handle: Handle, secret: impl Into<String>) -> Self {
        Self {
            handle,
            secret: secret.into(),
            confirmed: true,
            approved: true,
            requires_new_secret: false,
            attributes: Vec::new(),
        }
    }

    /// Marks the account as not yet confirmed.
    #[must_use]
    pub fn unconfirmed(mut self) -> Self {
        self.confirmed = false;
        self
    }

    /// Marks the account as confirmed but awaiting administrative
    /// activation.
    #[must_use]
    pub fn pending_approval(mut self) -> Self {
        self.approved = false;
        self
    }

    /// Forces a credential rotation on next sign-in.
    #[must_use]
    pub fn requires_new_secret(mut self) -> Self {
        self.requires_new_secret = true;
        self
    }

    /// Attaches a provider attribute.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, value));
        self
    }
}

/// In-memory [`IdentityProvider`] implementation.
#[derive(Default)]
pub struct MemoryIdentityProvider {
    accounts: RwLock<HashMap<Handle, Account>>,
    issued_tokens: RwLock<HashSet<String>>,
    resumable: RwLock<Option<Principal>>,
    counter: AtomicU64,
}

impl MemoryIdentityProvider {
    /// Creates an empty provider with no accounts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account and returns its assigned subject.
    pub async fn seed_account(&self, fixture: AccountFixture) -> SubjectId {
        let subject = self.next_subject();
        let mut accounts = self.accounts.write().await;
        accounts.insert(
            fixture.handle,
            Account {
                secret: fixture.secret,
                subject: subject.clone(),
                attributes: fixture.attributes,
                confirmed: fixture.confirmed,
                approved: fixture.approved,
                requires_new_secret: fixture.requires_new_secret,
                confirmation_code: None,
            },
        );
        subject
    }

    /// Issues tokens for an existing account and records the principal as
    /// resumable, as if a prior session had persisted its credentials.
    pub async fn make_resumable(&self, handle: &Handle) -> Result<Principal, IdentityError> {
        let accounts = self.accounts.read().await;
        if !accounts.contains_key(handle) {
            return Err(IdentityError::Other {
                message: format!("no account for '{handle}'"),
            });
        }
        drop(accounts);

        let tokens = self.issue_tokens(handle).await;
        let principal = Principal::new(handle.clone(), tokens);
        *self.resumable.write().await = Some(principal.clone());
        Ok(principal)
    }

    /// Returns the pending confirmation code for a handle, if one has been
    /// generated. Test and demo hook; a real provider delivers the code
    /// out of band.
    pub async fn confirmation_code(&self, handle: &Handle) -> Option<String> {
        let accounts = self.accounts.read().await;
        accounts.get(handle).and_then(|a| a.confirmation_code.clone())
    }

    /// Returns a stored attribute value for a handle.
    pub async fn attribute(&self, handle: &Handle, name: &str) -> Option<String> {
        let accounts = self.accounts.read().await;
        accounts.get(handle).and_then(|a| {
            a.attributes
                .iter()
                .find(|attr| attr.name == name)
                .map(|attr| attr.value.clone())
        })
    }

    fn next_subject(&self) -> SubjectId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        SubjectId::new(format!("subject-{n:08}"))
    }

    async fn issue_tokens(&self, handle: &Handle) -> SessionTokens {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let access = format!("access-{handle}-{n}");
        let refresh = format!("refresh-{handle}-{n}");
        self.issued_tokens.write().await.insert(access.clone());
        SessionTokens::new(access, None, Some(refresh))
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn resume_session(&self) -> Result<Option<Principal>, IdentityError> {
        Ok(self.resumable.read().await.clone())
    }

    async fn validate(&self, principal: &Principal) -> Result<bool, IdentityError> {
        let issued = self.issued_tokens.read().await;
        Ok(issued.contains(principal.tokens().access_token()))
    }

    async fn sign_in(
        &self,
        handle: &Handle,
        secret: &str,
    ) -> Result<SignInResponse, IdentityError> {
        {
            let accounts = self.accounts.read().await;
            let account = accounts
                .get(handle)
                .ok_or(IdentityError::InvalidCredentials)?;
            if account.secret != secret {
                return Err(IdentityError::InvalidCredentials);
            }
            if !account.confirmed {
                return Err(IdentityError::UnconfirmedAccount);
            }
            if !account.approved {
                return Err(IdentityError::PendingApproval);
            }
            if account.requires_new_secret {
                return Ok(SignInResponse::NewCredentialRequired);
            }
        }

        let tokens = self.issue_tokens(handle).await;
        Ok(SignInResponse::Tokens(tokens))
    }

    async fn register(
        &self,
        handle: &Handle,
        secret: &str,
        attributes: &[Attribute],
    ) -> Result<SubjectId, IdentityError> {
        let subject = self.next_subject();
        let code = format!("{:06}", 100_000 + self.counter.fetch_add(1, Ordering::Relaxed) % 900_000);

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(handle) {
            return Err(IdentityError::Other {
                message: format!("an account for '{handle}' already exists"),
            });
        }
        accounts.insert(
            handle.clone(),
            Account {
                secret: secret.to_string(),
                subject: subject.clone(),
                attributes: attributes.to_vec(),
                confirmed: false,
                approved: true,
                requires_new_secret: false,
                confirmation_code: Some(code),
            },
        );
        Ok(subject)
    }

    async fn confirm_registration(
        &self,
        handle: &Handle,
        code: &str,
    ) -> Result<(), IdentityError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(handle).ok_or_else(|| IdentityError::Other {
            message: format!("no account for '{handle}'"),
        })?;
        if account.confirmed {
            return Err(IdentityError::Other {
                message: "account is already confirmed".to_string(),
            });
        }
        if account.confirmation_code.as_deref() != Some(code) {
            return Err(IdentityError::Other {
                message: "invalid confirmation code".to_string(),
            });
        }
        account.confirmed = true;
        account.confirmation_code = None;
        Ok(())
    }

    async fn resend_code(&self, handle: &Handle) -> Result<(), IdentityError> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut accounts = self.accounts.write().await;
        let account = accounts.get_mut(handle).ok_or_else(|| IdentityError::Other {
            message: format!("no account for '{handle}'"),
        })?;
        if account.confirmed {
            return Err(IdentityError::Other {
                message: "account is already confirmed".to_string(),
            });
        }
        account.confirmation_code = Some(format!("{:06}", 100_000 + n % 900_000));
        Ok(())
    }

    async fn update_attributes(
        &self,
        principal: &Principal,
        attributes: &[Attribute],
    ) -> Result<(), IdentityError> {
        if !self.validate(principal).await? {
            return Err(IdentityError::InvalidCredentials);
        }
        let mut accounts = self.accounts.write().await;
        let account =
            accounts
                .get_mut(principal.handle())
                .ok_or_else(|| IdentityError::Other {
                    message: format!("no account for '{}'", principal.handle()),
                })?;
        for attribute in attributes {
            match account
                .attributes
                .iter_mut()
                .find(|existing| existing.name == attribute.name)
            {
                Some(existing) => existing.value = attribute.value.clone(),
                None => account.attributes.push(attribute.clone()),
            }
        }
        Ok(())
    }

    async fn sign_out(&self, principal: &Principal) -> Result<(), IdentityError> {
        self.issued_tokens
            .write()
            .await
            .remove(principal.tokens().access_token());

        let mut resumable = self.resumable.write().await;
        if resumable
            .as_ref()
            .is_some_and(|p| p.handle() == principal.handle())
        {
            *resumable = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(s: &str) -> Handle {
        Handle::new(s).expect("valid handle")
    }

    async fn provider_with_account(secret: &str) -> MemoryIdentityProvider {
        let provider = MemoryIdentityProvider::new();
        provider
            .seed_account(AccountFixture::new(handle("ana@x.com"), secret))
            .await;
        provider
    }

    #[tokio::test]
    async fn sign_in_with_correct_secret_issues_tokens() {
        let provider = provider_with_account("right-pw").await;

        let response = provider
            .sign_in(&handle("ana@x.com"), "right-pw")
            .await
            .expect("sign in");

        let SignInResponse::Tokens(tokens) = response else {
            panic!("expected tokens");
        };
        let principal = Principal::new(handle("ana@x.com"), tokens);
        assert!(provider.validate(&principal).await.expect("validate"));
    }

    #[tokio::test]
    async fn sign_in_with_wrong_secret_is_invalid_credentials() {
        let provider = provider_with_account("right-pw").await;

        let err = provider
            .sign_in(&handle("ana@x.com"), "wrong-pw")
            .await
            .expect_err("should reject");
        assert_eq!(err, IdentityError::InvalidCredentials);
    }

    #[tokio::test]
    async fn sign_in_unknown_handle_is_invalid_credentials() {
        let provider = MemoryIdentityProvider::new();
        let err = provider
            .sign_in(&handle("ghost@x.com"), "pw")
            .await
            .expect_err("should reject");
        assert_eq!(err, IdentityError::InvalidCredentials);
    }

    #[tokio::test]
    async fn unconfirmed_account_rejected_as_unconfirmed() {
        let provider = MemoryIdentityProvider::new();
        provider
            .seed_account(AccountFixture::new(handle("new@x.com"), "pw").unconfirmed())
            .await;

        let err = provider
            .sign_in(&handle("new@x.com"), "pw")
            .await
            .expect_err("should reject");
        assert_eq!(err, IdentityError::UnconfirmedAccount);
    }

    #[tokio::test]
    async fn unapproved_account_rejected_as_pending_approval() {
        let provider = MemoryIdentityProvider::new();
        provider
            .seed_account(AccountFixture::new(handle("held@x.com"), "pw").pending_approval())
            .await;

        let err = provider
            .sign_in(&handle("held@x.com"), "pw")
            .await
            .expect_err("should reject");
        assert_eq!(err, IdentityError::PendingApproval);
    }

    #[tokio::test]
    async fn forced_rotation_signals_new_credential_required() {
        let provider = MemoryIdentityProvider::new();
        provider
            .seed_account(AccountFixture::new(handle("temp@x.com"), "pw").requires_new_secret())
            .await;

        let response = provider
            .sign_in(&handle("temp@x.com"), "pw")
            .await
            .expect("call succeeds");
        assert_eq!(response, SignInResponse::NewCredentialRequired);
    }

    #[tokio::test]
    async fn register_confirm_then_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let subject = provider
            .register(
                &handle("new@x.com"),
                "pw",
                &[Attribute::new("email", "new@x.com")],
            )
            .await
            .expect("register");
        assert!(subject.as_str().starts_with("subject-"));

        // Not yet confirmed.
        let err = provider
            .sign_in(&handle("new@x.com"), "pw")
            .await
            .expect_err("unconfirmed");
        assert_eq!(err, IdentityError::UnconfirmedAccount);

        let code = provider
            .confirmation_code(&handle("new@x.com"))
            .await
            .expect("code generated");
        provider
            .confirm_registration(&handle("new@x.com"), &code)
            .await
            .expect("confirm");

        let response = provider
            .sign_in(&handle("new@x.com"), "pw")
            .await
            .expect("sign in after confirm");
        assert!(matches!(response, SignInResponse::Tokens(_)));
    }

    #[tokio::test]
    async fn register_duplicate_handle_fails() {
        let provider = provider_with_account("pw").await;
        let err = provider
            .register(&handle("ana@x.com"), "other-pw", &[])
            .await
            .expect_err("duplicate");
        assert!(matches!(err, IdentityError::Other { .. }));
    }

    #[tokio::test]
    async fn wrong_confirmation_code_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider
            .register(&handle("new@x.com"), "pw", &[])
            .await
            .expect("register");

        let err = provider
            .confirm_registration(&handle("new@x.com"), "000000-wrong")
            .await
            .expect_err("bad code");
        assert!(matches!(err, IdentityError::Other { .. }));
    }

    #[tokio::test]
    async fn resend_replaces_the_code() {
        let provider = MemoryIdentityProvider::new();
        provider
            .register(&handle("new@x.com"), "pw", &[])
            .await
            .expect("register");
        let first = provider
            .confirmation_code(&handle("new@x.com"))
            .await
            .expect("code");

        provider.resend_code(&handle("new@x.com")).await.expect("resend");
        let second = provider
            .confirmation_code(&handle("new@x.com"))
            .await
            .expect("code");

        assert_ne!(first, second);
        provider
            .confirm_registration(&handle("new@x.com"), &second)
            .await
            .expect("new code works");
    }

    #[tokio::test]
    async fn resume_round_trip() {
        let provider = provider_with_account("pw").await;
        let principal = provider
            .make_resumable(&handle("ana@x.com"))
            .await
            .expect("make resumable");

        let resumed = provider
            .resume_session()
            .await
            .expect("resume")
            .expect("principal present");
        assert_eq!(resumed, principal);
        assert!(provider.validate(&resumed).await.expect("validate"));
    }

    #[tokio::test]
    async fn sign_out_revokes_tokens_and_resumability() {
        let provider = provider_with_account("pw").await;
        let principal = provider
            .make_resumable(&handle("ana@x.com"))
            .await
            .expect("make resumable");

        provider.sign_out(&principal).await.expect("sign out");

        assert!(!provider.validate(&principal).await.expect("validate"));
        assert!(provider.resume_session().await.expect("resume").is_none());
    }

    #[tokio::test]
    async fn update_attributes_merges_by_name() {
        let provider = MemoryIdentityProvider::new();
        provider
            .seed_account(
                AccountFixture::new(handle("ana@x.com"), "pw")
                    .with_attribute("email", "ana@x.com"),
            )
            .await;
        let principal = provider
            .make_resumable(&handle("ana@x.com"))
            .await
            .expect("tokens");

        provider
            .update_attributes(
                &principal,
                &[
                    Attribute::new("email", "ana@corp.io"),
                    Attribute::new("phone_number", "+15550100"),
                ],
            )
            .await
            .expect("update");

        assert_eq!(
            provider.attribute(&handle("ana@x.com"), "email").await,
            Some("ana@corp.io".to_string())
        );
        assert_eq!(
            provider.attribute(&handle("ana@x.com"), "phone_number").await,
            Some("+15550100".to_string())
        );
    }

    #[tokio::test]
    async fn update_attributes_with_revoked_tokens_rejected() {
        let provider = provider_with_account("pw").await;
        let principal = provider
            .make_resumable(&handle("ana@x.com"))
            .await
            .expect("tokens");
        provider.sign_out(&principal).await.expect("sign out");

        let err = provider
            .update_attributes(&principal, &[Attribute::new("email", "x@y.z")])
            .await
            .expect_err("revoked");
        assert_eq!(err, IdentityError::InvalidCredentials);
    }
}
