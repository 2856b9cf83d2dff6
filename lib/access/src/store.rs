//! The session store: owner of authentication state and its transitions.
//!
//! One store instance exists per interactive session. It is the single
//! writer of [`SessionState`]; the route guard, role policy, and screens
//! only ever read snapshots. The store talks to two collaborators, both
//! injected at construction: the identity provider (credentials) and the
//! profile directory (authorization metadata).
//!
//! Write discipline for the two collaborators: failures of the primary
//! identity-provider operation always propagate to the caller, while the
//! paired directory write is best-effort in the registration flows
//! (logged, never failing the call) and surfaced without rollback in the
//! profile-edit flow.

use chrono::Utc;
use cloudledger_core::{Handle, SubjectId};
use cloudledger_directory::{NewProfile, ProfileChanges, ProfileDirectory};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{IdentityError, SessionError};
use crate::principal::Principal;
use crate::provider::{Attribute, IdentityProvider, SignInResponse};
use crate::state::SessionState;

/// Outcome of a sign-in call that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignIn {
    /// The principal is signed in and the state reflects it.
    Completed(Principal),
    /// The provider demands a new secret before issuing tokens; route the
    /// user into the credential-reset flow. Session state is unchanged.
    NewCredentialRequired { handle: Handle },
}

/// Outcome of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignUp {
    /// Subject assigned by the identity provider.
    pub subject_id: SubjectId,
}

/// Input to [`SessionStore::sign_up`].
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub handle: Handle,
    pub secret: String,
    pub email: String,
    pub company: Option<String>,
    pub department: Option<String>,
}

/// Owns session state and the operations that mutate it.
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    directory: Arc<dyn ProfileDirectory>,
    state: RwLock<SessionState>,
    /// Bumped on every principal transition. A profile fetch only commits
    /// if the epoch it started under is still current, so a slow fetch
    /// cannot overwrite state owned by a later sign-in or sign-out.
    epoch: AtomicU64,
}

impl SessionStore {
    /// Creates a store in the bootstrapping state.
    ///
    /// Call [`resume_session`](Self::resume_session) once before consulting
    /// the route guard; until then every snapshot reports `loading`.
    #[must_use]
    pub fn new(provider: Arc<dyn IdentityProvider>, directory: Arc<dyn ProfileDirectory>) -> Self {
        Self {
            provider,
            directory,
            state: RwLock::new(SessionState::bootstrapping()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Returns a snapshot of the current state.
    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// Attempts to resume a previously-authenticated session.
    ///
    /// Never fails: provider errors are logged and converge to the
    /// signed-out state. Always ends the bootstrap window (`loading`
    /// becomes false on every path).
    pub async fn resume_session(&self) {
        let resumed = match self.provider.resume_session().await {
            Ok(Some(principal)) => match self.provider.validate(&principal).await {
                Ok(true) => Some(principal),
                Ok(false) => {
                    debug!(
                        handle = %principal.handle(),
                        "persisted credentials are no longer valid"
                    );
                    None
                }
                Err(err) => {
                    warn!(error = %err, "credential validation failed; treating as signed out");
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(error = %err, "session resumption failed; treating as signed out");
                None
            }
        };

        match resumed {
            Some(principal) => {
                let handle = principal.handle().clone();
                {
                    let mut state = self.state.write().await;
                    state.principal = Some(principal);
                    state.profile = None;
                    state.loading = false;
                }
                self.epoch.fetch_add(1, Ordering::AcqRel);
                self.load_profile(&handle).await;
            }
            None => {
                let mut state = self.state.write().await;
                state.principal = None;
                state.profile = None;
                state.loading = false;
            }
        }
    }

    /// Fetches the profile record for `handle` and attaches it to the
    /// state.
    ///
    /// Side effect only. Lookup failure leaves the profile absent and the
    /// principal untouched. The fetched record is discarded if the
    /// principal changed while the fetch was in flight.
    pub async fn load_profile(&self, handle: &Handle) {
        let epoch = self.epoch.load(Ordering::Acquire);
        match self.directory.get(handle).await {
            Ok(Some(record)) => {
                let mut state = self.state.write().await;
                let still_current = self.epoch.load(Ordering::Acquire) == epoch
                    && state
                        .principal
                        .as_ref()
                        .is_some_and(|p| p.handle() == handle);
                if still_current {
                    state.profile = Some(record);
                } else {
                    debug!(%handle, "discarding profile fetch for a superseded session");
                }
            }
            Ok(None) => {
                debug!(%handle, "no profile record; principal carries no role metadata");
            }
            Err(err) => {
                warn!(%handle, error = %err, "profile fetch failed; continuing without profile");
            }
        }
    }

    /// Authenticates a handle/secret pair.
    ///
    /// On success the principal is installed and its profile fetched. A
    /// "new credential required" signal resolves as
    /// [`SignIn::NewCredentialRequired`] without touching state.
    ///
    /// # Errors
    ///
    /// Provider failures are recorded in `last_error` and propagated
    /// unwrapped so the caller can branch on the kind.
    pub async fn sign_in(&self, handle: &Handle, secret: &str) -> Result<SignIn, IdentityError> {
        match self.provider.sign_in(handle, secret).await {
            Ok(SignInResponse::Tokens(tokens)) => {
                let principal = Principal::new(handle.clone(), tokens);
                {
                    let mut state = self.state.write().await;
                    state.principal = Some(principal.clone());
                    state.profile = None;
                    state.loading = false;
                    state.last_error = None;
                }
                self.epoch.fetch_add(1, Ordering::AcqRel);
                self.load_profile(handle).await;
                Ok(SignIn::Completed(principal))
            }
            Ok(SignInResponse::NewCredentialRequired) => Ok(SignIn::NewCredentialRequired {
                handle: handle.clone(),
            }),
            Err(err) => {
                self.record_error(&err).await;
                Err(err)
            }
        }
    }

    /// Registers a new account, then best-effort creates the matching
    /// profile record with status `pending_verification`.
    ///
    /// The identity-provider registration is authoritative: a directory
    /// failure is logged as drift and does not fail the call.
    pub async fn sign_up(&self, request: SignUpRequest) -> Result<SignUp, IdentityError> {
        let mut attributes = vec![Attribute::new("email", request.email.clone())];
        if let Some(company) = &request.company {
            attributes.push(Attribute::new("custom:company", company.clone()));
        }
        if let Some(department) = &request.department {
            attributes.push(Attribute::new("custom:department", department.clone()));
        }

        let subject_id = self
            .provider
            .register(&request.handle, &request.secret, &attributes)
            .await?;

        let new_profile = NewProfile::new(request.handle.clone())
            .with_email(Some(request.email))
            .with_company(request.company)
            .with_department(request.department);
        if let Err(err) = self.directory.create(new_profile).await {
            warn!(
                handle = %request.handle,
                error = %err,
                "profile record creation failed after registration; directory lags identity"
            );
        }

        Ok(SignUp { subject_id })
    }

    /// Submits a confirmation code, then best-effort activates the profile
    /// record.
    ///
    /// # Errors
    ///
    /// Confirmation failure propagates the provider error; the directory
    /// activation failure is logged only.
    pub async fn confirm_registration(
        &self,
        handle: &Handle,
        code: &str,
    ) -> Result<(), IdentityError> {
        self.provider.confirm_registration(handle, code).await?;

        if let Err(err) = self
            .directory
            .update(handle, ProfileChanges::verified(Utc::now()))
            .await
        {
            warn!(
                %handle,
                error = %err,
                "profile activation failed after confirmation; directory lags identity"
            );
        }
        Ok(())
    }

    /// Requests a fresh confirmation code.
    ///
    /// # Errors
    ///
    /// Passes through the provider error.
    pub async fn resend_confirmation_code(&self, handle: &Handle) -> Result<(), IdentityError> {
        self.provider.resend_code(handle).await
    }

    /// Signs out unconditionally.
    ///
    /// Local state is cleared first and always; the provider's credential
    /// invalidation is attempted afterwards and any failure is logged.
    /// Sign-out therefore never fails from the caller's perspective.
    pub async fn sign_out(&self) {
        let principal = {
            let mut state = self.state.write().await;
            let principal = state.principal.take();
            state.profile = None;
            state.last_error = None;
            state.loading = false;
            principal
        };
        self.epoch.fetch_add(1, Ordering::AcqRel);

        if let Some(principal) = principal {
            if let Err(err) = self.provider.sign_out(&principal).await {
                warn!(
                    handle = %principal.handle(),
                    error = %err,
                    "provider sign-out failed; local session is cleared regardless"
                );
            }
        }
    }

    /// Pushes attribute updates for the current principal to the identity
    /// provider, then mirrors the recognized attributes into the profile
    /// directory.
    ///
    /// # Errors
    ///
    /// Fails with [`SessionError::NoCurrentPrincipal`] while signed out.
    /// A provider failure or a directory failure after a successful
    /// provider write is surfaced as-is; the stores are left inconsistent
    /// with no rollback.
    pub async fn update_profile_attributes(
        &self,
        attributes: &[Attribute],
    ) -> Result<(), SessionError> {
        let principal = self
            .state
            .read()
            .await
            .principal
            .clone()
            .ok_or(SessionError::NoCurrentPrincipal)?;

        if let Err(err) = self.provider.update_attributes(&principal, attributes).await {
            self.record_error(&err).await;
            return Err(SessionError::Provider(err));
        }

        let changes = directory_changes(attributes);
        if !changes.is_empty() {
            if let Err(err) = self.directory.update(principal.handle(), changes).await {
                let mut state = self.state.write().await;
                state.last_error = Some(err.to_string());
                return Err(SessionError::DirectoryWrite(err));
            }
        }

        self.load_profile(principal.handle()).await;
        Ok(())
    }

    async fn record_error(&self, err: &IdentityError) {
        let mut state = self.state.write().await;
        state.last_error = Some(err.to_string());
    }
}

/// Maps provider attribute names onto directory fields. Attributes the
/// directory does not track (phone numbers, locale, ...) are provider-only.
fn directory_changes(attributes: &[Attribute]) -> ProfileChanges {
    let mut changes = ProfileChanges::default();
    for attribute in attributes {
        match attribute.name.as_str() {
            "email" => changes.email = Some(attribute.value.clone()),
            "custom:company" => changes.company = Some(attribute.value.clone()),
            "custom:department" => changes.department = Some(attribute.value.clone()),
            _ => {}
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::{self, AccessDecision};
    use crate::memory::{AccountFixture, MemoryIdentityProvider};
    use cloudledger_directory::{DirectoryError, MemoryDirectory, ProfileRecord, ProfileStatus};
    use tokio::sync::Semaphore;

    fn handle(s: &str) -> Handle {
        Handle::new(s).expect("valid handle")
    }

    async fn seeded_provider() -> Arc<MemoryIdentityProvider> {
        let provider = MemoryIdentityProvider::new();
        provider
            .seed_account(AccountFixture::new(handle("ana@x.com"), "right-pw"))
            .await;
        Arc::new(provider)
    }

    async fn seeded_directory(role: &str) -> Arc<MemoryDirectory> {
        let directory = MemoryDirectory::new();
        directory
            .seed(ProfileRecord::pending(
                NewProfile::new(handle("ana@x.com"))
                    .with_email(Some("ana@x.com".to_string()))
                    .with_company(Some("Acme".to_string()))
                    .with_role(Some(role.to_string())),
            ))
            .await;
        Arc::new(directory)
    }

    /// Directory stub whose every operation fails.
    struct UnavailableDirectory;

    #[async_trait::async_trait]
    impl ProfileDirectory for UnavailableDirectory {
        async fn get(&self, _: &Handle) -> Result<Option<ProfileRecord>, DirectoryError> {
            Err(unavailable())
        }
        async fn create(&self, _: NewProfile) -> Result<ProfileRecord, DirectoryError> {
            Err(unavailable())
        }
        async fn update(
            &self,
            _: &Handle,
            _: ProfileChanges,
        ) -> Result<ProfileRecord, DirectoryError> {
            Err(unavailable())
        }
        async fn list_by_role(&self, _: &str) -> Result<Vec<ProfileRecord>, DirectoryError> {
            Err(unavailable())
        }
        async fn list_by_company(&self, _: &str) -> Result<Vec<ProfileRecord>, DirectoryError> {
            Err(unavailable())
        }
        async fn delete(&self, _: &Handle) -> Result<(), DirectoryError> {
            Err(unavailable())
        }
    }

    fn unavailable() -> DirectoryError {
        DirectoryError::Unavailable {
            reason: "injected failure".to_string(),
        }
    }

    /// Directory wrapper that holds `get` until a permit is released.
    struct GatedDirectory {
        inner: Arc<MemoryDirectory>,
        gate: Semaphore,
    }

    #[async_trait::async_trait]
    impl ProfileDirectory for GatedDirectory {
        async fn get(&self, h: &Handle) -> Result<Option<ProfileRecord>, DirectoryError> {
            let _permit = self.gate.acquire().await.expect("gate open");
            self.inner.get(h).await
        }
        async fn create(&self, new: NewProfile) -> Result<ProfileRecord, DirectoryError> {
            self.inner.create(new).await
        }
        async fn update(
            &self,
            h: &Handle,
            changes: ProfileChanges,
        ) -> Result<ProfileRecord, DirectoryError> {
            self.inner.update(h, changes).await
        }
        async fn list_by_role(&self, role: &str) -> Result<Vec<ProfileRecord>, DirectoryError> {
            self.inner.list_by_role(role).await
        }
        async fn list_by_company(
            &self,
            company: &str,
        ) -> Result<Vec<ProfileRecord>, DirectoryError> {
            self.inner.list_by_company(company).await
        }
        async fn delete(&self, h: &Handle) -> Result<(), DirectoryError> {
            self.inner.delete(h).await
        }
    }

    /// Provider wrapper whose sign-out always fails.
    struct RefusingSignOutProvider {
        inner: Arc<MemoryIdentityProvider>,
    }

    #[async_trait::async_trait]
    impl IdentityProvider for RefusingSignOutProvider {
        async fn resume_session(&self) -> Result<Option<Principal>, IdentityError> {
            self.inner.resume_session().await
        }
        async fn validate(&self, principal: &Principal) -> Result<bool, IdentityError> {
            self.inner.validate(principal).await
        }
        async fn sign_in(
            &self,
            h: &Handle,
            secret: &str,
        ) -> Result<SignInResponse, IdentityError> {
            self.inner.sign_in(h, secret).await
        }
        async fn register(
            &self,
            h: &Handle,
            secret: &str,
            attributes: &[Attribute],
        ) -> Result<SubjectId, IdentityError> {
            self.inner.register(h, secret, attributes).await
        }
        async fn confirm_registration(&self, h: &Handle, code: &str) -> Result<(), IdentityError> {
            self.inner.confirm_registration(h, code).await
        }
        async fn resend_code(&self, h: &Handle) -> Result<(), IdentityError> {
            self.inner.resend_code(h).await
        }
        async fn update_attributes(
            &self,
            principal: &Principal,
            attributes: &[Attribute],
        ) -> Result<(), IdentityError> {
            self.inner.update_attributes(principal, attributes).await
        }
        async fn sign_out(&self, _: &Principal) -> Result<(), IdentityError> {
            Err(IdentityError::ProviderUnavailable {
                reason: "injected failure".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn resume_with_nothing_persisted_lands_signed_out() {
        let store = SessionStore::new(seeded_provider().await, seeded_directory("admin").await);

        store.resume_session().await;

        let state = store.state().await;
        assert!(!state.loading());
        assert!(state.principal().is_none());
        assert!(state.profile().is_none());
        assert!(state.last_error().is_none());
    }

    #[tokio::test]
    async fn resume_restores_principal_and_profile() {
        let provider = seeded_provider().await;
        provider
            .make_resumable(&handle("ana@x.com"))
            .await
            .expect("resumable");
        let store = SessionStore::new(provider, seeded_directory("admin").await);

        store.resume_session().await;

        let state = store.state().await;
        assert!(!state.loading());
        assert_eq!(
            state.principal().expect("signed in").handle(),
            &handle("ana@x.com")
        );
        assert_eq!(state.profile().expect("profile").role(), Some("admin"));
    }

    #[tokio::test]
    async fn resume_is_idempotent() {
        let provider = seeded_provider().await;
        provider
            .make_resumable(&handle("ana@x.com"))
            .await
            .expect("resumable");
        let store = SessionStore::new(provider, seeded_directory("admin").await);

        store.resume_session().await;
        let first = store.state().await;
        store.resume_session().await;
        let second = store.state().await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn resume_swallows_provider_errors() {
        struct BrokenResume;

        #[async_trait::async_trait]
        impl IdentityProvider for BrokenResume {
            async fn resume_session(&self) -> Result<Option<Principal>, IdentityError> {
                Err(IdentityError::ProviderUnavailable {
                    reason: "boot outage".to_string(),
                })
            }
            async fn validate(&self, _: &Principal) -> Result<bool, IdentityError> {
                Ok(false)
            }
            async fn sign_in(
                &self,
                _: &Handle,
                _: &str,
            ) -> Result<SignInResponse, IdentityError> {
                Err(IdentityError::InvalidCredentials)
            }
            async fn register(
                &self,
                _: &Handle,
                _: &str,
                _: &[Attribute],
            ) -> Result<SubjectId, IdentityError> {
                Err(IdentityError::InvalidCredentials)
            }
            async fn confirm_registration(&self, _: &Handle, _: &str) -> Result<(), IdentityError> {
                Ok(())
            }
            async fn resend_code(&self, _: &Handle) -> Result<(), IdentityError> {
                Ok(())
            }
            async fn update_attributes(
                &self,
                _: &Principal,
                _: &[Attribute],
            ) -> Result<(), IdentityError> {
                Ok(())
            }
            async fn sign_out(&self, _: &Principal) -> Result<(), IdentityError> {
                Ok(())
            }
        }

        let store = SessionStore::new(Arc::new(BrokenResume), Arc::new(MemoryDirectory::new()));
        store.resume_session().await;

        let state = store.state().await;
        assert!(!state.loading());
        assert!(state.principal().is_none());
        assert!(state.last_error().is_none());
    }

    #[tokio::test]
    async fn sign_in_success_loads_profile_and_grants_roles() {
        let store = SessionStore::new(seeded_provider().await, seeded_directory("Admin").await);
        store.resume_session().await;

        let outcome = store
            .sign_in(&handle("ana@x.com"), "right-pw")
            .await
            .expect("sign in");
        assert!(matches!(outcome, SignIn::Completed(_)));

        let state = store.state().await;
        assert_eq!(state.profile().expect("profile").role(), Some("Admin"));
        assert!(state.policy().has_role("admin"));
        assert!(state.policy().is_privileged_operator());
        assert_eq!(guard::decide(&state, "/dashboard"), AccessDecision::Render);
    }

    #[tokio::test]
    async fn sign_in_wrong_secret_rejects_and_leaves_state_signed_out() {
        let store = SessionStore::new(seeded_provider().await, seeded_directory("admin").await);
        store.resume_session().await;

        let err = store
            .sign_in(&handle("ana@x.com"), "wrong-pw")
            .await
            .expect_err("should reject");
        assert_eq!(err, IdentityError::InvalidCredentials);

        let state = store.state().await;
        assert!(state.principal().is_none());
        assert!(state.profile().is_none());
        assert_eq!(state.last_error(), Some("invalid credentials"));
    }

    #[tokio::test]
    async fn sign_in_new_credential_required_is_not_an_error() {
        let provider = MemoryIdentityProvider::new();
        provider
            .seed_account(AccountFixture::new(handle("temp@x.com"), "pw").requires_new_secret())
            .await;
        let store = SessionStore::new(Arc::new(provider), Arc::new(MemoryDirectory::new()));
        store.resume_session().await;

        let outcome = store
            .sign_in(&handle("temp@x.com"), "pw")
            .await
            .expect("resolves");
        assert_eq!(
            outcome,
            SignIn::NewCredentialRequired {
                handle: handle("temp@x.com")
            }
        );

        let state = store.state().await;
        assert!(state.principal().is_none());
        assert!(state.last_error().is_none());
    }

    #[tokio::test]
    async fn missing_profile_is_not_missing_authentication() {
        let store = SessionStore::new(seeded_provider().await, Arc::new(MemoryDirectory::new()));
        store.resume_session().await;

        store
            .sign_in(&handle("ana@x.com"), "right-pw")
            .await
            .expect("sign in");

        let state = store.state().await;
        assert!(state.principal().is_some());
        assert!(state.profile().is_none());
        assert!(!state.policy().can_manage_clients());
        assert_eq!(guard::decide(&state, "/clients"), AccessDecision::Render);
    }

    #[tokio::test]
    async fn sign_up_survives_directory_failure() {
        let store = SessionStore::new(seeded_provider().await, Arc::new(UnavailableDirectory));

        let outcome = store
            .sign_up(SignUpRequest {
                handle: handle("new@x.com"),
                secret: "pw".to_string(),
                email: "new@x.com".to_string(),
                company: Some("Acme".to_string()),
                department: None,
            })
            .await
            .expect("sign up succeeds despite directory failure");
        assert!(outcome.subject_id.as_str().starts_with("subject-"));
    }

    #[tokio::test]
    async fn sign_up_creates_pending_profile() {
        let directory = Arc::new(MemoryDirectory::new());
        let store = SessionStore::new(seeded_provider().await, directory.clone());

        store
            .sign_up(SignUpRequest {
                handle: handle("new@x.com"),
                secret: "pw".to_string(),
                email: "new@x.com".to_string(),
                company: Some("Acme".to_string()),
                department: Some("FinOps".to_string()),
            })
            .await
            .expect("sign up");

        let record = directory
            .get(&handle("new@x.com"))
            .await
            .expect("get")
            .expect("record created");
        assert_eq!(record.status(), ProfileStatus::PendingVerification);
        assert_eq!(record.email(), Some("new@x.com"));
        assert_eq!(record.company(), Some("Acme"));
        assert_eq!(record.department(), Some("FinOps"));
    }

    #[tokio::test]
    async fn confirm_activates_profile() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        let directory = Arc::new(MemoryDirectory::new());
        let store = SessionStore::new(provider.clone(), directory.clone());

        store
            .sign_up(SignUpRequest {
                handle: handle("new@x.com"),
                secret: "pw".to_string(),
                email: "new@x.com".to_string(),
                company: None,
                department: None,
            })
            .await
            .expect("sign up");

        let code = provider
            .confirmation_code(&handle("new@x.com"))
            .await
            .expect("code");
        store
            .confirm_registration(&handle("new@x.com"), &code)
            .await
            .expect("confirm");

        let record = directory
            .get(&handle("new@x.com"))
            .await
            .expect("get")
            .expect("record");
        assert_eq!(record.status(), ProfileStatus::Active);
        assert!(record.verified_at().is_some());
    }

    #[tokio::test]
    async fn confirm_survives_directory_failure() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider
            .register(&handle("new@x.com"), "pw", &[])
            .await
            .expect("register");
        let code = provider
            .confirmation_code(&handle("new@x.com"))
            .await
            .expect("code");

        let store = SessionStore::new(provider, Arc::new(UnavailableDirectory));
        store
            .confirm_registration(&handle("new@x.com"), &code)
            .await
            .expect("confirm succeeds despite directory failure");
    }

    #[tokio::test]
    async fn confirm_with_bad_code_propagates_provider_error() {
        let provider = Arc::new(MemoryIdentityProvider::new());
        provider
            .register(&handle("new@x.com"), "pw", &[])
            .await
            .expect("register");

        let store = SessionStore::new(provider, Arc::new(MemoryDirectory::new()));
        let err = store
            .confirm_registration(&handle("new@x.com"), "wrong")
            .await
            .expect_err("bad code");
        assert!(matches!(err, IdentityError::Other { .. }));
    }

    #[tokio::test]
    async fn sign_out_resets_state_exactly() {
        let store = SessionStore::new(seeded_provider().await, seeded_directory("admin").await);
        store.resume_session().await;
        store
            .sign_in(&handle("ana@x.com"), "right-pw")
            .await
            .expect("sign in");

        store.sign_out().await;

        let state = store.state().await;
        assert!(state.principal().is_none());
        assert!(state.profile().is_none());
        assert!(!state.loading());
        assert!(state.last_error().is_none());
    }

    #[tokio::test]
    async fn sign_out_is_effective_even_when_provider_fails() {
        let inner = seeded_provider().await;
        let store = SessionStore::new(
            Arc::new(RefusingSignOutProvider { inner }),
            seeded_directory("admin").await,
        );
        store.resume_session().await;
        store
            .sign_in(&handle("ana@x.com"), "right-pw")
            .await
            .expect("sign in");

        store.sign_out().await;

        let state = store.state().await;
        assert!(state.principal().is_none());
        assert!(state.profile().is_none());
        assert!(!state.loading());
        assert!(state.last_error().is_none());
    }

    #[tokio::test]
    async fn update_profile_attributes_requires_principal() {
        let store = SessionStore::new(seeded_provider().await, seeded_directory("admin").await);
        store.resume_session().await;

        let err = store
            .update_profile_attributes(&[Attribute::new("email", "ana@corp.io")])
            .await
            .expect_err("signed out");
        assert_eq!(err, SessionError::NoCurrentPrincipal);
    }

    #[tokio::test]
    async fn update_profile_attributes_writes_both_stores() {
        let provider = seeded_provider().await;
        let directory = seeded_directory("admin").await;
        let store = SessionStore::new(provider.clone(), directory.clone());
        store.resume_session().await;
        store
            .sign_in(&handle("ana@x.com"), "right-pw")
            .await
            .expect("sign in");

        store
            .update_profile_attributes(&[
                Attribute::new("email", "ana@corp.io"),
                Attribute::new("phone_number", "+15550100"),
            ])
            .await
            .expect("update");

        assert_eq!(
            provider.attribute(&handle("ana@x.com"), "email").await,
            Some("ana@corp.io".to_string())
        );
        let record = directory
            .get(&handle("ana@x.com"))
            .await
            .expect("get")
            .expect("record");
        assert_eq!(record.email(), Some("ana@corp.io"));

        // The refreshed profile is visible in the snapshot.
        let state = store.state().await;
        assert_eq!(state.profile().expect("profile").email(), Some("ana@corp.io"));
    }

    #[tokio::test]
    async fn update_profile_attributes_surfaces_directory_failure() {
        let provider = seeded_provider().await;
        let store = SessionStore::new(provider.clone(), Arc::new(UnavailableDirectory));
        store.resume_session().await;
        store
            .sign_in(&handle("ana@x.com"), "right-pw")
            .await
            .expect("sign in");

        let err = store
            .update_profile_attributes(&[Attribute::new("email", "ana@corp.io")])
            .await
            .expect_err("directory is down");
        assert!(matches!(err, SessionError::DirectoryWrite(_)));

        // The provider write went through; the stores are now inconsistent
        // and nothing rolls back.
        assert_eq!(
            provider.attribute(&handle("ana@x.com"), "email").await,
            Some("ana@corp.io".to_string())
        );
        let state = store.state().await;
        assert!(state.last_error().is_some());
    }

    #[tokio::test]
    async fn stale_profile_fetch_cannot_overwrite_sign_out() {
        let provider = seeded_provider().await;
        let gated = Arc::new(GatedDirectory {
            inner: {
                let directory = MemoryDirectory::new();
                directory
                    .seed(ProfileRecord::pending(
                        NewProfile::new(handle("ana@x.com"))
                            .with_role(Some("admin".to_string())),
                    ))
                    .await;
                Arc::new(directory)
            },
            gate: Semaphore::new(0),
        });
        let store = Arc::new(SessionStore::new(provider, gated.clone()));
        store.resume_session().await;

        // Sign in on a separate task; its profile fetch blocks on the gate.
        let sign_in = tokio::spawn({
            let store = store.clone();
            async move { store.sign_in(&handle("ana@x.com"), "right-pw").await }
        });

        // Wait until the principal is installed (fetch now pending).
        loop {
            if store.state().await.principal().is_some() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        store.sign_out().await;

        // Release the fetch; its result must be discarded.
        gated.gate.add_permits(1);
        sign_in
            .await
            .expect("task completes")
            .expect("sign in itself succeeded");

        let state = store.state().await;
        assert!(state.principal().is_none());
        assert!(state.profile().is_none());
    }
}
