use std::sync::Arc;

use crate::config::LookupConfig;
use crate::contact::UserContact;
use crate::errors::{LookupError, Result};
use crate::policy::{self, Selection};
use crate::provider::{AuthorizationStatus, ContactsProvider};

/// Answers `getUserContact` against one contacts provider.
///
/// Holds no per-call state; concurrent lookups are independent.
pub struct ContactLookupService {
    provider: Arc<dyn ContactsProvider>,
    config: LookupConfig,
}

impl ContactLookupService {
    pub fn new(provider: Arc<dyn ContactsProvider>, config: LookupConfig) -> Self {
        ContactLookupService { provider, config }
    }

    /// Finds the user's contact, by `email` when one is given.
    ///
    /// `Ok(None)` means access was granted and nothing matched.
    pub async fn get_user_contact(
        &self,
        email: Option<&str>,
    ) -> Result<Option<UserContact>> {
        self.authorize().await?;

        let selection =
            match Selection::for_request(email, &self.config.selection) {
                Some(selection) => selection,
                None => {
                    log::debug!("No email and no fallback, skipping scan");
                    return Ok(None);
                }
            };

        let found = self.scan(selection).await?;
        log::info!(
            "Contact lookup finished: {}",
            if found.is_some() { "match" } else { "no match" }
        );
        Ok(found)
    }

    async fn authorize(&self) -> Result<()> {
        match self.provider.authorization_status() {
            AuthorizationStatus::Authorized | AuthorizationStatus::Limited => {
                Ok(())
            }
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                Err(LookupError::PermissionDenied { details: None })
            }
            AuthorizationStatus::NotDetermined => {
                log::debug!("Contacts authorization undetermined, requesting");
                let decision =
                    self.provider.request_access().await.map_err(|e| {
                        log::warn!("Contacts access request failed: {}", e);
                        LookupError::PermissionError(e.to_string())
                    })?;
                if decision.granted {
                    Ok(())
                } else {
                    Err(LookupError::PermissionDenied {
                        details: decision.error,
                    })
                }
            }
            AuthorizationStatus::Unknown(raw) => {
                log::warn!("Unrecognized contacts authorization status {}", raw);
                Err(LookupError::UnknownAuthorizationStatus(raw))
            }
        }
    }

    /// Runs the blocking scan off the async executor.
    ///
    /// On timeout the scan keeps running on the blocking pool until it ends;
    /// only its result is discarded.
    async fn scan(&self, selection: Selection) -> Result<Option<UserContact>> {
        let provider = self.provider.clone();
        let task = tokio::task::spawn_blocking(move || {
            policy::select(provider.as_ref(), &selection)
        });

        let joined = match self.config.scan.timeout() {
            Some(limit) => tokio::time::timeout(limit, task).await.map_err(
                |_| {
                    LookupError::EnumerationError(format!(
                        "Scan did not finish within {} ms",
                        limit.as_millis()
                    ))
                },
            )?,
            None => task.await,
        };

        match joined {
            Ok(Ok(found)) => Ok(found),
            Ok(Err(e)) => {
                log::warn!("Contact enumeration failed: {}", e);
                Err(LookupError::EnumerationError(e.to_string()))
            }
            Err(e) if e.is_panic() => {
                log::warn!("Contact store panicked during enumeration");
                Err(LookupError::EnumerationError(
                    "Contact store panicked during enumeration".to_owned(),
                ))
            }
            Err(e) => Err(LookupError::EnumerationError(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use rstest::rstest;

    use super::*;
    use crate::config::ScanConfig;
    use crate::contact::Contact;
    use crate::provider::{
        AccessDecision, EnumerationFault, FetchRequest, MemoryProvider,
        ProviderError, Visitor,
    };

    const PHOTO: &[u8] = b"\x89PNG\r\n\x1a\n";

    fn contacts() -> Vec<Contact> {
        vec![
            Contact::organization("ACME").with_image(PHOTO),
            Contact::person("Ada", "Lovelace")
                .with_email("ADA@X.com ")
                .with_image(PHOTO),
        ]
    }

    fn service(provider: MemoryProvider) -> (ContactLookupService, Arc<MemoryProvider>) {
        let provider = Arc::new(provider);
        let service =
            ContactLookupService::new(provider.clone(), LookupConfig::default());
        (service, provider)
    }

    #[rstest]
    #[case(AuthorizationStatus::Denied, None)]
    #[case(AuthorizationStatus::Denied, Some("ada@x.com"))]
    #[case(AuthorizationStatus::Restricted, Some(""))]
    #[case(AuthorizationStatus::Restricted, Some("not an email"))]
    #[tokio::test]
    async fn denied_regardless_of_email(
        #[case] status: AuthorizationStatus,
        #[case] email: Option<&str>,
    ) {
        let (service, provider) =
            service(MemoryProvider::new(contacts()).with_status(status));
        let result = service.get_user_contact(email).await;
        assert_eq!(result, Err(LookupError::PermissionDenied { details: None }));
        assert_eq!(provider.enumerations(), 0);
    }

    #[tokio::test]
    async fn prompts_when_undetermined_then_scans() {
        let (service, provider) = service(
            MemoryProvider::new(contacts())
                .with_status(AuthorizationStatus::NotDetermined),
        );
        let found = service.get_user_contact(Some("ada@x.com")).await.unwrap();
        assert_eq!(found.map(|c| c.name), Some("Ada Lovelace".to_owned()));
        assert_eq!(provider.prompts(), 1);

        service.get_user_contact(None).await.unwrap();
        assert_eq!(provider.prompts(), 1);
    }

    #[tokio::test]
    async fn prompt_refusal_carries_platform_description() {
        let (service, _) = service(
            MemoryProvider::new(contacts())
                .with_status(AuthorizationStatus::NotDetermined)
                .answering_prompt(Ok(AccessDecision::denied(Some(
                    "Access Denied",
                )))),
        );
        let result = service.get_user_contact(None).await;
        assert_eq!(
            result,
            Err(LookupError::PermissionDenied {
                details: Some("Access Denied".to_owned())
            })
        );
    }

    #[tokio::test]
    async fn failed_request_is_permission_error() {
        let (service, _) = service(
            MemoryProvider::new(contacts())
                .with_status(AuthorizationStatus::NotDetermined)
                .answering_prompt(Err("XPC connection lost".to_owned())),
        );
        match service.get_user_contact(None).await {
            Err(LookupError::PermissionError(description)) => {
                assert!(description.contains("XPC connection lost"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unknown_status_is_reported() {
        let (service, provider) = service(
            MemoryProvider::new(contacts())
                .with_status(AuthorizationStatus::Unknown(7)),
        );
        let result = service.get_user_contact(None).await;
        assert_eq!(result, Err(LookupError::UnknownAuthorizationStatus(7)));
        assert_eq!(provider.enumerations(), 0);
    }

    #[tokio::test]
    async fn limited_access_still_scans() {
        let (service, _) = service(
            MemoryProvider::new(contacts())
                .with_status(AuthorizationStatus::Limited),
        );
        let found = service.get_user_contact(None).await.unwrap();
        assert_eq!(found.map(|c| c.name), Some("Ada Lovelace".to_owned()));
    }

    #[tokio::test]
    async fn me_card_is_stable_across_calls() {
        let (service, _) = service(MemoryProvider::new(contacts()));
        let first = service.get_user_contact(None).await.unwrap();
        let second = service.get_user_contact(None).await.unwrap();
        assert!(first.is_some());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn no_fallback_means_not_found_without_scan() {
        let provider = Arc::new(MemoryProvider::new(contacts()));
        let mut config = LookupConfig::default();
        config.selection.fallback_to_me_card = false;
        let service = ContactLookupService::new(provider.clone(), config);

        assert_eq!(service.get_user_contact(None).await, Ok(None));
        assert_eq!(provider.enumerations(), 0);
    }

    #[tokio::test]
    async fn enumeration_failure_is_reported() {
        let (service, _) = service(
            MemoryProvider::new(contacts()).with_fault(
                EnumerationFault::ErrorAfter(1, "store unavailable".into()),
            ),
        );
        match service.get_user_contact(Some("ada@x.com")).await {
            Err(LookupError::EnumerationError(description)) => {
                assert!(description.contains("store unavailable"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn provider_panic_is_contained() {
        let (service, _) = service(
            MemoryProvider::new(contacts())
                .with_fault(EnumerationFault::PanicAfter(0)),
        );
        let result = service.get_user_contact(None).await;
        assert!(matches!(result, Err(LookupError::EnumerationError(_))));
    }

    struct StalledProvider(Duration);

    #[async_trait]
    impl ContactsProvider for StalledProvider {
        fn authorization_status(&self) -> AuthorizationStatus {
            AuthorizationStatus::Authorized
        }

        async fn request_access(&self) -> std::result::Result<AccessDecision, ProviderError> {
            Ok(AccessDecision::granted())
        }

        fn enumerate(
            &self,
            _request: &FetchRequest,
            _visit: &mut Visitor<'_>,
        ) -> std::result::Result<(), ProviderError> {
            std::thread::sleep(self.0);
            Ok(())
        }
    }

    #[tokio::test]
    async fn slow_scan_times_out() {
        let provider = Arc::new(StalledProvider(Duration::from_millis(300)));
        let config = LookupConfig {
            scan: ScanConfig {
                timeout_ms: Some(20),
            },
            ..LookupConfig::default()
        };
        let service = ContactLookupService::new(provider, config);
        match service.get_user_contact(Some("ada@x.com")).await {
            Err(LookupError::EnumerationError(description)) => {
                assert!(description.contains("20 ms"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn scan_within_timeout_replies() {
        let provider = Arc::new(MemoryProvider::new(contacts()));
        let config = LookupConfig {
            scan: ScanConfig {
                timeout_ms: Some(60_000),
            },
            ..LookupConfig::default()
        };
        let service = ContactLookupService::new(provider, config);
        let found = service.get_user_contact(None).await.unwrap();
        assert!(found.is_some());
    }
}
