//! Which record counts as "the user's contact".
//!
//! Two modes exist. When the host passes an email address, the first record
//! carrying that address wins. Without one, the lookup falls back to the
//! "me card" heuristic: the first person (not organization) with a photo.
//! The heuristic is a guess. No platform API reliably names the device
//! owner's own card, so callers should treat that result as a suggestion.

use std::ops::ControlFlow;

use crate::config::SelectionConfig;
use crate::contact::{ContactKey, ContactKind, ContactRecord, FieldError, UserContact};
use crate::provider::{ContactsProvider, FetchRequest, ProviderError};

/// Trims surrounding whitespace and lowercases.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Match on a normalized email address.
    Email { query: String },
    /// First person-type record with a non-empty photo.
    MeCard { require_person: bool },
}

impl Selection {
    /// Picks the mode for one lookup, or `None` when no scan should happen.
    ///
    /// A blank or whitespace-only email is no filter at all.
    pub fn for_request(
        email: Option<&str>,
        config: &SelectionConfig,
    ) -> Option<Selection> {
        let query = email.map(normalize_email).filter(|q| !q.is_empty());
        match query {
            Some(query) => Some(Selection::Email { query }),
            None if config.fallback_to_me_card => Some(Selection::MeCard {
                require_person: config.require_person_kind,
            }),
            None => None,
        }
    }

    pub fn fetch_request(&self) -> FetchRequest {
        let mut keys = vec![
            ContactKey::GivenName,
            ContactKey::FamilyName,
            ContactKey::ImageData,
        ];
        match self {
            Selection::Email { .. } => keys.push(ContactKey::EmailAddresses),
            Selection::MeCard {
                require_person: true,
            } => keys.push(ContactKey::ContactType),
            Selection::MeCard {
                require_person: false,
            } => {}
        }
        FetchRequest { keys }
    }

    pub fn matches(
        &self,
        record: &dyn ContactRecord,
    ) -> Result<bool, FieldError> {
        match self {
            Selection::Email { query } => Ok(record
                .email_addresses()?
                .iter()
                .any(|email| normalize_email(email) == *query)),
            Selection::MeCard { require_person } => {
                if *require_person && record.kind()? != ContactKind::Person {
                    return Ok(false);
                }
                Ok(record.image_data()?.is_some_and(|data| !data.is_empty()))
            }
        }
    }

    /// Builds the reply for a matching record.
    ///
    /// The photo only decides a me-card match, so in email mode an unreadable
    /// photo leaves the image empty rather than losing the match.
    pub fn project(
        &self,
        record: &dyn ContactRecord,
    ) -> Result<UserContact, FieldError> {
        match self {
            Selection::Email { .. } => UserContact::from_record_lossy_image(record),
            Selection::MeCard { .. } => UserContact::from_record(record),
        }
    }
}

/// Scans `provider` and projects the first matching record.
///
/// Records whose properties cannot be read are skipped; only a failure of the
/// enumeration itself is an error.
pub fn select(
    provider: &dyn ContactsProvider,
    selection: &Selection,
) -> Result<Option<UserContact>, ProviderError> {
    let request = selection.fetch_request();
    let mut found = None;
    let mut scanned = 0usize;

    provider.enumerate(&request, &mut |record: &dyn ContactRecord| {
        scanned += 1;
        let matched = selection
            .matches(record)
            .and_then(|hit| hit.then(|| selection.project(record)).transpose());
        match matched {
            Ok(Some(contact)) => {
                found = Some(contact);
                ControlFlow::Break(())
            }
            Ok(None) => ControlFlow::Continue(()),
            Err(e) => {
                log::warn!("Skipping contact #{}: {}", scanned, e);
                ControlFlow::Continue(())
            }
        }
    })?;

    log::debug!(
        "Scanned {} contacts, match {}",
        scanned,
        if found.is_some() { "found" } else { "not found" }
    );
    Ok(found)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::contact::Contact;
    use crate::provider::MemoryProvider;

    const PHOTO: &[u8] = b"\x89PNG....";

    fn email(query: &str) -> Selection {
        Selection::Email {
            query: normalize_email(query),
        }
    }

    fn me_card() -> Selection {
        Selection::MeCard {
            require_person: true,
        }
    }

    #[rstest]
    #[case("ada@x.com", "ada@x.com")]
    #[case("  Ada@X.com\n", "ada@x.com")]
    #[case("ADA@X.COM ", "ada@x.com")]
    #[case("   ", "")]
    fn normalizes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_email(raw), expected);
    }

    #[rstest]
    #[case(None, true, Some(me_card()))]
    #[case(Some(""), true, Some(me_card()))]
    #[case(Some("  \t"), true, Some(me_card()))]
    #[case(Some(" A@B.c "), true, Some(email("a@b.c")))]
    #[case(None, false, None)]
    #[case(Some("a@b.c"), false, Some(email("a@b.c")))]
    fn picks_mode(
        #[case] query: Option<&str>,
        #[case] fallback: bool,
        #[case] expected: Option<Selection>,
    ) {
        let config = SelectionConfig {
            fallback_to_me_card: fallback,
            ..SelectionConfig::default()
        };
        assert_eq!(Selection::for_request(query, &config), expected);
    }

    #[test]
    fn email_mode_fetches_addresses_but_not_type() {
        let request = email("a@b.c").fetch_request();
        assert!(request.contains(ContactKey::EmailAddresses));
        assert!(!request.contains(ContactKey::ContactType));

        let request = me_card().fetch_request();
        assert!(request.contains(ContactKey::ContactType));
        assert!(!request.contains(ContactKey::EmailAddresses));
    }

    #[test]
    fn email_match_ignores_case_and_whitespace() {
        let provider = MemoryProvider::new(vec![
            Contact::person("Grace", "Hopper").with_email("grace@navy.mil"),
            Contact::person("Ada", "Lovelace")
                .with_email("ada@work.org")
                .with_email("ADA@X.com ")
                .with_image(PHOTO),
        ]);
        let found = select(&provider, &email("ada@x.com")).unwrap().unwrap();
        assert_eq!(found.name, "Ada Lovelace");
        assert_eq!(found.decode_image().unwrap(), PHOTO);
    }

    #[test]
    fn email_match_allows_missing_photo() {
        let provider = MemoryProvider::new(vec![
            Contact::person("Ada", "Lovelace").with_email("ada@x.com")
        ]);
        let found = select(&provider, &email("ada@x.com")).unwrap().unwrap();
        assert_eq!(found.image_base64, "");
    }

    #[test]
    fn email_match_survives_unreadable_photo() {
        let provider = MemoryProvider::new(vec![Contact::person("Ada", "L")
            .with_email("ada@x.com")
            .with_image(PHOTO)
            .with_unreadable(ContactKey::ImageData)]);
        let found = select(&provider, &email("ada@x.com")).unwrap();
        assert_eq!(
            found,
            Some(UserContact {
                name: "Ada L".to_owned(),
                image_base64: String::new(),
            })
        );
    }

    #[test]
    fn me_card_skips_unreadable_photo() {
        let provider = MemoryProvider::new(vec![
            Contact::person("Broken", "")
                .with_image(PHOTO)
                .with_unreadable(ContactKey::ImageData),
            Contact::person("Ada", "Lovelace").with_image(PHOTO),
        ]);
        let found = select(&provider, &me_card()).unwrap().unwrap();
        assert_eq!(found.name, "Ada Lovelace");
    }

    #[test]
    fn email_match_stops_at_first_hit() {
        let provider = MemoryProvider::new(vec![
            Contact::person("First", "").with_email("dup@x.com"),
            Contact::person("Second", "").with_email("dup@x.com"),
            Contact::person("Third", ""),
        ]);
        let found = select(&provider, &email("dup@x.com")).unwrap().unwrap();
        assert_eq!(found.name, "First ");
        assert_eq!(provider.visited(), 1);
    }

    #[test]
    fn me_card_skips_organizations_and_photoless_people() {
        let provider = MemoryProvider::new(vec![
            Contact::organization("ACME").with_image(PHOTO),
            Contact::person("No", "Photo"),
            Contact::person("Empty", "Photo").with_image(b""),
            Contact::person("Ada", "Lovelace").with_image(PHOTO),
            Contact::person("Later", "Person").with_image(PHOTO),
        ]);
        let found = select(&provider, &me_card()).unwrap().unwrap();
        assert_eq!(found.name, "Ada Lovelace");
        assert_eq!(provider.visited(), 4);
    }

    #[test]
    fn me_card_without_person_filter_accepts_organizations() {
        let provider = MemoryProvider::new(vec![
            Contact::organization("ACME").with_image(PHOTO),
        ]);
        let selection = Selection::MeCard {
            require_person: false,
        };
        let found = select(&provider, &selection).unwrap().unwrap();
        assert_eq!(found.name, "ACME ");
    }

    #[test]
    fn unreadable_record_is_skipped() {
        let provider = MemoryProvider::new(vec![
            Contact::person("Broken", "")
                .with_image(PHOTO)
                .with_unreadable(ContactKey::ContactType),
            Contact::person("Ada", "Lovelace").with_image(PHOTO),
        ]);
        let found = select(&provider, &me_card()).unwrap().unwrap();
        assert_eq!(found.name, "Ada Lovelace");
    }

    #[test]
    fn nothing_matches() {
        let provider = MemoryProvider::new(vec![
            Contact::person("No", "Photo"),
            Contact::organization("ACME").with_image(PHOTO),
        ]);
        assert_eq!(select(&provider, &me_card()).unwrap(), None);
        assert_eq!(select(&provider, &email("nobody@x.com")).unwrap(), None);
    }
}
