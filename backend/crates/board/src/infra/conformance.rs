//! Repository conformance suite
//!
//! Behaviour every backend must share. Each backend's tests call these
//! with a fresh, empty repository.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use kernel::id::{QuoteId, SessionId, UserId};

use crate::domain::entity::{quote::Quote, user::User, user_session::UserSession};
use crate::domain::repository::{QuoteRepository, UserRepository, UserSessionRepository};
use crate::error::StorageError;

/// A timestamp with sub-second precision, to catch truncation
fn created() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 9, 17, 41, 12)
        .single()
        .unwrap_or_default()
        + TimeDelta::nanoseconds(123_456_789)
}

fn quote(id: &str, text: &str) -> Quote {
    Quote {
        id: id.into(),
        submitter_id: "accounts.example.com/abc123".into(),
        quotee: "Krystian".to_string(),
        context: "on moving day".to_string(),
        text: text.to_string(),
        created: created(),
    }
}

fn user(id: &str, name: &str) -> User {
    User {
        id: id.into(),
        name: name.to_string(),
        email: format!("{name}@example.com"),
        picture_url: "https://example.com/p.png".to_string(),
        created: created(),
        quiz_passed: true,
        quiz_attempts: 3,
        banned: false,
        admin: true,
    }
}

fn session(id: &str, expires: Option<DateTime<Utc>>) -> UserSession {
    UserSession {
        id: id.into(),
        user_id: "accounts.example.com/abc123".into(),
        created: created(),
        expires,
        ip: "192.0.2.7".to_string(),
    }
}

fn sorted_quotes(mut quotes: Vec<Quote>) -> Vec<Quote> {
    quotes.sort_by(|a, b| a.id.cmp(&b.id));
    quotes
}

fn sorted_users(mut users: Vec<User>) -> Vec<User> {
    users.sort_by(|a, b| a.id.cmp(&b.id));
    users
}

pub async fn quote_repository<R: QuoteRepository>(repo: &R) {
    // Empty
    assert!(repo.find_all().await.unwrap().is_empty());
    let missing = QuoteId::new("missing");
    assert!(matches!(
        repo.find_by_id(&missing).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.update(&quote("missing", "x")).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.delete(&missing).await,
        Err(StorageError::NotFound)
    ));

    // Round-trip
    let a = quote("a934", "Isn't every truck a hand truck?");
    let b = quote("x179", "The cake is a lie.");
    repo.create(&a).await.unwrap();
    repo.create(&b).await.unwrap();
    assert_eq!(repo.find_by_id(&a.id).await.unwrap(), a);

    // Duplicate rejection leaves the original untouched
    let dup = quote("a934", "Something else entirely");
    assert!(matches!(
        repo.create(&dup).await,
        Err(StorageError::AlreadyExists)
    ));
    assert_eq!(repo.find_by_id(&a.id).await.unwrap(), a);

    // Update isolation
    let edited = Quote {
        text: "Every truck is a hand truck.".to_string(),
        ..a.clone()
    };
    repo.update(&edited).await.unwrap();
    assert_eq!(repo.find_by_id(&a.id).await.unwrap(), edited);
    assert_eq!(repo.find_by_id(&b.id).await.unwrap(), b);

    // Completeness
    assert_eq!(
        sorted_quotes(repo.find_all().await.unwrap()),
        vec![edited.clone(), b.clone()]
    );

    // Delete
    repo.delete(&a.id).await.unwrap();
    assert!(matches!(
        repo.find_by_id(&a.id).await,
        Err(StorageError::NotFound)
    ));
    assert_eq!(repo.find_all().await.unwrap(), vec![b]);
}

pub async fn user_repository<R: UserRepository>(repo: &R) {
    assert!(repo.find_all().await.unwrap().is_empty());
    let missing = UserId::new("missing");
    assert!(matches!(
        repo.find_by_id(&missing).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.update(&user("missing", "nobody")).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.delete(&missing).await,
        Err(StorageError::NotFound)
    ));

    let u1 = user("accounts.example.com/u1", "nick");
    let u2 = User {
        admin: false,
        banned: true,
        quiz_passed: false,
        quiz_attempts: 0,
        ..user("accounts.example.com/u2", "dvd")
    };
    repo.create(&u1).await.unwrap();
    repo.create(&u2).await.unwrap();
    assert_eq!(repo.find_by_id(&u1.id).await.unwrap(), u1);
    assert_eq!(repo.find_by_id(&u2.id).await.unwrap(), u2);

    let dup = User {
        name: "impostor".to_string(),
        ..u1.clone()
    };
    assert!(matches!(
        repo.create(&dup).await,
        Err(StorageError::AlreadyExists)
    ));
    assert_eq!(repo.find_by_id(&u1.id).await.unwrap().name, "nick");

    let updated = User {
        quiz_attempts: 4,
        quiz_passed: false,
        ..u1.clone()
    };
    repo.update(&updated).await.unwrap();
    assert_eq!(repo.find_by_id(&u1.id).await.unwrap(), updated);
    assert_eq!(repo.find_by_id(&u2.id).await.unwrap(), u2);

    assert_eq!(
        sorted_users(repo.find_all().await.unwrap()),
        vec![updated, u2.clone()]
    );

    repo.delete(&u1.id).await.unwrap();
    assert_eq!(repo.find_all().await.unwrap(), vec![u2]);
}

pub async fn user_session_repository<R: UserSessionRepository>(repo: &R) {
    let missing = SessionId::new("missing");
    assert!(matches!(
        repo.find_by_id(&missing).await,
        Err(StorageError::NotFound)
    ));

    let now = created();
    let live = session("live", Some(now + TimeDelta::days(14)));
    let past = session("past", Some(now - TimeDelta::seconds(1)));
    let unset = session("unset", None);

    for s in [&live, &past, &unset] {
        repo.create(s).await.unwrap();
        assert_eq!(&repo.find_by_id(&s.id).await.unwrap(), s);
    }

    let dup = UserSession {
        ip: "198.51.100.1".to_string(),
        ..live.clone()
    };
    assert!(matches!(
        repo.create(&dup).await,
        Err(StorageError::AlreadyExists)
    ));
    assert_eq!(repo.find_by_id(&live.id).await.unwrap(), live);

    // Sweep removes expired and unset sessions only
    assert_eq!(repo.delete_expired(now).await.unwrap(), 2);
    assert_eq!(repo.find_by_id(&live.id).await.unwrap(), live);
    assert!(matches!(
        repo.find_by_id(&past.id).await,
        Err(StorageError::NotFound)
    ));
    assert!(matches!(
        repo.find_by_id(&unset.id).await,
        Err(StorageError::NotFound)
    ));
    assert_eq!(repo.delete_expired(now).await.unwrap(), 0);
}
