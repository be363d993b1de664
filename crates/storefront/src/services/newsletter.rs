//! Newsletter subscriptions.

use bestmarket_core::Email;

use crate::db;
use crate::error::AppError;
use crate::store::{Durability, Store};

/// Result of a subscribe request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    /// Newly subscribed.
    Subscribed(Durability),
    /// Either store already had the address.
    AlreadySubscribed,
}

/// Newsletter service.
pub struct NewsletterService<'a> {
    store: &'a Store,
}

impl<'a> NewsletterService<'a> {
    #[must_use]
    pub const fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Subscribe an address.
    ///
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` if the address is not a valid email.
    pub async fn subscribe(&self, email: &str) -> Result<Subscription, AppError> {
        let email =
            Email::parse(email).map_err(|_| AppError::bad_request("Invalid email address"))?;

        let local = self.store.local();
        if local.is_subscribed(&email).await {
            return Ok(Subscription::AlreadySubscribed);
        }

        let remote = self
            .store
            .attempt("newsletter.subscribe", |pool| {
                db::newsletter::subscribe(pool, &email)
            })
            .await;
        local.subscribe(email).await;

        match remote {
            Some(false) => Ok(Subscription::AlreadySubscribed),
            Some(true) => Ok(Subscription::Subscribed(Durability::Remote)),
            None => Ok(Subscription::Subscribed(Durability::LocalOnly)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::LocalStore;

    #[tokio::test]
    async fn test_subscribe_once() {
        let store = Store::new(None, LocalStore::in_memory(Vec::new()));
        let newsletter = NewsletterService::new(&store);

        assert_eq!(
            newsletter.subscribe("Reader@Example.com").await.unwrap(),
            Subscription::Subscribed(Durability::LocalOnly)
        );
        assert_eq!(
            newsletter.subscribe("reader@example.com").await.unwrap(),
            Subscription::AlreadySubscribed
        );
        assert!(matches!(
            newsletter.subscribe("not-an-email").await,
            Err(AppError::BadRequest(_))
        ));
    }
}
