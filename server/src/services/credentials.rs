use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use super::{bounded, TicketingError};
use crate::models::{Attendee, CustomerContact, OrderItem};
use crate::store::TicketingStore;

/// Unambiguous characters for human-typed order numbers (no 0/O, 1/I/L).
const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const ORDER_NUMBER_SUFFIX_LEN: usize = 8;

/// Where check-in tokens come from. Swappable so tests can force collisions.
pub trait TokenSource: Send + Sync {
    fn next_token(&self) -> String;
}

/// 122 random bits from a v4 UUID, rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn next_token(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

pub struct CredentialIssuer {
    store: Arc<dyn TicketingStore>,
    tokens: Arc<dyn TokenSource>,
    timeout: Duration,
}

impl CredentialIssuer {
    pub fn new(store: Arc<dyn TicketingStore>, tokens: Arc<dyn TokenSource>, timeout: Duration) -> Self {
        Self {
            store,
            tokens,
            timeout,
        }
    }

    /// Binds one unit of `item` to a fresh token.
    ///
    /// `pending` holds the tokens already handed out for the order being
    /// assembled; they are not in the store yet but are just as taken. On
    /// success the new token is added to it.
    pub async fn issue(
        &self,
        item: &OrderItem,
        holder: &CustomerContact,
        pending: &mut HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<Attendee, TicketingError> {
        let token = self.tokens.next_token();
        if pending.contains(&token)
            || bounded(self.timeout, "token_exists", self.store.token_exists(&token)).await?
        {
            debug!(order_item_id = %item.id, "Generated token already in use");
            return Err(TicketingError::IssuanceConflict);
        }

        pending.insert(token.clone());
        Ok(Attendee {
            id: Uuid::new_v4(),
            order_id: item.order_id,
            order_item_id: item.id,
            ticket_type_id: item.ticket_type_id,
            name: holder.name.trim().to_string(),
            email: holder.email.trim().to_string(),
            phone: holder.phone.clone(),
            token,
            checked_in: false,
            checked_in_at: None,
            created_at: now,
        })
    }
}

/// `ORD-YYYYMMDD-XXXXXXXX`, with a random suffix short enough to read out
/// over the phone. Uniqueness is enforced by the store.
pub fn mint_order_number(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
        .map(|_| ORDER_NUMBER_ALPHABET[rng.gen_range(0..ORDER_NUMBER_ALPHABET.len())] as char)
        .collect();
    format!("ORD-{}-{}", now.format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use std::sync::Mutex;

    struct Scripted(Mutex<Vec<&'static str>>);

    impl TokenSource for Scripted {
        fn next_token(&self) -> String {
            self.0.lock().unwrap().remove(0).to_string()
        }
    }

    fn item() -> OrderItem {
        OrderItem {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            ticket_type_id: Uuid::new_v4(),
            quantity: 2,
            unit_price: Decimal::new(500, 2),
            created_at: Utc::now(),
        }
    }

    fn holder() -> CustomerContact {
        CustomerContact {
            name: " Lin ".to_string(),
            email: "lin@example.com".to_string(),
            phone: None,
        }
    }

    #[test]
    fn random_tokens_are_32_hex_chars() {
        let token = RandomTokens.next_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, RandomTokens.next_token());
    }

    #[test]
    fn order_numbers_carry_the_date() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let number = mint_order_number(now);
        assert!(number.starts_with("ORD-20240601-"));
        let suffix = &number["ORD-20240601-".len()..];
        assert_eq!(suffix.len(), ORDER_NUMBER_SUFFIX_LEN);
        assert!(suffix.bytes().all(|b| ORDER_NUMBER_ALPHABET.contains(&b)));
    }

    #[tokio::test]
    async fn repeated_token_within_one_order_is_a_conflict() {
        let issuer = CredentialIssuer::new(
            Arc::new(MemoryStore::new()),
            Arc::new(Scripted(Mutex::new(vec!["aaaa", "aaaa", "bbbb"]))),
            Duration::from_secs(1),
        );
        let item = item();
        let mut pending = HashSet::new();

        let first = issuer.issue(&item, &holder(), &mut pending, Utc::now()).await.unwrap();
        assert_eq!(first.token, "aaaa");
        assert_eq!(first.name, "Lin");
        assert!(!first.checked_in);

        let clash = issuer.issue(&item, &holder(), &mut pending, Utc::now()).await;
        assert!(matches!(clash, Err(TicketingError::IssuanceConflict)));

        let second = issuer.issue(&item, &holder(), &mut pending, Utc::now()).await.unwrap();
        assert_eq!(second.token, "bbbb");
        assert_eq!(pending.len(), 2);
    }
}
