use serde::Serialize;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct Account {
    pub id: u32,
    pub email: String,
    pub name: String,
}

struct UserRecord {
    account: Account,
    salt: [u8; 16],
    password_hash: Vec<u8>,
}

/// Demo user directory kept in memory
pub(crate) struct UserDirectory {
    users: RwLock<Vec<UserRecord>>,
}

fn hash_password(salt: &[u8], password: &str) -> Vec<u8> {
    Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize()
        .to_vec()
}

fn record(id: u32, email: &str, name: &str, password: &str) -> UserRecord {
    let salt = *Uuid::new_v4().as_bytes();
    UserRecord {
        account: Account {
            id,
            email: email.to_string(),
            name: name.to_string(),
        },
        salt,
        password_hash: hash_password(&salt, password),
    }
}

impl UserDirectory {
    pub(crate) fn seeded() -> Self {
        Self {
            users: RwLock::new(vec![
                record(1, "john@company.com", "John", "supersafe"),
                record(2, "jack@company.com", "Jack", "megasafe"),
            ]),
        }
    }

    pub(crate) async fn list(&self) -> Vec<Account> {
        let users = self.users.read().await;
        users.iter().map(|user| user.account.clone()).collect()
    }

    pub(crate) async fn find(&self, email: &str) -> Option<Account> {
        let users = self.users.read().await;
        users
            .iter()
            .find(|user| user.account.email == email)
            .map(|user| user.account.clone())
    }

    /// `None` when the email is already registered
    pub(crate) async fn create(&self, name: &str, email: &str, password: &str) -> Option<Account> {
        let mut users = self.users.write().await;
        if users.iter().any(|user| user.account.email == email) {
            return None;
        }
        let id = users.iter().map(|user| user.account.id).max().unwrap_or(0) + 1;
        let user = record(id, email, name, password);
        let account = user.account.clone();
        users.push(user);
        Some(account)
    }

    pub(crate) async fn verify(&self, email: &str, password: &str) -> Option<Account> {
        let users = self.users.read().await;
        let user = users.iter().find(|user| user.account.email == email)?;
        let candidate = hash_password(&user.salt, password);
        if bool::from(candidate.ct_eq(&user.password_hash)) {
            Some(user.account.clone())
        } else {
            None
        }
    }
}
