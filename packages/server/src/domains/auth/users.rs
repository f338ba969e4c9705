use anyhow::{bail, Result};

/// A configured login. Passwords are compared as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    pub username: String,
    pub password: String,
    pub tenant: String,
}

/// Static user list loaded from configuration
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: Vec<UserAccount>,
}

impl UserDirectory {
    pub fn new(users: Vec<UserAccount>) -> Self {
        Self { users }
    }

    /// Parse `user:password:tenant` entries separated by commas.
    pub fn parse(list: &str) -> Result<Self> {
        let mut users = Vec::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let parts: Vec<&str> = entry.splitn(3, ':').collect();
            match parts.as_slice() {
                [username, password, tenant]
                    if !username.is_empty() && !password.is_empty() && !tenant.is_empty() =>
                {
                    users.push(UserAccount {
                        username: username.to_string(),
                        password: password.to_string(),
                        tenant: tenant.to_string(),
                    });
                }
                _ => bail!("invalid user entry '{}', expected user:password:tenant", entry),
            }
        }
        Ok(Self { users })
    }

    pub fn find(&self, username: &str) -> Option<&UserAccount> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn authenticate(&self, username: &str, password: &str) -> Option<&UserAccount> {
        self.find(username).filter(|u| u.password == password)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
