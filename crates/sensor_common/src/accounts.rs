//! Credential store read from the member sheet.
//!
//! Named columns (`username`, `password`, `name`, `role`) are preferred. Sheets
//! without them fall back to the legacy positional layout where columns 2-5
//! hold username, password, display name and role.

use crate::error::Result;
use crate::sheet::{parse_csv, RawSheet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_ROLE: &str = "User";
pub const ADMIN_ROLE: &str = "Admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub name: String,
    pub role: String,
}

impl Account {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Column indices for the four account fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Layout {
    username: usize,
    password: usize,
    name: usize,
    role: usize,
}

impl Layout {
    const LEGACY: Layout = Layout { username: 1, password: 2, name: 3, role: 4 };

    fn detect(headers: &[String]) -> Option<Layout> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        if let (Some(username), Some(password)) = (find(&["username", "user"]), find(&["password"])) {
            let name = find(&["name", "display name", "display_name"]).unwrap_or(username);
            let role = find(&["role"]).unwrap_or(usize::MAX);
            return Some(Layout { username, password, name, role });
        }

        if headers.len() >= 5 {
            debug!("Account sheet has no named columns, using positional layout");
            return Some(Layout::LEGACY);
        }

        None
    }
}

/// All known accounts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountBook {
    accounts: Vec<Account>,
}

impl AccountBook {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self { accounts }
    }

    pub fn from_csv(text: &str) -> Result<Self> {
        Ok(Self::from_sheet(&parse_csv(text)?))
    }

    pub fn from_sheet(sheet: &RawSheet) -> Self {
        let Some(layout) = Layout::detect(&sheet.headers) else {
            warn!(
                "Account sheet has {} columns and no username/password headers",
                sheet.headers.len()
            );
            return Self::default();
        };

        let cell = |row: &[String], idx: usize| row.get(idx).cloned().unwrap_or_default();

        let accounts = sheet
            .rows
            .iter()
            .filter_map(|row| {
                let username = cell(row, layout.username);
                if username.trim().is_empty() {
                    return None;
                }
                let role = cell(row, layout.role).trim().to_string();
                Some(Account {
                    password: cell(row, layout.password),
                    name: cell(row, layout.name),
                    role: if role.is_empty() { DEFAULT_ROLE.to_string() } else { role },
                    username,
                })
            })
            .collect();

        Self { accounts }
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    /// Plain credential comparison; first match wins.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<&Account> {
        self.accounts
            .iter()
            .find(|a| a.username == username && a.password == password)
    }

    pub fn find(&self, username: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.username == username)
    }
}
