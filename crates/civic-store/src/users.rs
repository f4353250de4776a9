//! CRUD operations for [`User`] records and their bearer sessions.

use rusqlite::{params, OptionalExtension};

use civic_shared::constants::SESSION_TOKEN_BYTES;
use civic_shared::UserId;

use crate::codec;
use crate::database::Database;
use crate::error::{not_found, Result};
use crate::models::{NewUser, User};

pub(crate) const USER_COLUMNS: &str =
    "u.user_id, u.username, u.fullname, u.email_address, u.image_url, u.created_at";

impl Database {
    /// Register a user with a fresh id.
    pub fn create_user(&self, new: &NewUser) -> Result<User> {
        let user = User {
            user_id: UserId::new(),
            username: new.username.clone(),
            fullname: new.fullname.clone(),
            email_address: new.email_address.clone(),
            image_url: new.image_url.clone(),
            created_at: codec::now(),
        };

        self.conn().execute(
            "INSERT INTO users (user_id, username, fullname, email_address, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.user_id.to_string(),
                user.username,
                user.fullname,
                user.email_address,
                user.image_url,
                codec::encode_utc(&user.created_at),
            ],
        )?;

        tracing::debug!(user = %user.user_id.short(), "user registered");
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users u WHERE u.user_id = ?1"),
                params![id.to_string()],
                |row| row_to_user(row, 0),
            )
            .map_err(not_found)
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Issue a new bearer token for `user_id`.
    pub fn create_session(&self, user_id: UserId) -> Result<String> {
        let token = hex::encode(rand::random::<[u8; SESSION_TOKEN_BYTES]>());
        self.conn().execute(
            "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![token, user_id.to_string(), codec::encode_utc(&codec::now())],
        )?;
        Ok(token)
    }

    /// Resolve a bearer token.  Unknown tokens yield `None`.
    pub fn session_user(&self, token: &str) -> Result<Option<UserId>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT user_id FROM sessions WHERE token = ?1",
                params![token],
                |row| row.get(0),
            )
            .optional()?;

        Ok(raw.map(|s| codec::user_id(0, &s)).transpose()?)
    }

    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(affected > 0)
    }
}

/// Map the [`USER_COLUMNS`] block starting at column `at`.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<User> {
    let id_str: String = row.get(at)?;
    let created_str: String = row.get(at + 5)?;

    Ok(User {
        user_id: codec::user_id(at, &id_str)?,
        username: row.get(at + 1)?,
        fullname: row.get(at + 2)?,
        email_address: row.get(at + 3)?,
        image_url: row.get(at + 4)?,
        created_at: codec::utc(at + 5, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::new_user;
    use crate::StoreError;

    #[test]
    fn test_create_and_get_user() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("thandi")).unwrap();

        let loaded = db.get_user(user.user_id).unwrap();
        assert_eq!(loaded, user);
        assert!(matches!(db.get_user(UserId::new()), Err(StoreError::NotFound)));
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(&new_user("sipho")).unwrap();
        assert!(db.create_user(&new_user("sipho")).is_err());
    }

    #[test]
    fn test_session_lifecycle() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(&new_user("lerato")).unwrap();

        let token = db.create_session(user.user_id).unwrap();
        assert_eq!(token.len(), SESSION_TOKEN_BYTES * 2);
        assert_eq!(db.session_user(&token).unwrap(), Some(user.user_id));
        assert_eq!(db.session_user("nope").unwrap(), None);

        assert!(db.delete_session(&token).unwrap());
        assert_eq!(db.session_user(&token).unwrap(), None);
    }
}
