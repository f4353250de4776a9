//! Fixtures shared by the store's unit tests.

use civic_shared::{CategoryId, IssueId};

use crate::database::Database;
use crate::models::{NewIssue, NewUser, User};

pub(crate) fn new_user(name: &str) -> NewUser {
    NewUser {
        username: name.to_string(),
        fullname: format!("{name} Fullname"),
        email_address: format!("{name}@example.com"),
        image_url: Some(format!("https://img.example.com/{name}.png")),
    }
}

/// An in-memory database with two users and two categories.
pub(crate) struct Fixture {
    pub db: Database,
    pub alice: User,
    pub bob: User,
    pub roads: CategoryId,
    pub water: CategoryId,
}

impl Fixture {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_user(&new_user("alice")).unwrap();
        let bob = db.create_user(&new_user("bob")).unwrap();
        let roads = db.create_category("Roads").unwrap().category_id;
        let water = db.create_category("Water").unwrap().category_id;
        Self {
            db,
            alice,
            bob,
            roads,
            water,
        }
    }

    pub fn issue_by(&self, user: &User, category: CategoryId, content: &str) -> IssueId {
        self.db
            .create_issue(&NewIssue {
                user_id: user.user_id,
                category_id: category,
                content: content.to_string(),
                sentiment: "Angry".to_string(),
                is_anonymous: false,
                location: None,
            })
            .unwrap()
            .issue_id
    }
}
