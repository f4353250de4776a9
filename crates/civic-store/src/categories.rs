//! Category and location lookups.

use rusqlite::{params, Connection, OptionalExtension};

use civic_shared::{CategoryId, LocationId};

use crate::database::Database;
use crate::error::Result;
use crate::models::{Category, Location, NewLocation};

impl Database {
    pub fn create_category(&self, name: &str) -> Result<Category> {
        self.conn()
            .execute("INSERT INTO categories (name) VALUES (?1)", params![name])?;
        Ok(Category {
            category_id: CategoryId(self.conn().last_insert_rowid()),
            name: name.to_string(),
        })
    }

    /// Look a category up by its display name.
    pub fn category_id_by_name(&self, name: &str) -> Result<Option<CategoryId>> {
        Ok(self
            .conn()
            .query_row(
                "SELECT category_id FROM categories WHERE name = ?1",
                params![name],
                |row| row.get(0).map(CategoryId),
            )
            .optional()?)
    }

    /// All categories, ordered by name.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT category_id, name FROM categories ORDER BY name ASC")?;
        let rows = stmt.query_map([], row_to_category)?;

        let mut categories = Vec::new();
        for row in rows {
            categories.push(row?);
        }
        Ok(categories)
    }
}

pub(crate) fn category_exists(conn: &Connection, id: CategoryId) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM categories WHERE category_id = ?1",
            params![id.0],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Return the location with `new.place_id`, creating it on first use.
/// An existing location keeps the fields it was first stored with.
pub(crate) fn upsert_location(conn: &Connection, new: &NewLocation) -> Result<LocationId> {
    let existing: Option<i64> = conn
        .query_row(
            "SELECT location_id FROM locations WHERE place_id = ?1",
            params![new.place_id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(LocationId(id));
    }

    conn.execute(
        "INSERT INTO locations (place_id, province, city, suburb, district)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![new.place_id, new.province, new.city, new.suburb, new.district],
    )?;
    Ok(LocationId(conn.last_insert_rowid()))
}

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        category_id: CategoryId(row.get(0)?),
        name: row.get(1)?,
    })
}

/// Map six location columns starting at `at`.
pub(crate) fn row_to_location(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Location> {
    Ok(Location {
        location_id: LocationId(row.get(at)?),
        place_id: row.get(at + 1)?,
        province: row.get(at + 2)?,
        city: row.get(at + 3)?,
        suburb: row.get(at + 4)?,
        district: row.get(at + 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_lookup_by_name() {
        let db = Database::open_in_memory().unwrap();
        let roads = db.create_category("Roads").unwrap();
        db.create_category("Electricity").unwrap();

        assert_eq!(db.category_id_by_name("Roads").unwrap(), Some(roads.category_id));
        assert_eq!(db.category_id_by_name("Parks").unwrap(), None);

        let names: Vec<_> = db
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Electricity", "Roads"]);
    }

    #[test]
    fn test_location_deduplicated_by_place_id() {
        let db = Database::open_in_memory().unwrap();
        let first = NewLocation {
            place_id: "ChIJ-main-st".to_string(),
            city: Some("Pretoria".to_string()),
            ..Default::default()
        };
        let a = upsert_location(db.conn(), &first).unwrap();
        let b = upsert_location(
            db.conn(),
            &NewLocation {
                city: Some("Tshwane".to_string()),
                ..first.clone()
            },
        )
        .unwrap();

        assert_eq!(a, b);
        let city: Option<String> = db
            .conn()
            .query_row(
                "SELECT city FROM locations WHERE location_id = ?1",
                params![a.0],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(city.as_deref(), Some("Pretoria"));
    }
}
