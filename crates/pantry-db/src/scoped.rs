//! Owner-scoped access to recipes and tags.
//!
//! Every statement here carries an `owner_id = ?` predicate. A row owned by
//! someone else is indistinguishable from a row that does not exist: reads
//! return `None`, deletes report `false`.

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use pantry_types::models::{Recipe, RecipeChanges, Tag, TagChanges};

use crate::Database;
use crate::models::{RecipeRow, TagRow};
use crate::queries::OptionalExt;

const RECIPE_COLUMNS: &str = "id, owner_id, title, description, time_minutes, price, link";
const TAG_COLUMNS: &str = "id, owner_id, name";
const TAG_BATCH: usize = 500;

pub struct Recipes<'a> {
    db: &'a Database,
    owner: String,
}

impl<'a> Recipes<'a> {
    pub(crate) fn new(db: &'a Database, owner: Uuid) -> Self {
        Self {
            db,
            owner: owner.to_string(),
        }
    }

    /// Newest first.
    pub fn list(&self) -> Result<Vec<Recipe>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECIPE_COLUMNS} FROM recipes WHERE owner_id = ?1 ORDER BY id DESC"
            ))?;
            let rows = stmt
                .query_map([&self.owner], recipe_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            attach_tags(conn, rows)
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<Recipe>> {
        self.db.with_conn(|conn| load_recipe(conn, &self.owner, id))
    }

    pub fn exists(&self, id: i64) -> Result<bool> {
        self.db.with_conn(|conn| row_exists(conn, "recipes", &self.owner, id))
    }

    /// Insert a recipe owned by this scope. `title`, `time_minutes` and
    /// `price` must be present.
    pub fn create(&self, changes: &RecipeChanges) -> Result<Recipe> {
        let title = changes.title.as_deref().ok_or_else(|| anyhow!("Recipe title is required"))?;
        let time_minutes = changes
            .time_minutes
            .ok_or_else(|| anyhow!("Recipe time_minutes is required"))?;
        let price = changes.price.ok_or_else(|| anyhow!("Recipe price is required"))?;

        self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "INSERT INTO recipes (owner_id, title, description, time_minutes, price, link)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    self.owner,
                    title,
                    changes.description.as_deref().unwrap_or_default(),
                    time_minutes,
                    price.to_string(),
                    changes.link.as_deref().unwrap_or_default(),
                ],
            )?;
            let id = tx.last_insert_rowid();

            if let Some(names) = &changes.tags {
                let tag_ids = resolve_tags(&tx, &self.owner, names)?;
                replace_recipe_tags(&tx, id, &tag_ids)?;
            }

            let recipe = load_recipe(&tx, &self.owner, id)?
                .ok_or_else(|| anyhow!("Recipe {} missing after insert", id))?;
            tx.commit()?;
            Ok(recipe)
        })
    }

    /// Merge `changes` onto the stored row. Fields left as `None` keep their
    /// stored value. Returns `None` when the recipe is not in this scope.
    pub fn update(&self, id: i64, changes: &RecipeChanges) -> Result<Option<Recipe>> {
        self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(mut row) = select_recipe(&tx, &self.owner, id)? else {
                return Ok(None);
            };

            if let Some(title) = &changes.title {
                row.title = title.clone();
            }
            if let Some(description) = &changes.description {
                row.description = description.clone();
            }
            if let Some(time_minutes) = changes.time_minutes {
                row.time_minutes = time_minutes;
            }
            if let Some(price) = changes.price {
                row.price = price.to_string();
            }
            if let Some(link) = &changes.link {
                row.link = link.clone();
            }

            tx.execute(
                "UPDATE recipes
                 SET title = ?1, description = ?2, time_minutes = ?3, price = ?4, link = ?5
                 WHERE id = ?6 AND owner_id = ?7",
                params![
                    row.title,
                    row.description,
                    row.time_minutes,
                    row.price,
                    row.link,
                    id,
                    self.owner,
                ],
            )?;

            if let Some(names) = &changes.tags {
                let tag_ids = resolve_tags(&tx, &self.owner, names)?;
                replace_recipe_tags(&tx, id, &tag_ids)?;
            }

            let recipe = load_recipe(&tx, &self.owner, id)?;
            tx.commit()?;
            Ok(recipe)
        })
    }

    /// Returns `false` when nothing in this scope matched.
    pub fn delete(&self, id: i64) -> Result<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM recipes WHERE id = ?1 AND owner_id = ?2",
                params![id, self.owner],
            )?;
            Ok(removed > 0)
        })
    }
}

pub struct Tags<'a> {
    db: &'a Database,
    owner: String,
}

impl<'a> Tags<'a> {
    pub(crate) fn new(db: &'a Database, owner: Uuid) -> Self {
        Self {
            db,
            owner: owner.to_string(),
        }
    }

    /// Ordered by name, descending.
    pub fn list(&self) -> Result<Vec<Tag>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TAG_COLUMNS} FROM tags WHERE owner_id = ?1 ORDER BY name DESC, id DESC"
            ))?;
            let rows = stmt
                .query_map([&self.owner], tag_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter().map(TagRow::into_tag).collect()
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<Tag>> {
        self.db
            .with_conn(|conn| select_tag(conn, &self.owner, id)?.map(TagRow::into_tag).transpose())
    }

    pub fn exists(&self, id: i64) -> Result<bool> {
        self.db.with_conn(|conn| row_exists(conn, "tags", &self.owner, id))
    }

    pub fn create(&self, name: &str) -> Result<Tag> {
        self.db.with_conn(|conn| {
            let id = insert_tag(conn, &self.owner, name)?;
            select_tag(conn, &self.owner, id)?
                .ok_or_else(|| anyhow!("Tag {} missing after insert", id))?
                .into_tag()
        })
    }

    pub fn update(&self, id: i64, changes: &TagChanges) -> Result<Option<Tag>> {
        self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let Some(mut row) = select_tag(&tx, &self.owner, id)? else {
                return Ok(None);
            };

            if let Some(name) = &changes.name {
                row.name = name.clone();
            }

            tx.execute(
                "UPDATE tags SET name = ?1 WHERE id = ?2 AND owner_id = ?3",
                params![row.name, id, self.owner],
            )?;
            tx.commit()?;

            row.into_tag().map(Some)
        })
    }

    /// Recipes keep existing; only their association with the tag goes.
    pub fn delete(&self, id: i64) -> Result<bool> {
        self.db.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM tags WHERE id = ?1 AND owner_id = ?2",
                params![id, self.owner],
            )?;
            Ok(removed > 0)
        })
    }
}

// -- Row helpers --

fn recipe_row(row: &Row<'_>) -> rusqlite::Result<RecipeRow> {
    Ok(RecipeRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        time_minutes: row.get(4)?,
        price: row.get(5)?,
        link: row.get(6)?,
    })
}

fn tag_row(row: &Row<'_>) -> rusqlite::Result<TagRow> {
    Ok(TagRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
    })
}

fn select_recipe(conn: &Connection, owner: &str, id: i64) -> Result<Option<RecipeRow>> {
    conn.query_row(
        &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1 AND owner_id = ?2"),
        params![id, owner],
        recipe_row,
    )
    .optional()
}

fn select_tag(conn: &Connection, owner: &str, id: i64) -> Result<Option<TagRow>> {
    conn.query_row(
        &format!("SELECT {TAG_COLUMNS} FROM tags WHERE id = ?1 AND owner_id = ?2"),
        params![id, owner],
        tag_row,
    )
    .optional()
}

// `table` is only ever one of the literals above.
fn row_exists(conn: &Connection, table: &str, owner: &str, id: i64) -> Result<bool> {
    let found = conn
        .query_row(
            &format!("SELECT 1 FROM {table} WHERE id = ?1 AND owner_id = ?2"),
            params![id, owner],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn load_recipe(conn: &Connection, owner: &str, id: i64) -> Result<Option<Recipe>> {
    match select_recipe(conn, owner, id)? {
        Some(row) => Ok(attach_tags(conn, vec![row])?.pop()),
        None => Ok(None),
    }
}

/// Batch-fetch tags for a set of recipe rows and build domain recipes.
/// Ids are bound in chunks to stay under SQLite's host parameter limit.
fn attach_tags(conn: &Connection, rows: Vec<RecipeRow>) -> Result<Vec<Recipe>> {
    let mut by_recipe: HashMap<i64, Vec<Tag>> = HashMap::new();

    for chunk in rows.chunks(TAG_BATCH) {
        let placeholders: Vec<String> = (1..=chunk.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT rt.recipe_id, t.id, t.owner_id, t.name
             FROM recipe_tags rt
             JOIN tags t ON t.id = rt.tag_id
             WHERE rt.recipe_id IN ({})
             ORDER BY t.id",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<&dyn rusqlite::types::ToSql> =
            chunk.iter().map(|r| &r.id as &dyn rusqlite::types::ToSql).collect();

        let pairs = stmt
            .query_map(params.as_slice(), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    TagRow {
                        id: row.get(1)?,
                        owner_id: row.get(2)?,
                        name: row.get(3)?,
                    },
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (recipe_id, tag) in pairs {
            by_recipe.entry(recipe_id).or_default().push(tag.into_tag()?);
        }
    }

    rows.into_iter()
        .map(|row| {
            let tags = by_recipe.remove(&row.id).unwrap_or_default();
            row.into_recipe(tags)
        })
        .collect()
}

fn insert_tag(conn: &Connection, owner: &str, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO tags (owner_id, name) VALUES (?1, ?2)", params![owner, name])?;
    Ok(conn.last_insert_rowid())
}

/// Map tag names to ids within one owner's tags, creating the missing ones.
/// Duplicate names collapse to a single id.
fn resolve_tags(conn: &Connection, owner: &str, names: &[String]) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(names.len());

    for name in names {
        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM tags WHERE owner_id = ?1 AND name = ?2 ORDER BY id LIMIT 1",
                params![owner, name],
                |row| row.get(0),
            )
            .optional()?;

        let id = match existing {
            Some(id) => id,
            None => insert_tag(conn, owner, name)?,
        };

        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    Ok(ids)
}

fn replace_recipe_tags(conn: &Connection, recipe_id: i64, tag_ids: &[i64]) -> Result<()> {
    conn.execute("DELETE FROM recipe_tags WHERE recipe_id = ?1", [recipe_id])?;
    for tag_id in tag_ids {
        conn.execute(
            "INSERT INTO recipe_tags (recipe_id, tag_id) VALUES (?1, ?2)",
            params![recipe_id, tag_id],
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;

    fn db_with_users() -> (Database, Uuid, Uuid) {
        let db = Database::open_in_memory().unwrap();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        db.create_user(&alice.to_string(), "alice@example.com", "x").unwrap();
        db.create_user(&bob.to_string(), "bob@example.com", "x").unwrap();
        (db, alice, bob)
    }

    fn sample(title: &str) -> RecipeChanges {
        RecipeChanges {
            title: Some(title.to_string()),
            description: Some("Sample description".to_string()),
            time_minutes: Some(22),
            price: Some(Decimal::from_str("5.25").unwrap()),
            link: Some("http://example.com/recipe.pdf".to_string()),
            tags: None,
        }
    }

    #[test]
    fn create_then_get_returns_same_fields() {
        let (db, alice, _) = db_with_users();
        let created = db.recipes(alice).create(&sample("Soup")).unwrap();

        let fetched = db.recipes(alice).get(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.owner, alice);
        assert_eq!(fetched.title, "Soup");
        assert_eq!(fetched.time_minutes, 22);
        assert_eq!(fetched.price, Decimal::from_str("5.25").unwrap());
        assert_eq!(fetched.link, "http://example.com/recipe.pdf");
    }

    #[test]
    fn optional_fields_default_to_empty() {
        let (db, alice, _) = db_with_users();
        let changes = RecipeChanges {
            description: None,
            link: None,
            ..sample("Toast")
        };
        let created = db.recipes(alice).create(&changes).unwrap();
        assert_eq!(created.description, "");
        assert_eq!(created.link, "");
        assert!(created.tags.is_empty());
    }

    #[test]
    fn create_without_required_field_fails() {
        let (db, alice, _) = db_with_users();
        let changes = RecipeChanges {
            price: None,
            ..sample("Toast")
        };
        assert!(db.recipes(alice).create(&changes).is_err());
        assert!(db.recipes(alice).list().unwrap().is_empty());
    }

    #[test]
    fn list_is_scoped_and_newest_first() {
        let (db, alice, bob) = db_with_users();
        let first = db.recipes(alice).create(&sample("First")).unwrap();
        db.recipes(bob).create(&sample("Bob's")).unwrap();
        let second = db.recipes(alice).create(&sample("Second")).unwrap();

        let ids: Vec<i64> = db.recipes(alice).list().unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn other_owner_sees_nothing() {
        let (db, alice, bob) = db_with_users();
        let recipe = db.recipes(bob).create(&sample("Secret")).unwrap();
        let tag = db.tags(bob).create("Private").unwrap();

        assert!(db.recipes(alice).get(recipe.id).unwrap().is_none());
        assert!(db.recipes(alice).update(recipe.id, &sample("Hijack")).unwrap().is_none());
        assert!(!db.recipes(alice).delete(recipe.id).unwrap());
        assert!(db.tags(alice).get(tag.id).unwrap().is_none());
        assert!(db.tags(alice).list().unwrap().is_empty());
        assert!(!db.tags(alice).delete(tag.id).unwrap());

        let untouched = db.recipes(bob).get(recipe.id).unwrap().unwrap();
        assert_eq!(untouched.title, "Secret");
        assert!(db.tags(bob).get(tag.id).unwrap().is_some());
    }

    #[test]
    fn partial_update_keeps_other_fields() {
        let (db, alice, _) = db_with_users();
        let recipe = db.recipes(alice).create(&sample("Before")).unwrap();

        let changes = RecipeChanges {
            title: Some("After".to_string()),
            ..RecipeChanges::default()
        };
        let updated = db.recipes(alice).update(recipe.id, &changes).unwrap().unwrap();

        assert_eq!(updated.title, "After");
        assert_eq!(updated.description, recipe.description);
        assert_eq!(updated.link, recipe.link);
        assert_eq!(updated.price, recipe.price);
        assert_eq!(updated.owner, alice);
    }

    #[test]
    fn tags_are_reused_by_name_and_replaced_on_update() {
        let (db, alice, bob) = db_with_users();
        let existing = db.tags(alice).create("Vegan").unwrap();
        db.tags(bob).create("Dinner").unwrap();

        let changes = RecipeChanges {
            tags: Some(vec!["Vegan".into(), "Dinner".into(), "Vegan".into()]),
            ..sample("Curry")
        };
        let recipe = db.recipes(alice).create(&changes).unwrap();

        let names: Vec<&str> = recipe.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Vegan", "Dinner"]);
        assert_eq!(recipe.tags[0].id, existing.id);
        assert!(recipe.tags.iter().all(|t| t.owner == alice));
        assert_eq!(db.tags(alice).list().unwrap().len(), 2);

        let retag = RecipeChanges {
            tags: Some(vec!["Lunch".into()]),
            ..RecipeChanges::default()
        };
        let updated = db.recipes(alice).update(recipe.id, &retag).unwrap().unwrap();
        let names: Vec<&str> = updated.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Lunch"]);

        let untagged = RecipeChanges {
            title: Some("Curry II".into()),
            ..RecipeChanges::default()
        };
        let kept = db.recipes(alice).update(recipe.id, &untagged).unwrap().unwrap();
        assert_eq!(kept.tags, updated.tags);
    }

    #[test]
    fn tags_list_by_descending_name() {
        let (db, alice, _) = db_with_users();
        db.tags(alice).create("Vegan").unwrap();
        db.tags(alice).create("Dessert").unwrap();

        let names: Vec<String> = db.tags(alice).list().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Vegan", "Dessert"]);
    }

    #[test]
    fn tag_rename_and_delete() {
        let (db, alice, _) = db_with_users();
        let changes = RecipeChanges {
            tags: Some(vec!["Spicy".into()]),
            ..sample("Chili")
        };
        let recipe = db.recipes(alice).create(&changes).unwrap();
        let tag_id = recipe.tags[0].id;

        let renamed = db
            .tags(alice)
            .update(tag_id, &TagChanges { name: Some("Hot".into()) })
            .unwrap()
            .unwrap();
        assert_eq!(renamed.name, "Hot");
        assert_eq!(db.recipes(alice).get(recipe.id).unwrap().unwrap().tags[0].name, "Hot");

        assert!(db.tags(alice).delete(tag_id).unwrap());
        let after = db.recipes(alice).get(recipe.id).unwrap().unwrap();
        assert!(after.tags.is_empty());
        assert!(db.tags(alice).get(tag_id).unwrap().is_none());
    }

    #[test]
    fn exists_is_scoped() {
        let (db, alice, bob) = db_with_users();
        let recipe = db.recipes(alice).create(&sample("Mine")).unwrap();
        let tag = db.tags(alice).create("Mine").unwrap();

        assert!(db.recipes(alice).exists(recipe.id).unwrap());
        assert!(!db.recipes(bob).exists(recipe.id).unwrap());
        assert!(!db.recipes(alice).exists(recipe.id + 1000).unwrap());
        assert!(db.tags(alice).exists(tag.id).unwrap());
        assert!(!db.tags(bob).exists(tag.id).unwrap());
    }

    #[test]
    fn list_attaches_tags_across_batches() {
        let (db, alice, _) = db_with_users();
        let total = TAG_BATCH + 25;
        for i in 0..total {
            let changes = RecipeChanges {
                tags: Some(vec![format!("Tag {}", i % 3)]),
                ..sample(&format!("Recipe {}", i))
            };
            db.recipes(alice).create(&changes).unwrap();
        }

        let recipes = db.recipes(alice).list().unwrap();
        assert_eq!(recipes.len(), total);
        assert!(recipes.iter().all(|r| r.tags.len() == 1));
    }

    #[test]
    fn delete_recipe_removes_only_that_row() {
        let (db, alice, _) = db_with_users();
        let keep = db.recipes(alice).create(&sample("Keep")).unwrap();
        let gone = db.recipes(alice).create(&sample("Gone")).unwrap();

        assert!(db.recipes(alice).delete(gone.id).unwrap());
        assert!(!db.recipes(alice).delete(gone.id).unwrap());
        assert!(db.recipes(alice).get(gone.id).unwrap().is_none());
        assert!(db.recipes(alice).get(keep.id).unwrap().is_some());
    }
}
