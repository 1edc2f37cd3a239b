//! Database repository for recipe attributes: tags and ingredients.
//!
//! The repository is always bound to an owner. Every query filters on `user_id = owner`, so
//! there is no way to read or link another user's attributes through it.

use crate::{
    db::{
        errors::Result,
        models::attributes::{AttributeDBResponse, AttributeFilter, AttributeKind},
    },
    types::UserId,
};
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::instrument;

pub struct Attributes<'c> {
    db: &'c mut PgConnection,
    kind: AttributeKind,
    owner: UserId,
}

impl<'c> Attributes<'c> {
    pub fn new(db: &'c mut PgConnection, kind: AttributeKind, owner: UserId) -> Self {
        Self { db, kind, owner }
    }

    pub fn tags(db: &'c mut PgConnection, owner: UserId) -> Self {
        Self::new(db, AttributeKind::Tag, owner)
    }

    pub fn ingredients(db: &'c mut PgConnection, owner: UserId) -> Self {
        Self::new(db, AttributeKind::Ingredient, owner)
    }

    #[instrument(skip(self), fields(kind = ?self.kind, owner = self.owner), err)]
    pub async fn create(&mut self, name: &str) -> Result<AttributeDBResponse> {
        let query = format!("INSERT INTO {} (name, user_id) VALUES ($1, $2) RETURNING *", self.kind.table());
        let attribute = sqlx::query_as::<_, AttributeDBResponse>(&query)
            .bind(name)
            .bind(self.owner)
            .fetch_one(&mut *self.db)
            .await?;

        Ok(attribute)
    }

    /// List the owner's attributes, newest name first.
    ///
    /// With `assigned_only`, only attributes linked to at least one of the owner's recipes are
    /// returned. `EXISTS` keeps each attribute to a single row however many recipes use it.
    #[instrument(skip(self), fields(kind = ?self.kind, owner = self.owner), err)]
    pub async fn list(&mut self, filter: &AttributeFilter) -> Result<Vec<AttributeDBResponse>> {
        let query = format!(
            r#"
            SELECT a.*
            FROM {table} a
            WHERE a.user_id = $1
              AND (
                $2 = FALSE
                OR EXISTS (
                    SELECT 1
                    FROM {link} l
                    JOIN recipes r ON r.id = l.recipe_id
                    WHERE l.{column} = a.id AND r.user_id = $1
                )
              )
            ORDER BY a.name DESC, a.id DESC
            "#,
            table = self.kind.table(),
            link = self.kind.link_table(),
            column = self.kind.link_column(),
        );

        let attributes = sqlx::query_as::<_, AttributeDBResponse>(&query)
            .bind(self.owner)
            .bind(filter.assigned_only)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(attributes)
    }

    /// Return the ids from `ids` that don't exist or belong to someone else, deduplicated and sorted
    #[instrument(skip(self, ids), fields(kind = ?self.kind, owner = self.owner, count = ids.len()), err)]
    pub async fn missing_ids(&mut self, ids: &[i64]) -> Result<Vec<i64>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = format!(
            r#"
            SELECT DISTINCT req.id
            FROM UNNEST($1::BIGINT[]) AS req(id)
            WHERE NOT EXISTS (
                SELECT 1 FROM {table} a WHERE a.id = req.id AND a.user_id = $2
            )
            ORDER BY req.id
            "#,
            table = self.kind.table(),
        );

        let missing: Vec<i64> = sqlx::query_scalar(&query)
            .bind(ids)
            .bind(self.owner)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(missing)
    }

    /// Get lots of attributes by their IDs, keyed by ID. Ids the owner doesn't own are skipped.
    #[instrument(skip(self, ids), fields(kind = ?self.kind, owner = self.owner, count = ids.len()), err)]
    pub async fn get_bulk(&mut self, ids: &[i64]) -> Result<HashMap<i64, AttributeDBResponse>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!("SELECT * FROM {} WHERE id = ANY($1) AND user_id = $2", self.kind.table());
        let attributes = sqlx::query_as::<_, AttributeDBResponse>(&query)
            .bind(ids)
            .bind(self.owner)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(attributes.into_iter().map(|a| (a.id, a)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Recipes, Repository, Users};
    use crate::db::models::recipes::RecipeCreateDBRequest;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    async fn create_owner(conn: &mut PgConnection, email: &str) -> UserId {
        Users::new(conn).create_user(email, "", None).await.unwrap().id
    }

    fn recipe(title: &str, tags: Vec<i64>, ingredients: Vec<i64>) -> RecipeCreateDBRequest {
        RecipeCreateDBRequest {
            title: title.to_string(),
            time_minutes: 10,
            price: Decimal::new(500, 2),
            link: String::new(),
            tags,
            ingredients,
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_ordered_by_name_descending(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_owner(&mut conn, "tags@example.com").await;

        let mut tags = Attributes::tags(&mut conn, owner);
        tags.create("Dessert").await.unwrap();
        tags.create("Vegan").await.unwrap();

        let listed = tags.list(&AttributeFilter::default()).await.unwrap();
        let names: Vec<_> = listed.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Vegan", "Dessert"]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_list_limited_to_owner(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_owner(&mut conn, "one@example.com").await;
        let other = create_owner(&mut conn, "two@example.com").await;

        Attributes::ingredients(&mut conn, other).create("Vinegar").await.unwrap();
        let mine = Attributes::ingredients(&mut conn, owner).create("Turmeric").await.unwrap();

        let listed = Attributes::ingredients(&mut conn, owner)
            .list(&AttributeFilter::default())
            .await
            .unwrap();
        assert_eq!(listed, vec![mine]);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_assigned_only_is_distinct(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_owner(&mut conn, "assigned@example.com").await;

        let breakfast = Attributes::tags(&mut conn, owner).create("Breakfast").await.unwrap();
        Attributes::tags(&mut conn, owner).create("Lunch").await.unwrap();

        let mut recipes = Recipes::new(&mut conn, owner);
        recipes.create(&recipe("Pancakes", vec![breakfast.id], vec![])).await.unwrap();
        recipes.create(&recipe("Porridge", vec![breakfast.id], vec![])).await.unwrap();

        let assigned = Attributes::tags(&mut conn, owner)
            .list(&AttributeFilter { assigned_only: true })
            .await
            .unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, breakfast.id);

        let all = Attributes::tags(&mut conn, owner)
            .list(&AttributeFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_missing_ids_includes_foreign_ids(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_owner(&mut conn, "mine@example.com").await;
        let other = create_owner(&mut conn, "theirs@example.com").await;

        let mine = Attributes::tags(&mut conn, owner).create("Mine").await.unwrap();
        let theirs = Attributes::tags(&mut conn, other).create("Theirs").await.unwrap();

        let mut tags = Attributes::tags(&mut conn, owner);
        assert!(tags.missing_ids(&[mine.id, mine.id]).await.unwrap().is_empty());
        assert_eq!(
            tags.missing_ids(&[mine.id, theirs.id, 999_999]).await.unwrap(),
            vec![theirs.id, 999_999]
        );

        let bulk = tags.get_bulk(&[mine.id, theirs.id]).await.unwrap();
        assert_eq!(bulk.len(), 1);
        assert!(bulk.contains_key(&mine.id));
    }
}
