//! Read-only, cross-owner listings for the admin site.
//!
//! These queries deliberately ignore ownership; nothing outside `admin` should construct one.

use crate::db::{
    errors::Result,
    models::{
        attributes::AttributeKind,
        catalog::{CatalogAttribute, CatalogCounts, CatalogRecipe},
    },
};
use sqlx::PgConnection;
use tracing::instrument;

pub struct Catalog<'c> {
    db: &'c mut PgConnection,
}

impl<'c> Catalog<'c> {
    pub fn new(db: &'c mut PgConnection) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn counts(&mut self) -> Result<CatalogCounts> {
        let counts = sqlx::query_as::<_, CatalogCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM tags) AS tags,
                (SELECT COUNT(*) FROM ingredients) AS ingredients,
                (SELECT COUNT(*) FROM recipes) AS recipes
            "#,
        )
        .fetch_one(&mut *self.db)
        .await?;

        Ok(counts)
    }

    #[instrument(skip(self), err)]
    pub async fn list_attributes(&mut self, kind: AttributeKind) -> Result<Vec<CatalogAttribute>> {
        let query = format!(
            r#"
            SELECT a.id, a.name, u.email AS owner_email
            FROM {} a
            JOIN users u ON u.id = a.user_id
            ORDER BY a.name ASC, a.id ASC
            "#,
            kind.table()
        );
        let attributes = sqlx::query_as::<_, CatalogAttribute>(&query)
            .fetch_all(&mut *self.db)
            .await?;

        Ok(attributes)
    }

    #[instrument(skip(self), err)]
    pub async fn list_recipes(&mut self) -> Result<Vec<CatalogRecipe>> {
        let recipes = sqlx::query_as::<_, CatalogRecipe>(
            r#"
            SELECT r.id, r.title, r.time_minutes, r.price, u.email AS owner_email
            FROM recipes r
            JOIN users u ON u.id = r.user_id
            ORDER BY r.id ASC
            "#,
        )
        .fetch_all(&mut *self.db)
        .await?;

        Ok(recipes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::{Attributes, Recipes, Repository, Users};
    use crate::db::models::recipes::RecipeCreateDBRequest;
    use rust_decimal::Decimal;
    use sqlx::PgPool;

    #[sqlx::test]
    #[test_log::test]
    async fn test_catalog_spans_owners(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let alice = Users::new(&mut conn).create_user("alice@example.com", "", None).await.unwrap();
        let bob = Users::new(&mut conn).create_user("bob@example.com", "", None).await.unwrap();

        Attributes::tags(&mut conn, alice.id).create("Vegan").await.unwrap();
        Attributes::tags(&mut conn, bob.id).create("Dessert").await.unwrap();
        Recipes::new(&mut conn, bob.id)
            .create(&RecipeCreateDBRequest {
                title: "Trifle".to_string(),
                time_minutes: 30,
                price: Decimal::new(1250, 2),
                link: String::new(),
                tags: vec![],
                ingredients: vec![],
            })
            .await
            .unwrap();

        let mut catalog = Catalog::new(&mut conn);
        let counts = catalog.counts().await.unwrap();
        assert_eq!(counts.users, 2);
        assert_eq!(counts.tags, 2);
        assert_eq!(counts.ingredients, 0);
        assert_eq!(counts.recipes, 1);

        let tags = catalog.list_attributes(AttributeKind::Tag).await.unwrap();
        assert_eq!(tags[0].name, "Dessert");
        assert_eq!(tags[0].owner_email, "bob@example.com");
        assert_eq!(tags[1].owner_email, "alice@example.com");

        let recipes = catalog.list_recipes().await.unwrap();
        assert_eq!(recipes.len(), 1);
        assert_eq!(recipes[0].owner_email, "bob@example.com");
    }
}
