//! Database repository for recipes.
//!
//! Like [`Attributes`], a `Recipes` repository is bound to an owner and every statement filters
//! on it. Links to tags and ingredients are only ever written for attributes the owner holds.

use crate::{
    db::{
        errors::{DbError, Result},
        handlers::{attributes::Attributes, repository::Repository},
        models::{
            attributes::{AttributeDBResponse, AttributeKind},
            recipes::{RecipeCreateDBRequest, RecipeDBResponse, RecipeFilter, RecipeUpdateDBRequest},
        },
    },
    types::{RecipeId, UserId},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Connection, FromRow, PgConnection};
use std::collections::HashMap;
use tracing::instrument;

// Database entity model
#[derive(Debug, Clone, FromRow)]
struct Recipe {
    pub id: RecipeId,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub image: Option<String>,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<(Recipe, Vec<AttributeDBResponse>, Vec<AttributeDBResponse>)> for RecipeDBResponse {
    fn from((recipe, tags, ingredients): (Recipe, Vec<AttributeDBResponse>, Vec<AttributeDBResponse>)) -> Self {
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price: recipe.price,
            link: recipe.link,
            image: recipe.image,
            user_id: recipe.user_id,
            tags,
            ingredients,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
        }
    }
}

/// Replace the links of one kind for a recipe. Ids the owner doesn't hold are ignored.
async fn replace_links(conn: &mut PgConnection, kind: AttributeKind, recipe_id: RecipeId, owner: UserId, ids: &[i64]) -> Result<()> {
    let delete = format!("DELETE FROM {} WHERE recipe_id = $1", kind.link_table());
    sqlx::query(&delete).bind(recipe_id).execute(&mut *conn).await?;

    if ids.is_empty() {
        return Ok(());
    }

    let insert = format!(
        r#"
        INSERT INTO {link} (recipe_id, {column})
        SELECT $1, a.id FROM {table} a WHERE a.id = ANY($2) AND a.user_id = $3
        ON CONFLICT DO NOTHING
        "#,
        link = kind.link_table(),
        column = kind.link_column(),
        table = kind.table(),
    );
    sqlx::query(&insert)
        .bind(recipe_id)
        .bind(ids)
        .bind(owner)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub struct Recipes<'c> {
    db: &'c mut PgConnection,
    owner: UserId,
}

impl<'c> Recipes<'c> {
    pub fn new(db: &'c mut PgConnection, owner: UserId) -> Self {
        Self { db, owner }
    }

    /// Attach the recipe's tags and ingredients to a batch of rows, preserving row order
    async fn with_links(&mut self, recipes: Vec<Recipe>) -> Result<Vec<RecipeDBResponse>> {
        let ids: Vec<RecipeId> = recipes.iter().map(|r| r.id).collect();
        let mut tags = self.links(AttributeKind::Tag, &ids).await?;
        let mut ingredients = self.links(AttributeKind::Ingredient, &ids).await?;

        Ok(recipes
            .into_iter()
            .map(|recipe| {
                let id = recipe.id;
                RecipeDBResponse::from((
                    recipe,
                    tags.remove(&id).unwrap_or_default(),
                    ingredients.remove(&id).unwrap_or_default(),
                ))
            })
            .collect())
    }

    /// Linked attributes per recipe, each list ordered by attribute id
    async fn links(&mut self, kind: AttributeKind, recipe_ids: &[RecipeId]) -> Result<HashMap<RecipeId, Vec<AttributeDBResponse>>> {
        if recipe_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let query = format!(
            "SELECT recipe_id, {column} FROM {link} WHERE recipe_id = ANY($1) ORDER BY recipe_id, {column}",
            column = kind.link_column(),
            link = kind.link_table(),
        );
        let pairs: Vec<(RecipeId, i64)> = sqlx::query_as(&query).bind(recipe_ids).fetch_all(&mut *self.db).await?;

        let attribute_ids: Vec<i64> = pairs.iter().map(|(_, id)| *id).collect();
        let attributes = Attributes::new(&mut *self.db, kind, self.owner).get_bulk(&attribute_ids).await?;

        let mut result: HashMap<RecipeId, Vec<AttributeDBResponse>> = HashMap::new();
        for (recipe_id, attribute_id) in pairs {
            if let Some(attribute) = attributes.get(&attribute_id) {
                result.entry(recipe_id).or_default().push(attribute.clone());
            }
        }
        Ok(result)
    }

    /// Set the recipe's image path, replacing any previous one
    #[instrument(skip(self), fields(owner = self.owner), err)]
    pub async fn set_image(&mut self, id: RecipeId, path: &str) -> Result<RecipeDBResponse> {
        let recipe = sqlx::query_as::<_, Recipe>(
            "UPDATE recipes SET image = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(self.owner)
        .bind(path)
        .fetch_optional(&mut *self.db)
        .await?
        .ok_or(DbError::NotFound)?;

        let mut responses = self.with_links(vec![recipe]).await?;
        responses.pop().ok_or(DbError::NotFound)
    }
}

#[async_trait::async_trait]
impl<'c> Repository for Recipes<'c> {
    type CreateRequest = RecipeCreateDBRequest;
    type UpdateRequest = RecipeUpdateDBRequest;
    type Response = RecipeDBResponse;
    type Id = RecipeId;
    type Filter = RecipeFilter;

    #[instrument(skip(self, request), fields(owner = self.owner, title = %request.title), err)]
    async fn create(&mut self, request: &Self::CreateRequest) -> Result<Self::Response> {
        let mut tx = self.db.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes (title, time_minutes, price, link, user_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&request.title)
        .bind(request.time_minutes)
        .bind(request.price)
        .bind(&request.link)
        .bind(self.owner)
        .fetch_one(&mut *tx)
        .await?;

        replace_links(&mut *tx, AttributeKind::Tag, recipe.id, self.owner, &request.tags).await?;
        replace_links(&mut *tx, AttributeKind::Ingredient, recipe.id, self.owner, &request.ingredients).await?;

        tx.commit().await?;

        let mut responses = self.with_links(vec![recipe]).await?;
        responses.pop().ok_or(DbError::NotFound)
    }

    #[instrument(skip(self), fields(owner = self.owner), err)]
    async fn get_by_id(&mut self, id: Self::Id) -> Result<Option<Self::Response>> {
        let recipe = sqlx::query_as::<_, Recipe>("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(self.owner)
            .fetch_optional(&mut *self.db)
            .await?;

        match recipe {
            Some(recipe) => Ok(self.with_links(vec![recipe]).await?.pop()),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, filter), fields(owner = self.owner, tags = filter.tags.len(), ingredients = filter.ingredients.len()), err)]
    async fn list(&mut self, filter: &Self::Filter) -> Result<Vec<Self::Response>> {
        let recipes = sqlx::query_as::<_, Recipe>(
            r#"
            SELECT r.*
            FROM recipes r
            WHERE r.user_id = $1
              AND (
                CARDINALITY($2::BIGINT[]) = 0
                OR EXISTS (SELECT 1 FROM recipe_tags rt WHERE rt.recipe_id = r.id AND rt.tag_id = ANY($2))
              )
              AND (
                CARDINALITY($3::BIGINT[]) = 0
                OR EXISTS (SELECT 1 FROM recipe_ingredients ri WHERE ri.recipe_id = r.id AND ri.ingredient_id = ANY($3))
              )
            ORDER BY r.id
            "#,
        )
        .bind(self.owner)
        .bind(&filter.tags)
        .bind(&filter.ingredients)
        .fetch_all(&mut *self.db)
        .await?;

        self.with_links(recipes).await
    }

    #[instrument(skip(self), fields(owner = self.owner), err)]
    async fn delete(&mut self, id: Self::Id) -> Result<bool> {
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(self.owner)
            .execute(&mut *self.db)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, request), fields(owner = self.owner), err)]
    async fn update(&mut self, id: Self::Id, request: &Self::UpdateRequest) -> Result<Self::Response> {
        // Recipe row and link tables change together
        let mut tx = self.db.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            UPDATE recipes SET
                title = COALESCE($3, title),
                time_minutes = COALESCE($4, time_minutes),
                price = COALESCE($5, price),
                link = COALESCE($6, link),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(self.owner)
        .bind(&request.title)
        .bind(request.time_minutes)
        .bind(request.price)
        .bind(&request.link)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(DbError::NotFound)?;

        if let Some(tags) = &request.tags {
            replace_links(&mut *tx, AttributeKind::Tag, recipe.id, self.owner, tags).await?;
        }
        if let Some(ingredients) = &request.ingredients {
            replace_links(&mut *tx, AttributeKind::Ingredient, recipe.id, self.owner, ingredients).await?;
        }

        tx.commit().await?;

        let mut responses = self.with_links(vec![recipe]).await?;
        responses.pop().ok_or(DbError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::handlers::Users;

    use sqlx::PgPool;

    async fn create_owner(conn: &mut PgConnection, email: &str) -> UserId {
        Users::new(conn).create_user(email, "", None).await.unwrap().id
    }

    fn sample_recipe(title: &str) -> RecipeCreateDBRequest {
        RecipeCreateDBRequest {
            title: title.to_string(),
            time_minutes: 10,
            price: Decimal::new(500, 2),
            link: String::new(),
            tags: vec![],
            ingredients: vec![],
        }
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_create_with_links(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_owner(&mut conn, "chef@example.com").await;

        let vegan = Attributes::tags(&mut conn, owner).create("Vegan").await.unwrap();
        let dessert = Attributes::tags(&mut conn, owner).create("Dessert").await.unwrap();
        let ginger = Attributes::ingredients(&mut conn, owner).create("Ginger").await.unwrap();

        let mut recipes = Recipes::new(&mut conn, owner);
        let created = recipes
            .create(&RecipeCreateDBRequest {
                tags: vec![vegan.id, dessert.id],
                ingredients: vec![ginger.id],
                ..sample_recipe("Chocolate cheesecake")
            })
            .await
            .unwrap();

        assert_eq!(created.title, "Chocolate cheesecake");
        assert_eq!(created.price, Decimal::new(500, 2));
        assert_eq!(created.user_id, owner);
        let tag_ids: Vec<_> = created.tags.iter().map(|t| t.id).collect();
        assert_eq!(tag_ids, vec![vegan.id, dessert.id]);
        assert_eq!(created.ingredients.len(), 1);
        assert_eq!(created.ingredients[0].name, "Ginger");
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_foreign_attributes_are_never_linked(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_owner(&mut conn, "owner@example.com").await;
        let other = create_owner(&mut conn, "other@example.com").await;

        let theirs = Attributes::tags(&mut conn, other).create("Theirs").await.unwrap();

        let created = Recipes::new(&mut conn, owner)
            .create(&RecipeCreateDBRequest {
                tags: vec![theirs.id],
                ..sample_recipe("Sneaky")
            })
            .await
            .unwrap();
        assert!(created.tags.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_recipes_limited_to_owner(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_owner(&mut conn, "a@example.com").await;
        let other = create_owner(&mut conn, "b@example.com").await;

        let theirs = Recipes::new(&mut conn, other).create(&sample_recipe("Theirs")).await.unwrap();
        let mine = Recipes::new(&mut conn, owner).create(&sample_recipe("Mine")).await.unwrap();

        let mut recipes = Recipes::new(&mut conn, owner);
        let listed = recipes.list(&RecipeFilter::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, mine.id);

        assert!(recipes.get_by_id(theirs.id).await.unwrap().is_none());
        assert!(!recipes.delete(theirs.id).await.unwrap());
        assert!(matches!(
            recipes.update(theirs.id, &RecipeUpdateDBRequest::default()).await,
            Err(DbError::NotFound)
        ));
        assert!(matches!(recipes.set_image(theirs.id, "uploads/recipe/x.png").await, Err(DbError::NotFound)));
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_update_replaces_only_provided_links(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_owner(&mut conn, "update@example.com").await;

        let curry = Attributes::tags(&mut conn, owner).create("Curry").await.unwrap();
        let spicy = Attributes::tags(&mut conn, owner).create("Spicy").await.unwrap();
        let salt = Attributes::ingredients(&mut conn, owner).create("Salt").await.unwrap();

        let mut recipes = Recipes::new(&mut conn, owner);
        let created = recipes
            .create(&RecipeCreateDBRequest {
                tags: vec![spicy.id],
                ingredients: vec![salt.id],
                ..sample_recipe("Chicken tikka")
            })
            .await
            .unwrap();

        let updated = recipes
            .update(
                created.id,
                &RecipeUpdateDBRequest {
                    title: Some("Chicken curry".to_string()),
                    tags: Some(vec![curry.id]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "Chicken curry");
        assert_eq!(updated.time_minutes, 10);
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.tags[0].id, curry.id);
        assert_eq!(updated.ingredients.len(), 1);

        let cleared = recipes
            .update(
                created.id,
                &RecipeUpdateDBRequest {
                    tags: Some(vec![]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.tags.is_empty());
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_filter_by_tags_and_ingredients(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_owner(&mut conn, "filter@example.com").await;

        let vegan = Attributes::tags(&mut conn, owner).create("Vegan").await.unwrap();
        let veggie = Attributes::tags(&mut conn, owner).create("Vegetarian").await.unwrap();
        let feta = Attributes::ingredients(&mut conn, owner).create("Feta").await.unwrap();

        let mut recipes = Recipes::new(&mut conn, owner);
        let curry = recipes
            .create(&RecipeCreateDBRequest {
                tags: vec![vegan.id],
                ..sample_recipe("Thai vegetable curry")
            })
            .await
            .unwrap();
        let aubergine = recipes
            .create(&RecipeCreateDBRequest {
                tags: vec![veggie.id],
                ingredients: vec![feta.id],
                ..sample_recipe("Aubergine with tahini")
            })
            .await
            .unwrap();
        recipes.create(&sample_recipe("Fish and chips")).await.unwrap();

        let by_tags = recipes
            .list(&RecipeFilter {
                tags: vec![vegan.id, veggie.id],
                ingredients: vec![],
            })
            .await
            .unwrap();
        let ids: Vec<_> = by_tags.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![curry.id, aubergine.id]);

        let by_both = recipes
            .list(&RecipeFilter {
                tags: vec![vegan.id, veggie.id],
                ingredients: vec![feta.id],
            })
            .await
            .unwrap();
        assert_eq!(by_both.len(), 1);
        assert_eq!(by_both[0].id, aubergine.id);

        assert_eq!(recipes.list(&RecipeFilter::default()).await.unwrap().len(), 3);
    }

    #[sqlx::test]
    #[test_log::test]
    async fn test_set_image_replaces_previous(pool: PgPool) {
        let mut conn = pool.acquire().await.unwrap();
        let owner = create_owner(&mut conn, "image@example.com").await;

        let mut recipes = Recipes::new(&mut conn, owner);
        let created = recipes.create(&sample_recipe("Photo")).await.unwrap();
        assert!(created.image.is_none());

        recipes.set_image(created.id, "uploads/recipe/first.jpg").await.unwrap();
        let updated = recipes.set_image(created.id, "uploads/recipe/second.jpg").await.unwrap();
        assert_eq!(updated.image.as_deref(), Some("uploads/recipe/second.jpg"));

        assert!(recipes.delete(created.id).await.unwrap());
        assert!(recipes.get_by_id(created.id).await.unwrap().is_none());
    }
}
