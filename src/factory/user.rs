use chrono::Local;
use fake::{faker::name::en::Name, Dummy, Fake, Faker};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    model::{role::Role, user::User},
    repository::user::create_user,
};

/// Stored as-is; not a valid PHC string, so these users cannot log in.
const PLACEHOLDER_PASSWORD: &str = "factory-password";

pub struct UserFactory<T: Clone> {
    modifier_one: fn(x: &User, ext: T) -> User,
    modifier_many: fn(x: &User, idx: usize, ext: T) -> User,
}

impl<T: Clone> Default for UserFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> UserFactory<T> {
    pub fn new() -> Self {
        Self {
            modifier_one: |x, _| x.clone(),
            modifier_many: |x, _, _| x.clone(),
        }
    }

    pub fn modified_one(&mut self, modifier: fn(x: &User, ext: T) -> User) {
        self.modifier_one = modifier
    }

    pub fn modified_many(&mut self, modifier: fn(x: &User, idx: usize, ext: T) -> User) {
        self.modifier_many = modifier
    }

    pub async fn generate_one(&mut self, db: &PgPool, ext: T) -> anyhow::Result<User> {
        let data = Faker.fake::<UserDummy>().into_user();
        let data = (self.modifier_one)(&data, ext);
        create_user(db, &data).await?;
        Ok(data)
    }

    pub async fn generate_many(
        &mut self,
        db: &PgPool,
        num: u32,
        ext: T,
    ) -> anyhow::Result<Vec<User>> {
        let mut result: Vec<User> = vec![];
        for idx in 0..num as usize {
            let data = Faker.fake::<UserDummy>().into_user();
            result.push((self.modifier_many)(&data, idx, ext.clone()));
        }
        let mut tx = db.begin().await?;
        for item in result.iter() {
            create_user(&mut *tx, item).await?;
        }
        tx.commit().await?;
        Ok(result)
    }
}

#[derive(Debug, Dummy, Clone)]
struct UserDummy {
    pub id: Uuid,
    #[dummy(faker = "Name()")]
    pub full_name: String,
}

impl UserDummy {
    fn into_user(self) -> User {
        let now = Local::now().fixed_offset();
        let username = format!("user_{}", &self.id.simple().to_string()[..12]);
        User {
            id: self.id,
            email: format!("{}@example.com", username),
            username,
            password: PLACEHOLDER_PASSWORD.to_string(),
            full_name: self.full_name,
            role: Role::User,
            is_active: true,
            created_date: Some(now),
            updated_date: Some(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;
    use uuid::Uuid;

    use crate::{
        factory::user::UserFactory,
        model::{role::Role, user::User},
    };

    #[derive(Clone)]
    struct ExtData {
        pub id: Uuid,
    }

    #[sqlx::test]
    async fn test_generate_one(pool: PgPool) -> anyhow::Result<()> {
        // When
        let mut factory = UserFactory::new();
        factory.generate_one(&pool, ()).await?;

        // Expect
        let num_data: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM public.users"#)
            .fetch_one(&pool)
            .await?;
        assert_eq!(num_data.0, 1);
        Ok(())
    }

    #[sqlx::test]
    async fn test_generate_one_modified(pool: PgPool) -> anyhow::Result<()> {
        // When
        let mut factory = UserFactory::<ExtData>::new();
        factory.modified_one(|data, ext| User {
            id: ext.id,
            username: "test_user".to_string(),
            role: Role::Admin,
            ..data.clone()
        });
        let ext = ExtData { id: Uuid::now_v7() };
        factory.generate_one(&pool, ext.clone()).await?;

        // Expect
        let res: (Uuid, String, String) =
            sqlx::query_as(r#"SELECT id, username, role FROM public.users"#)
                .fetch_one(&pool)
                .await?;
        assert_eq!(res.0, ext.id);
        assert_eq!(res.1, "test_user".to_string());
        assert_eq!(res.2, "admin".to_string());
        Ok(())
    }

    #[sqlx::test]
    async fn test_generate_many_modified(pool: PgPool) -> anyhow::Result<()> {
        // When
        let mut factory = UserFactory::new();
        factory.modified_many(|data, idx, _| User {
            is_active: idx % 2 == 0,
            ..data.clone()
        });
        factory.generate_many(&pool, 5, ()).await?;

        // Expect
        let res: (i64,) =
            sqlx::query_as(r#"SELECT COUNT(*) FROM public.users WHERE is_active"#)
                .fetch_one(&pool)
                .await?;
        assert_eq!(res.0, 3);
        Ok(())
    }
}
