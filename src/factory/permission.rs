use chrono::Local;
use fake::{faker::lorem::en::Word, Dummy, Fake, Faker};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{model::permission::Permission, repository::permission::create_permission};

pub struct PermissionFactory<T: Clone> {
    modifier_one: fn(x: &Permission, ext: T) -> Permission,
    modifier_many: fn(x: &Permission, idx: usize, ext: T) -> Permission,
}

impl<T: Clone> Default for PermissionFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> PermissionFactory<T> {
    pub fn new() -> Self {
        Self {
            modifier_one: |x, _| x.clone(),
            modifier_many: |x, _, _| x.clone(),
        }
    }

    pub fn modified_one(&mut self, modifier: fn(x: &Permission, ext: T) -> Permission) {
        self.modifier_one = modifier
    }

    pub fn modified_many(
        &mut self,
        modifier: fn(x: &Permission, idx: usize, ext: T) -> Permission,
    ) {
        self.modifier_many = modifier
    }

    pub async fn generate_one(&mut self, db: &PgPool, ext: T) -> anyhow::Result<Permission> {
        let data = Faker.fake::<PermissionDummy>().into_permission();
        let data = (self.modifier_one)(&data, ext);
        create_permission(db, &data).await
    }

    pub async fn generate_many(
        &mut self,
        db: &PgPool,
        num: u32,
        ext: T,
    ) -> anyhow::Result<Vec<Permission>> {
        let mut tx = db.begin().await?;
        let mut result: Vec<Permission> = vec![];
        for idx in 0..num as usize {
            let data = Faker.fake::<PermissionDummy>().into_permission();
            let data = (self.modifier_many)(&data, idx, ext.clone());
            result.push(create_permission(&mut *tx, &data).await?);
        }
        tx.commit().await?;
        Ok(result)
    }
}

#[derive(Debug, Dummy, Clone)]
struct PermissionDummy {
    pub key: Uuid,
    #[dummy(faker = "Word()")]
    pub module: String,
}

impl PermissionDummy {
    fn into_permission(self) -> Permission {
        let now = Local::now().fixed_offset();
        let action = &self.key.simple().to_string()[..8];
        Permission {
            id: 0,
            name: format!("{}.{}", self.module, action),
            display_name: format!("{} {}", self.module, action),
            description: None,
            module: self.module,
            created_date: Some(now),
            updated_date: Some(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use crate::{factory::permission::PermissionFactory, model::permission::Permission};

    #[sqlx::test]
    async fn test_generate_one_modified(pool: PgPool) -> anyhow::Result<()> {
        // When
        let mut factory = PermissionFactory::new();
        factory.modified_one(|data, _| Permission {
            name: "reports.export".to_string(),
            module: "reports".to_string(),
            ..data.clone()
        });
        let permission = factory.generate_one(&pool, ()).await?;

        // Expect
        assert!(permission.id > 0);
        let res: (String, String) =
            sqlx::query_as("SELECT name, module FROM public.permissions WHERE id = $1")
                .bind(permission.id)
                .fetch_one(&pool)
                .await?;
        assert_eq!(res, ("reports.export".to_string(), "reports".to_string()));
        Ok(())
    }
}
