use chrono::Local;
use fake::{faker::lorem::en::Word, Dummy, Fake, Faker};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    model::{menu::Menu, role::Role},
    repository::{menu::create_menu, menu_permission::replace_menu_roles},
};

/// Inserts menus and, when `roles` is non-empty, grants them to those roles.
pub struct MenuFactory<T: Clone> {
    modifier_one: fn(x: &Menu, ext: T) -> Menu,
    modifier_many: fn(x: &Menu, idx: usize, ext: T) -> Menu,
    roles: Vec<Role>,
}

impl<T: Clone> Default for MenuFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> MenuFactory<T> {
    pub fn new() -> Self {
        Self {
            modifier_one: |x, _| x.clone(),
            modifier_many: |x, _, _| x.clone(),
            roles: vec![],
        }
    }

    pub fn modified_one(&mut self, modifier: fn(x: &Menu, ext: T) -> Menu) {
        self.modifier_one = modifier
    }

    pub fn modified_many(&mut self, modifier: fn(x: &Menu, idx: usize, ext: T) -> Menu) {
        self.modifier_many = modifier
    }

    pub fn visible_to(&mut self, roles: &[Role]) {
        self.roles = roles.to_vec();
    }

    pub async fn generate_one(&mut self, db: &PgPool, ext: T) -> anyhow::Result<Menu> {
        let data = Faker.fake::<MenuDummy>().into_menu();
        let data = (self.modifier_one)(&data, ext);
        let mut tx = db.begin().await?;
        let menu = create_menu(&mut tx, &data).await?;
        replace_menu_roles(&mut tx, menu.id, &self.roles).await?;
        tx.commit().await?;
        Ok(menu)
    }

    /// Rows are inserted in order inside one transaction.
    pub async fn generate_many(
        &mut self,
        db: &PgPool,
        num: u32,
        ext: T,
    ) -> anyhow::Result<Vec<Menu>> {
        let mut tx = db.begin().await?;
        let mut result: Vec<Menu> = vec![];
        for idx in 0..num as usize {
            let data = Faker.fake::<MenuDummy>().into_menu();
            let data = (self.modifier_many)(&data, idx, ext.clone());
            let menu = create_menu(&mut tx, &data).await?;
            replace_menu_roles(&mut tx, menu.id, &self.roles).await?;
            result.push(menu);
        }
        tx.commit().await?;
        Ok(result)
    }
}

#[derive(Debug, Dummy, Clone)]
struct MenuDummy {
    pub key: Uuid,
    #[dummy(faker = "Word()")]
    pub word: String,
    #[dummy(faker = "0..50")]
    pub order_no: i32,
}

impl MenuDummy {
    fn into_menu(self) -> Menu {
        let now = Local::now().fixed_offset();
        let name = format!("{}_{}", self.word, &self.key.simple().to_string()[..8]);
        Menu {
            id: 0,
            parent_id: None,
            display_name: self.word.clone(),
            url: Some(format!("/{}", name)),
            name,
            icon: None,
            order_no: self.order_no,
            is_active: true,
            created_date: Some(now),
            updated_date: Some(now),
        }
    }
}
