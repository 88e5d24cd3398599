use chrono::{Duration, Local};
use fake::{faker::name::en::Name, Dummy, Fake, Faker};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    model::employee::{Employee, GENDERS},
    repository::employee::create_employee,
};

const DEPARTMENTS: [&str; 4] = ["IT", "HR", "Finance", "Operations"];
const POSITIONS: [&str; 3] = ["Staff", "Supervisor", "Manager"];

pub struct EmployeeFactory<T: Clone> {
    modifier_one: fn(x: &Employee, ext: T) -> Employee,
    modifier_many: fn(x: &Employee, idx: usize, ext: T) -> Employee,
}

impl<T: Clone> Default for EmployeeFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> EmployeeFactory<T> {
    pub fn new() -> Self {
        Self {
            modifier_one: |x, _| x.clone(),
            modifier_many: |x, _, _| x.clone(),
        }
    }

    pub fn modified_one(&mut self, modifier: fn(x: &Employee, ext: T) -> Employee) {
        self.modifier_one = modifier
    }

    pub fn modified_many(&mut self, modifier: fn(x: &Employee, idx: usize, ext: T) -> Employee) {
        self.modifier_many = modifier
    }

    pub async fn generate_one(&mut self, db: &PgPool, ext: T) -> anyhow::Result<Employee> {
        let data = Faker.fake::<EmployeeDummy>().into_employee();
        let data = (self.modifier_one)(&data, ext);
        create_employee(db, &data).await?;
        Ok(data)
    }

    pub async fn generate_many(
        &mut self,
        db: &PgPool,
        num: u32,
        ext: T,
    ) -> anyhow::Result<Vec<Employee>> {
        let mut result: Vec<Employee> = vec![];
        for idx in 0..num as usize {
            let data = Faker.fake::<EmployeeDummy>().into_employee();
            result.push((self.modifier_many)(&data, idx, ext.clone()));
        }
        let mut tx = db.begin().await?;
        for item in result.iter() {
            create_employee(&mut *tx, item).await?;
        }
        tx.commit().await?;
        Ok(result)
    }
}

#[derive(Debug, Dummy, Clone)]
struct EmployeeDummy {
    pub id: Uuid,
    #[dummy(faker = "Name()")]
    pub full_name: String,
    #[dummy(faker = "0..4")]
    pub department: usize,
    #[dummy(faker = "0..3")]
    pub position: usize,
    #[dummy(faker = "0..2")]
    pub gender: usize,
    #[dummy(faker = "3000.0..20000.0")]
    pub salary: f64,
    #[dummy(faker = "30..3650")]
    pub days_employed: i64,
}

impl EmployeeDummy {
    fn into_employee(self) -> Employee {
        let now = Local::now();
        let code = self.id.simple().to_string()[..10].to_uppercase();
        Employee {
            id: self.id,
            employee_code: format!("EMP-{}", code),
            full_name: self.full_name,
            email: format!("{}@company.test", code.to_lowercase()),
            phone: None,
            address: None,
            position: POSITIONS[self.position].to_string(),
            department: DEPARTMENTS[self.department].to_string(),
            salary: Some(self.salary),
            hire_date: (now - Duration::days(self.days_employed)).date_naive(),
            birth_date: None,
            gender: GENDERS[self.gender].to_string(),
            photo: None,
            status: "Active".to_string(),
            created_by: None,
            created_date: Some(now.fixed_offset()),
            updated_date: Some(now.fixed_offset()),
        }
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use crate::{factory::employee::EmployeeFactory, model::employee::Employee};

    #[sqlx::test]
    async fn test_generate_one(pool: PgPool) -> anyhow::Result<()> {
        // When
        let mut factory = EmployeeFactory::new();
        let employee = factory.generate_one(&pool, ()).await?;

        // Expect
        let res: (String, String) =
            sqlx::query_as(r#"SELECT employee_code, status FROM public.employees"#)
                .fetch_one(&pool)
                .await?;
        assert_eq!(res.0, employee.employee_code);
        assert_eq!(res.1, "Active".to_string());
        Ok(())
    }

    #[sqlx::test]
    async fn test_generate_many_modified(pool: PgPool) -> anyhow::Result<()> {
        // When
        let mut factory = EmployeeFactory::<String>::new();
        factory.modified_many(|data, _, department| Employee {
            department,
            ..data.clone()
        });
        factory
            .generate_many(&pool, 4, "Research".to_string())
            .await?;

        // Expect
        let res: (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM public.employees WHERE department = 'Research'"#,
        )
        .fetch_one(&pool)
        .await?;
        assert_eq!(res.0, 4);
        Ok(())
    }
}
