//! # Request Session
//!
//! One transaction per HTTP request, handing out repositories that all
//! borrow it.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  handler                                                                │
//! │    let mut session = db.begin().await?;        BEGIN                    │
//! │    session.addresses().find_matching(..)       ┐                        │
//! │    session.products().find_by_ids(..)          ├ same connection        │
//! │    session.orders().create(..)                 ┘                        │
//! │    session.commit().await?;                    COMMIT                   │
//! │                                                                         │
//! │  `?` anywhere above drops the session → ROLLBACK                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each accessor takes `&mut self`, so only one repository is alive at a
//! time; the borrow checker enforces what a single connection requires.

use sqlx::{Sqlite, Transaction};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{
    AddressRepository, CategoryRepository, EmployeeProfileRepository, OrderRepository,
    ProductRepository, UserRepository,
};

/// A request-scoped transaction.
pub struct DbSession {
    tx: Transaction<'static, Sqlite>,
}

impl DbSession {
    pub(crate) fn new(tx: Transaction<'static, Sqlite>) -> Self {
        DbSession { tx }
    }

    pub fn users(&mut self) -> UserRepository<'_> {
        UserRepository::new(&mut self.tx)
    }

    pub fn addresses(&mut self) -> AddressRepository<'_> {
        AddressRepository::new(&mut self.tx)
    }

    pub fn categories(&mut self) -> CategoryRepository<'_> {
        CategoryRepository::new(&mut self.tx)
    }

    pub fn products(&mut self) -> ProductRepository<'_> {
        ProductRepository::new(&mut self.tx)
    }

    pub fn orders(&mut self) -> OrderRepository<'_> {
        OrderRepository::new(&mut self.tx)
    }

    pub fn employee_profiles(&mut self) -> EmployeeProfileRepository<'_> {
        EmployeeProfileRepository::new(&mut self.tx)
    }

    /// Makes every change of this session durable.
    pub async fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        debug!("Session committed");
        Ok(())
    }

    /// Discards every change of this session. Dropping does the same.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}
