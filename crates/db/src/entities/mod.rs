//! `SeaORM` entity definitions.

pub mod budgets;
pub mod budgets_history;
pub mod transactions;

pub mod prelude {
    //! Entity re-exports.

    pub use super::budgets::Entity as Budgets;
    pub use super::budgets_history::Entity as BudgetsHistory;
    pub use super::transactions::Entity as Transactions;
}
