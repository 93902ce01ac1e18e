//! `SeaORM` entity definitions.

pub mod businesses;
pub mod categories;
pub mod customers;
pub mod point_transactions;
pub mod profiles;
pub mod sea_orm_active_enums;
pub mod sub_categories;
pub mod users;
pub mod wallets;
