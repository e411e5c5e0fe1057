//! Accounts: the named buckets that transactions move money between.

mod accounts_page;
mod core;
mod create;
mod delete;
mod edit;
mod form;

pub use accounts_page::get_accounts_page;
pub use core::{
    Account, AccountFields, AccountId, AccountPatch, AccountType, NewAccount, account_exists,
    create_account, create_account_table, delete_account, get_account, get_all_accounts,
    update_account,
};
pub use create::{create_account_endpoint, get_new_account_page};
pub use delete::delete_account_endpoint;
pub use edit::{get_edit_account_page, update_account_endpoint};
