//! Canonical chart of accounts.
//!
//! Every account code referenced by the sync mapping tables is listed here,
//! parents before children, so seeding can run top to bottom.

use super::types::AccountType;

/// A chart entry to seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartAccount {
    /// Account code.
    pub code: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Classification.
    pub account_type: AccountType,
    /// Code of the parent account, seeded earlier in the same chart.
    pub parent_code: Option<&'static str>,
}

const fn header(code: &'static str, name: &'static str, account_type: AccountType) -> ChartAccount {
    ChartAccount {
        code,
        name,
        account_type,
        parent_code: None,
    }
}

const fn child(
    code: &'static str,
    name: &'static str,
    account_type: AccountType,
    parent_code: &'static str,
) -> ChartAccount {
    ChartAccount {
        code,
        name,
        account_type,
        parent_code: Some(parent_code),
    }
}

/// Cash on hand at branches and agents.
pub const CASH_ON_HAND: &str = "1010";
/// Main operating bank account.
pub const BANK_OPERATING: &str = "1020";
/// E-money float held with mobile network operators.
pub const MOMO_FLOAT: &str = "1030";
/// Float held by agency banking agents.
pub const AGENCY_FLOAT: &str = "1040";
/// Balances owed to mobile money wallet holders.
pub const CUSTOMER_WALLETS: &str = "2010";
/// Deposits taken through agency banking.
pub const AGENCY_DEPOSITS: &str = "2020";
/// Commissions earned by agents, not yet paid out.
pub const COMMISSIONS_PAYABLE: &str = "2030";
/// Amounts owed to billers and merchants.
pub const MERCHANT_PAYABLE: &str = "2040";
/// Fees charged on mobile money transactions.
pub const MOMO_FEE_INCOME: &str = "4010";
/// Fees charged on agency banking transactions.
pub const AGENCY_FEE_INCOME: &str = "4020";
/// Commissions received from partner institutions.
pub const COMMISSION_INCOME: &str = "4030";
/// Commissions owed to agents.
pub const AGENT_COMMISSION_EXPENSE: &str = "5010";
/// Payroll.
pub const SALARIES: &str = "5020";
/// Rent and utilities.
pub const RENT_AND_UTILITIES: &str = "5030";
/// Office and administrative costs.
pub const OFFICE_ADMIN: &str = "5040";
/// Transport and logistics.
pub const TRANSPORT: &str = "5050";
/// Anything not classified elsewhere.
pub const OTHER_EXPENSES: &str = "5090";

/// The default chart seeded by `ensure_required_accounts_exist`.
pub const CANONICAL_CHART: &[ChartAccount] = &[
    header("1000", "Current Assets", AccountType::Asset),
    child(CASH_ON_HAND, "Cash on Hand", AccountType::Asset, "1000"),
    child(BANK_OPERATING, "Bank - Operating Account", AccountType::Asset, "1000"),
    child(MOMO_FLOAT, "Mobile Money Float", AccountType::Asset, "1000"),
    child(AGENCY_FLOAT, "Agency Banking Float", AccountType::Asset, "1000"),
    header("2000", "Current Liabilities", AccountType::Liability),
    child(CUSTOMER_WALLETS, "Customer Wallet Balances", AccountType::Liability, "2000"),
    child(AGENCY_DEPOSITS, "Agency Customer Deposits", AccountType::Liability, "2000"),
    child(COMMISSIONS_PAYABLE, "Commissions Payable", AccountType::Liability, "2000"),
    child(MERCHANT_PAYABLE, "Merchant Settlements Payable", AccountType::Liability, "2000"),
    header("3000", "Equity", AccountType::Equity),
    child("3010", "Owner's Capital", AccountType::Equity, "3000"),
    child("3020", "Retained Earnings", AccountType::Equity, "3000"),
    header("4000", "Revenue", AccountType::Revenue),
    child(MOMO_FEE_INCOME, "Mobile Money Fee Income", AccountType::Revenue, "4000"),
    child(AGENCY_FEE_INCOME, "Agency Banking Fee Income", AccountType::Revenue, "4000"),
    child(COMMISSION_INCOME, "Commission Income", AccountType::Revenue, "4000"),
    header("5000", "Operating Expenses", AccountType::Expense),
    child(AGENT_COMMISSION_EXPENSE, "Agent Commission Expense", AccountType::Expense, "5000"),
    child(SALARIES, "Salaries and Wages", AccountType::Expense, "5000"),
    child(RENT_AND_UTILITIES, "Rent and Utilities", AccountType::Expense, "5000"),
    child(OFFICE_ADMIN, "Office and Administrative", AccountType::Expense, "5000"),
    child(TRANSPORT, "Transport", AccountType::Expense, "5000"),
    child(OTHER_EXPENSES, "Other Expenses", AccountType::Expense, "5000"),
];
