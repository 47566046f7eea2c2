//! Hierarchical view of the chart of accounts.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::AccountId;

use super::types::{Account, AccountType};

/// Accounts grouped by type, each group a forest of parent/child trees.
#[derive(Debug, Clone, Serialize)]
pub struct AccountTree {
    /// One group per account type, in reporting order.
    pub groups: Vec<AccountGroup>,
}

/// All accounts of one type.
#[derive(Debug, Clone, Serialize)]
pub struct AccountGroup {
    /// The account type.
    pub account_type: AccountType,
    /// Root accounts of this type.
    pub roots: Vec<AccountNode>,
    /// Sum of stored balances of every account in the group.
    pub total_balance: Decimal,
}

/// An account and its children.
#[derive(Debug, Clone, Serialize)]
pub struct AccountNode {
    /// The account.
    pub account: Account,
    /// Child accounts ordered by code.
    pub children: Vec<AccountNode>,
}

impl AccountNode {
    /// Number of accounts in this subtree, including this one.
    #[must_use]
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Self::len).sum::<usize>()
    }

    /// Always false; a node holds at least its own account.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

impl AccountTree {
    /// Builds the tree from a flat account list.
    ///
    /// Accounts whose parent is missing become roots. Groups are grouped by
    /// the root's type and always present, even when empty.
    #[must_use]
    pub fn build(mut accounts: Vec<Account>) -> Self {
        accounts.sort_by(|a, b| a.code.cmp(&b.code));

        let known: HashSet<AccountId> = accounts.iter().map(|a| a.id).collect();
        let mut children_of: HashMap<AccountId, Vec<usize>> = HashMap::new();
        let mut roots = Vec::new();

        for (idx, account) in accounts.iter().enumerate() {
            match account.parent_id {
                Some(parent) if parent != account.id && known.contains(&parent) => {
                    children_of.entry(parent).or_default().push(idx);
                }
                _ => roots.push(idx),
            }
        }

        let mut visited = vec![false; accounts.len()];
        let mut nodes: Vec<AccountNode> = roots
            .iter()
            .map(|&idx| build_node(idx, &accounts, &children_of, &mut visited))
            .collect();

        // Parent cycles are unreachable from any root; surface them as roots.
        for idx in 0..accounts.len() {
            if !visited[idx] {
                nodes.push(build_node(idx, &accounts, &children_of, &mut visited));
            }
        }

        let groups = AccountType::ALL
            .iter()
            .map(|&account_type| {
                let roots: Vec<AccountNode> = nodes
                    .iter()
                    .filter(|n| n.account.account_type == account_type)
                    .cloned()
                    .collect();
                let total_balance = roots.iter().map(subtree_balance).sum();
                AccountGroup {
                    account_type,
                    roots,
                    total_balance,
                }
            })
            .collect();

        Self { groups }
    }

    /// Returns the group for one account type.
    #[must_use]
    pub fn group(&self, account_type: AccountType) -> Option<&AccountGroup> {
        self.groups.iter().find(|g| g.account_type == account_type)
    }
}

fn build_node(
    idx: usize,
    accounts: &[Account],
    children_of: &HashMap<AccountId, Vec<usize>>,
    visited: &mut [bool],
) -> AccountNode {
    visited[idx] = true;
    let account = accounts[idx].clone();
    let children = children_of
        .get(&account.id)
        .map(|kids| {
            kids.iter()
                .filter(|&&kid| !visited[kid])
                .copied()
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
        .into_iter()
        .map(|kid| build_node(kid, accounts, children_of, visited))
        .collect();
    AccountNode { account, children }
}

fn subtree_balance(node: &AccountNode) -> Decimal {
    node.account.balance + node.children.iter().map(subtree_balance).sum::<Decimal>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn account(code: &str, account_type: AccountType, parent: Option<AccountId>) -> Account {
        Account::new(code, format!("Account {code}"), account_type, parent)
    }

    #[test]
    fn test_builds_parent_child_hierarchy() {
        let assets = account("1000", AccountType::Asset, None);
        let mut cash = account("1010", AccountType::Asset, Some(assets.id));
        cash.balance = dec!(250);
        let bank = account("1020", AccountType::Asset, Some(assets.id));
        let revenue = account("4000", AccountType::Revenue, None);

        let tree = AccountTree::build(vec![bank, revenue, cash, assets]);

        let asset_group = tree.group(AccountType::Asset).unwrap();
        assert_eq!(asset_group.roots.len(), 1);
        assert_eq!(asset_group.roots[0].account.code, "1000");
        let child_codes: Vec<_> = asset_group.roots[0]
            .children
            .iter()
            .map(|n| n.account.code.as_str())
            .collect();
        assert_eq!(child_codes, vec!["1010", "1020"]);
        assert_eq!(asset_group.total_balance, dec!(250));
        assert_eq!(tree.group(AccountType::Revenue).unwrap().roots.len(), 1);
    }

    #[test]
    fn test_all_groups_present_in_order() {
        let tree = AccountTree::build(vec![]);
        let types: Vec<_> = tree.groups.iter().map(|g| g.account_type).collect();
        assert_eq!(types, AccountType::ALL.to_vec());
        assert!(tree.groups.iter().all(|g| g.roots.is_empty()));
    }

    #[test]
    fn test_orphans_become_roots() {
        let orphan = account("5010", AccountType::Expense, Some(AccountId::new()));
        let tree = AccountTree::build(vec![orphan]);
        let expenses = tree.group(AccountType::Expense).unwrap();
        assert_eq!(expenses.roots.len(), 1);
        assert_eq!(expenses.roots[0].account.code, "5010");
    }

    #[test]
    fn test_parent_cycle_does_not_lose_accounts() {
        let mut a = account("1000", AccountType::Asset, None);
        let mut b = account("1010", AccountType::Asset, None);
        a.parent_id = Some(b.id);
        b.parent_id = Some(a.id);

        let tree = AccountTree::build(vec![a, b]);
        let group = tree.group(AccountType::Asset).unwrap();
        let total: usize = group.roots.iter().map(AccountNode::len).sum();
        assert_eq!(total, 2);
    }
}
