//! Layout state owned by the console shell and handed down to whatever
//! renders it.

use crate::model::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellState {
    pub sidebar_expanded: bool,
    pub account_menu_open: bool,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            sidebar_expanded: true,
            account_menu_open: false,
        }
    }
}

impl ShellState {
    pub fn toggle_sidebar(&mut self) {
        self.sidebar_expanded = !self.sidebar_expanded;
    }

    pub fn toggle_account_menu(&mut self) {
        self.account_menu_open = !self.account_menu_open;
    }

    /// Navigating away closes transient menus.
    pub fn navigated(&mut self) {
        self.account_menu_open = false;
    }
}

/// Sidebar entries visible to a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavItem {
    Dashboard,
    Employees,
    Departments,
    JobRoles,
    LeaveApprovals,
    MyLeaves,
    Payrolls,
}

pub fn navigation(role: Role) -> Vec<NavItem> {
    if role.is_manager() {
        vec![
            NavItem::Dashboard,
            NavItem::Employees,
            NavItem::Departments,
            NavItem::JobRoles,
            NavItem::LeaveApprovals,
            NavItem::Payrolls,
        ]
    } else {
        vec![NavItem::Dashboard, NavItem::MyLeaves, NavItem::Payrolls]
    }
}
